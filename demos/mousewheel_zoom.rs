//! Mouse wheel zoom restricted to a focused map, snapping to whole zoom levels.
//!
//! Run with `RUST_LOG=debug cargo run --example mousewheel_zoom`.

use glvector::prelude::*;
use geo_types::{point, polygon};
use serde_json::json;

fn main() -> anyhow::Result<()> {
    glvector::init_logging();

    let interactions = defaults(DefaultsOptions {
        mouse_wheel_zoom: false,
        ..Default::default()
    })
    .with(MouseWheelZoom::new(MouseWheelZoomOptions {
        constrain_resolution: true,
        condition: condition::focus(),
        ..Default::default()
    }));

    let source = VectorSource::from_features([
        Feature::new(point!(x: 0.0, y: 0.0)).with_property("name", "origin"),
        Feature::new(polygon![
            (x: -2.0e6, y: -1.0e6),
            (x: 2.0e6, y: -1.0e6),
            (x: 0.0, y: 2.0e6),
        ]),
    ]);
    let style = LayerStyle::from_json(&json!([
        { "circle-radius": 6, "circle-fill-color": ["var", "pointColor"] },
        { "fill-color": ["var", "areaColor"], "stroke-color": "#333", "stroke-width": 1 }
    ]))?;
    let layer = WebGLVectorLayer::new(WebGLVectorLayerOptions {
        source: Some(source),
        style: Some(style),
        variables: Some(
            StyleVariables::new()
                .with("pointColor", "red")
                .with("areaColor", "rgba(0, 128, 255, 0.4)"),
        ),
        ..Default::default()
    })
    .map_err(|e| anyhow::anyhow!(e))?;

    let mut map = Map::new(MapOptions {
        target: Some(MapTarget::new(Size::new(800.0, 600.0), 1.0)),
        view: ViewOptions {
            center: [0.0, 0.0],
            zoom: 2.0,
            ..Default::default()
        },
        interactions: Some(interactions),
        ..Default::default()
    })
    .map_err(|e| anyhow::anyhow!(e))?;
    map.add_layer(layer.clone()).map_err(|e| anyhow::anyhow!(e))?;

    map.on(MapEventType::MoveEnd, |event| {
        if let Some(frame_state) = &event.frame_state {
            log::info!("moveend at zoom {}", frame_state.view_state.zoom);
        }
    });

    let wheel = |delta: f64| InputEvent::Wheel {
        delta,
        delta_mode: WheelDeltaMode::Pixel,
        position: [400.0, 300.0],
        modifiers: KeyModifiers::default(),
    };

    let script = [
        // Ignored: the map is not focused yet
        wheel(-120.0),
        InputEvent::Focus,
        wheel(-120.0),
        wheel(-3.0),
        wheel(250.0),
        InputEvent::Blur,
        wheel(-120.0),
    ];

    let timing = map.performance().framerate.clone();
    let mut last_render = instant::Instant::now();
    for input in script {
        let changed = map.handle_input(input);
        log::info!("zoom {} (changed: {changed})", map.view().zoom());

        if changed {
            layer.update_style_variables(StyleVariables::new().with(
                "pointColor",
                if map.view().zoom() > 2.0 { "yellow" } else { "red" },
            ));
        }

        if timing.should_render(last_render) || changed {
            if map.tick().map_err(|e| anyhow::anyhow!(e))? {
                last_render = instant::Instant::now();
            }
        }
    }

    let draws = map
        .context()
        .with_headless(|ctx| ctx.draw_calls().count())
        .unwrap_or_default();
    log::info!(
        "rendered {} frames, last frame issued {draws} draw calls",
        map.frame_count()
    );

    map.dispose();
    Ok(())
}
