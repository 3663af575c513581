use crate::{
    core::{
        constants::{DELTA_PER_ZOOM, WHEEL_LINE_HEIGHT},
        view::View,
    },
    input::events::{InputEvent, MapBrowserEvent, WheelDeltaMode},
    interaction::{condition, condition::Condition, Interaction},
};

/// Options for [`MouseWheelZoom`]
#[derive(Clone)]
pub struct MouseWheelZoomOptions {
    /// Zoom by whole levels and land on an integer zoom
    pub constrain_resolution: bool,
    pub condition: Condition,
    /// Largest zoom change of a single wheel event, in levels
    pub max_delta: f64,
    /// Keep the coordinate under the pointer fixed while zooming
    pub use_anchor: bool,
}

impl Default for MouseWheelZoomOptions {
    fn default() -> Self {
        Self {
            constrain_resolution: false,
            condition: condition::always(),
            max_delta: 1.0,
            use_anchor: true,
        }
    }
}

impl std::fmt::Debug for MouseWheelZoomOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MouseWheelZoomOptions")
            .field("constrain_resolution", &self.constrain_resolution)
            .field("max_delta", &self.max_delta)
            .field("use_anchor", &self.use_anchor)
            .finish_non_exhaustive()
    }
}

/// Zooms the view on wheel events
#[derive(Debug, Clone)]
pub struct MouseWheelZoom {
    options: MouseWheelZoomOptions,
    active: bool,
}

impl MouseWheelZoom {
    pub fn new(options: MouseWheelZoomOptions) -> Self {
        Self {
            options,
            active: true,
        }
    }

    pub fn options(&self) -> &MouseWheelZoomOptions {
        &self.options
    }

    /// Zoom change for a wheel delta; positive deltas zoom out
    fn zoom_delta(&self, delta: f64, delta_mode: WheelDeltaMode) -> f64 {
        let delta = match delta_mode {
            WheelDeltaMode::Pixel => delta,
            WheelDeltaMode::Line => delta * WHEEL_LINE_HEIGHT,
        };
        let limit = self.options.max_delta * DELTA_PER_ZOOM;
        -delta.clamp(-limit, limit) / DELTA_PER_ZOOM
    }
}

impl Default for MouseWheelZoom {
    fn default() -> Self {
        Self::new(MouseWheelZoomOptions::default())
    }
}

impl Interaction for MouseWheelZoom {
    fn name(&self) -> &'static str {
        "mouse-wheel-zoom"
    }

    fn handle_event(&mut self, event: &MapBrowserEvent, view: &mut View) -> bool {
        let InputEvent::Wheel {
            delta, delta_mode, ..
        } = event.event
        else {
            return true;
        };
        if !(self.options.condition)(event) {
            return true;
        }

        let zoom_delta = self.zoom_delta(delta, delta_mode);
        if zoom_delta == 0.0 {
            return false;
        }

        let anchor = if self.options.use_anchor {
            event.coordinate
        } else {
            None
        };

        if self.options.constrain_resolution || view.constrain_resolution() {
            let direction = zoom_delta.signum();
            let before = view.zoom();
            view.snap_zoom(direction, anchor);
            if view.zoom() == before {
                view.adjust_zoom(direction, anchor);
            }
        } else {
            view.adjust_zoom(zoom_delta, anchor);
        }

        log::trace!("wheel zoom by {zoom_delta:.3} to {:.3}", view.zoom());
        false
    }

    fn active(&self) -> bool {
        self.active
    }

    fn set_active(&mut self, active: bool) {
        self.active = active;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        core::{frame::FrameState, geo::Size, view::ViewOptions},
        input::events::KeyModifiers,
    };

    fn wheel(delta: f64, delta_mode: WheelDeltaMode, view: &View, focused: bool) -> MapBrowserEvent {
        let frame_state = FrameState::new(0, view, Size::new(200.0, 100.0), 1.0);
        MapBrowserEvent::new(
            InputEvent::Wheel {
                delta,
                delta_mode,
                position: [100.0, 50.0],
                modifiers: KeyModifiers::default(),
            },
            Some(&frame_state),
            focused,
        )
    }

    fn view_at(zoom: f64) -> View {
        View::new(ViewOptions {
            zoom,
            ..Default::default()
        })
    }

    #[test]
    fn test_unconstrained_zoom_delta() {
        let mut view = view_at(2.0);
        let mut zoom = MouseWheelZoom::default();

        let event = wheel(-150.0, WheelDeltaMode::Pixel, &view, false);
        assert!(!zoom.handle_event(&event, &mut view));
        assert!((view.zoom() - 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_delta_is_clamped() {
        let mut view = view_at(5.0);
        let mut zoom = MouseWheelZoom::default();

        let event = wheel(3000.0, WheelDeltaMode::Pixel, &view, false);
        zoom.handle_event(&event, &mut view);
        assert!((view.zoom() - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_line_mode_scaling() {
        let mut view = view_at(2.0);
        let mut zoom = MouseWheelZoom::default();

        // 3 lines * 40 px = 120 px = 0.4 levels out
        let event = wheel(3.0, WheelDeltaMode::Line, &view, false);
        zoom.handle_event(&event, &mut view);
        assert!((view.zoom() - 1.6).abs() < 1e-9);
    }

    #[test]
    fn test_constrained_zoom_lands_on_integers() {
        let mut view = view_at(2.3);
        let mut zoom = MouseWheelZoom::new(MouseWheelZoomOptions {
            constrain_resolution: true,
            ..Default::default()
        });

        let event = wheel(-10.0, WheelDeltaMode::Pixel, &view, false);
        zoom.handle_event(&event, &mut view);
        assert_eq!(view.zoom(), 3.0);

        let event = wheel(-10.0, WheelDeltaMode::Pixel, &view, false);
        zoom.handle_event(&event, &mut view);
        assert_eq!(view.zoom(), 4.0);

        let event = wheel(500.0, WheelDeltaMode::Pixel, &view, false);
        zoom.handle_event(&event, &mut view);
        assert_eq!(view.zoom(), 3.0);
    }

    #[test]
    fn test_condition_blocks_zoom() {
        let mut view = view_at(2.0);
        let mut zoom = MouseWheelZoom::new(MouseWheelZoomOptions {
            condition: condition::focus(),
            ..Default::default()
        });

        let event = wheel(-300.0, WheelDeltaMode::Pixel, &view, false);
        assert!(zoom.handle_event(&event, &mut view));
        assert_eq!(view.zoom(), 2.0);

        let event = wheel(-300.0, WheelDeltaMode::Pixel, &view, true);
        assert!(!zoom.handle_event(&event, &mut view));
        assert_eq!(view.zoom(), 3.0);
    }

    #[test]
    fn test_other_events_pass_through() {
        let mut view = view_at(2.0);
        let mut zoom = MouseWheelZoom::default();
        let event = MapBrowserEvent::new(InputEvent::Focus, None, true);
        assert!(zoom.handle_event(&event, &mut view));
        assert_eq!(view.zoom(), 2.0);
    }
}
