use crate::{
    core::{config::GpuRenderingConfig, frame::FrameState},
    input::handler::{EventManager, ListenerKey},
    layers::base::{LayerProperties, LayerRevision, LayerState, LayerTrait, LayerType},
    rendering::{
        context::ContextHandle,
        event::{RenderEvent, RenderEventType},
        vector::WebGLVectorLayerRenderer,
    },
    source::vector::VectorSource,
    style::{
        rule::{LayerStyle, StyleRuleDescriptor},
        variables::{SharedVariables, StyleVariables},
    },
    MapError, Result,
};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

/// Class name used when none is configured
pub const DEFAULT_CLASS_NAME: &str = "ol-layer";

/// Options for [`WebGLVectorLayer`]
#[derive(Debug, Clone)]
pub struct WebGLVectorLayerOptions {
    /// Class name identifying the layer's output in the host
    pub class_name: Option<String>,
    pub source: Option<VectorSource>,
    /// One rule or an ordered list of rules; none draws nothing
    pub style: Option<LayerStyle>,
    pub variables: Option<StyleVariables>,
    pub disable_hit_detection: bool,
    pub z_index: i32,
    pub visible: bool,
    pub opacity: f32,
}

impl Default for WebGLVectorLayerOptions {
    fn default() -> Self {
        Self {
            class_name: None,
            source: None,
            style: None,
            variables: None,
            disable_hit_detection: false,
            z_index: 0,
            visible: true,
            opacity: 1.0,
        }
    }
}

struct LayerInner {
    properties: LayerProperties,
    styles: Vec<StyleRuleDescriptor>,
    variables: SharedVariables,
    hit_detection_enabled: bool,
    source: RwLock<Option<VectorSource>>,
    renderer: Mutex<Option<Arc<WebGLVectorLayerRenderer>>>,
    events: EventManager<RenderEventType, RenderEvent>,
}

/// Vector layer drawn through a [`WebGLVectorLayerRenderer`].
///
/// Cloning yields another handle to the same layer. Style variables live in a
/// table shared with the renderer: [`update_style_variables`] changes what the
/// next frame draws without rebuilding anything.
///
/// [`update_style_variables`]: WebGLVectorLayer::update_style_variables
#[derive(Clone)]
pub struct WebGLVectorLayer {
    inner: Arc<LayerInner>,
}

impl WebGLVectorLayer {
    pub fn new(options: WebGLVectorLayerOptions) -> Result<Self> {
        if !(0.0..=1.0).contains(&options.opacity) {
            return Err(MapError::Layer(format!(
                "opacity must be within [0, 1], got {}",
                options.opacity
            ))
            .into());
        }

        let class_name = options
            .class_name
            .unwrap_or_else(|| DEFAULT_CLASS_NAME.to_string());
        let styles = options
            .style
            .as_ref()
            .map(LayerStyle::normalize)
            .unwrap_or_default();
        let properties = LayerProperties::with_state(
            LayerProperties::generate_id(LayerType::Vector),
            class_name,
            LayerType::Vector,
            LayerState {
                z_index: options.z_index,
                opacity: options.opacity,
                visible: options.visible,
            },
        );

        log::debug!(
            "created vector layer '{}' with {} style rules",
            properties.id,
            styles.len()
        );

        Ok(Self {
            inner: Arc::new(LayerInner {
                properties,
                styles,
                variables: SharedVariables::new(options.variables.unwrap_or_default()),
                hit_detection_enabled: !options.disable_hit_detection,
                source: RwLock::new(options.source),
                renderer: Mutex::new(None),
                events: EventManager::new(),
            }),
        })
    }

    fn renderer_slot(&self) -> MutexGuard<'_, Option<Arc<WebGLVectorLayerRenderer>>> {
        self.inner
            .renderer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn class_name(&self) -> &str {
        &self.inner.properties.name
    }

    /// Normalized style rules
    pub fn styles(&self) -> &[StyleRuleDescriptor] {
        &self.inner.styles
    }

    pub fn hit_detection_enabled(&self) -> bool {
        self.inner.hit_detection_enabled
    }

    /// Snapshot of the current variable table
    pub fn style_variables(&self) -> StyleVariables {
        self.inner.variables.snapshot()
    }

    /// Merges `variables` into the variable table.
    ///
    /// Given keys are overwritten, others are kept. The change is visible to
    /// the renderer's uniforms immediately; the map redraws on its next tick.
    pub fn update_style_variables(&self, variables: StyleVariables) {
        log::trace!(
            "layer '{}': updating {} style variables",
            self.inner.properties.id,
            variables.len()
        );
        self.inner.variables.merge(variables);
        self.inner.properties.changed();
    }

    /// Like [`update_style_variables`](Self::update_style_variables) for an
    /// untyped JSON object; anything else is rejected
    pub fn update_style_variables_json(&self, value: &serde_json::Value) -> Result<()> {
        let variables = StyleVariables::from_json(value)?;
        self.update_style_variables(variables);
        Ok(())
    }

    pub fn source(&self) -> Option<VectorSource> {
        self.inner
            .source
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Attaches or replaces the source; the existing renderer is kept
    pub fn set_source(&self, source: Option<VectorSource>) {
        *self
            .inner
            .source
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = source;
        self.inner.properties.changed();
    }

    /// Returns the renderer, creating it on first use
    pub fn renderer(&self) -> Arc<WebGLVectorLayerRenderer> {
        self.renderer_slot()
            .get_or_insert_with(|| {
                Arc::new(WebGLVectorLayerRenderer::new(
                    self.inner.styles.clone(),
                    self.inner.variables.clone(),
                    self.inner.hit_detection_enabled,
                ))
            })
            .clone()
    }

    pub fn has_renderer(&self) -> bool {
        self.renderer_slot().is_some()
    }

    /// Register a render event listener
    pub fn on<F>(&self, event_type: RenderEventType, callback: F) -> ListenerKey
    where
        F: Fn(&RenderEvent) + Send + Sync + 'static,
    {
        self.inner.events.on(event_type, callback)
    }

    /// Register a render event listener that fires once
    pub fn once<F>(&self, event_type: RenderEventType, callback: F) -> ListenerKey
    where
        F: Fn(&RenderEvent) + Send + Sync + 'static,
    {
        self.inner.events.once(event_type, callback)
    }

    pub fn un(&self, key: ListenerKey) -> bool {
        self.inner.events.un(key)
    }

    fn vector_options(&self) -> serde_json::Map<String, serde_json::Value> {
        let mut options = serde_json::Map::new();
        options.insert("class_name".into(), self.class_name().into());
        options.insert("styles".into(), self.inner.styles.len().into());
        options.insert(
            "disable_hit_detection".into(),
            (!self.inner.hit_detection_enabled).into(),
        );
        options
    }

    fn dispatch(&self, event_type: RenderEventType, context: &ContextHandle, frame_state: &FrameState) {
        if !self.inner.events.has_listeners(event_type) {
            return;
        }
        let event = RenderEvent::new(event_type, context.clone(), frame_state);
        self.inner.events.dispatch(event_type, &event);
    }
}

impl LayerTrait for WebGLVectorLayer {
    crate::impl_layer_trait!(inner.properties);
    crate::impl_default_options_serialization!(inner.properties, vector_options);

    fn revision(&self) -> LayerRevision {
        LayerRevision {
            layer: self.inner.properties.revision(),
            source: self.source().map_or(0, |source| source.revision()),
        }
    }

    fn render_frame(
        &self,
        frame_state: &FrameState,
        context: &ContextHandle,
        config: &GpuRenderingConfig,
    ) -> Result<bool> {
        if !self.is_visible() {
            return Ok(false);
        }

        let source = self.source();
        let renderer = self.renderer();
        if !renderer.prepare_frame(frame_state, source.as_ref()) {
            log::trace!("layer '{}' skipped frame {}", self.id(), frame_state.index);
            return Ok(false);
        }
        let Some(source) = source else {
            return Ok(false);
        };

        self.dispatch(RenderEventType::PreCompose, context, frame_state);
        self.dispatch(RenderEventType::PreRender, context, frame_state);
        let draws = renderer.render(context, frame_state, &source, config)?;
        log::trace!(
            "layer '{}' issued {draws} draw calls in frame {}",
            self.id(),
            frame_state.index
        );
        self.dispatch(RenderEventType::PostRender, context, frame_state);

        Ok(true)
    }

    /// Disposes the renderer, if any; a later frame builds a fresh one
    fn dispose(&self) {
        let renderer = self.renderer_slot().take();
        if let Some(renderer) = renderer {
            renderer.dispose();
            log::debug!("disposed layer '{}'", self.id());
        }
    }
}

impl std::fmt::Debug for WebGLVectorLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebGLVectorLayer")
            .field("id", &self.inner.properties.id)
            .field("class_name", &self.class_name())
            .field("styles", &self.inner.styles.len())
            .field("has_source", &self.source().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        core::{
            geo::Size,
            view::{View, ViewOptions},
        },
        rendering::{context::BufferKind, uniforms::UniformValue},
        source::vector::Feature,
        style::{rule::StyleRule, value::StyleValue},
    };
    use geo_types::point;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn frame_state() -> FrameState {
        let view = View::new(ViewOptions::default());
        FrameState::new(1, &view, Size::new(100.0, 80.0), 1.0)
    }

    fn point_source() -> VectorSource {
        VectorSource::from_features([Feature::new(point!(x: 0.0, y: 0.0))])
    }

    fn circle_layer(source: Option<VectorSource>) -> WebGLVectorLayer {
        WebGLVectorLayer::new(WebGLVectorLayerOptions {
            source,
            style: Some(
                StyleRule::new()
                    .with("circle-radius", 4)
                    .with("circle-fill-color", StyleValue::var("fillColor"))
                    .into(),
            ),
            variables: Some(StyleVariables::new().with("fillColor", "red")),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_renderer_is_created_lazily_and_reused() {
        let layer = circle_layer(None);
        assert!(!layer.has_renderer());

        let first = layer.renderer();
        let second = layer.renderer();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(first.hit_detection_enabled());
        assert_eq!(first.styles().len(), 1);
    }

    #[test]
    fn test_dispose_without_renderer_is_noop() {
        let layer = circle_layer(None);
        layer.dispose();
        assert!(!layer.has_renderer());
    }

    #[test]
    fn test_dispose_then_render_recreates_renderer() {
        let layer = circle_layer(Some(point_source()));
        let context = ContextHandle::headless();
        let config = GpuRenderingConfig::default();

        assert!(layer.render_frame(&frame_state(), &context, &config).unwrap());
        let first = layer.renderer();
        layer.dispose();
        assert_eq!(first.dispose_count(), 1);
        assert_eq!(context.live_buffers(), 0);
        assert_eq!(context.live_programs(), 0);

        assert!(layer.render_frame(&frame_state(), &context, &config).unwrap());
        let second = layer.renderer();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(first.dispose_count(), 1);
    }

    #[test]
    fn test_render_events_fire_in_order() {
        let layer = circle_layer(Some(point_source()));
        let seen = Arc::new(Mutex::new(Vec::new()));
        for event_type in [
            RenderEventType::PostRender,
            RenderEventType::PreRender,
            RenderEventType::PreCompose,
        ] {
            let sink = seen.clone();
            layer.on(event_type, move |event| {
                sink.lock().unwrap().push(event.event_type);
            });
        }

        let context = ContextHandle::headless();
        layer
            .render_frame(&frame_state(), &context, &GpuRenderingConfig::default())
            .unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                RenderEventType::PreCompose,
                RenderEventType::PreRender,
                RenderEventType::PostRender
            ]
        );
    }

    #[test]
    fn test_sourceless_layer_skips_frame() {
        let layer = circle_layer(None);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        layer.on(RenderEventType::PostRender, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let context = ContextHandle::headless();
        let config = GpuRenderingConfig::default();
        assert!(!layer.render_frame(&frame_state(), &context, &config).unwrap());
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        layer.set_source(Some(point_source()));
        assert!(layer.render_frame(&frame_state(), &context, &config).unwrap());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_hidden_layer_is_not_rendered() {
        let layer = circle_layer(Some(point_source()));
        layer.set_visible(false);
        let context = ContextHandle::headless();
        assert!(!layer
            .render_frame(&frame_state(), &context, &GpuRenderingConfig::default())
            .unwrap());
        assert!(context
            .with_headless(|ctx| ctx.draw_calls().next().is_none())
            .unwrap());
    }

    #[test]
    fn test_update_variables_reaches_uniforms() {
        let layer = circle_layer(None);
        let renderer = layer.renderer();
        let accessor = renderer.uniform(0, "u_var_fillColor").unwrap();
        assert_eq!(accessor(), UniformValue::Vec4([255.0, 0.0, 0.0, 1.0]));

        let revision = layer.revision();
        layer.update_style_variables(StyleVariables::new().with("fillColor", "yellow"));
        assert_eq!(accessor(), UniformValue::Vec4([255.0, 255.0, 0.0, 1.0]));
        assert!(layer.revision().layer > revision.layer);
    }

    #[test]
    fn test_set_source_changes_revision_regardless_of_source_counter() {
        let older = VectorSource::new();
        older.add_feature(Feature::new(point!(x: 0.0, y: 0.0)));
        older.add_feature(Feature::new(point!(x: 1.0, y: 1.0)));
        let layer = circle_layer(Some(older));
        let before = layer.revision();
        assert_eq!(before.source, 2);

        // One step lower on the source, one step higher on the layer
        layer.set_source(Some(point_source()));
        let after = layer.revision();
        assert_eq!(after.source, 1);
        assert_eq!(after.layer, before.layer + 1);
        assert_ne!(after, before);
    }

    #[test]
    fn test_update_variables_json_rejects_non_objects() {
        let layer = circle_layer(None);
        let err = layer.update_style_variables_json(&json!([1, 2])).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<MapError>(),
            Some(MapError::InvalidStyleVariables(_))
        ));

        layer
            .update_style_variables_json(&json!({ "fillColor": "blue" }))
            .unwrap();
        assert_eq!(
            layer.style_variables().get("fillColor").and_then(|v| v.as_str().map(String::from)),
            Some("blue".to_string())
        );
    }

    #[test]
    fn test_hit_detection_buffer_follows_option() {
        let context = ContextHandle::headless();
        let config = GpuRenderingConfig::default();

        let layer = circle_layer(Some(point_source()));
        layer.render_frame(&frame_state(), &context, &config).unwrap();
        assert!(layer.renderer().has_hit_buffer());

        let no_hits = WebGLVectorLayer::new(WebGLVectorLayerOptions {
            source: Some(point_source()),
            style: Some(StyleRule::new().with("circle-radius", 2).into()),
            disable_hit_detection: true,
            ..Default::default()
        })
        .unwrap();
        no_hits.render_frame(&frame_state(), &context, &config).unwrap();
        assert!(!no_hits.renderer().has_hit_buffer());
        assert_eq!(
            context
                .with_headless(|ctx| ctx.buffers_of_kind(BufferKind::HitDetection))
                .unwrap(),
            1
        );
    }

    #[test]
    fn test_invalid_opacity_rejected() {
        let result = WebGLVectorLayer::new(WebGLVectorLayerOptions {
            opacity: 1.5,
            ..Default::default()
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_options_serialization() {
        let layer = circle_layer(None);
        let options = layer.options();
        assert_eq!(options["class_name"], json!(DEFAULT_CLASS_NAME));
        assert_eq!(options["styles"], json!(1));
        assert_eq!(options["disable_hit_detection"], json!(false));
        assert_eq!(options["layer_type"], json!("vector"));
    }
}
