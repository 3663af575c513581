use crate::{
    core::{config::GpuRenderingConfig, frame::FrameState},
    rendering::{
        context::{BufferId, BufferKind, ContextHandle, GraphicsContext},
        style_renderer::StyleRenderer,
        uniforms::UniformAccessor,
    },
    source::vector::VectorSource,
    style::{
        rule::StyleRuleDescriptor,
        variables::{SharedVariables, StyleVariables},
    },
    Result,
};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Mutex, MutexGuard,
};

#[derive(Debug, Default)]
struct RendererState {
    style_renderers: Vec<StyleRenderer>,
    /// Context the GPU resources were created on
    context: Option<ContextHandle>,
    hit_buffer: Option<(BufferId, (u32, u32))>,
}

/// Renderer of a [`WebGLVectorLayer`](crate::layers::webgl_vector::WebGLVectorLayer).
///
/// Holds one [`StyleRenderer`] per normalized style rule. The variable table
/// is shared with the layer, so variable updates reach the uniform accessors
/// without rebuilding the renderer.
#[derive(Debug)]
pub struct WebGLVectorLayerRenderer {
    styles: Vec<StyleRuleDescriptor>,
    variables: SharedVariables,
    hit_detection_enabled: bool,
    state: Mutex<RendererState>,
    dispose_count: AtomicUsize,
}

impl WebGLVectorLayerRenderer {
    pub fn new(
        styles: Vec<StyleRuleDescriptor>,
        variables: SharedVariables,
        hit_detection_enabled: bool,
    ) -> Self {
        let style_renderers = styles
            .iter()
            .cloned()
            .map(|descriptor| StyleRenderer::new(descriptor, variables.clone()))
            .collect();

        log::debug!(
            "created vector renderer with {} style rules (hit detection: {hit_detection_enabled})",
            styles.len()
        );

        Self {
            styles,
            variables,
            hit_detection_enabled,
            state: Mutex::new(RendererState {
                style_renderers,
                ..Default::default()
            }),
            dispose_count: AtomicUsize::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RendererState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Normalized style rules, in draw order
    pub fn styles(&self) -> &[StyleRuleDescriptor] {
        &self.styles
    }

    /// Current variable values as seen by the uniform accessors
    pub fn style_variables(&self) -> StyleVariables {
        self.variables.snapshot()
    }

    pub fn hit_detection_enabled(&self) -> bool {
        self.hit_detection_enabled
    }

    /// Uniform accessor `name` of the style renderer at `index`
    pub fn uniform(&self, index: usize, name: &str) -> Option<UniformAccessor> {
        self.lock()
            .style_renderers
            .get(index)
            .and_then(|renderer| renderer.uniform(name))
    }

    /// Whether the layer can render this frame; layers without a source skip it
    pub fn prepare_frame(&self, _frame_state: &FrameState, source: Option<&VectorSource>) -> bool {
        source.is_some() && self.dispose_count() == 0
    }

    /// Draws every style rule; returns the number of draw calls issued
    pub fn render(
        &self,
        context: &ContextHandle,
        frame_state: &FrameState,
        source: &VectorSource,
        config: &GpuRenderingConfig,
    ) -> Result<usize> {
        let mut state = self.lock();

        if let Some(previous) = &state.context {
            if !previous.ptr_eq(context) {
                log::debug!("graphics context changed, releasing renderer resources");
                release(&mut state);
            }
        }
        state.context = Some(context.clone());

        context.with(|ctx| -> Result<usize> {
            if self.hit_detection_enabled {
                ensure_hit_buffer(&mut state, ctx, frame_state, config.hit_detection_scale)?;
            }

            let mut draws = 0;
            for renderer in state.style_renderers.iter_mut() {
                draws += renderer.render(ctx, frame_state, source, config.max_buffer_vertices)?;
            }
            Ok(draws)
        })
    }

    /// Releases GPU resources. Called by the owning layer exactly once.
    pub fn dispose(&self) {
        let count = self.dispose_count.fetch_add(1, Ordering::SeqCst) + 1;
        if count > 1 {
            log::warn!("vector renderer disposed {count} times");
        }

        let mut state = self.lock();
        release(&mut state);
        log::debug!("disposed vector renderer");
    }

    /// How many times `dispose` was called
    pub fn dispose_count(&self) -> usize {
        self.dispose_count.load(Ordering::SeqCst)
    }

    pub fn is_disposed(&self) -> bool {
        self.dispose_count() > 0
    }

    pub fn has_hit_buffer(&self) -> bool {
        self.lock().hit_buffer.is_some()
    }
}

fn ensure_hit_buffer(
    state: &mut RendererState,
    ctx: &mut dyn GraphicsContext,
    frame_state: &FrameState,
    scale: f64,
) -> Result<()> {
    let (width, height) = frame_state.render_size();
    let size = (
        ((width as f64) * scale).ceil().max(1.0) as u32,
        ((height as f64) * scale).ceil().max(1.0) as u32,
    );

    match state.hit_buffer {
        Some((_, current)) if current == size => return Ok(()),
        Some((buffer, _)) => ctx.delete_buffer(buffer),
        None => {}
    }

    let bytes = vec![0u8; size.0 as usize * size.1 as usize * 4];
    let buffer = ctx.create_buffer(BufferKind::HitDetection, &bytes)?;
    state.hit_buffer = Some((buffer, size));
    log::trace!("allocated {}x{} hit detection buffer", size.0, size.1);
    Ok(())
}

fn release(state: &mut RendererState) {
    let Some(context) = state.context.take() else {
        return;
    };

    context.with(|ctx| {
        for renderer in state.style_renderers.iter_mut() {
            renderer.dispose(ctx);
        }
        if let Some((buffer, _)) = state.hit_buffer.take() {
            ctx.delete_buffer(buffer);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        core::{
            geo::Size,
            view::{View, ViewOptions},
        },
        source::vector::Feature,
        style::rule::{LayerStyle, StyleRule},
    };
    use geo_types::point;
    use serde_json::json;

    fn styles() -> Vec<StyleRuleDescriptor> {
        LayerStyle::from_json(&json!([
            { "circle-radius": 4, "circle-fill-color": ["var", "fillColor"] },
            { "fill-color": ["var", "fillColor"] }
        ]))
        .unwrap()
        .normalize()
    }

    fn frame_state() -> FrameState {
        FrameState::new(1, &View::new(ViewOptions::default()), Size::new(100.0, 100.0), 2.0)
    }

    #[test]
    fn test_hit_buffer_follows_toggle() {
        let variables = SharedVariables::default();
        let source = VectorSource::from_features([Feature::new(point!(x: 0.0, y: 0.0))]);
        let context = ContextHandle::headless();
        let config = GpuRenderingConfig::default();

        let with_hits = WebGLVectorLayerRenderer::new(styles(), variables.clone(), true);
        with_hits.render(&context, &frame_state(), &source, &config).unwrap();
        assert!(with_hits.has_hit_buffer());
        assert_eq!(
            context.with_headless(|ctx| ctx.buffers_of_kind(BufferKind::HitDetection)),
            Some(1)
        );

        let without_hits = WebGLVectorLayerRenderer::new(styles(), variables, false);
        without_hits.render(&context, &frame_state(), &source, &config).unwrap();
        assert!(!without_hits.has_hit_buffer());

        with_hits.dispose();
        without_hits.dispose();
        assert_eq!(context.live_buffers(), 0);
        assert_eq!(context.live_programs(), 0);
    }

    #[test]
    fn test_prepare_frame_requires_source() {
        let renderer = WebGLVectorLayerRenderer::new(styles(), SharedVariables::default(), true);
        let source = VectorSource::new();
        assert!(!renderer.prepare_frame(&frame_state(), None));
        assert!(renderer.prepare_frame(&frame_state(), Some(&source)));
        renderer.dispose();
        assert!(!renderer.prepare_frame(&frame_state(), Some(&source)));
    }

    #[test]
    fn test_dispose_without_render_is_safe() {
        let renderer = WebGLVectorLayerRenderer::new(
            vec![StyleRuleDescriptor::new(StyleRule::new().with("fill-color", "red"))],
            SharedVariables::default(),
            false,
        );
        renderer.dispose();
        assert_eq!(renderer.dispose_count(), 1);
        assert!(renderer.is_disposed());
    }

    #[test]
    fn test_context_switch_releases_old_resources() {
        let renderer = WebGLVectorLayerRenderer::new(styles(), SharedVariables::default(), false);
        let source = VectorSource::from_features([Feature::new(point!(x: 0.0, y: 0.0))]);
        let config = GpuRenderingConfig::default();
        let first = ContextHandle::headless();
        let second = ContextHandle::headless();

        renderer.render(&first, &frame_state(), &source, &config).unwrap();
        assert!(first.live_programs() > 0);

        renderer.render(&second, &frame_state(), &source, &config).unwrap();
        assert_eq!(first.live_programs(), 0);
        assert_eq!(first.live_buffers(), 0);
        assert!(second.live_programs() > 0);
    }
}
