use crate::{
    core::{
        config::MapPerformanceOptions,
        frame::FrameState,
        geo::Size,
        view::{View, ViewOptions, ViewState},
    },
    input::{
        events::{InputEvent, MapBrowserEvent, MapEvent, MapEventType},
        handler::{EventManager, ListenerKey},
    },
    interaction::{defaults, DefaultsOptions, Interactions},
    layers::{
        base::{LayerRevision, LayerTrait},
        manager::LayerCollection,
    },
    rendering::context::ContextHandle,
    MapError, Result,
};
use futures::channel::oneshot;
use std::{future::Future, sync::Arc};

/// Render target of a map: the host surface the map draws into
#[derive(Debug, Clone, PartialEq)]
pub struct MapTarget {
    /// Size in CSS pixels
    pub size: Size,
    pub pixel_ratio: f64,
    /// Whether the target has keyboard focus
    pub focused: bool,
}

impl MapTarget {
    pub fn new(size: Size, pixel_ratio: f64) -> Self {
        Self {
            size,
            pixel_ratio,
            focused: false,
        }
    }
}

pub struct MapOptions {
    /// Without a target the map does not render
    pub target: Option<MapTarget>,
    pub view: ViewOptions,
    pub layers: Vec<Arc<dyn LayerTrait>>,
    /// Interaction chain; `None` installs the defaults
    pub interactions: Option<Interactions>,
    pub performance: MapPerformanceOptions,
    /// Graphics context to draw with; a headless context by default
    pub context: Option<ContextHandle>,
}

impl Default for MapOptions {
    fn default() -> Self {
        Self {
            target: None,
            view: ViewOptions::default(),
            layers: Vec::new(),
            interactions: None,
            performance: MapPerformanceOptions::default(),
            context: None,
        }
    }
}

/// Decides when the map renders a frame
///
/// A frame is due when it was requested, the view changed since the last
/// frame, or a layer changed since the last frame.
#[derive(Debug, Clone, Default)]
pub struct UpdateOrchestrator {
    frame_count: u64,
    force_update_reasons: Vec<String>,
    rendered_view: Option<ViewState>,
    rendered_layers: Option<Vec<(String, LayerRevision)>>,
}

impl UpdateOrchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a frame is due, and why
    pub fn should_update_and_render(
        &mut self,
        view_state: &ViewState,
        layers: &[(String, LayerRevision)],
    ) -> (bool, Vec<String>) {
        let mut reasons = std::mem::take(&mut self.force_update_reasons);

        if self.rendered_view.as_ref() != Some(view_state) {
            reasons.push("view_changed".to_string());
        }
        if self.rendered_layers.as_deref() != Some(layers) {
            reasons.push("layers_changed".to_string());
        }

        (!reasons.is_empty(), reasons)
    }

    pub fn force_update(&mut self, reason: impl Into<String>) {
        self.force_update_reasons.push(reason.into());
    }

    /// Records what a completed frame rendered
    pub fn frame_rendered(&mut self, view_state: ViewState, layers: Vec<(String, LayerRevision)>) {
        self.frame_count += 1;
        self.force_update_reasons.clear();
        self.rendered_view = Some(view_state);
        self.rendered_layers = Some(layers);
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

/// An interactive map: a target, a view, layers and interactions
///
/// The host drives the map: it forwards input through [`Map::handle_input`]
/// and calls [`Map::tick`] from its frame loop. A frame runs every layer's
/// render sequence in z-order and then signals `postrender` and
/// `rendercomplete`.
pub struct Map {
    target: Option<MapTarget>,
    view: View,
    layers: LayerCollection,
    interactions: Interactions,
    performance: MapPerformanceOptions,
    context: ContextHandle,
    event_manager: EventManager<MapEventType, MapEvent>,
    update_orchestrator: UpdateOrchestrator,
    last_frame: Option<FrameState>,
    completion_waiters: Vec<oneshot::Sender<FrameState>>,
}

impl Map {
    pub fn new(options: MapOptions) -> Result<Self> {
        options.performance.validate()?;

        let mut layers = LayerCollection::new();
        for layer in options.layers {
            layers.add(layer)?;
        }

        let context = options.context.unwrap_or_default();
        log::debug!(
            "created map with {} layers on {:?} context",
            layers.len(),
            context.backend()
        );

        Ok(Self {
            target: options.target,
            view: View::new(options.view),
            layers,
            interactions: options
                .interactions
                .unwrap_or_else(|| defaults(DefaultsOptions::default())),
            performance: options.performance,
            context,
            event_manager: EventManager::new(),
            update_orchestrator: UpdateOrchestrator::new(),
            last_frame: None,
            completion_waiters: Vec::new(),
        })
    }

    pub fn target(&self) -> Option<&MapTarget> {
        self.target.as_ref()
    }

    /// Sets or removes the target; a new target requests a frame
    pub fn set_target(&mut self, target: Option<MapTarget>) {
        if target.is_some() {
            self.update_orchestrator.force_update("target_changed");
        }
        self.target = target;
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    /// Mutable view access; changes are rendered on the next tick
    pub fn view_mut(&mut self) -> &mut View {
        &mut self.view
    }

    /// Replaces the view and notifies `change:view` listeners
    pub fn set_view(&mut self, view: View) {
        self.view = view;
        self.event_manager
            .dispatch(MapEventType::ChangeView, &MapEvent::new(MapEventType::ChangeView));
    }

    pub fn context(&self) -> &ContextHandle {
        &self.context
    }

    pub fn performance(&self) -> &MapPerformanceOptions {
        &self.performance
    }

    pub fn set_performance(&mut self, performance: MapPerformanceOptions) -> Result<()> {
        performance.validate()?;
        self.performance = performance;
        self.update_orchestrator.force_update("performance_changed");
        Ok(())
    }

    pub fn interactions(&self) -> &Interactions {
        &self.interactions
    }

    pub fn interactions_mut(&mut self) -> &mut Interactions {
        &mut self.interactions
    }

    pub fn layers(&self) -> &LayerCollection {
        &self.layers
    }

    /// Adds a layer; layer handles may be cloned before adding
    pub fn add_layer<L: LayerTrait + 'static>(&mut self, layer: L) -> Result<()> {
        self.add_layer_arc(Arc::new(layer))
    }

    pub fn add_layer_arc(&mut self, layer: Arc<dyn LayerTrait>) -> Result<()> {
        let layer_id = layer.id().to_string();
        self.layers.add(layer)?;
        self.update_orchestrator.force_update("layer_added");
        self.event_manager.dispatch(
            MapEventType::LayerAdd,
            &MapEvent::new(MapEventType::LayerAdd).with_layer(layer_id),
        );
        Ok(())
    }

    /// Removes a layer without disposing it
    pub fn remove_layer(&mut self, layer_id: &str) -> Option<Arc<dyn LayerTrait>> {
        let layer = self.layers.remove(layer_id)?;
        self.update_orchestrator.force_update("layer_removed");
        self.event_manager.dispatch(
            MapEventType::LayerRemove,
            &MapEvent::new(MapEventType::LayerRemove).with_layer(layer_id),
        );
        Some(layer)
    }

    /// Register an event listener
    pub fn on<F>(&self, event_type: MapEventType, callback: F) -> ListenerKey
    where
        F: Fn(&MapEvent) + Send + Sync + 'static,
    {
        self.event_manager.on(event_type, callback)
    }

    /// Register a listener that fires once
    pub fn once<F>(&self, event_type: MapEventType, callback: F) -> ListenerKey
    where
        F: Fn(&MapEvent) + Send + Sync + 'static,
    {
        self.event_manager.once(event_type, callback)
    }

    pub fn un(&self, key: ListenerKey) -> bool {
        self.event_manager.un(key)
    }

    /// Requests a frame; it is rendered by the next [`tick`](Self::tick)
    pub fn render(&mut self) {
        self.update_orchestrator.force_update("render_requested");
    }

    /// Resolves with the frame state of the next completed frame.
    ///
    /// Fails if the map is dropped before a frame completes.
    pub fn render_complete(&mut self) -> impl Future<Output = Result<FrameState>> + Send + 'static {
        let (sender, receiver) = oneshot::channel();
        self.completion_waiters.push(sender);
        async move {
            let frame_state = receiver.await.map_err(|_| {
                MapError::Render("map dropped before the frame completed".to_string())
            })?;
            Ok::<_, Box<dyn std::error::Error + Send + Sync>>(frame_state)
        }
    }

    /// Renders a frame if one is due; returns whether a frame was rendered
    pub fn tick(&mut self) -> Result<bool> {
        if !self.has_renderable_target() {
            return Ok(false);
        }

        let (should_render, reasons) = self
            .update_orchestrator
            .should_update_and_render(&self.view.state(), &self.layers.revisions());
        if !should_render {
            return Ok(false);
        }

        log::trace!("rendering frame, reasons: {reasons:?}");
        self.render_frame()?;
        Ok(true)
    }

    /// Renders a frame now, regardless of whether one is due
    pub fn render_sync(&mut self) -> Result<bool> {
        if !self.has_renderable_target() {
            return Ok(false);
        }
        self.render_frame()?;
        Ok(true)
    }

    /// Frame state of the last completed frame
    pub fn frame_state(&self) -> Option<&FrameState> {
        self.last_frame.as_ref()
    }

    pub fn frame_count(&self) -> u64 {
        self.update_orchestrator.frame_count()
    }

    /// Feeds a host input event through the interaction chain.
    ///
    /// Returns whether the view changed.
    pub fn handle_input(&mut self, input: InputEvent) -> bool {
        match &input {
            InputEvent::Focus | InputEvent::Blur => {
                if let Some(target) = self.target.as_mut() {
                    target.focused = matches!(input, InputEvent::Focus);
                }
            }
            InputEvent::Resize { size } => {
                if let Some(target) = self.target.as_mut() {
                    target.size = Size::new(size[0], size[1]);
                    self.update_orchestrator.force_update("resized");
                }
            }
            _ => {}
        }

        let focused = self.target.as_ref().is_some_and(|target| target.focused);
        let frame_state = self.current_frame_state();
        let event = MapBrowserEvent::new(input, frame_state.as_ref(), focused);

        let before = self.view.state();
        self.interactions.handle_event(&event, &mut self.view);
        let changed = self.view.state() != before;

        if changed {
            log::debug!("view changed to zoom {:.3}", self.view.zoom());
            self.event_manager
                .dispatch(MapEventType::ChangeView, &MapEvent::new(MapEventType::ChangeView));
        }
        changed
    }

    /// Disposes every layer and drops pending completion futures
    pub fn dispose(&mut self) {
        self.layers.clear();
        self.completion_waiters.clear();
        self.event_manager.clear_listeners();
        log::debug!("disposed map");
    }

    fn has_renderable_target(&self) -> bool {
        match &self.target {
            Some(target) if target.size.has_area() => true,
            Some(_) => {
                log::trace!("map target has no area, skipping frame");
                false
            }
            None => {
                log::trace!("map has no target, skipping frame");
                false
            }
        }
    }

    fn current_frame_state(&self) -> Option<FrameState> {
        self.target.as_ref().map(|target| {
            FrameState::new(
                self.frame_count(),
                &self.view,
                target.size,
                target.pixel_ratio,
            )
        })
    }

    fn render_frame(&mut self) -> Result<()> {
        let index = self.frame_count() + 1;
        let frame_state = match &self.target {
            Some(target) => FrameState::new(index, &self.view, target.size, target.pixel_ratio),
            None => return Ok(()),
        };

        let (width, height) = frame_state.render_size();
        self.context.with(|ctx| ctx.begin_frame(width, height))?;

        let mut rendered = 0;
        for layer in self.layers.layers() {
            match layer.render_frame(&frame_state, &self.context, &self.performance.rendering) {
                Ok(true) => rendered += 1,
                Ok(false) => {}
                Err(e) => log::warn!("layer '{}' failed to render: {e}", layer.id()),
            }
        }

        let view_moved = self
            .last_frame
            .as_ref()
            .map_or(true, |last| last.view_state != frame_state.view_state);
        self.update_orchestrator
            .frame_rendered(frame_state.view_state, self.layers.revisions());
        self.last_frame = Some(frame_state.clone());

        log::debug!("frame {index}: rendered {rendered} of {} layers", self.layers.len());

        self.event_manager.dispatch(
            MapEventType::PostRender,
            &MapEvent::new(MapEventType::PostRender).with_frame_state(frame_state.clone()),
        );
        if view_moved {
            self.event_manager.dispatch(
                MapEventType::MoveEnd,
                &MapEvent::new(MapEventType::MoveEnd).with_frame_state(frame_state.clone()),
            );
        }
        self.event_manager.dispatch(
            MapEventType::RenderComplete,
            &MapEvent::new(MapEventType::RenderComplete).with_frame_state(frame_state.clone()),
        );
        for waiter in self.completion_waiters.drain(..) {
            // The receiving future may already be gone
            let _ = waiter.send(frame_state.clone());
        }

        Ok(())
    }
}

impl std::fmt::Debug for Map {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Map")
            .field("target", &self.target)
            .field("view", &self.view)
            .field("layers", &self.layers)
            .field("interactions", &self.interactions)
            .field("frame_count", &self.frame_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::webgl_vector::{WebGLVectorLayer, WebGLVectorLayerOptions};
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    };

    fn map_with_target() -> Map {
        Map::new(MapOptions {
            target: Some(MapTarget::new(Size::new(100.0, 50.0), 2.0)),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_map_without_target_does_not_render() {
        let mut map = Map::new(MapOptions::default()).unwrap();
        map.render();
        assert!(!map.tick().unwrap());
        assert!(!map.render_sync().unwrap());
        assert_eq!(map.frame_count(), 0);
    }

    #[test]
    fn test_tick_renders_only_when_due() {
        let mut map = map_with_target();
        assert!(map.tick().unwrap());
        assert!(!map.tick().unwrap());

        map.render();
        assert!(map.tick().unwrap());
        assert!(!map.tick().unwrap());

        map.view_mut().set_zoom(3.0);
        assert!(map.tick().unwrap());
        assert_eq!(map.frame_count(), 3);
    }

    #[test]
    fn test_orchestrator_compares_layer_revisions_pairwise() {
        let view_state = View::default().state();
        let rev = |layer, source| LayerRevision { layer, source };
        let mut orchestrator = UpdateOrchestrator::new();
        orchestrator.frame_rendered(view_state, vec![("vector-1".to_string(), rev(2, 2))]);

        let (due, _) = orchestrator
            .should_update_and_render(&view_state, &[("vector-1".to_string(), rev(2, 2))]);
        assert!(!due);

        // Layer counter up, source counter down: same sum, still a change
        let (due, reasons) = orchestrator
            .should_update_and_render(&view_state, &[("vector-1".to_string(), rev(3, 1))]);
        assert!(due);
        assert_eq!(reasons, vec!["layers_changed".to_string()]);
    }

    #[test]
    fn test_layer_changes_trigger_frames() {
        let mut map = map_with_target();
        let layer = WebGLVectorLayer::new(WebGLVectorLayerOptions::default()).unwrap();
        map.add_layer(layer.clone()).unwrap();
        assert!(map.tick().unwrap());
        assert!(!map.tick().unwrap());

        layer.set_opacity(0.5);
        assert!(map.tick().unwrap());
    }

    #[test]
    fn test_frame_events_order() {
        let mut map = map_with_target();
        let seen = Arc::new(Mutex::new(Vec::new()));
        for event_type in [
            MapEventType::RenderComplete,
            MapEventType::PostRender,
            MapEventType::MoveEnd,
        ] {
            let sink = seen.clone();
            map.on(event_type, move |event| {
                sink.lock().unwrap().push(event.event_type);
            });
        }

        map.render_sync().unwrap();
        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                MapEventType::PostRender,
                MapEventType::MoveEnd,
                MapEventType::RenderComplete
            ]
        );

        // View did not move, so no moveend
        seen.lock().unwrap().clear();
        map.render_sync().unwrap();
        assert_eq!(
            *seen.lock().unwrap(),
            vec![MapEventType::PostRender, MapEventType::RenderComplete]
        );
    }

    #[test]
    fn test_once_listener() {
        let mut map = map_with_target();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        map.once(MapEventType::RenderComplete, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        map.render_sync().unwrap();
        map.render_sync().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_focus_and_resize_input() {
        let mut map = map_with_target();
        map.handle_input(InputEvent::Focus);
        assert!(map.target().unwrap().focused);
        map.handle_input(InputEvent::Blur);
        assert!(!map.target().unwrap().focused);

        map.handle_input(InputEvent::Resize { size: [300.0, 200.0] });
        assert_eq!(map.target().unwrap().size, Size::new(300.0, 200.0));
    }

    #[test]
    fn test_duplicate_layers_rejected() {
        let layer = WebGLVectorLayer::new(WebGLVectorLayerOptions::default()).unwrap();
        let result = Map::new(MapOptions {
            layers: vec![Arc::new(layer.clone()), Arc::new(layer)],
            ..Default::default()
        });
        assert!(result.is_err());
    }
}
