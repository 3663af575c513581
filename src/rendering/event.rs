use crate::{
    core::{frame::FrameState, geo::Pixel, transform::Transform},
    rendering::context::ContextHandle,
};
use std::fmt;

/// Render events fired by layers around their draw calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderEventType {
    /// Before the layer's output is composed onto the map
    PreCompose,
    /// Before the layer draws
    PreRender,
    /// After the layer drew
    PostRender,
}

impl RenderEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PreCompose => "precompose",
            Self::PreRender => "prerender",
            Self::PostRender => "postrender",
        }
    }
}

impl fmt::Display for RenderEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload of a render event
#[derive(Debug, Clone)]
pub struct RenderEvent {
    pub event_type: RenderEventType,
    pub context: ContextHandle,
    pub frame_state: FrameState,
    /// CSS pixel to render-target pixel
    pub inverse_pixel_transform: Transform,
}

impl RenderEvent {
    pub fn new(event_type: RenderEventType, context: ContextHandle, frame_state: &FrameState) -> Self {
        Self {
            event_type,
            context,
            inverse_pixel_transform: frame_state.inverse_pixel_transform(),
            frame_state: frame_state.clone(),
        }
    }
}

/// Converts a CSS pixel into the render target's pixel space.
///
/// The result is scaled by the device pixel ratio and measured from the
/// bottom edge: `[x * pr, (height - y) * pr]`.
pub fn get_render_pixel(event: &RenderEvent, pixel: Pixel) -> Pixel {
    event.inverse_pixel_transform.apply(pixel)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{
        geo::Size,
        view::{View, ViewOptions},
    };

    fn event(pixel_ratio: f64) -> RenderEvent {
        let view = View::new(ViewOptions::default());
        let frame_state = FrameState::new(1, &view, Size::new(200.0, 100.0), pixel_ratio);
        RenderEvent::new(RenderEventType::PostRender, ContextHandle::headless(), &frame_state)
    }

    #[test]
    fn test_render_pixel_flips_and_scales() {
        assert_eq!(get_render_pixel(&event(1.0), [10.0, 20.0]), [10.0, 80.0]);
        assert_eq!(get_render_pixel(&event(2.0), [10.0, 20.0]), [20.0, 160.0]);
        assert_eq!(get_render_pixel(&event(2.0), [0.0, 0.0]), [0.0, 200.0]);
    }

    #[test]
    fn test_event_names() {
        assert_eq!(RenderEventType::PreCompose.to_string(), "precompose");
        assert_eq!(RenderEventType::PostRender.as_str(), "postrender");
    }
}
