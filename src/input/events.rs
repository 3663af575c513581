use crate::core::{
    frame::FrameState,
    geo::{Coordinate, Pixel},
};
use serde::{Deserialize, Serialize};

/// Input events delivered by the host to the map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InputEvent {
    /// Single click/tap
    Click {
        position: Pixel,
        button: MouseButton,
    },
    /// Double click/tap
    DoubleClick {
        position: Pixel,
        #[serde(default)]
        modifiers: KeyModifiers,
    },
    /// Mouse/finger move
    MouseMove { position: Pixel },
    /// Scroll wheel or trackpad; positive `delta` scrolls down (zooms out)
    Wheel {
        delta: f64,
        #[serde(default)]
        delta_mode: WheelDeltaMode,
        position: Pixel,
        #[serde(default)]
        modifiers: KeyModifiers,
    },
    /// Keyboard input
    KeyPress {
        key: KeyCode,
        #[serde(default)]
        modifiers: KeyModifiers,
    },
    /// The map target gained keyboard focus
    Focus,
    /// The map target lost keyboard focus
    Blur,
    /// Target resized, in CSS pixels
    Resize { size: [f64; 2] },
}

/// Unit of a wheel delta
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WheelDeltaMode {
    #[default]
    Pixel,
    Line,
}

/// Keyboard key codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyCode {
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    Plus,
    Minus,
    Escape,
    Enter,
    Other(u32),
}

/// Keyboard modifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct KeyModifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl KeyModifiers {
    pub fn shift() -> Self {
        Self {
            shift: true,
            ..Self::default()
        }
    }

    pub fn any(&self) -> bool {
        self.shift || self.ctrl || self.alt || self.meta
    }
}

/// Mouse button types
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    Other(u16),
}

impl InputEvent {
    /// Gets the primary position associated with this event, if any
    pub fn position(&self) -> Option<Pixel> {
        match self {
            InputEvent::Click { position, .. }
            | InputEvent::DoubleClick { position, .. }
            | InputEvent::MouseMove { position }
            | InputEvent::Wheel { position, .. } => Some(*position),
            _ => None,
        }
    }

    pub fn modifiers(&self) -> KeyModifiers {
        match self {
            InputEvent::DoubleClick { modifiers, .. }
            | InputEvent::Wheel { modifiers, .. }
            | InputEvent::KeyPress { modifiers, .. } => *modifiers,
            _ => KeyModifiers::default(),
        }
    }
}

/// An input event enriched with map context, handed to interactions
#[derive(Debug, Clone, PartialEq)]
pub struct MapBrowserEvent {
    pub event: InputEvent,
    /// Event position in CSS pixels
    pub pixel: Option<Pixel>,
    /// Event position in map coordinates
    pub coordinate: Option<Coordinate>,
    /// Whether the map target has keyboard focus
    pub focused: bool,
}

impl MapBrowserEvent {
    pub fn new(event: InputEvent, frame_state: Option<&FrameState>, focused: bool) -> Self {
        let pixel = event.position();
        let coordinate = pixel
            .zip(frame_state)
            .map(|(pixel, frame_state)| frame_state.pixel_to_coordinate(pixel));

        Self {
            event,
            pixel,
            coordinate,
            focused,
        }
    }
}

/// Map-level events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MapEventType {
    /// After all layers rendered a frame
    PostRender,
    /// A rendered frame settled
    RenderComplete,
    /// The view changed
    ChangeView,
    /// The view stopped moving
    MoveEnd,
    LayerAdd,
    LayerRemove,
}

impl MapEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PostRender => "postrender",
            Self::RenderComplete => "rendercomplete",
            Self::ChangeView => "change:view",
            Self::MoveEnd => "moveend",
            Self::LayerAdd => "layeradd",
            Self::LayerRemove => "layerremove",
        }
    }
}

/// Payload of a map event
#[derive(Debug, Clone)]
pub struct MapEvent {
    pub event_type: MapEventType,
    /// Frame the event belongs to, for render events
    pub frame_state: Option<FrameState>,
    /// Affected layer, for layer events
    pub layer_id: Option<String>,
}

impl MapEvent {
    pub fn new(event_type: MapEventType) -> Self {
        Self {
            event_type,
            frame_state: None,
            layer_id: None,
        }
    }

    pub fn with_frame_state(mut self, frame_state: FrameState) -> Self {
        self.frame_state = Some(frame_state);
        self
    }

    pub fn with_layer(mut self, layer_id: impl Into<String>) -> Self {
        self.layer_id = Some(layer_id.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{
        geo::Size,
        view::{View, ViewOptions},
    };

    #[test]
    fn test_browser_event_coordinate() {
        let view = View::new(ViewOptions::default());
        let frame_state = FrameState::new(0, &view, Size::new(100.0, 100.0), 1.0);
        let event = MapBrowserEvent::new(
            InputEvent::MouseMove {
                position: [50.0, 50.0],
            },
            Some(&frame_state),
            false,
        );

        let [x, y] = event.coordinate.unwrap();
        assert!(x.abs() < 1e-6 && y.abs() < 1e-6);
        assert_eq!(event.pixel, Some([50.0, 50.0]));
    }

    #[test]
    fn test_events_without_position() {
        let event = MapBrowserEvent::new(InputEvent::Focus, None, true);
        assert!(event.pixel.is_none());
        assert!(event.coordinate.is_none());
    }

    #[test]
    fn test_deserialize_wheel_defaults() {
        let event: InputEvent =
            serde_json::from_str(r#"{ "Wheel": { "delta": 120.0, "position": [1.0, 2.0] } }"#)
                .unwrap();
        assert_eq!(
            event,
            InputEvent::Wheel {
                delta: 120.0,
                delta_mode: WheelDeltaMode::Pixel,
                position: [1.0, 2.0],
                modifiers: KeyModifiers::default(),
            }
        );
        assert!(!event.modifiers().any());
    }

    #[test]
    fn test_map_event_names() {
        assert_eq!(MapEventType::RenderComplete.as_str(), "rendercomplete");
        assert_eq!(MapEventType::ChangeView.as_str(), "change:view");
    }
}
