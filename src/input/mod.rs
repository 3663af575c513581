pub mod events;
pub mod handler;

// Re-export the essential types
pub use events::{
    InputEvent, KeyCode, KeyModifiers, MapBrowserEvent, MapEvent, MapEventType, MouseButton,
    WheelDeltaMode,
};
pub use handler::{EventCallback, EventManager, ListenerKey};
