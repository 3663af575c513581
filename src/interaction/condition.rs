//! Event conditions deciding whether an interaction handles an event

use crate::input::events::MapBrowserEvent;
use std::sync::Arc;

/// Predicate over a map browser event
pub type Condition = Arc<dyn Fn(&MapBrowserEvent) -> bool + Send + Sync>;

pub fn always() -> Condition {
    Arc::new(|_| true)
}

pub fn never() -> Condition {
    Arc::new(|_| false)
}

/// True when the map target has keyboard focus
pub fn focus() -> Condition {
    Arc::new(|event| event.focused)
}

/// True when no modifier key is held
pub fn no_modifier_keys() -> Condition {
    Arc::new(|event| !event.event.modifiers().any())
}

/// True when shift is the only modifier held
pub fn shift_key_only() -> Condition {
    Arc::new(|event| {
        let modifiers = event.event.modifiers();
        modifiers.shift && !modifiers.ctrl && !modifiers.alt && !modifiers.meta
    })
}

/// True when every condition holds
pub fn all(conditions: Vec<Condition>) -> Condition {
    Arc::new(move |event| conditions.iter().all(|condition| condition(event)))
}

/// True when at least one condition holds
pub fn any(conditions: Vec<Condition>) -> Condition {
    Arc::new(move |event| conditions.iter().any(|condition| condition(event)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::events::{InputEvent, KeyModifiers, WheelDeltaMode};

    fn wheel(modifiers: KeyModifiers, focused: bool) -> MapBrowserEvent {
        MapBrowserEvent::new(
            InputEvent::Wheel {
                delta: 1.0,
                delta_mode: WheelDeltaMode::Pixel,
                position: [0.0, 0.0],
                modifiers,
            },
            None,
            focused,
        )
    }

    #[test]
    fn test_basic_conditions() {
        let plain = wheel(KeyModifiers::default(), false);
        assert!(always()(&plain));
        assert!(!never()(&plain));
        assert!(!focus()(&plain));
        assert!(focus()(&wheel(KeyModifiers::default(), true)));
    }

    #[test]
    fn test_modifier_conditions() {
        let plain = wheel(KeyModifiers::default(), true);
        let shifted = wheel(KeyModifiers::shift(), true);
        let ctrl_shift = wheel(
            KeyModifiers {
                shift: true,
                ctrl: true,
                ..Default::default()
            },
            true,
        );

        assert!(no_modifier_keys()(&plain));
        assert!(!no_modifier_keys()(&shifted));
        assert!(shift_key_only()(&shifted));
        assert!(!shift_key_only()(&ctrl_shift));
    }

    #[test]
    fn test_combinators() {
        let event = wheel(KeyModifiers::shift(), false);
        assert!(!all(vec![shift_key_only(), focus()])(&event));
        assert!(any(vec![shift_key_only(), focus()])(&event));
        assert!(all(Vec::new())(&event));
        assert!(!any(Vec::new())(&event));
    }
}
