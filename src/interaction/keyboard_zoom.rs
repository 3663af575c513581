use crate::{
    core::view::View,
    input::events::{InputEvent, KeyCode, MapBrowserEvent},
    interaction::{condition, condition::Condition, Interaction},
};

/// Zooms with the `+` and `-` keys
#[derive(Clone)]
pub struct KeyboardZoom {
    delta: f64,
    condition: Condition,
    active: bool,
}

impl KeyboardZoom {
    pub fn new(delta: f64, condition: Condition) -> Self {
        Self {
            delta,
            condition,
            active: true,
        }
    }
}

impl Default for KeyboardZoom {
    fn default() -> Self {
        Self::new(1.0, condition::always())
    }
}

impl std::fmt::Debug for KeyboardZoom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyboardZoom")
            .field("delta", &self.delta)
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}

impl Interaction for KeyboardZoom {
    fn name(&self) -> &'static str {
        "keyboard-zoom"
    }

    fn handle_event(&mut self, event: &MapBrowserEvent, view: &mut View) -> bool {
        let InputEvent::KeyPress { key, .. } = event.event else {
            return true;
        };
        let delta = match key {
            KeyCode::Plus => self.delta,
            KeyCode::Minus => -self.delta,
            _ => return true,
        };
        if !(self.condition)(event) {
            return true;
        }

        view.adjust_zoom(delta, None);
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
    use crate::{core::view::ViewOptions, input::events::KeyModifiers};

    fn key(key: KeyCode) -> MapBrowserEvent {
        MapBrowserEvent::new(
            InputEvent::KeyPress {
                key,
                modifiers: KeyModifiers::default(),
            },
            None,
            true,
        )
    }

    #[test]
    fn test_plus_minus() {
        let mut view = View::new(ViewOptions {
            zoom: 5.0,
            ..Default::default()
        });
        let mut interaction = KeyboardZoom::default();

        assert!(!interaction.handle_event(&key(KeyCode::Plus), &mut view));
        assert_eq!(view.zoom(), 6.0);
        interaction.handle_event(&key(KeyCode::Minus), &mut view);
        interaction.handle_event(&key(KeyCode::Minus), &mut view);
        assert_eq!(view.zoom(), 4.0);

        assert!(interaction.handle_event(&key(KeyCode::Enter), &mut view));
        assert_eq!(view.zoom(), 4.0);
    }
}
