use crate::{
    core::view::View,
    input::events::{InputEvent, MapBrowserEvent},
    interaction::Interaction,
};

/// Zooms in on double click, or out when shift is held
#[derive(Debug, Clone)]
pub struct DoubleClickZoom {
    /// Zoom change per double click, in levels
    delta: f64,
    active: bool,
}

impl DoubleClickZoom {
    pub fn new(delta: f64) -> Self {
        Self {
            delta,
            active: true,
        }
    }
}

impl Default for DoubleClickZoom {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl Interaction for DoubleClickZoom {
    fn name(&self) -> &'static str {
        "double-click-zoom"
    }

    fn handle_event(&mut self, event: &MapBrowserEvent, view: &mut View) -> bool {
        let InputEvent::DoubleClick { modifiers, .. } = event.event else {
            return true;
        };

        let delta = if modifiers.shift { -self.delta } else { self.delta };
        view.adjust_zoom(delta, event.coordinate);
        log::trace!("double-click zoom to {:.3}", view.zoom());
        false
    }

    fn active(&self) -> bool {
        self.active
    }

    fn set_active(&mut self, active: bool) {
        self.active = active;
    }
}
