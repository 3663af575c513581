//! User interactions that turn input events into view changes
//!
//! A map holds an ordered [`Interactions`] chain. Events are offered to the
//! most recently added interaction first; an interaction returning `false`
//! from [`Interaction::handle_event`] stops propagation.

pub mod condition;
pub mod double_click_zoom;
pub mod keyboard_zoom;
pub mod mouse_wheel_zoom;

pub use double_click_zoom::DoubleClickZoom;
pub use keyboard_zoom::KeyboardZoom;
pub use mouse_wheel_zoom::{MouseWheelZoom, MouseWheelZoomOptions};

use crate::{core::view::View, input::events::MapBrowserEvent};

pub trait Interaction: Send {
    fn name(&self) -> &'static str;

    /// Handles `event`, possibly changing `view`; `false` stops propagation
    fn handle_event(&mut self, event: &MapBrowserEvent, view: &mut View) -> bool;

    fn active(&self) -> bool;

    fn set_active(&mut self, active: bool);
}

/// Ordered interaction chain of a map
#[derive(Default)]
pub struct Interactions {
    interactions: Vec<Box<dyn Interaction>>,
}

impl Interactions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, interaction: impl Interaction + 'static) {
        self.interactions.push(Box::new(interaction));
    }

    /// Appends `interaction` and returns the chain
    pub fn with(mut self, interaction: impl Interaction + 'static) -> Self {
        self.push(interaction);
        self
    }

    /// Appends all `interactions` and returns the chain
    pub fn extend(mut self, interactions: impl IntoIterator<Item = Box<dyn Interaction>>) -> Self {
        self.interactions.extend(interactions);
        self
    }

    /// Offers `event` to active interactions, newest first.
    ///
    /// Returns whether the event propagated through the whole chain.
    pub fn handle_event(&mut self, event: &MapBrowserEvent, view: &mut View) -> bool {
        for interaction in self.interactions.iter_mut().rev() {
            if !interaction.active() {
                continue;
            }
            if !interaction.handle_event(event, view) {
                log::trace!("event handled by {}", interaction.name());
                return false;
            }
        }
        true
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.interactions.iter().map(|i| i.name()).collect()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Box<dyn Interaction>> {
        self.interactions.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.interactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interactions.is_empty()
    }
}

impl std::fmt::Debug for Interactions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// Toggles for the default interaction chain
#[derive(Debug, Clone, PartialEq)]
pub struct DefaultsOptions {
    pub double_click_zoom: bool,
    pub keyboard: bool,
    pub mouse_wheel_zoom: bool,
    /// Zoom change of the double-click and keyboard interactions
    pub zoom_delta: f64,
}

impl Default for DefaultsOptions {
    fn default() -> Self {
        Self {
            double_click_zoom: true,
            keyboard: true,
            mouse_wheel_zoom: true,
            zoom_delta: 1.0,
        }
    }
}

/// Builds the default interaction chain
pub fn defaults(options: DefaultsOptions) -> Interactions {
    let mut interactions = Interactions::new();
    if options.double_click_zoom {
        interactions.push(DoubleClickZoom::new(options.zoom_delta));
    }
    if options.keyboard {
        interactions.push(KeyboardZoom::new(options.zoom_delta, condition::always()));
    }
    if options.mouse_wheel_zoom {
        interactions.push(MouseWheelZoom::default());
    }
    interactions
}
