use serde::{Deserialize, Serialize};
use std::sync::{
    atomic::{AtomicU64, Ordering},
    RwLock, RwLockReadGuard, RwLockWriteGuard,
};

// LayerTrait is unified with LayerOperations in shared traits
pub use crate::traits::LayerOperations as LayerTrait;

static NEXT_LAYER_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LayerType {
    Vector,
    Custom,
}

impl std::fmt::Display for LayerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LayerType::Vector => write!(f, "vector"),
            LayerType::Custom => write!(f, "custom"),
        }
    }
}

/// Change counters of a layer and of the data it draws.
///
/// The map renders again whenever a layer's pair differs from the one it saw
/// in the last frame. The counters are compared, never added.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LayerRevision {
    /// Bumped on every property, style variable or source change
    pub layer: u64,
    /// Revision of the attached source, 0 without one
    pub source: u64,
}

/// Mutable display state of a layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerState {
    pub z_index: i32,
    pub opacity: f32,
    pub visible: bool,
}

impl Default for LayerState {
    fn default() -> Self {
        Self {
            z_index: 0,
            opacity: 1.0,
            visible: true,
        }
    }
}

/// Identity and display state shared by all layers
#[derive(Debug)]
pub struct LayerProperties {
    pub id: String,
    pub name: String,
    pub layer_type: LayerType,
    state: RwLock<LayerState>,
    revision: AtomicU64,
}

impl LayerProperties {
    pub fn new(id: String, name: String, layer_type: LayerType) -> Self {
        Self::with_state(id, name, layer_type, LayerState::default())
    }

    pub fn with_state(id: String, name: String, layer_type: LayerType, state: LayerState) -> Self {
        Self {
            id,
            name,
            layer_type,
            state: RwLock::new(state),
            revision: AtomicU64::new(0),
        }
    }

    /// Generates a process-unique id such as `vector-3`
    pub fn generate_id(layer_type: LayerType) -> String {
        format!("{layer_type}-{}", NEXT_LAYER_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn state(&self) -> RwLockReadGuard<'_, LayerState> {
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Applies `f` to the state and bumps the revision
    pub fn update(&self, f: impl FnOnce(&mut LayerState)) {
        {
            let mut state: RwLockWriteGuard<'_, LayerState> =
                self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner());
            f(&mut state);
        }
        self.changed();
    }

    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::SeqCst)
    }

    pub fn changed(&self) {
        self.revision.fetch_add(1, Ordering::SeqCst);
    }
}

impl Default for LayerProperties {
    fn default() -> Self {
        Self::new(
            "default".to_string(),
            "Default Layer".to_string(),
            LayerType::Custom,
        )
    }
}
