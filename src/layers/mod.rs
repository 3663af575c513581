#[macro_use]
pub mod macros;

pub mod base;
pub mod manager;
pub mod webgl_vector;

pub use base::{LayerProperties, LayerRevision, LayerState, LayerTrait, LayerType};
pub use manager::LayerCollection;
pub use webgl_vector::{WebGLVectorLayer, WebGLVectorLayerOptions};
