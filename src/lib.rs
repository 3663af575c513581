//! # glvector
//!
//! GPU vector layers for interactive 2D maps.
//!
//! A [`Map`] owns a render target description, a [`View`], an ordered layer
//! collection and an interaction chain. Each frame it walks its layers, lets
//! every [`WebGLVectorLayer`] lazily create its renderer and dispatches the
//! `precompose` → `prerender` → `postrender` render events before signalling
//! `rendercomplete`.
//!
//! Vector layers are styled with declarative rules whose values may reference
//! named style variables (`["var", "name"]`). Variables can be updated at any
//! time; renderers resolve them through uniform accessors on the next draw,
//! without being rebuilt.

pub mod core;
pub mod data;
pub mod input;
pub mod interaction;
pub mod layers;
pub mod rendering;
pub mod source;
pub mod spatial;
pub mod style;
pub mod traits;
pub mod prelude;
pub use crate::core::constants;

// Re-export public API
pub use core::{
    bounds::Extent,
    frame::FrameState,
    geo::{Coordinate, LatLng, Pixel, Size},
    map::{Map, MapOptions, MapTarget},
    transform::Transform,
    view::{View, ViewOptions},
};

pub use layers::{
    base::LayerTrait,
    webgl_vector::{WebGLVectorLayer, WebGLVectorLayerOptions},
};

pub use input::{
    events::{InputEvent, MapBrowserEvent, MapEvent, MapEventType},
    handler::{EventManager, ListenerKey},
};

pub use interaction::{
    condition, defaults, DefaultsOptions, DoubleClickZoom, Interaction, Interactions,
    KeyboardZoom, MouseWheelZoom, MouseWheelZoomOptions,
};

pub use rendering::{
    context::{ContextHandle, GraphicsBackend, GraphicsContext, HeadlessContext},
    event::{get_render_pixel, RenderEvent, RenderEventType},
    vector::WebGLVectorLayerRenderer,
};

pub use source::vector::{Feature, VectorSource};

pub use style::{
    rule::{LayerStyle, StyleRule, StyleRuleDescriptor},
    value::StyleValue,
    variables::{StyleVariables, VariableValue},
};

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Common error types
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid style: {0}")]
    InvalidStyle(String),

    #[error("Invalid style variables: {0}")]
    InvalidStyleVariables(String),

    #[error("Render error: {0}")]
    Render(String),

    #[error("Graphics context error: {0}")]
    Context(String),

    #[error("Layer error: {0}")]
    Layer(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Error type alias for convenience
pub type Error = MapError;

/// Initializes `env_logger` once; later calls are ignored
#[cfg(feature = "debug")]
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .is_test(cfg!(test))
        .try_init();
}
