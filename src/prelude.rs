//! Prelude module for common glvector types and traits
//!
//! This module re-exports the most commonly used types, traits, and functions
//! for easy importing with `use glvector::prelude::*;`

pub use crate::core::{
    bounds::Extent,
    config::{FrameTimingConfig, GpuRenderingConfig, MapPerformanceOptions, MapPerformanceProfile},
    frame::FrameState,
    geo::{Coordinate, LatLng, Pixel, Point, Size},
    map::{Map, MapOptions, MapTarget},
    transform::Transform,
    view::{View, ViewOptions, ViewState},
};

pub use crate::layers::{
    base::{LayerProperties, LayerRevision, LayerTrait, LayerType},
    manager::LayerCollection,
    webgl_vector::{WebGLVectorLayer, WebGLVectorLayerOptions},
};

pub use crate::input::{
    events::{InputEvent, KeyCode, KeyModifiers, MapBrowserEvent, MapEvent, MapEventType, WheelDeltaMode},
    handler::{EventManager, ListenerKey},
};

pub use crate::interaction::{
    condition, defaults, DefaultsOptions, DoubleClickZoom, Interaction, Interactions,
    KeyboardZoom, MouseWheelZoom, MouseWheelZoomOptions,
};

pub use crate::rendering::{
    context::{ContextHandle, GraphicsBackend, GraphicsContext, HeadlessContext},
    event::{get_render_pixel, RenderEvent, RenderEventType},
    uniforms::{UniformValue, ValueType},
    vector::WebGLVectorLayerRenderer,
};

pub use crate::source::vector::{Feature, VectorSource};

pub use crate::style::{
    rule::{LayerStyle, StyleRule, StyleRuleDescriptor},
    value::StyleValue,
    variables::{StyleVariables, VariableValue},
};

pub use crate::{Error as MapError, Result};

pub use std::{
    collections::VecDeque,
    sync::Arc,
    time::Duration,
};

pub use fxhash::{FxHashMap as HashMap, FxHashSet as HashSet, FxHasher};
