//! Core constants derived from common web-map conventions.
//! Keeping them in a single place makes it easier to tweak engine-wide magic numbers.

/// Default square tile size in pixels, used to derive the zoom 0 resolution.
pub const TILE_SIZE: u32 = 256;

/// Web Mercator world width in meters.
pub const WORLD_WIDTH: f64 = 40_075_016.685_578_49;

/// Resolution (map units per CSS pixel) at zoom 0.
pub const DEFAULT_MAX_RESOLUTION: f64 = WORLD_WIDTH / TILE_SIZE as f64;

pub const DEFAULT_MIN_ZOOM: f64 = 0.0;

pub const DEFAULT_MAX_ZOOM: f64 = 28.0;

/// Wheel delta (in pixels) that corresponds to one zoom level.
pub const DELTA_PER_ZOOM: f64 = 300.0;

/// Pixel equivalent of one wheel "line" when the host reports line deltas.
pub const WHEEL_LINE_HEIGHT: f64 = 40.0;

/// Prefix of the uniform generated for a style variable.
pub const VARIABLE_UNIFORM_PREFIX: &str = "u_var_";

/// Projection matrix uniform bound on every vector draw.
pub const PROJECTION_UNIFORM: &str = "u_projectionMatrix";

/// Rule color uniform, always in slot 0 of the vector shader.
pub const COLOR_UNIFORM: &str = "u_color";

/// Number of `vec4` uniform slots available to the vector shader.
pub const UNIFORM_SLOTS: usize = 16;

/// Frame-wide uniforms.
pub const PIXEL_RATIO_UNIFORM: &str = "u_pixelRatio";
pub const VIEWPORT_SIZE_UNIFORM: &str = "u_viewportSizePx";
