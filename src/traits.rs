//! Shared trait abstractions for common patterns
//!
//! Geometry and matrix helpers used by extents, frame transforms and
//! render events, and the operations every map layer supports.

use crate::{
    core::{config::GpuRenderingConfig, frame::FrameState, geo::Point},
    layers::base::{LayerRevision, LayerType},
    rendering::context::ContextHandle,
    Result,
};

/// Unified geometry operations trait to eliminate duplicate math implementations
pub trait GeometryOps<T> {
    /// Check if bounds contain a point
    fn contains_point(&self, point: &T) -> bool;

    /// Check if this bounds intersects with another
    fn intersects_bounds(&self, other: &Self) -> bool;

    /// Extend bounds to include a point
    fn extend_with_point(&mut self, point: &T);

    /// Get the center point
    fn center(&self) -> T;

    /// Check if bounds are valid
    fn is_valid(&self) -> bool;

    /// Get the area/size
    fn area(&self) -> f64;
}

/// Unified matrix transformation operations
///
/// Matrices are `[a, b, c, d, e, f]` and map `(x, y)` to
/// `(a*x + c*y + e, b*x + d*y + f)`.
pub trait MatrixTransform {
    /// Apply 2D transformation matrix
    fn apply_transform(&self, matrix: &[f64; 6]) -> Self;

    /// Combine two transformation matrices (`b` is applied first)
    fn combine_matrices(a: &[f64; 6], b: &[f64; 6]) -> [f64; 6] {
        [
            a[0] * b[0] + a[2] * b[1],        // a
            a[1] * b[0] + a[3] * b[1],        // b
            a[0] * b[2] + a[2] * b[3],        // c
            a[1] * b[2] + a[3] * b[3],        // d
            a[0] * b[4] + a[2] * b[5] + a[4], // e
            a[1] * b[4] + a[3] * b[5] + a[5], // f
        ]
    }
}

impl MatrixTransform for Point {
    fn apply_transform(&self, matrix: &[f64; 6]) -> Self {
        Point::new(
            matrix[0] * self.x + matrix[2] * self.y + matrix[4],
            matrix[1] * self.x + matrix[3] * self.y + matrix[5],
        )
    }
}

impl MatrixTransform for [f64; 2] {
    fn apply_transform(&self, matrix: &[f64; 6]) -> Self {
        Point::from(*self).apply_transform(matrix).to_array()
    }
}

/// Operations shared by all map layers.
///
/// Layers are shared handles: the map and the host may both hold one, so
/// every setter takes `&self` and uses interior mutability.
pub trait LayerOperations: Send + Sync {
    fn id(&self) -> &str;

    fn name(&self) -> &str;

    fn layer_type(&self) -> LayerType;

    fn z_index(&self) -> i32;

    fn set_z_index(&self, z_index: i32);

    fn opacity(&self) -> f32;

    fn set_opacity(&self, opacity: f32);

    fn is_visible(&self) -> bool;

    fn set_visible(&self, visible: bool);

    /// Change counters; the map renders again when they differ from the last frame
    fn revision(&self) -> LayerRevision;

    /// Renders one frame; returns `false` when the layer skipped the frame
    fn render_frame(
        &self,
        frame_state: &FrameState,
        context: &ContextHandle,
        config: &GpuRenderingConfig,
    ) -> Result<bool>;

    /// Releases the layer's renderer and GPU resources
    fn dispose(&self);

    fn options(&self) -> serde_json::Value;

    fn as_any(&self) -> &dyn std::any::Any;
}
