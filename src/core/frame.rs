use crate::core::{
    bounds::Extent,
    geo::{Coordinate, Pixel, Size},
    transform::Transform,
    view::{View, ViewState},
};
use instant::Instant;

/// Per-frame metadata handed to layer renderers and render-event listeners.
///
/// A frame state is built once per rendered frame and is read-only for every
/// consumer.
#[derive(Debug, Clone)]
pub struct FrameState {
    /// Monotonic frame counter of the owning map
    pub index: u64,
    pub time: Instant,
    /// Output size in CSS pixels (`[width, height]`)
    pub size: [f64; 2],
    pub pixel_ratio: f64,
    pub view_state: ViewState,
    /// Visible extent in map coordinates
    pub extent: Extent,
    pub coordinate_to_pixel_transform: Transform,
    pub pixel_to_coordinate_transform: Transform,
}

impl FrameState {
    pub fn new(index: u64, view: &View, size: Size, pixel_ratio: f64) -> Self {
        let view_state = view.state();
        let coordinate_to_pixel_transform =
            coordinate_to_pixel(&view_state, size.width, size.height);
        let pixel_to_coordinate_transform = coordinate_to_pixel_transform
            .invert()
            .unwrap_or_else(Transform::identity);

        Self {
            index,
            time: Instant::now(),
            size: size.to_array(),
            pixel_ratio,
            view_state,
            extent: view.calculate_extent(size),
            coordinate_to_pixel_transform,
            pixel_to_coordinate_transform,
        }
    }

    pub fn width(&self) -> f64 {
        self.size[0]
    }

    pub fn height(&self) -> f64 {
        self.size[1]
    }

    /// Render target size in device pixels
    pub fn render_size(&self) -> (u32, u32) {
        Size::new(self.size[0], self.size[1]).scaled(self.pixel_ratio)
    }

    /// Maps a CSS pixel to a render-target pixel.
    ///
    /// The render target origin is the bottom-left corner, so the vertical axis
    /// is flipped before the pixel ratio is applied.
    pub fn inverse_pixel_transform(&self) -> Transform {
        let pr = self.pixel_ratio;
        Transform::new(pr, 0.0, 0.0, -pr, 0.0, self.size[1] * pr)
    }

    /// Maps a map coordinate to clip space (`[-1, 1]` on both axes)
    pub fn projection_transform(&self) -> Transform {
        let resolution = self.view_state.resolution;
        let [cx, cy] = self.view_state.center;
        let sx = 2.0 / (resolution * self.size[0]);
        let sy = 2.0 / (resolution * self.size[1]);
        Transform::new(sx, 0.0, 0.0, sy, -cx * sx, -cy * sy)
    }

    pub fn coordinate_to_pixel(&self, coordinate: Coordinate) -> Pixel {
        self.coordinate_to_pixel_transform.apply(coordinate)
    }

    pub fn pixel_to_coordinate(&self, pixel: Pixel) -> Coordinate {
        self.pixel_to_coordinate_transform.apply(pixel)
    }
}

fn coordinate_to_pixel(view_state: &ViewState, width: f64, height: f64) -> Transform {
    let resolution = view_state.resolution;
    let [cx, cy] = view_state.center;
    Transform::new(
        1.0 / resolution,
        0.0,
        0.0,
        -1.0 / resolution,
        -cx / resolution + width / 2.0,
        cy / resolution + height / 2.0,
    )
}
