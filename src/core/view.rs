use crate::core::{
    bounds::Extent,
    constants::{DEFAULT_MAX_RESOLUTION, DEFAULT_MAX_ZOOM, DEFAULT_MIN_ZOOM},
    geo::{Coordinate, Size},
};
use serde::{Deserialize, Serialize};

/// Construction options for a [`View`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewOptions {
    pub center: Coordinate,
    pub zoom: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
    /// Snap every zoom change to an integer level
    pub constrain_resolution: bool,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            center: [0.0, 0.0],
            zoom: 0.0,
            min_zoom: DEFAULT_MIN_ZOOM,
            max_zoom: DEFAULT_MAX_ZOOM,
            constrain_resolution: false,
        }
    }
}

/// Snapshot of the view used for one frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewState {
    pub center: Coordinate,
    pub resolution: f64,
    pub zoom: f64,
    pub rotation: f64,
}

/// Manages the current view of the map: center and zoom in map coordinates
#[derive(Debug, Clone, PartialEq)]
pub struct View {
    center: Coordinate,
    zoom: f64,
    min_zoom: f64,
    max_zoom: f64,
    constrain_resolution: bool,
}

impl View {
    pub fn new(options: ViewOptions) -> Self {
        let mut view = Self {
            center: options.center,
            zoom: options.zoom,
            min_zoom: options.min_zoom,
            max_zoom: options.max_zoom,
            constrain_resolution: options.constrain_resolution,
        };
        view.zoom = view.constrain_zoom(options.zoom);
        view
    }

    pub fn center(&self) -> Coordinate {
        self.center
    }

    pub fn set_center(&mut self, center: Coordinate) {
        self.center = center;
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    /// Sets the zoom level, clamping to valid range
    pub fn set_zoom(&mut self, zoom: f64) {
        self.zoom = self.constrain_zoom(zoom);
    }

    pub fn min_zoom(&self) -> f64 {
        self.min_zoom
    }

    pub fn max_zoom(&self) -> f64 {
        self.max_zoom
    }

    /// Sets the zoom limits
    pub fn set_zoom_limits(&mut self, min_zoom: f64, max_zoom: f64) {
        self.min_zoom = min_zoom;
        self.max_zoom = max_zoom;
        self.zoom = self.constrain_zoom(self.zoom);
    }

    /// Map units per CSS pixel at the current zoom
    pub fn resolution(&self) -> f64 {
        Self::resolution_for_zoom(self.zoom)
    }

    pub fn resolution_for_zoom(zoom: f64) -> f64 {
        DEFAULT_MAX_RESOLUTION / 2_f64.powf(zoom)
    }

    pub fn zoom_for_resolution(resolution: f64) -> f64 {
        (DEFAULT_MAX_RESOLUTION / resolution).log2()
    }

    /// Changes zoom by `delta` levels, keeping `anchor` fixed on screen
    pub fn adjust_zoom(&mut self, delta: f64, anchor: Option<Coordinate>) {
        self.zoom_to(self.zoom + delta, anchor);
    }

    /// Zooms to `zoom`, keeping `anchor` fixed on screen
    pub fn zoom_to(&mut self, zoom: f64, anchor: Option<Coordinate>) {
        let old_resolution = self.resolution();
        let new_zoom = self.constrain_zoom(zoom);

        // No-op if zoom does not change significantly
        if (new_zoom - self.zoom).abs() < 1e-9 {
            return;
        }

        self.zoom = new_zoom;

        if let Some(anchor) = anchor {
            let ratio = self.resolution() / old_resolution;
            self.center = [
                anchor[0] - (anchor[0] - self.center[0]) * ratio,
                anchor[1] - (anchor[1] - self.center[1]) * ratio,
            ];
        }
    }

    /// Rounds the zoom to the nearest integer level, keeping `anchor` fixed
    pub fn snap_zoom(&mut self, direction: f64, anchor: Option<Coordinate>) {
        let snapped = if direction > 0.0 {
            (self.zoom - 1e-9).ceil()
        } else if direction < 0.0 {
            (self.zoom + 1e-9).floor()
        } else {
            self.zoom.round()
        };
        self.zoom_to(snapped, anchor);
    }

    pub fn constrain_resolution(&self) -> bool {
        self.constrain_resolution
    }

    pub fn set_constrain_resolution(&mut self, constrain: bool) {
        self.constrain_resolution = constrain;
    }

    /// Extent visible in a render target of `size`
    pub fn calculate_extent(&self, size: Size) -> Extent {
        let resolution = self.resolution();
        Extent::from_center_and_size(
            self.center,
            size.width * resolution,
            size.height * resolution,
        )
    }

    pub fn state(&self) -> ViewState {
        ViewState {
            center: self.center,
            resolution: self.resolution(),
            zoom: self.zoom,
            rotation: 0.0,
        }
    }

    fn constrain_zoom(&self, zoom: f64) -> f64 {
        let zoom = zoom.clamp(self.min_zoom, self.max_zoom);
        if self.constrain_resolution {
            zoom.round()
        } else {
            zoom
        }
    }
}

impl Default for View {
    fn default() -> Self {
        Self::new(ViewOptions::default())
    }
}
