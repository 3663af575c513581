//! Configuration system for frame timing and GPU rendering
//!
//! Options can be resolved from a preset profile or deserialized from JSON,
//! which keeps host applications free to ship their own tuning files.

use crate::{MapError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MapPerformanceProfile {
    Balanced,
    LowPower,
    HighQuality,
    Custom(MapPerformanceOptions),
}

impl MapPerformanceProfile {
    pub fn resolve(&self) -> MapPerformanceOptions {
        match self {
            Self::Balanced => MapPerformanceOptions {
                framerate: FrameTimingConfig {
                    target_fps: Some(60),
                    render_on_idle: false,
                    min_update_interval_ms: 16,
                },
                rendering: GpuRenderingConfig {
                    msaa_samples: 4,
                    hit_detection_scale: 0.5,
                    max_buffer_vertices: 1 << 20,
                },
            },
            Self::LowPower => MapPerformanceOptions {
                framerate: FrameTimingConfig {
                    target_fps: Some(30),
                    render_on_idle: false,
                    min_update_interval_ms: 33,
                },
                rendering: GpuRenderingConfig {
                    msaa_samples: 0,
                    hit_detection_scale: 0.25,
                    max_buffer_vertices: 1 << 18,
                },
            },
            Self::HighQuality => MapPerformanceOptions {
                framerate: FrameTimingConfig {
                    target_fps: Some(120),
                    render_on_idle: true,
                    min_update_interval_ms: 8,
                },
                rendering: GpuRenderingConfig {
                    msaa_samples: 8,
                    hit_detection_scale: 1.0,
                    max_buffer_vertices: 1 << 22,
                },
            },
            Self::Custom(options) => options.clone(),
        }
    }
}

impl Default for MapPerformanceProfile {
    fn default() -> Self {
        Self::Balanced
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapPerformanceOptions {
    pub framerate: FrameTimingConfig,
    pub rendering: GpuRenderingConfig,
}

impl MapPerformanceOptions {
    /// Parses options from JSON; missing sections fall back to the balanced preset
    pub fn from_json_str(json: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<()> {
        if self.framerate.target_fps == Some(0) {
            return Err(MapError::Config("target_fps must be greater than zero".into()).into());
        }
        if !(self.rendering.hit_detection_scale > 0.0 && self.rendering.hit_detection_scale <= 1.0)
        {
            return Err(MapError::Config(format!(
                "hit_detection_scale must be in (0, 1], got {}",
                self.rendering.hit_detection_scale
            ))
            .into());
        }
        Ok(())
    }
}

impl Default for MapPerformanceOptions {
    fn default() -> Self {
        MapPerformanceProfile::default().resolve()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameTimingConfig {
    pub target_fps: Option<u32>,
    pub render_on_idle: bool,
    pub min_update_interval_ms: u64,
}

impl FrameTimingConfig {
    pub fn target_frame_duration_ms(&self) -> Option<u64> {
        self.target_fps.map(|fps| 1000 / fps.max(1) as u64)
    }

    pub fn should_render(&self, last_render_time: instant::Instant) -> bool {
        if self.render_on_idle {
            return true;
        }

        let elapsed = last_render_time.elapsed();
        if let Some(target_duration) = self.target_frame_duration_ms() {
            elapsed.as_millis() >= target_duration as u128
        } else {
            true
        }
    }
}

impl Default for FrameTimingConfig {
    fn default() -> Self {
        Self {
            target_fps: Some(60),
            render_on_idle: false,
            min_update_interval_ms: 16,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GpuRenderingConfig {
    pub msaa_samples: u32,
    /// Size of the hit-detection buffer relative to the render target
    pub hit_detection_scale: f64,
    /// Upper bound of vertices uploaded per style renderer and frame
    pub max_buffer_vertices: usize,
}

impl GpuRenderingConfig {
    pub fn is_msaa_enabled(&self) -> bool {
        self.msaa_samples > 0
    }

    pub fn sample_count(&self) -> u32 {
        if self.msaa_samples == 0 {
            1
        } else {
            self.msaa_samples.next_power_of_two().min(8)
        }
    }
}

impl Default for GpuRenderingConfig {
    fn default() -> Self {
        Self {
            msaa_samples: 4,
            hit_detection_scale: 0.5,
            max_buffer_vertices: 1 << 20,
        }
    }
}
