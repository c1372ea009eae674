use std::path::{Path, PathBuf};

use glam::{DMat4, DVec3};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::error::RenderError;
use crate::io;

/// Everything that parameterizes a render run.
///
/// Every field has a default, so a settings file only needs to name what it
/// overrides. The defaults reproduce the stock 100 frame stereo sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderSettings {
    #[serde(default)]
    pub resolution: Resolution,
    #[serde(default)]
    pub intrinsics: Intrinsics,
    #[serde(default = "RenderSettings::default_frame_count")]
    pub frame_count: usize,
    #[serde(default = "RenderSettings::default_render_depth")]
    pub render_depth: bool,
    #[serde(default = "RenderSettings::default_depth_scale")]
    pub depth_scale: f32,
    #[serde(default)]
    pub look_at: LookAt,
    /// Left-to-right eye translation.
    #[serde(default = "RenderSettings::default_stereo_baseline")]
    pub stereo_baseline: [f64; 3],
    /// Per-frame camera motion, row-major.
    #[serde(default = "RenderSettings::default_trajectory_step")]
    pub trajectory_step: [[f64; 4]; 4],
    #[serde(default = "RenderSettings::default_mask_size")]
    pub mask_size: u32,
    #[serde(default = "RenderSettings::default_output_dir")]
    pub output_dir: PathBuf,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            resolution: Resolution::default(),
            intrinsics: Intrinsics::default(),
            frame_count: Self::default_frame_count(),
            render_depth: Self::default_render_depth(),
            depth_scale: Self::default_depth_scale(),
            look_at: LookAt::default(),
            stereo_baseline: Self::default_stereo_baseline(),
            trajectory_step: Self::default_trajectory_step(),
            mask_size: Self::default_mask_size(),
            output_dir: Self::default_output_dir(),
        }
    }
}

impl RenderSettings {
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, RenderError> {
        let path = path.as_ref();
        let contents = io::load_string(path)?;
        let settings = serde_json::from_str::<RenderSettings>(&contents)?;
        info!("Loaded render settings from {:?}", path);
        Ok(settings.validate())
    }

    pub fn validate(mut self) -> Self {
        if self.resolution.width == 0 || self.resolution.height == 0 {
            warn!("Resolution must be greater than zero. Using default resolution.");
            self.resolution = Resolution::default();
        }

        if !self.intrinsics.is_valid() {
            warn!("Camera intrinsics are invalid. Using default intrinsics.");
            self.intrinsics = Intrinsics::default();
        }

        if !(self.depth_scale.is_finite() && self.depth_scale > 0.0) {
            warn!("Depth scale must be positive. Using default value.");
            self.depth_scale = Self::default_depth_scale();
        }

        if !self.look_at.is_valid() {
            warn!("Look-at eye, target and up are degenerate. Using default look-at.");
            self.look_at = LookAt::default();
        }

        if !self.stereo_baseline.iter().all(|v| v.is_finite()) {
            warn!("Stereo baseline must be finite. Using default baseline.");
            self.stereo_baseline = Self::default_stereo_baseline();
        }

        let det = self.trajectory_step_matrix().determinant();
        if !det.is_finite() || det.abs() < 1e-9 {
            warn!("Trajectory step is not invertible. Using default step.");
            self.trajectory_step = Self::default_trajectory_step();
        }

        if self.mask_size == 0 {
            warn!("Mask size must be greater than zero. Using default value.");
            self.mask_size = Self::default_mask_size();
        }

        self
    }

    pub fn baseline_matrix(&self) -> DMat4 {
        DMat4::from_translation(DVec3::from_array(self.stereo_baseline))
    }

    pub fn trajectory_step_matrix(&self) -> DMat4 {
        DMat4::from_cols_array_2d(&self.trajectory_step).transpose()
    }

    const fn default_frame_count() -> usize {
        100
    }

    const fn default_render_depth() -> bool {
        true
    }

    fn default_depth_scale() -> f32 {
        65535.0 * 0.1
    }

    const fn default_stereo_baseline() -> [f64; 3] {
        [0.0, -0.06, 0.0]
    }

    // Roughly 5 degrees of yaw plus 2.5cm forward per frame.
    const fn default_trajectory_step() -> [[f64; 4]; 4] {
        [
            [0.9961, -0.0871, 0.0, 0.025],
            [0.0871, 0.9961, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ]
    }

    const fn default_mask_size() -> u32 {
        256
    }

    fn default_output_dir() -> PathBuf {
        PathBuf::from(".")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Default for Resolution {
    fn default() -> Self {
        Self {
            width: 848,
            height: 800,
        }
    }
}

impl Resolution {
    pub fn area(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// Pinhole intrinsics in pixels, plus the clip range in scene units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Intrinsics {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
    pub near: f64,
    pub far: f64,
}

impl Default for Intrinsics {
    fn default() -> Self {
        Self {
            fx: 286.29,
            fy: 286.29,
            cx: 436.76,
            cy: 336.08,
            near: 0.1,
            far: 100.0,
        }
    }
}

impl Intrinsics {
    fn is_valid(&self) -> bool {
        let all_finite = [self.fx, self.fy, self.cx, self.cy, self.near, self.far]
            .iter()
            .all(|v| v.is_finite());
        all_finite && self.fx > 0.0 && self.fy > 0.0 && self.near > 0.0 && self.far > self.near
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LookAt {
    pub eye: [f64; 3],
    pub target: [f64; 3],
    pub up: [f64; 3],
}

impl Default for LookAt {
    fn default() -> Self {
        Self {
            eye: [0.0, 0.0, 0.75],
            target: [0.75, 0.0, 0.75],
            up: [0.0, 0.0, 1.0],
        }
    }
}

impl LookAt {
    fn is_valid(&self) -> bool {
        let eye = DVec3::from_array(self.eye);
        let forward = DVec3::from_array(self.target) - eye;
        let up = DVec3::from_array(self.up);
        forward.is_finite() && up.is_finite() && forward.cross(up).length_squared() > 1e-12
    }
}
