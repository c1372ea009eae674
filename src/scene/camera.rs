use glam::{DMat4, DVec3, Mat4};

use crate::scene::RigidStep;
use crate::settings::{Intrinsics, Resolution};

/// World-to-camera transform for a right-down-forward camera at `eye`
/// looking at `target`.
pub fn look_at_rdf(eye: DVec3, target: DVec3, up: DVec3) -> DMat4 {
    let z = (target - eye).normalize();
    let x = z.cross(up).normalize();
    let y = z.cross(x).normalize();

    DMat4::from_cols(
        glam::DVec4::new(x.x, y.x, z.x, 0.0),
        glam::DVec4::new(x.y, y.y, z.y, 0.0),
        glam::DVec4::new(x.z, y.z, z.z, 0.0),
        glam::DVec4::new(-x.dot(eye), -y.dot(eye), -z.dot(eye), 1.0),
    )
}

/// Pinhole projection for an RDF camera into wgpu clip space.
///
/// The image origin is the top-left pixel and clip depth spans [0, 1] from
/// `near` to `far`.
pub fn projection_rdf(resolution: Resolution, k: &Intrinsics) -> DMat4 {
    let w = resolution.width as f64;
    let h = resolution.height as f64;
    let depth_range = k.far - k.near;

    let rows = [
        [2.0 * k.fx / w, 0.0, 2.0 * k.cx / w - 1.0, 0.0],
        [0.0, -2.0 * k.fy / h, 1.0 - 2.0 * k.cy / h, 0.0],
        [0.0, 0.0, k.far / depth_range, -k.far * k.near / depth_range],
        [0.0, 0.0, 1.0, 0.0],
    ];
    DMat4::from_cols_array_2d(&rows).transpose()
}

/// Projection plus view matrix handed to the renderers for one pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderCamera {
    pub projection: DMat4,
    pub view: DMat4,
}

impl RenderCamera {
    pub fn new(projection: DMat4, view: DMat4) -> Self {
        Self { projection, view }
    }

    pub fn view_proj(&self) -> Mat4 {
        (self.projection * self.view).as_mat4()
    }

    pub fn eye(&self) -> DVec3 {
        self.view.inverse().transform_point3(DVec3::ZERO)
    }

    /// Same projection, view composed with an extra world-space transform.
    pub fn with_world_transform(&self, world: DMat4) -> Self {
        Self {
            projection: self.projection,
            view: self.view * world,
        }
    }
}

/// Owns the camera's world-to-camera pose and moves it by fixed steps.
///
/// Every mutation is a right multiplication with a precomputed matrix; there
/// is no renormalization, so a sequence of calls yields exactly the matrix
/// product of that sequence.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraPoseController {
    pose: DMat4,
}

impl CameraPoseController {
    pub fn new(pose: DMat4) -> Self {
        Self { pose }
    }

    pub fn look_at(eye: DVec3, target: DVec3, up: DVec3) -> Self {
        Self::new(look_at_rdf(eye, target, up))
    }

    pub fn initialize(&mut self, eye: DVec3, target: DVec3, up: DVec3) {
        self.pose = look_at_rdf(eye, target, up);
    }

    pub fn pose(&self) -> DMat4 {
        self.pose
    }

    /// Moves to the paired stereo eye.
    pub fn apply_right(&mut self, baseline: &RigidStep) {
        self.pose = self.pose * baseline.inverse();
    }

    /// Returns to the left eye; undoes exactly one `apply_right`.
    pub fn undo_right(&mut self, baseline: &RigidStep) {
        self.pose = self.pose * baseline.forward();
    }

    pub fn advance_trajectory(&mut self, step: &RigidStep) {
        self.pose = self.pose * step.inverse();
    }
}
