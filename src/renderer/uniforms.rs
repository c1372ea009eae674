// renderer/uniforms.rs
use bytemuck::{Pod, Zeroable};
use glam::DVec4;

use crate::scene::RenderCamera;
use crate::settings::Resolution;

/// Per-draw data for the scene mesh shaders.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable, Debug, PartialEq)]
pub struct MeshUniform {
    pub view_proj: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    /// World-space plane; fragments on its negative side are discarded.
    pub clip_plane: [f32; 4],
    /// x: depth scale, y: 1.0 when the clip plane is active.
    pub params: [f32; 4],
}

impl MeshUniform {
    pub fn new(camera: &RenderCamera, clip_plane: Option<DVec4>, depth_scale: f32) -> Self {
        let (plane, enabled) = match clip_plane {
            Some(plane) => (plane.as_vec4().to_array(), 1.0),
            None => ([0.0; 4], 0.0),
        };
        Self {
            view_proj: camera.view_proj().to_cols_array_2d(),
            view: camera.view.as_mat4().to_cols_array_2d(),
            clip_plane: plane,
            params: [depth_scale, enabled, 0.0, 0.0],
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable, Debug, PartialEq)]
pub struct MirrorUniform {
    pub view_proj: [[f32; 4]; 4],
    /// xy: target size in pixels, z: reflectivity.
    pub params: [f32; 4],
}

impl MirrorUniform {
    pub fn new(camera: &RenderCamera, resolution: Resolution, reflectivity: f32) -> Self {
        Self {
            view_proj: camera.view_proj().to_cols_array_2d(),
            params: [
                resolution.width as f32,
                resolution.height as f32,
                reflectivity,
                0.0,
            ],
        }
    }
}
