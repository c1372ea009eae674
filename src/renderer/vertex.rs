use bytemuck::{Pod, Zeroable};
use glam::DVec3;
use std::mem;

/// Textured position shared by scene meshes and mirror quads.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable, Debug, PartialEq)]
pub struct Vertex {
    pub pos: [f32; 3],
    pub uv: [f32; 2],
}

impl Vertex {
    const ATTRS: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![
        0 => Float32x3,
        1 => Float32x2
    ];

    /// World-space point narrowed to GPU precision.
    pub fn from_world(pos: DVec3, uv: [f32; 2]) -> Self {
        Self {
            pos: pos.as_vec3().to_array(),
            uv,
        }
    }

    pub fn layout<'a>() -> wgpu::VertexBufferLayout<'a> {
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}
