use std::path::Path;

use wgpu::util::DeviceExt;

use crate::asset::ply::{read_ply, PlyMesh};
use crate::error::RenderError;
use crate::renderer::Vertex;

/// Fraction of a tile left empty on each side so bilinear sampling does not
/// bleed into the neighbouring face.
const TILE_INSET: f32 = 0.05;

/// Triangulated mesh ready for upload.
///
/// Every face gets its own corner vertices so each face can own a tile of the
/// atlas.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn load(path: &Path) -> Result<Self, RenderError> {
        let ply = read_ply(path)?;
        let data = Self::from_ply(&ply);
        if data.indices.is_empty() {
            return Err(RenderError::mesh(path, "mesh has no renderable faces"));
        }
        log::info!(
            "Loaded mesh {:?}: {} faces, {} triangles",
            path,
            ply.faces.len(),
            data.indices.len() / 3
        );
        Ok(data)
    }

    pub fn from_ply(ply: &PlyMesh) -> Self {
        let layout = AtlasLayout::new(ply.faces.len());
        let mut data = MeshData::default();

        for (face_index, face) in ply.faces.iter().enumerate() {
            if face.len() < 3 {
                continue;
            }

            let base = data.vertices.len() as u32;
            for (corner, &vertex) in face.iter().enumerate() {
                let uv = match &ply.uvs {
                    Some(uvs) => uvs[vertex as usize],
                    None => layout.corner_uv(face_index, corner, face.len()),
                };
                data.vertices.push(Vertex {
                    pos: ply.positions[vertex as usize],
                    uv,
                });
            }

            // Fan around the first corner keeps the face's winding.
            for k in 1..face.len() as u32 - 1 {
                data.indices.extend_from_slice(&[base, base + k, base + k + 1]);
            }
        }

        data
    }
}

/// Square grid of per-face tiles covering the atlas.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AtlasLayout {
    tiles_per_row: usize,
}

impl AtlasLayout {
    pub fn new(face_count: usize) -> Self {
        let mut tiles_per_row = (face_count as f64).sqrt().ceil() as usize;
        while tiles_per_row * tiles_per_row < face_count {
            tiles_per_row += 1;
        }
        Self {
            tiles_per_row: tiles_per_row.max(1),
        }
    }

    pub fn tiles_per_row(&self) -> usize {
        self.tiles_per_row
    }

    /// Texture coordinate of `corner` of a face with `corners` corners.
    pub fn corner_uv(&self, face: usize, corner: usize, corners: usize) -> [f32; 2] {
        let local = match (corners, corner) {
            (3, 0) | (4, 0) => [0.0, 0.0],
            (3, 1) | (4, 1) => [1.0, 0.0],
            (3, 2) => [0.0, 1.0],
            (4, 2) => [1.0, 1.0],
            (4, 3) => [0.0, 1.0],
            _ => {
                let angle = std::f32::consts::TAU * corner as f32 / corners as f32;
                [0.5 + 0.5 * angle.cos(), 0.5 + 0.5 * angle.sin()]
            }
        };

        let tile = 1.0 / self.tiles_per_row as f32;
        let col = (face % self.tiles_per_row) as f32;
        let row = (face / self.tiles_per_row) as f32;
        let span = 1.0 - 2.0 * TILE_INSET;
        [
            (col + TILE_INSET + local[0] * span) * tile,
            (row + TILE_INSET + local[1] * span) * tile,
        ]
    }
}

/// GPU buffers for a [`MeshData`].
#[derive(Debug)]
pub struct Mesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
}

impl Mesh {
    pub fn from_data(device: &wgpu::Device, data: &MeshData, label: &str) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label}VertexBuffer")),
            contents: bytemuck::cast_slice(&data.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label}IndexBuffer")),
            contents: bytemuck::cast_slice(&data.indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        Self {
            vertex_buffer,
            index_buffer,
            index_count: data.indices.len() as u32,
        }
    }

    pub fn vertex_buffer(&self) -> &wgpu::Buffer {
        &self.vertex_buffer
    }

    pub fn index_buffer(&self) -> &wgpu::Buffer {
        &self.index_buffer
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }
}
