use std::mem;
use std::num::NonZeroU64;

use crate::asset::{Mesh, MeshData};
use crate::error::RenderError;
use crate::pipeline::{Framebuffers, SceneRenderer};
use crate::renderer::targets::{COLOR_FORMAT, DEPTH_FORMAT, DEPTH_VALUE_FORMAT};
use crate::renderer::{
    GpuContext, GpuFramebuffers, MeshUniform, PipelineBuilder, RasterState, Texture, Vertex,
};
use crate::scene::RenderCamera;

/// Draws the atlas-textured scene mesh, either as color or as scaled camera
/// depth.
pub struct MeshRenderer {
    mesh: Mesh,
    _atlas: Texture,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    atlas_bind_group: wgpu::BindGroup,
    color_pipelines: [wgpu::RenderPipeline; 3],
    depth_pipelines: [wgpu::RenderPipeline; 3],
}

impl MeshRenderer {
    pub fn new(context: &GpuContext, data: &MeshData, atlas: Texture) -> Self {
        let device = &context.device;
        let mesh = Mesh::from_data(device, data, "Scene");

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("MeshUniformLayout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: NonZeroU64::new(mem::size_of::<MeshUniform>() as u64),
                },
                count: None,
            }],
        });

        let atlas_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("AtlasLayout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("MeshUniformBuffer"),
            size: mem::size_of::<MeshUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("MeshUniformBindGroup"),
            layout: &uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let atlas_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("AtlasBindGroup"),
            layout: &atlas_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&atlas.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&atlas.sampler),
                },
            ],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("MeshShader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shader/mesh.wgsl").into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("MeshPipelineLayout"),
            bind_group_layouts: &[&uniform_layout, &atlas_layout],
            push_constant_ranges: &[],
        });

        let build = |state: RasterState, entry: &str, format: wgpu::TextureFormat, label: &str| {
            PipelineBuilder::new(device, &pipeline_layout, &shader)
                .with_label(label)
                .with_fragment_entry(entry)
                .with_vertex_buffer(Vertex::layout())
                .with_color_target(format, None)
                .with_depth_stencil(DEPTH_FORMAT, true, wgpu::CompareFunction::Less)
                .with_raster_state(state)
                .build()
        };

        let color_pipelines =
            RasterState::ALL.map(|state| build(state, "fs_main", COLOR_FORMAT, "MeshColorPipeline"));
        let depth_pipelines = RasterState::ALL
            .map(|state| build(state, "fs_depth", DEPTH_VALUE_FORMAT, "MeshDepthPipeline"));

        Self {
            mesh,
            _atlas: atlas,
            uniform_buffer,
            uniform_bind_group,
            atlas_bind_group,
            color_pipelines,
            depth_pipelines,
        }
    }

    fn draw(
        &mut self,
        fb: &mut GpuFramebuffers,
        camera: &RenderCamera,
        depth_scale: f32,
        depth: bool,
    ) -> Result<(), RenderError> {
        let expected = if depth { DEPTH_VALUE_FORMAT } else { COLOR_FORMAT };
        match fb.bound_format() {
            Some(format) if format == expected => {}
            other => {
                return Err(RenderError::Binding(format!(
                    "mesh {} pass needs a {expected:?} target, bound: {other:?}",
                    if depth { "depth" } else { "color" }
                )))
            }
        }

        let uniform = MeshUniform::new(camera, fb.clip_plane(), depth_scale);
        fb.context()
            .queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniform));

        let state = fb.raster_state().index();
        let pipeline = if depth {
            &self.depth_pipelines[state]
        } else {
            &self.color_pipelines[state]
        };
        let mesh = &self.mesh;
        let uniform_bind_group = &self.uniform_bind_group;
        let atlas_bind_group = &self.atlas_bind_group;

        fb.draw_pass("MeshPass", |pass| {
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, uniform_bind_group, &[]);
            pass.set_bind_group(1, atlas_bind_group, &[]);
            pass.set_vertex_buffer(0, mesh.vertex_buffer().slice(..));
            pass.set_index_buffer(mesh.index_buffer().slice(..), wgpu::IndexFormat::Uint32);
            pass.draw_indexed(0..mesh.index_count(), 0, 0..1);
        })
    }
}

impl SceneRenderer<GpuFramebuffers> for MeshRenderer {
    fn render_color(
        &mut self,
        fb: &mut GpuFramebuffers,
        camera: &RenderCamera,
    ) -> Result<(), RenderError> {
        self.draw(fb, camera, 1.0, false)
    }

    fn render_depth(
        &mut self,
        fb: &mut GpuFramebuffers,
        camera: &RenderCamera,
        scale: f32,
    ) -> Result<(), RenderError> {
        self.draw(fb, camera, scale, true)
    }
}
