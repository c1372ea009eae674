use std::mem;
use std::num::NonZeroU64;

use wgpu::util::DeviceExt;

use crate::asset::{AssetCache, Handle};
use crate::error::RenderError;
use crate::pipeline::{Framebuffers, MirrorRenderer, SceneRenderer, Target, Viewport, Winding};
use crate::renderer::targets::{COLOR_FORMAT, DEPTH_FORMAT};
use crate::renderer::{
    GpuContext, GpuFramebuffers, MirrorUniform, PipelineBuilder, Texture, Vertex,
};
use crate::scene::{MirrorSurface, RenderCamera};

/// GPU resources for one mirror.
pub struct MirrorResources {
    _mask: Texture,
    quad: wgpu::Buffer,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

pub struct GpuMirrorRenderer {
    resources: AssetCache<MirrorResources>,
    pipeline: wgpu::RenderPipeline,
}

impl GpuMirrorRenderer {
    /// Uploads a quad and an outline mask for every mirror, keyed by list index.
    pub fn new(
        context: &GpuContext,
        framebuffers: &GpuFramebuffers,
        mirrors: &[MirrorSurface],
        mask_size: u32,
    ) -> Self {
        let device = &context.device;

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("MirrorLayout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: NonZeroU64::new(mem::size_of::<MirrorUniform>() as u64),
                    },
                    count: None,
                },
                texture_entry(1),
                sampler_entry(2),
                texture_entry(3),
                sampler_entry(4),
            ],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("MirrorShader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shader/mirror.wgsl").into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("MirrorPipelineLayout"),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });

        let pipeline = PipelineBuilder::new(device, &pipeline_layout, &shader)
            .with_label("MirrorPipeline")
            .with_vertex_buffer(Vertex::layout())
            .with_color_target(COLOR_FORMAT, Some(wgpu::BlendState::ALPHA_BLENDING))
            .with_depth_stencil(DEPTH_FORMAT, false, wgpu::CompareFunction::LessEqual)
            .build();

        let capture = framebuffers.capture();
        let mut resources = AssetCache::new();
        for (index, mirror) in mirrors.iter().enumerate() {
            let mask = Texture::from_mask(
                device,
                &context.queue,
                &mirror.mask(mask_size),
                &format!("MirrorMask{index}"),
            );

            let quad = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("MirrorQuad{index}")),
                contents: bytemuck::cast_slice(&quad_vertices(mirror)),
                usage: wgpu::BufferUsages::VERTEX,
            });

            let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(&format!("MirrorUniform{index}")),
                size: mem::size_of::<MirrorUniform>() as u64,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });

            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(&format!("MirrorBindGroup{index}")),
                layout: &layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: uniform_buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(&capture.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::Sampler(&capture.sampler),
                    },
                    wgpu::BindGroupEntry {
                        binding: 3,
                        resource: wgpu::BindingResource::TextureView(&mask.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 4,
                        resource: wgpu::BindingResource::Sampler(&mask.sampler),
                    },
                ],
            });

            resources.insert(MirrorResources {
                _mask: mask,
                quad,
                uniform_buffer,
                bind_group,
            });
        }
        log::info!("Prepared {} mirror masks at {mask_size}x{mask_size}", resources.len());

        Self {
            resources,
            pipeline,
        }
    }
}

fn texture_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

fn sampler_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    }
}

/// Two triangles covering the mirror's bounding rectangle.
fn quad_vertices(mirror: &MirrorSurface) -> [Vertex; 6] {
    let corners = mirror.quad().map(|(pos, uv)| Vertex::from_world(pos, uv));
    [
        corners[0], corners[1], corners[2], corners[0], corners[2], corners[3],
    ]
}

impl MirrorRenderer<GpuFramebuffers> for GpuMirrorRenderer {
    type Mask = Handle<MirrorResources>;

    fn mask_resource(&self, index: usize) -> Option<Self::Mask> {
        self.resources.handle_at(index)
    }

    fn capture_reflection<S: SceneRenderer<GpuFramebuffers>>(
        &mut self,
        fb: &mut GpuFramebuffers,
        mirror: &MirrorSurface,
        scene: &mut S,
        camera: &RenderCamera,
        front_face: Winding,
    ) -> Result<(), RenderError> {
        let reflected = camera.with_world_transform(mirror.reflection());

        fb.bind(Target::Capture)?;
        fb.set_viewport(Viewport::full(fb.resolution()));
        fb.clear();
        fb.set_cull_face(true);
        // Reflection reverses handedness.
        fb.set_front_face(front_face.flipped());
        fb.set_clip_plane(Some(mirror.clip_plane_facing(camera.eye())));

        let rendered = scene.render_color(fb, &reflected);

        fb.set_clip_plane(None);
        fb.set_front_face(front_face);
        fb.set_cull_face(false);
        rendered?;
        fb.unbind()
    }

    fn render(
        &mut self,
        fb: &mut GpuFramebuffers,
        mirror: &MirrorSurface,
        mask: Self::Mask,
        camera: &RenderCamera,
    ) -> Result<(), RenderError> {
        let resources = self
            .resources
            .get(mask)
            .ok_or_else(|| RenderError::Mirror(format!("unknown mirror {mask}")))?;

        let uniform = MirrorUniform::new(camera, fb.resolution(), mirror.reflectivity());
        fb.context()
            .queue
            .write_buffer(&resources.uniform_buffer, 0, bytemuck::bytes_of(&uniform));

        let pipeline = &self.pipeline;
        fb.draw_pass("MirrorPass", |pass| {
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, &resources.bind_group, &[]);
            pass.set_vertex_buffer(0, resources.quad.slice(..));
            pass.draw(0..6, 0..1);
        })
    }
}
