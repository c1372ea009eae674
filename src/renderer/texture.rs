// renderer/texture.rs

use std::path::Path;

use image::GrayImage;

use crate::error::RenderError;
use crate::settings::Resolution;

struct TextureSource<'a> {
    data: &'a [u8],
    width: u32,
    height: u32,
    format: wgpu::TextureFormat,
    label: Option<&'a str>,
}

#[derive(Debug)]
pub struct Texture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
}

impl Texture {
    /// Loads the texture atlas. Texel values are used as stored, without an
    /// sRGB decode, so a uniform atlas renders back to the same bytes.
    pub fn from_path(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        path: impl AsRef<Path>,
    ) -> Result<Self, RenderError> {
        let path = path.as_ref();
        log::info!("Loading texture: {:?}", path);

        let rgba = image::open(path)?.to_rgba8();
        let (width, height) = rgba.dimensions();
        let label = path.to_string_lossy();

        Ok(Self::upload(
            device,
            queue,
            TextureSource {
                data: &rgba,
                width,
                height,
                format: wgpu::TextureFormat::Rgba8Unorm,
                label: Some(label.as_ref()),
            },
        ))
    }

    /// Single channel mirror outline mask.
    pub fn from_mask(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        mask: &GrayImage,
        label: &str,
    ) -> Self {
        let (width, height) = mask.dimensions();
        Self::upload(
            device,
            queue,
            TextureSource {
                data: mask.as_raw(),
                width,
                height,
                format: wgpu::TextureFormat::R8Unorm,
                label: Some(label),
            },
        )
    }

    fn upload(device: &wgpu::Device, queue: &wgpu::Queue, source: TextureSource<'_>) -> Self {
        let size = wgpu::Extent3d {
            width: source.width,
            height: source.height,
            depth_or_array_layers: 1,
        };

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: source.label,
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: source.format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        let bytes_per_texel = source.format.block_copy_size(None).unwrap_or(4);
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            source.data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(bytes_per_texel * source.width),
                rows_per_image: Some(source.height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = Self::clamped_sampler(device, source.label);

        Self {
            texture,
            view,
            sampler,
        }
    }

    /// Offscreen attachment sized to the output resolution.
    pub fn render_target(
        device: &wgpu::Device,
        resolution: Resolution,
        format: wgpu::TextureFormat,
        usage: wgpu::TextureUsages,
        label: &str,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: resolution.width.max(1),
                height: resolution.height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: usage | wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = Self::clamped_sampler(device, Some(label));

        Self {
            texture,
            view,
            sampler,
        }
    }

    fn clamped_sampler(device: &wgpu::Device, label: Option<&str>) -> wgpu::Sampler {
        let sampler_label = label.map(|name| format!("{name} Sampler"));
        device.create_sampler(&wgpu::SamplerDescriptor {
            label: sampler_label.as_deref(),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        })
    }
}
