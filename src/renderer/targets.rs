use glam::DVec4;
use image::RgbImage;

use crate::error::RenderError;
use crate::pipeline::{DepthImage, Framebuffers, Target, Viewport, Winding};
use crate::renderer::{GpuContext, Texture};
use crate::settings::Resolution;

pub const COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
pub const DEPTH_VALUE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::R32Float;
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24Plus;

/// Fixed-function culling state a pipeline is built for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RasterState {
    NoCull,
    BackCull(Winding),
}

impl RasterState {
    pub const ALL: [RasterState; 3] = [
        RasterState::NoCull,
        RasterState::BackCull(Winding::Ccw),
        RasterState::BackCull(Winding::Cw),
    ];

    pub fn index(self) -> usize {
        match self {
            RasterState::NoCull => 0,
            RasterState::BackCull(Winding::Ccw) => 1,
            RasterState::BackCull(Winding::Cw) => 2,
        }
    }

    pub fn cull_mode(self) -> Option<wgpu::Face> {
        match self {
            RasterState::NoCull => None,
            RasterState::BackCull(_) => Some(wgpu::Face::Back),
        }
    }

    pub fn front_face(self) -> wgpu::FrontFace {
        match self {
            RasterState::BackCull(Winding::Cw) => wgpu::FrontFace::Cw,
            _ => wgpu::FrontFace::Ccw,
        }
    }
}

struct BoundTarget {
    target: Target,
    encoder: wgpu::CommandEncoder,
    viewport: Option<Viewport>,
    pending_clear: bool,
}

/// Staging buffer padded to the copy row alignment.
struct Readback {
    buffer: wgpu::Buffer,
    unpadded_bytes_per_row: u32,
    padded_bytes_per_row: u32,
}

impl Readback {
    fn new(device: &wgpu::Device, resolution: Resolution, bytes_per_pixel: u32, label: &str) -> Self {
        let unpadded_bytes_per_row = bytes_per_pixel * resolution.width;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded_bytes_per_row = unpadded_bytes_per_row.div_ceil(align) * align;

        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: (padded_bytes_per_row * resolution.height) as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        Self {
            buffer,
            unpadded_bytes_per_row,
            padded_bytes_per_row,
        }
    }
}

/// The offscreen color, depth-value and mirror capture targets.
///
/// Every bind records into its own command encoder, submitted on unbind, so
/// uniform writes issued while a target is bound land before that target's
/// draws and after everything recorded earlier.
pub struct GpuFramebuffers {
    context: GpuContext,
    resolution: Resolution,
    color: Texture,
    depth_value: Texture,
    depth: Texture,
    capture: Texture,
    capture_depth: Texture,
    color_readback: Readback,
    depth_readback: Readback,
    bound: Option<BoundTarget>,
    cull_face: bool,
    front_face: Winding,
    clip_plane: Option<DVec4>,
}

impl GpuFramebuffers {
    pub fn new(context: &GpuContext, resolution: Resolution) -> Self {
        let device = &context.device;
        let copy_src = wgpu::TextureUsages::COPY_SRC;
        let sampled = wgpu::TextureUsages::TEXTURE_BINDING;

        Self {
            context: context.clone(),
            resolution,
            color: Texture::render_target(device, resolution, COLOR_FORMAT, copy_src, "ColorTarget"),
            depth_value: Texture::render_target(
                device,
                resolution,
                DEPTH_VALUE_FORMAT,
                copy_src,
                "DepthValueTarget",
            ),
            depth: Texture::render_target(
                device,
                resolution,
                DEPTH_FORMAT,
                wgpu::TextureUsages::empty(),
                "DepthBuffer",
            ),
            capture: Texture::render_target(device, resolution, COLOR_FORMAT, sampled, "CaptureTarget"),
            capture_depth: Texture::render_target(
                device,
                resolution,
                DEPTH_FORMAT,
                wgpu::TextureUsages::empty(),
                "CaptureDepthBuffer",
            ),
            color_readback: Readback::new(device, resolution, 4, "ColorReadback"),
            depth_readback: Readback::new(device, resolution, 4, "DepthReadback"),
            bound: None,
            cull_face: false,
            front_face: Winding::default(),
            clip_plane: None,
        }
    }

    pub fn context(&self) -> &GpuContext {
        &self.context
    }

    /// Texture holding the last mirror capture.
    pub fn capture(&self) -> &Texture {
        &self.capture
    }

    /// Color format of the bound target.
    pub fn bound_format(&self) -> Option<wgpu::TextureFormat> {
        self.bound.as_ref().map(|bound| match bound.target {
            Target::Depth => DEPTH_VALUE_FORMAT,
            Target::Color | Target::Capture => COLOR_FORMAT,
        })
    }

    pub fn raster_state(&self) -> RasterState {
        if self.cull_face {
            RasterState::BackCull(self.front_face)
        } else {
            RasterState::NoCull
        }
    }

    /// Records one render pass into the bound target.
    ///
    /// A pending clear becomes the pass's load op.
    pub fn draw_pass(
        &mut self,
        label: &str,
        draw: impl FnOnce(&mut wgpu::RenderPass<'_>),
    ) -> Result<(), RenderError> {
        let Some(bound) = self.bound.as_mut() else {
            return Err(RenderError::Binding(format!(
                "draw '{label}' issued with no target bound"
            )));
        };

        let (color_view, depth_view) = match bound.target {
            Target::Color => (&self.color.view, &self.depth.view),
            Target::Depth => (&self.depth_value.view, &self.depth.view),
            Target::Capture => (&self.capture.view, &self.capture_depth.view),
        };

        let clear = std::mem::take(&mut bound.pending_clear);
        let color_load = if clear {
            // Zero doubles as the "no surface" depth value.
            wgpu::LoadOp::Clear(match bound.target {
                Target::Depth => wgpu::Color::TRANSPARENT,
                Target::Color | Target::Capture => wgpu::Color::BLACK,
            })
        } else {
            wgpu::LoadOp::Load
        };
        let depth_load = if clear {
            wgpu::LoadOp::Clear(1.0)
        } else {
            wgpu::LoadOp::Load
        };

        let mut pass = bound.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(label),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: color_view,
                resolve_target: None,
                depth_slice: None,
                ops: wgpu::Operations {
                    load: color_load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: depth_load,
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        if let Some(vp) = bound.viewport {
            pass.set_viewport(
                vp.x as f32,
                vp.y as f32,
                vp.width as f32,
                vp.height as f32,
                0.0,
                1.0,
            );
        }

        draw(&mut pass);
        Ok(())
    }

    fn ensure_unbound(&self, what: &str) -> Result<(), RenderError> {
        match &self.bound {
            Some(bound) => Err(RenderError::Binding(format!(
                "{what} while {:?} is bound",
                bound.target
            ))),
            None => Ok(()),
        }
    }

    /// Copies `source` into `readback` and returns the tightly packed rows.
    fn read_back(&self, source: &wgpu::Texture, readback: &Readback) -> Result<Vec<u8>, RenderError> {
        let device = &self.context.device;
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("ReadbackEncoder"),
        });

        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: source,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &readback.buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(readback.padded_bytes_per_row),
                    rows_per_image: Some(self.resolution.height),
                },
            },
            wgpu::Extent3d {
                width: self.resolution.width,
                height: self.resolution.height,
                depth_or_array_layers: 1,
            },
        );
        self.context.queue.submit(Some(encoder.finish()));

        let slice = readback.buffer.slice(..);
        let (sender, receiver) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        device
            .poll(wgpu::PollType::wait_indefinitely())
            .map_err(|e| RenderError::Gpu(format!("device poll failed: {e}")))?;
        receiver
            .recv()
            .map_err(|e| RenderError::Gpu(format!("readback callback dropped: {e}")))?
            .map_err(|e| RenderError::Gpu(format!("failed to map readback buffer: {e}")))?;

        let mut pixels =
            Vec::with_capacity((readback.unpadded_bytes_per_row * self.resolution.height) as usize);
        {
            let data = slice.get_mapped_range();
            for row in 0..self.resolution.height {
                let start = (row * readback.padded_bytes_per_row) as usize;
                let end = start + readback.unpadded_bytes_per_row as usize;
                pixels.extend_from_slice(&data[start..end]);
            }
        }
        readback.buffer.unmap();
        Ok(pixels)
    }

    fn check_size(&self, width: u32, height: u32) -> Result<(), RenderError> {
        if (width, height) != (self.resolution.width, self.resolution.height) {
            return Err(RenderError::Gpu(format!(
                "download buffer is {width}x{height}, targets are {}x{}",
                self.resolution.width, self.resolution.height
            )));
        }
        Ok(())
    }
}

impl Framebuffers for GpuFramebuffers {
    fn resolution(&self) -> Resolution {
        self.resolution
    }

    fn bind(&mut self, target: Target) -> Result<(), RenderError> {
        self.ensure_unbound(&format!("binding {target:?}"))?;
        let encoder = self
            .context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some(&format!("{target:?}Encoder")),
            });
        self.bound = Some(BoundTarget {
            target,
            encoder,
            viewport: None,
            pending_clear: false,
        });
        Ok(())
    }

    fn unbind(&mut self) -> Result<(), RenderError> {
        if self.bound.as_ref().is_some_and(|bound| bound.pending_clear) {
            self.draw_pass("ClearPass", |_| {})?;
        }
        let bound = self
            .bound
            .take()
            .ok_or_else(|| RenderError::Binding("unbind with no target bound".into()))?;
        self.context.queue.submit(Some(bound.encoder.finish()));
        Ok(())
    }

    fn bound(&self) -> Option<Target> {
        self.bound.as_ref().map(|bound| bound.target)
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        if let Some(bound) = self.bound.as_mut() {
            bound.viewport = Some(viewport);
        }
    }

    fn clear(&mut self) {
        if let Some(bound) = self.bound.as_mut() {
            bound.pending_clear = true;
        }
    }

    fn set_cull_face(&mut self, enabled: bool) {
        self.cull_face = enabled;
    }

    fn set_front_face(&mut self, winding: Winding) {
        self.front_face = winding;
    }

    fn front_face(&self) -> Winding {
        self.front_face
    }

    fn set_clip_plane(&mut self, plane: Option<DVec4>) {
        self.clip_plane = plane;
    }

    fn clip_plane(&self) -> Option<DVec4> {
        self.clip_plane
    }

    fn download_color(&mut self, out: &mut RgbImage) -> Result<(), RenderError> {
        self.ensure_unbound("downloading color")?;
        self.check_size(out.width(), out.height())?;
        let rgba = self.read_back(&self.color.texture, &self.color_readback)?;
        for (dst, src) in out.pixels_mut().zip(rgba.chunks_exact(4)) {
            dst.0 = [src[0], src[1], src[2]];
        }
        Ok(())
    }

    fn download_depth(&mut self, out: &mut DepthImage) -> Result<(), RenderError> {
        self.ensure_unbound("downloading depth")?;
        self.check_size(out.width(), out.height())?;
        let bytes = self.read_back(&self.depth_value.texture, &self.depth_readback)?;
        for (dst, src) in out.pixels_mut().zip(bytes.chunks_exact(4)) {
            dst.0[0] = f32::from_ne_bytes([src[0], src[1], src[2], src[3]]);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raster_state_indices_are_dense() {
        for (i, state) in RasterState::ALL.iter().enumerate() {
            assert_eq!(state.index(), i);
        }
    }

    #[test]
    fn raster_state_maps_to_wgpu() {
        let cw = RasterState::BackCull(Winding::Cw);
        assert_eq!(cw.cull_mode(), Some(wgpu::Face::Back));
        assert_eq!(cw.front_face(), wgpu::FrontFace::Cw);
        assert_eq!(RasterState::NoCull.cull_mode(), None);
    }
}
