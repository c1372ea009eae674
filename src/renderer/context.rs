use crate::error::RenderError;
use crate::settings::Resolution;

/// Headless device and queue shared by the framebuffers and renderers.
#[derive(Clone, Debug)]
pub struct GpuContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub adapter_info: wgpu::AdapterInfo,
}

impl GpuContext {
    /// Opens a device able to render `resolution` offscreen.
    ///
    /// Fails with [`RenderError::Capability`] before anything is allocated if
    /// the adapter is missing or lacks a required format or size.
    pub fn new(resolution: Resolution) -> Result<Self, RenderError> {
        pollster::block_on(Self::new_async(resolution))
    }

    pub async fn new_async(resolution: Resolution) -> Result<Self, RenderError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| RenderError::Capability(format!("no graphics adapter: {e}")))?;

        let adapter_info = adapter.get_info();
        log::info!("Using adapter: {:?}", adapter_info);
        log::info!("Using backend: {:?}", adapter_info.backend);

        check_capabilities(&adapter, resolution)?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_defaults()
                    .using_resolution(adapter.limits()),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .map_err(|e| RenderError::Capability(format!("failed to create device: {e}")))?;

        Ok(Self {
            device,
            queue,
            adapter_info,
        })
    }
}

fn check_capabilities(adapter: &wgpu::Adapter, resolution: Resolution) -> Result<(), RenderError> {
    let max = adapter.limits().max_texture_dimension_2d;
    if resolution.width > max || resolution.height > max {
        return Err(RenderError::Capability(format!(
            "output size {}x{} exceeds the adapter limit of {max}",
            resolution.width, resolution.height
        )));
    }

    for format in [
        wgpu::TextureFormat::Rgba8Unorm,
        wgpu::TextureFormat::R32Float,
        wgpu::TextureFormat::Depth24Plus,
    ] {
        let features = adapter.get_texture_format_features(format);
        if !features
            .allowed_usages
            .contains(wgpu::TextureUsages::RENDER_ATTACHMENT)
        {
            return Err(RenderError::Capability(format!(
                "{format:?} is not renderable on this adapter"
            )));
        }
    }
    Ok(())
}
