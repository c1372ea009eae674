pub mod asset;
pub mod cli;
pub mod error;
pub mod io;
pub mod pipeline;
pub mod renderer;
pub mod scene;
pub mod settings;

use asset::MeshData;
use cli::Cli;
use error::RenderError;
use pipeline::{FrameOrchestrator, OutputWriter};
use renderer::{GpuContext, GpuFramebuffers, GpuMirrorRenderer, MeshRenderer, Texture};
use scene::{load_mirrors, MirrorSurface};
use settings::RenderSettings;

pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}

/// Loads the inputs, opens a headless device and renders every frame.
pub fn run(cli: &Cli) -> Result<(), RenderError> {
    cli.validate_paths()?;

    let mut settings = match &cli.settings {
        Some(path) => RenderSettings::load_from_path(path)?,
        None => RenderSettings::default(),
    };
    if let Some(dir) = &cli.output_dir {
        settings.output_dir = dir.clone();
    }

    // Argument checks: everything here is a usage error.
    let atlas_path = io::find_atlas_image(&cli.atlas_folder)?;
    let mirrors = match &cli.mirror_file {
        Some(path) => load_mirror_file(path)?,
        None => Vec::new(),
    };

    // Capability failures surface before any asset is loaded.
    let context = GpuContext::new(settings.resolution)?;
    let mesh = MeshData::load(&cli.mesh_file)?;
    let framebuffers = GpuFramebuffers::new(&context, settings.resolution);
    let atlas = Texture::from_path(&context.device, &context.queue, &atlas_path)?;
    let scene = MeshRenderer::new(&context, &mesh, atlas);
    let mirror_renderer =
        GpuMirrorRenderer::new(&context, &framebuffers, &mirrors, settings.mask_size);
    let output = OutputWriter::new(&settings.output_dir)?;

    log::info!(
        "Rendering {} frames at {}x{} into {:?}",
        settings.frame_count,
        settings.resolution.width,
        settings.resolution.height,
        settings.output_dir
    );

    FrameOrchestrator::new(framebuffers, scene, mirror_renderer, mirrors, &settings, output).run()
}

/// A mirror file that cannot be read or parsed is bad input, not a render
/// failure.
fn load_mirror_file(path: &std::path::Path) -> Result<Vec<MirrorSurface>, RenderError> {
    load_mirrors(path).map_err(|err| match err {
        RenderError::Usage(_) => err,
        other => RenderError::Usage(format!("mirror file {:?}: {other}", path)),
    })
}
