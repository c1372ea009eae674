pub mod context;
pub mod mesh;
pub mod mirror;
pub mod pipeline_builder;
pub mod targets;
pub mod texture;
pub mod uniforms;
pub mod vertex;

pub use context::GpuContext;
pub use mesh::MeshRenderer;
pub use mirror::{GpuMirrorRenderer, MirrorResources};
pub use pipeline_builder::PipelineBuilder;
pub use targets::{GpuFramebuffers, RasterState};
pub use texture::Texture;
pub use uniforms::{MeshUniform, MirrorUniform};
pub use vertex::Vertex;
