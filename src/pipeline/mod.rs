pub mod backend;
pub mod compositor;
pub mod orchestrator;
pub mod output;
pub mod quantize;

pub use backend::{
    DepthImage, Framebuffers, MirrorRenderer, SceneRenderer, Target, Viewport, Winding,
};
pub use compositor::MirrorCompositor;
pub use orchestrator::{FrameOrchestrator, FramePhase};
pub use output::{Eye, OutputWriter};
pub use quantize::{quantize_depth, quantize_depth_image, Depth16Image};
