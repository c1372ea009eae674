// scene/mod.rs

pub mod camera;
pub mod mirror;
pub mod transform;

pub use camera::{look_at_rdf, projection_rdf, CameraPoseController, RenderCamera};
pub use mirror::{load_mirrors, parse_mirrors, MirrorSurface, PlaneBasis};
pub use transform::{reflection_matrix, RigidStep};
