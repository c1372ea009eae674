pub mod cache;
pub mod handle;
pub mod mesh;
pub mod ply;

pub use cache::AssetCache;
pub use handle::Handle;
pub use mesh::{AtlasLayout, Mesh, MeshData};
pub use ply::{parse_ply, read_ply, PlyError, PlyMesh};
