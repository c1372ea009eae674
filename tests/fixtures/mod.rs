//! Input files shared by the CLI and end-to-end tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

/// One triangle two units in front of an identity camera, clockwise on screen
/// so it survives back-face culling.
pub const TRIANGLE_PLY: &str = "ply
format ascii 1.0
element vertex 3
property float x
property float y
property float z
element face 1
property list uchar int vertex_indices
end_header
-1 -1 2
1 -1 2
0 1 2
3 0 1 2
";

pub struct Inputs {
    pub mesh: PathBuf,
    pub atlas_folder: PathBuf,
}

/// Writes the triangle mesh and a uniform gray atlas under `dir`.
pub fn write_inputs(dir: &Path) -> Inputs {
    let mesh = dir.join("triangle.ply");
    std::fs::write(&mesh, TRIANGLE_PLY).unwrap();

    let atlas_folder = dir.join("atlas");
    std::fs::create_dir_all(&atlas_folder).unwrap();
    image::RgbImage::from_pixel(4, 4, image::Rgb([128, 128, 128]))
        .save(atlas_folder.join("atlas.png"))
        .unwrap();

    Inputs { mesh, atlas_folder }
}

/// Small identity camera looking down +z, one frame.
pub fn write_settings(dir: &Path, output_dir: &Path) -> PathBuf {
    let path = dir.join("settings.json");
    let settings = serde_json::json!({
        "resolution": { "width": 64, "height": 48 },
        "intrinsics": { "fx": 32.0, "fy": 32.0, "cx": 32.0, "cy": 24.0, "near": 0.1, "far": 100.0 },
        "frame_count": 1,
        "look_at": { "eye": [0.0, 0.0, 0.0], "target": [0.0, 0.0, 1.0], "up": [0.0, -1.0, 0.0] },
        "output_dir": output_dir,
    });
    std::fs::write(&path, settings.to_string()).unwrap();
    path
}
