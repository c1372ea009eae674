use std::path::PathBuf;

use argh::FromArgs;

use crate::error::RenderError;
use crate::io::require_exists;

/// Renders a stereo RGB and depth sequence of a textured mesh, with planar
/// mirror reflections composited into the color frames
#[derive(Debug, FromArgs)]
pub struct Cli {
    /// PLY mesh of the scene
    #[argh(positional)]
    pub mesh_file: PathBuf,

    /// folder holding the texture atlas image
    #[argh(positional)]
    pub atlas_folder: PathBuf,

    /// JSON list of mirror surfaces
    #[argh(positional)]
    pub mirror_file: Option<PathBuf>,

    /// JSON render settings
    #[argh(option, short = 's')]
    pub settings: Option<PathBuf>,

    /// directory the frames are written to
    #[argh(option, short = 'o')]
    pub output_dir: Option<PathBuf>,
}

impl Cli {
    /// Checks every input path before any GPU work starts.
    pub fn validate_paths(&self) -> Result<(), RenderError> {
        require_exists(&self.mesh_file, "mesh file")?;
        require_exists(&self.atlas_folder, "atlas folder")?;
        if !self.atlas_folder.is_dir() {
            return Err(RenderError::Usage(format!(
                "atlas folder {:?} is not a directory",
                self.atlas_folder
            )));
        }
        if let Some(mirror_file) = &self.mirror_file {
            require_exists(mirror_file, "mirror file")?;
        }
        if let Some(settings) = &self.settings {
            require_exists(settings, "settings file")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, argh::EarlyExit> {
        Cli::from_args(&["render"], args)
    }

    #[test]
    fn parses_positionals_and_options() {
        let cli = parse(&["scene.ply", "atlas", "mirrors.json", "--output-dir", "out"]).unwrap();
        assert_eq!(cli.mesh_file, PathBuf::from("scene.ply"));
        assert_eq!(cli.atlas_folder, PathBuf::from("atlas"));
        assert_eq!(cli.mirror_file, Some(PathBuf::from("mirrors.json")));
        assert_eq!(cli.output_dir, Some(PathBuf::from("out")));
        assert_eq!(cli.settings, None);
    }

    #[test]
    fn mirror_file_is_optional() {
        let cli = parse(&["scene.ply", "atlas"]).unwrap();
        assert_eq!(cli.mirror_file, None);
    }

    #[test]
    fn rejects_wrong_positional_counts() {
        assert!(parse(&["scene.ply"]).is_err());
        assert!(parse(&["a", "b", "c", "d"]).is_err());
    }

    #[test]
    fn missing_inputs_are_usage_errors() {
        let dir = tempfile::tempdir().unwrap();
        let mesh = dir.path().join("scene.ply");
        std::fs::write(&mesh, "ply").unwrap();

        let cli = parse(&[
            mesh.to_str().unwrap(),
            dir.path().join("no-atlas").to_str().unwrap(),
        ])
        .unwrap();
        let err = cli.validate_paths().unwrap_err();
        assert_eq!(err.exit_code(), 2);

        let cli = parse(&[
            mesh.to_str().unwrap(),
            dir.path().to_str().unwrap(),
            dir.path().join("mirrors.json").to_str().unwrap(),
        ])
        .unwrap();
        assert!(matches!(cli.validate_paths(), Err(RenderError::Usage(_))));

        let cli = parse(&[mesh.to_str().unwrap(), dir.path().to_str().unwrap()]).unwrap();
        assert!(cli.validate_paths().is_ok());
    }
}
