use std::path::{Path, PathBuf};

use crate::error::RenderError;

pub(crate) fn load_binary(path: &Path) -> Result<Vec<u8>, RenderError> {
    std::fs::read(path).map_err(|err| RenderError::io(path, err))
}

pub(crate) fn load_string(path: &Path) -> Result<String, RenderError> {
    std::fs::read_to_string(path).map_err(|err| RenderError::io(path, err))
}

/// Fails with a usage error when `path` does not exist.
pub fn require_exists(path: &Path, what: &str) -> Result<(), RenderError> {
    if path.exists() {
        Ok(())
    } else {
        Err(RenderError::Usage(format!("{what} {:?} does not exist", path)))
    }
}

/// Picks the atlas image inside `folder`.
///
/// `atlas.png` wins; otherwise the first png/jpg/jpeg in lexical order.
pub fn find_atlas_image(folder: &Path) -> Result<PathBuf, RenderError> {
    let preferred = folder.join("atlas.png");
    if preferred.is_file() {
        return Ok(preferred);
    }

    let entries = std::fs::read_dir(folder).map_err(|err| RenderError::io(folder, err))?;
    let mut candidates = Vec::new();
    for entry in entries {
        let path = entry.map_err(|err| RenderError::io(folder, err))?.path();
        let is_image = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| matches!(ext.to_ascii_lowercase().as_str(), "png" | "jpg" | "jpeg"))
            .unwrap_or(false);
        if is_image && path.is_file() {
            candidates.push(path);
        }
    }
    candidates.sort();

    candidates
        .into_iter()
        .next()
        .ok_or_else(|| RenderError::Usage(format!("no atlas image found in {:?}", folder)))
}
