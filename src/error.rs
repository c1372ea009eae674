use std::path::PathBuf;

/// Every failure the renderer can report.
///
/// Nothing is retried: a usage or capability error stops the run before any
/// rendering, anything later aborts the current frame.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// Bad command line input or a missing input path.
    #[error("{0}")]
    Usage(String),

    /// The graphics adapter cannot run this pipeline.
    #[error("graphics capability check failed: {0}")]
    Capability(String),

    /// Unbalanced bind/unbind, or a download while a target is bound.
    #[error("framebuffer binding error: {0}")]
    Binding(String),

    #[error("GPU error: {0}")]
    Gpu(String),

    #[error("failed to access {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to load mesh {path:?}: {reason}")]
    Mesh { path: PathBuf, reason: String },

    #[error("invalid mirror description: {0}")]
    Mirror(String),

    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

impl RenderError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        RenderError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn mesh(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        RenderError::Mesh {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Process exit status for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            RenderError::Usage(_) => 2,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_errors_exit_with_two() {
        assert_eq!(RenderError::Usage("missing mesh".into()).exit_code(), 2);
    }

    #[test]
    fn capability_errors_exit_with_one() {
        assert_eq!(RenderError::Capability("no adapter".into()).exit_code(), 1);
        assert_eq!(RenderError::Gpu("lost".into()).exit_code(), 1);
    }
}
