use std::path::PathBuf;

use thiserror::Error;

/// Failures surfaced by the material patcher.
#[derive(Debug, Error)]
pub enum PatchError {
    /// Conflicting or missing command line arguments. Raised before any file I/O.
    #[error("{0}")]
    Usage(String),
    #[error("I/O error for {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("glTF error: {0}")]
    Gltf(#[from] gltf::Error),
    #[error("invalid glTF document: {0}")]
    InvalidDocument(String),
}

impl PatchError {
    pub fn usage<T: Into<String>>(msg: T) -> Self {
        PatchError::Usage(msg.into())
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PatchError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn is_usage(&self) -> bool {
        matches!(self, PatchError::Usage(_))
    }
}

/// Failures surfaced by the generated-file mirror.
#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("I/O error for {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse site config {}: {source}", .path.display())]
    Config {
        path: PathBuf,
        source: serde_yaml::Error,
    },
}

impl MirrorError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        MirrorError::Io {
            path: path.into(),
            source,
        }
    }
}
