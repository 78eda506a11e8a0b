use std::path::PathBuf;

use thiserror::Error;

use crate::detection::domain::frame_detections::FrameDetections;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("detection cache not found at {0}")]
    NotFound(PathBuf),
    #[error("failed to read detection cache at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("detection cache at {path} is not parsable: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to serialize detections: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("failed to write detection cache to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Durable storage for a computed detection sequence.
///
/// The storage format is an implementation detail behind this interface; the
/// only contract is that `load` returns exactly what `save` was given. A
/// failed `load` is fatal to the caller — there is deliberately no fallback
/// to recomputation.
pub trait DetectionCache: Send {
    fn load(&self) -> Result<Vec<FrameDetections>, CacheError>;

    /// Persists the sequence wholesale, overwriting any previous content.
    fn save(&self, detections: &[FrameDetections]) -> Result<(), CacheError>;
}
