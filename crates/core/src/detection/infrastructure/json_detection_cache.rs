use std::fs;
use std::path::PathBuf;

use crate::detection::domain::detection_cache::{CacheError, DetectionCache};
use crate::detection::domain::frame_detections::FrameDetections;

/// File-backed detection cache serialized as JSON.
///
/// One file holds the whole sequence; writes go through a staging file and
/// rename so a crash mid-save cannot leave a half-written cache that a later
/// `load` would reject.
pub struct JsonDetectionCache {
    path: PathBuf,
}

impl JsonDetectionCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl DetectionCache for JsonDetectionCache {
    fn load(&self) -> Result<Vec<FrameDetections>, CacheError> {
        if !self.path.exists() {
            return Err(CacheError::NotFound(self.path.clone()));
        }
        let contents = fs::read_to_string(&self.path).map_err(|e| CacheError::Read {
            path: self.path.clone(),
            source: e,
        })?;
        serde_json::from_str(&contents).map_err(|e| CacheError::Parse {
            path: self.path.clone(),
            source: e,
        })
    }

    fn save(&self, detections: &[FrameDetections]) -> Result<(), CacheError> {
        let json = serde_json::to_vec(detections).map_err(CacheError::Serialize)?;

        let staged = self.path.with_extension("part");
        let write_err = |path: &PathBuf, e: std::io::Error| CacheError::Write {
            path: path.clone(),
            source: e,
        };
        fs::write(&staged, json).map_err(|e| write_err(&staged, e))?;
        fs::rename(&staged, &self.path).map_err(|e| write_err(&self.path, e))
    }
}
