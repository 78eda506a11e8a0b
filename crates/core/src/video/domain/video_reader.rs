use std::path::Path;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;

/// Source of decoded frames.
///
/// Codec and container details stay behind this boundary; the pipeline only
/// ever sees [`Frame`]s in decode order with sequential indices.
pub trait VideoReader: Send {
    /// Opens the source and reports its metadata.
    fn open(&mut self, path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>>;

    /// Frames in decode order. Call after a successful `open`.
    fn frames(
        &mut self,
    ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_>;

    /// Releases decoder resources. Safe to call repeatedly.
    fn close(&mut self);
}
