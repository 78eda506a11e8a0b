use crate::detection::domain::frame_detections::TrackId;
use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

/// One raw detection from the tracking model, before any class filtering.
#[derive(Clone, Debug, PartialEq)]
pub struct TrackedBox {
    /// Class label as reported by the model (e.g. "person").
    pub label: String,
    pub bbox: BoundingBox,
    /// Persistent identity. `None` means the model failed to associate the
    /// box with a track; downstream treats that as a hard error.
    pub track_id: Option<TrackId>,
}

/// Boundary to the pre-trained detection-and-tracking model.
///
/// Implementations are stateful: identity persistence lives inside the model,
/// so callers must feed frames one at a time, in temporal order, on a single
/// logical stream. Out-of-order or interleaved calls corrupt identity
/// continuity.
pub trait TrackingModel: Send {
    fn track(&mut self, frame: &Frame) -> Result<Vec<TrackedBox>, Box<dyn std::error::Error>>;
}
