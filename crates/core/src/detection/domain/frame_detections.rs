use serde::{Deserialize, Serialize};

use crate::shared::bounding_box::BoundingBox;

/// Persistent identity label assigned by the tracking model. Stable across
/// frames for the same physical person.
pub type TrackId = u32;

/// The person detections of one frame: an ordered association from unique
/// track identity to bounding box.
///
/// This is deliberately a list of pairs rather than a hash map: iteration
/// order is the model's output order, and that order is the documented
/// tie-break when two players score equally in court-proximity selection.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrameDetections {
    entries: Vec<(TrackId, BoundingBox)>,
}

impl FrameDetections {
    pub fn new() -> Self {
        Self::default()
    }

    /// Associates `id` with `bbox`. A repeated id replaces its box in place,
    /// keeping the original position, so identities stay unique per frame.
    pub fn insert(&mut self, id: TrackId, bbox: BoundingBox) {
        match self.entries.iter_mut().find(|(tid, _)| *tid == id) {
            Some(entry) => entry.1 = bbox,
            None => self.entries.push((id, bbox)),
        }
    }

    pub fn get(&self, id: TrackId) -> Option<&BoundingBox> {
        self.entries
            .iter()
            .find(|(tid, _)| *tid == id)
            .map(|(_, bbox)| bbox)
    }

    pub fn contains(&self, id: TrackId) -> bool {
        self.get(id).is_some()
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (TrackId, &BoundingBox)> {
        self.entries.iter().map(|(id, bbox)| (*id, bbox))
    }

    pub fn ids(&self) -> impl Iterator<Item = TrackId> + '_ {
        self.entries.iter().map(|(id, _)| *id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// A copy reduced to the given identities, preserving entry order.
    /// Identities absent from this frame are simply not represented.
    pub fn restricted_to(&self, ids: &[TrackId]) -> FrameDetections {
        FrameDetections {
            entries: self
                .entries
                .iter()
                .filter(|(id, _)| ids.contains(id))
                .cloned()
                .collect(),
        }
    }
}

impl FromIterator<(TrackId, BoundingBox)> for FrameDetections {
    fn from_iter<I: IntoIterator<Item = (TrackId, BoundingBox)>>(iter: I) -> Self {
        let mut detections = FrameDetections::new();
        for (id, bbox) in iter {
            detections.insert(id, bbox);
        }
        detections
    }
}
