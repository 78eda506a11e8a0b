use thiserror::Error;

use crate::detection::domain::detection_cache::DetectionCache;
use crate::detection::domain::frame_detections::FrameDetections;
use crate::detection::domain::tracking_model::TrackingModel;
use crate::shared::bounding_box::BoundingBox;
use crate::shared::constants::PERSON_LABEL;
use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum DetectionError {
    /// The model retained a person box but assigned no track identity.
    /// Substituting a synthetic id would silently break player selection,
    /// so this is fatal.
    #[error("person detection at ({x1:.1}, {y1:.1})-({x2:.1}, {y2:.1}) in frame {frame} has no track identity")]
    MissingTrackIdentity {
        frame: usize,
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
    },
}

impl DetectionError {
    fn missing_identity(frame: usize, bbox: &BoundingBox) -> Self {
        DetectionError::MissingTrackIdentity {
            frame,
            x1: bbox.x1,
            y1: bbox.y1,
            x2: bbox.x2,
            y2: bbox.y2,
        }
    }
}

/// Detects people frame-by-frame through an owned tracking model.
///
/// The detector holds exclusive ownership of one loaded model for its
/// lifetime; the model's internal identity memory is what keeps a player's
/// track id stable across the clip.
pub struct PlayerDetector {
    model: Box<dyn TrackingModel>,
}

impl PlayerDetector {
    pub fn new(model: Box<dyn TrackingModel>) -> Self {
        Self { model }
    }

    /// Runs the model on one frame and keeps only "person" detections.
    ///
    /// A frame with no people yields an empty set, not an error. A person
    /// box without a track identity raises [`DetectionError`].
    pub fn detect_frame(
        &mut self,
        frame: &Frame,
    ) -> Result<FrameDetections, Box<dyn std::error::Error>> {
        let boxes = self.model.track(frame)?;

        let mut detections = FrameDetections::new();
        for tracked in boxes {
            if tracked.label != PERSON_LABEL {
                continue;
            }
            let id = tracked
                .track_id
                .ok_or_else(|| DetectionError::missing_identity(frame.index(), &tracked.bbox))?;
            detections.insert(id, tracked.bbox);
        }
        Ok(detections)
    }

    /// Runs detection over a whole clip, with optional disk memoization.
    ///
    /// With `read_from_cache` set and a cache supplied, the stored sequence is
    /// returned verbatim and the model is never invoked; a missing or corrupt
    /// cache is a fatal [`CacheError`](crate::detection::domain::detection_cache::CacheError).
    /// Otherwise every frame is processed in input order, and if a cache is
    /// supplied the fresh result is persisted (overwriting) before returning.
    pub fn detect_frames(
        &mut self,
        frames: &[Frame],
        cache: Option<&dyn DetectionCache>,
        read_from_cache: bool,
    ) -> Result<Vec<FrameDetections>, Box<dyn std::error::Error>> {
        if read_from_cache {
            if let Some(cache) = cache {
                return Ok(cache.load()?);
            }
        }

        let mut sequence = Vec::with_capacity(frames.len());
        for frame in frames {
            let detections = self.detect_frame(frame)?;
            log::debug!(
                "frame {}: {} person detection(s)",
                frame.index(),
                detections.len()
            );
            sequence.push(detections);
        }

        if let Some(cache) = cache {
            cache.save(&sequence)?;
        }
        Ok(sequence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::detection_cache::CacheError;
    use crate::detection::domain::tracking_model::TrackedBox;
    use crate::detection::infrastructure::json_detection_cache::JsonDetectionCache;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn bbox(x1: f64, y1: f64) -> BoundingBox {
        BoundingBox::new(x1, y1, x1 + 10.0, y1 + 20.0)
    }

    fn person(id: u32, x1: f64, y1: f64) -> TrackedBox {
        TrackedBox {
            label: "person".to_string(),
            bbox: bbox(x1, y1),
            track_id: Some(id),
        }
    }

    /// Model stub replaying canned boxes per frame index and counting calls.
    struct ScriptedModel {
        boxes: HashMap<usize, Vec<TrackedBox>>,
        calls: Arc<AtomicUsize>,
    }

    impl ScriptedModel {
        fn new(boxes: HashMap<usize, Vec<TrackedBox>>) -> Self {
            Self {
                boxes,
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl TrackingModel for ScriptedModel {
        fn track(&mut self, frame: &Frame) -> Result<Vec<TrackedBox>, Box<dyn std::error::Error>> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            Ok(self.boxes.get(&frame.index()).cloned().unwrap_or_default())
        }
    }

    fn frame(index: usize) -> Frame {
        Frame::new(vec![0u8; 16 * 16 * 3], 16, 16, 3, index)
    }

    fn frames(count: usize) -> Vec<Frame> {
        (0..count).map(frame).collect()
    }

    #[test]
    fn test_detect_frame_keeps_only_persons() {
        let scripted = HashMap::from([(
            0,
            vec![
                person(1, 0.0, 0.0),
                TrackedBox {
                    label: "sports ball".to_string(),
                    bbox: bbox(40.0, 40.0),
                    track_id: Some(9),
                },
                person(2, 80.0, 80.0),
            ],
        )]);
        let mut detector = PlayerDetector::new(Box::new(ScriptedModel::new(scripted)));

        let detections = detector.detect_frame(&frame(0)).unwrap();
        assert_eq!(detections.ids().collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn test_detect_frame_without_people_is_empty() {
        let mut detector = PlayerDetector::new(Box::new(ScriptedModel::new(HashMap::new())));
        let detections = detector.detect_frame(&frame(0)).unwrap();
        assert!(detections.is_empty());
    }

    #[test]
    fn test_detect_frame_missing_identity_is_fatal() {
        let scripted = HashMap::from([(
            0,
            vec![TrackedBox {
                label: "person".to_string(),
                bbox: bbox(5.0, 5.0),
                track_id: None,
            }],
        )]);
        let mut detector = PlayerDetector::new(Box::new(ScriptedModel::new(scripted)));

        let err = detector.detect_frame(&frame(0)).unwrap_err();
        let detection_err = err.downcast_ref::<DetectionError>().unwrap();
        assert!(matches!(
            detection_err,
            DetectionError::MissingTrackIdentity { frame: 0, .. }
        ));
    }

    #[test]
    fn test_detect_frames_yields_one_set_per_frame_in_order() {
        let scripted = HashMap::from([
            (0, vec![person(1, 0.0, 0.0)]),
            (2, vec![person(1, 4.0, 0.0), person(2, 90.0, 0.0)]),
        ]);
        let mut detector = PlayerDetector::new(Box::new(ScriptedModel::new(scripted)));

        let sequence = detector.detect_frames(&frames(4), None, false).unwrap();
        assert_eq!(sequence.len(), 4);
        assert_eq!(sequence[0].len(), 1);
        assert!(sequence[1].is_empty());
        assert_eq!(sequence[2].len(), 2);
        assert!(sequence[3].is_empty());
    }

    #[test]
    fn test_detect_frames_persists_to_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache = JsonDetectionCache::new(dir.path().join("detections.json"));
        let scripted = HashMap::from([(0, vec![person(1, 0.0, 0.0)])]);
        let mut detector = PlayerDetector::new(Box::new(ScriptedModel::new(scripted)));

        let sequence = detector
            .detect_frames(&frames(2), Some(&cache), false)
            .unwrap();

        assert_eq!(cache.load().unwrap(), sequence);
    }

    #[test]
    fn test_detect_frames_reads_cache_without_inference() {
        let dir = tempfile::tempdir().unwrap();
        let cache = JsonDetectionCache::new(dir.path().join("detections.json"));
        let stored = vec![
            [(4, bbox(1.0, 2.0))].into_iter().collect(),
            FrameDetections::new(),
        ];
        cache.save(&stored).unwrap();

        let model = ScriptedModel::new(HashMap::new());
        let calls = model.calls.clone();
        let mut detector = PlayerDetector::new(Box::new(model));

        let sequence = detector
            .detect_frames(&frames(2), Some(&cache), true)
            .unwrap();
        assert_eq!(sequence, stored);
        assert_eq!(calls.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_read_from_missing_cache_is_fatal_and_runs_no_inference() {
        let dir = tempfile::tempdir().unwrap();
        let cache = JsonDetectionCache::new(dir.path().join("absent.json"));
        let model = ScriptedModel::new(HashMap::new());
        let calls = model.calls.clone();
        let mut detector = PlayerDetector::new(Box::new(model));

        let err = detector
            .detect_frames(&frames(3), Some(&cache), true)
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CacheError>(),
            Some(CacheError::NotFound(_))
        ));
        assert_eq!(calls.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_read_flag_without_cache_recomputes() {
        let model = ScriptedModel::new(HashMap::new());
        let calls = model.calls.clone();
        let mut detector = PlayerDetector::new(Box::new(model));

        let sequence = detector.detect_frames(&frames(3), None, true).unwrap();
        assert_eq!(sequence.len(), 3);
        assert_eq!(calls.load(Ordering::Relaxed), 3);
    }
}
