use crate::detection::domain::frame_detections::TrackId;
use crate::shared::bounding_box::BoundingBox;

/// Minimum IoU for a detection to continue an existing track.
const MATCH_THRESHOLD: f64 = 0.3;

struct TrackState {
    id: TrackId,
    bbox: BoundingBox,
    frames_lost: usize,
}

/// Greedy IoU association tracker.
///
/// Per frame: all (track, detection) pairs above the match threshold are
/// ranked by IoU and claimed greedily; unmatched detections open new tracks;
/// unmatched tracks age and are dropped after `max_lost` frames. A lost track
/// keeps its last box, so a person who is briefly occluded re-acquires their
/// old identity when they reappear nearby.
pub struct IouTracker {
    tracks: Vec<TrackState>,
    next_id: TrackId,
    max_lost: usize,
}

impl IouTracker {
    pub fn new(max_lost: usize) -> Self {
        Self {
            tracks: Vec::new(),
            next_id: 1,
            max_lost,
        }
    }

    /// Associates this frame's detections with tracks.
    ///
    /// Returns one `(track_id, bbox)` per input detection, in input order —
    /// every detection gets an identity, newly minted if nothing matched.
    pub fn update(&mut self, detections: &[BoundingBox]) -> Vec<(TrackId, BoundingBox)> {
        let mut candidates: Vec<(f64, usize, usize)> = Vec::new();
        for (ti, track) in self.tracks.iter().enumerate() {
            for (di, det) in detections.iter().enumerate() {
                let iou = track.bbox.iou(det);
                if iou >= MATCH_THRESHOLD {
                    candidates.push((iou, ti, di));
                }
            }
        }
        candidates.sort_by(|a, b| b.0.total_cmp(&a.0));

        let mut track_taken = vec![false; self.tracks.len()];
        let mut det_assignment: Vec<Option<usize>> = vec![None; detections.len()];
        for (_, ti, di) in candidates {
            if track_taken[ti] || det_assignment[di].is_some() {
                continue;
            }
            track_taken[ti] = true;
            det_assignment[di] = Some(ti);
        }

        // Refresh matched tracks, age the rest.
        for (ti, track) in self.tracks.iter_mut().enumerate() {
            if track_taken[ti] {
                track.frames_lost = 0;
            } else {
                track.frames_lost += 1;
            }
        }
        for (di, assignment) in det_assignment.iter().enumerate() {
            if let Some(ti) = assignment {
                self.tracks[*ti].bbox = detections[di];
            }
        }

        let mut output = Vec::with_capacity(detections.len());
        for (di, det) in detections.iter().enumerate() {
            let id = match det_assignment[di] {
                Some(ti) => self.tracks[ti].id,
                None => {
                    let id = self.next_id;
                    self.next_id += 1;
                    self.tracks.push(TrackState {
                        id,
                        bbox: *det,
                        frames_lost: 0,
                    });
                    id
                }
            };
            output.push((id, *det));
        }

        let max_lost = self.max_lost;
        self.tracks.retain(|t| t.frames_lost <= max_lost);

        output
    }
}
