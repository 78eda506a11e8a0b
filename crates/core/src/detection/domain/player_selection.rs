use crate::detection::domain::frame_detections::{FrameDetections, TrackId};
use crate::shared::constants::PLAYERS_PER_MATCH;
use crate::shared::court_keypoints::CourtKeypoints;

/// Picks the track identities whose box centers sit closest to the court.
///
/// Each candidate is scored by its minimum distance to any court landmark;
/// candidates are stable-sorted ascending by score, so equal scores keep the
/// detection set's insertion order. Returns up to two ids, closest first —
/// fewer when fewer people were detected.
pub fn select_players(keypoints: &CourtKeypoints, detections: &FrameDetections) -> Vec<TrackId> {
    let mut scored: Vec<(TrackId, f64)> = detections
        .iter()
        .map(|(id, bbox)| (id, keypoints.nearest_distance(bbox.center())))
        .collect();
    scored.sort_by(|a, b| a.1.total_cmp(&b.1));
    scored
        .into_iter()
        .take(PLAYERS_PER_MATCH)
        .map(|(id, _)| id)
        .collect()
}

/// Reduces every frame of the sequence to the chosen identities.
///
/// Frames where a chosen id is absent simply omit it; no identity is ever
/// introduced that the frame did not already contain.
pub fn restrict_to_players(
    sequence: &[FrameDetections],
    chosen: &[TrackId],
) -> Vec<FrameDetections> {
    sequence.iter().map(|d| d.restricted_to(chosen)).collect()
}

/// Full sequence-level selection: choose from the **first** frame only, then
/// apply that choice uniformly to the whole clip. An empty sequence selects
/// nobody and yields an empty sequence.
pub fn select_and_restrict(
    keypoints: &CourtKeypoints,
    sequence: &[FrameDetections],
) -> Vec<FrameDetections> {
    let chosen = match sequence.first() {
        Some(first) => select_players(keypoints, first),
        None => return Vec::new(),
    };
    restrict_to_players(sequence, &chosen)
}
