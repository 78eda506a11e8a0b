use std::path::Path;

use crate::annotation::player_annotator::PlayerAnnotator;
use crate::detection::domain::detection_cache::DetectionCache;
use crate::detection::domain::player_detector::PlayerDetector;
use crate::detection::domain::player_selection::{restrict_to_players, select_players};
use crate::shared::court_keypoints::CourtKeypoints;
use crate::shared::frame::Frame;
use crate::video::domain::video_reader::VideoReader;
use crate::video::domain::video_writer::VideoWriter;

use super::pipeline_logger::PipelineLogger;

/// Orchestrates the whole run: decode, detect (optionally memoized), select
/// the two court players, annotate, encode.
///
/// Strictly sequential — the tracking model's identity memory requires frames
/// in temporal order on a single stream. Single-use: `execute` consumes the
/// owned components, so a second call fails.
pub struct TrackPlayersUseCase {
    reader: Option<Box<dyn VideoReader>>,
    writer: Option<Box<dyn VideoWriter>>,
    detector: Option<PlayerDetector>,
    annotator: Option<PlayerAnnotator>,
    cache: Option<Box<dyn DetectionCache>>,
    read_from_cache: bool,
    keypoints: CourtKeypoints,
    logger: Box<dyn PipelineLogger>,
}

impl TrackPlayersUseCase {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        reader: Box<dyn VideoReader>,
        writer: Box<dyn VideoWriter>,
        detector: PlayerDetector,
        annotator: PlayerAnnotator,
        keypoints: CourtKeypoints,
        cache: Option<Box<dyn DetectionCache>>,
        read_from_cache: bool,
        logger: Box<dyn PipelineLogger>,
    ) -> Self {
        Self {
            reader: Some(reader),
            writer: Some(writer),
            detector: Some(detector),
            annotator: Some(annotator),
            cache,
            read_from_cache,
            keypoints,
            logger,
        }
    }

    pub fn execute(
        &mut self,
        input: &Path,
        output: &Path,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let mut reader = self.reader.take().ok_or("pipeline already executed")?;
        let mut writer = self.writer.take().ok_or("pipeline already executed")?;
        let mut detector = self.detector.take().ok_or("pipeline already executed")?;
        let annotator = self.annotator.take().ok_or("pipeline already executed")?;

        let metadata = reader.open(input)?;
        let mut frames: Vec<Frame> = reader
            .frames()
            .collect::<Result<_, Box<dyn std::error::Error>>>()?;
        reader.close();
        self.logger
            .info(&format!("decoded {} frames from {}", frames.len(), input.display()));

        let detections =
            detector.detect_frames(&frames, self.cache.as_deref(), self.read_from_cache)?;

        let chosen = detections
            .first()
            .map(|first| select_players(&self.keypoints, first))
            .unwrap_or_default();
        self.logger
            .info(&format!("court players (closest first): {chosen:?}"));
        let filtered = restrict_to_players(&detections, &chosen);

        annotator.annotate_sequence(&mut frames, &filtered)?;

        writer.open(output, &metadata)?;
        let total = frames.len();
        for (i, frame) in frames.iter().enumerate() {
            writer.write(frame)?;
            self.logger.progress(i + 1, total);
        }
        writer.close()?;

        self.logger.summary();
        Ok(())
    }
}
