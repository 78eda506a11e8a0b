/// Class label the detection model must report for a box to count as a player
/// candidate.
pub const PERSON_LABEL: &str = "person";

pub const DETECT_MODEL_NAME: &str = "yolov8n.onnx";
pub const DETECT_MODEL_URL: &str =
    "https://github.com/courtvision-video/courtvision/releases/download/v0.1.0/yolov8n.onnx";

pub const LABEL_FONT_NAME: &str = "DejaVuSans.ttf";
pub const LABEL_FONT_URL: &str =
    "https://github.com/courtvision-video/courtvision/releases/download/v0.1.0/DejaVuSans.ttf";

/// Max frames a track survives unmatched before removal (~1 second at 30 fps).
pub const TRACKER_MAX_LOST: usize = 30;

/// Default confidence floor for person detections.
pub const DEFAULT_CONFIDENCE: f64 = 0.25;

/// Players kept by court-proximity selection.
pub const PLAYERS_PER_MATCH: usize = 2;
