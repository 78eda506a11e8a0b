use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use ab_glyph::FontVec;
use clap::Parser;

use courtvision_core::annotation::player_annotator::PlayerAnnotator;
use courtvision_core::detection::domain::detection_cache::DetectionCache;
use courtvision_core::detection::domain::player_detector::PlayerDetector;
use courtvision_core::detection::infrastructure::iou_tracker::IouTracker;
use courtvision_core::detection::infrastructure::json_detection_cache::JsonDetectionCache;
use courtvision_core::detection::infrastructure::onnx_person_model::OnnxPersonModel;
use courtvision_core::pipeline::pipeline_logger::StdoutPipelineLogger;
use courtvision_core::pipeline::track_players_use_case::TrackPlayersUseCase;
use courtvision_core::shared::asset_resolver::{resolve_asset, ProgressFn};
use courtvision_core::shared::constants::{
    DEFAULT_CONFIDENCE, DETECT_MODEL_NAME, DETECT_MODEL_URL, LABEL_FONT_NAME, LABEL_FONT_URL,
    TRACKER_MAX_LOST,
};
use courtvision_core::shared::court_keypoints::CourtKeypoints;
use courtvision_core::video::infrastructure::ffmpeg_reader::FfmpegReader;
use courtvision_core::video::infrastructure::ffmpeg_writer::FfmpegWriter;

/// Detect and track the two court players in a match video.
#[derive(Parser)]
#[command(name = "courtvision")]
struct Cli {
    /// Input match video.
    input: PathBuf,

    /// Output video with player overlays.
    output: PathBuf,

    /// JSON file with court landmark coordinates as a flat [x0, y0, x1, y1, ...] array.
    #[arg(long)]
    keypoints: PathBuf,

    /// Path to the detection ONNX model (downloaded on first use when omitted).
    #[arg(long)]
    model: Option<PathBuf>,

    /// Where to persist (or replay) computed detections.
    #[arg(long)]
    cache: Option<PathBuf>,

    /// Replay detections from --cache instead of running the model.
    #[arg(long)]
    read_from_cache: bool,

    /// Person detection confidence threshold (0.0-1.0).
    #[arg(long, default_value_t = DEFAULT_CONFIDENCE)]
    confidence: f64,

    /// Frames a lost track survives before its identity is retired.
    #[arg(long, default_value_t = TRACKER_MAX_LOST)]
    max_lost: usize,

    /// Draw plain boxes without "Player N" captions.
    #[arg(long)]
    no_labels: bool,

    /// Print progress every N frames.
    #[arg(long, default_value = "25")]
    progress_every: usize,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if !(0.0..=1.0).contains(&cli.confidence) {
        return Err(format!("--confidence must be within 0.0-1.0, got {}", cli.confidence).into());
    }
    if cli.read_from_cache && cli.cache.is_none() {
        log::warn!("--read-from-cache has no effect without --cache; detections will be computed");
    }

    let keypoints = load_keypoints(&cli.keypoints)?;

    let model_path = match cli.model {
        Some(path) => path,
        None => resolve_asset(
            DETECT_MODEL_NAME,
            DETECT_MODEL_URL,
            None,
            download_progress("detection model"),
        )?,
    };
    let font = if cli.no_labels {
        None
    } else {
        Some(load_label_font()?)
    };

    let tracker = IouTracker::new(cli.max_lost);
    let model = OnnxPersonModel::new(&model_path, tracker, cli.confidence)?;
    let detector = PlayerDetector::new(Box::new(model));
    let annotator = PlayerAnnotator::new(font);
    let cache = cli
        .cache
        .map(|path| Box::new(JsonDetectionCache::new(path)) as Box<dyn DetectionCache>);

    let mut pipeline = TrackPlayersUseCase::new(
        Box::new(FfmpegReader::new()),
        Box::new(FfmpegWriter::new()),
        detector,
        annotator,
        keypoints,
        cache,
        cli.read_from_cache,
        Box::new(StdoutPipelineLogger::new(cli.progress_every)),
    );
    pipeline.execute(&cli.input, &cli.output)
}

fn load_keypoints(path: &Path) -> Result<CourtKeypoints, Box<dyn std::error::Error>> {
    let file = fs::File::open(path)
        .map_err(|e| format!("cannot open keypoints file {}: {e}", path.display()))?;
    let coords: Vec<f64> = serde_json::from_reader(file)
        .map_err(|e| format!("keypoints file {} is not a JSON number array: {e}", path.display()))?;
    Ok(CourtKeypoints::from_flat(&coords)?)
}

fn load_label_font() -> Result<FontVec, Box<dyn std::error::Error>> {
    let path = resolve_asset(
        LABEL_FONT_NAME,
        LABEL_FONT_URL,
        None,
        download_progress("label font"),
    )?;
    let bytes = fs::read(&path)
        .map_err(|e| format!("cannot read font file {}: {e}", path.display()))?;
    FontVec::try_from_vec(bytes)
        .map_err(|_| format!("font file {} is not a valid TrueType font", path.display()).into())
}

fn download_progress(asset: &'static str) -> Option<ProgressFn> {
    Some(Box::new(move |done, total| {
        if total > 0 {
            eprint!("\rdownloading {asset}: {}%", done * 100 / total);
            if done >= total {
                eprintln!();
            }
        }
    }))
}
