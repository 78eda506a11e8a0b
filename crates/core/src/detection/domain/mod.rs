pub mod detection_cache;
pub mod frame_detections;
pub mod player_detector;
pub mod player_selection;
pub mod tracking_model;
