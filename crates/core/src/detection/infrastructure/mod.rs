pub mod iou_tracker;
pub mod json_detection_cache;
pub mod onnx_person_model;
