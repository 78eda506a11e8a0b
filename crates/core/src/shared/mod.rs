pub mod asset_resolver;
pub mod bounding_box;
pub mod constants;
pub mod court_keypoints;
pub mod frame;
pub mod video_metadata;
