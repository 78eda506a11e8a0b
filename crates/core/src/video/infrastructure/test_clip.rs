//! Synthetic clip fixtures for decoder/encoder tests.

use std::path::Path;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_writer::VideoWriter;
use crate::video::infrastructure::ffmpeg_writer::FfmpegWriter;

/// Encodes `num_frames` flat gray frames to `path`.
pub fn write_test_clip(path: &Path, num_frames: usize, width: u32, height: u32, fps: f64) {
    let meta = VideoMetadata::bare(width, height, fps, num_frames);
    let mut writer = FfmpegWriter::new();
    writer.open(path, &meta).expect("open test clip for encode");
    for i in 0..num_frames {
        let value = ((i * 40) % 256) as u8;
        let frame = Frame::new(
            vec![value; (width * height * 3) as usize],
            width,
            height,
            3,
            i,
        );
        writer.write(&frame).expect("encode test frame");
    }
    writer.close().expect("finalize test clip");
}
