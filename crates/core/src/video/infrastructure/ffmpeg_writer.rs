use std::path::Path;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_writer::VideoWriter;

/// Video encoding through ffmpeg-next.
///
/// Frames come in as RGB24, get scaled to YUV420P, and are encoded with the
/// widely-supported MPEG4 codec. Analysis output carries no audio.
pub struct FfmpegWriter {
    octx: Option<ffmpeg_next::format::context::Output>,
    encoder: Option<ffmpeg_next::codec::encoder::video::Encoder>,
    scaler: Option<ffmpeg_next::software::scaling::Context>,
    width: u32,
    height: u32,
    fps: i32,
    frames_written: usize,
}

// Safety: the writer is driven from one thread at a time; the raw pointers
// inside ffmpeg types are never shared.
unsafe impl Send for FfmpegWriter {}

impl FfmpegWriter {
    pub fn new() -> Self {
        Self {
            octx: None,
            encoder: None,
            scaler: None,
            width: 0,
            height: 0,
            fps: 0,
            frames_written: 0,
        }
    }

    fn drain_encoder(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let encoder = self.encoder.as_mut().ok_or("writer not opened")?;
        let octx = self.octx.as_mut().ok_or("writer not opened")?;
        let time_base = octx
            .stream(0)
            .ok_or("output stream missing")?
            .time_base();

        let mut packet = ffmpeg_next::Packet::empty();
        while encoder.receive_packet(&mut packet).is_ok() {
            packet.set_stream(0);
            packet.rescale_ts(ffmpeg_next::Rational(1, self.fps), time_base);
            packet.write_interleaved(octx)?;
        }
        Ok(())
    }
}

impl Default for FfmpegWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoWriter for FfmpegWriter {
    fn open(
        &mut self,
        path: &Path,
        metadata: &VideoMetadata,
    ) -> Result<(), Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;

        self.width = metadata.width;
        self.height = metadata.height;
        self.fps = match metadata.fps.round() as i32 {
            f if f > 0 => f,
            _ => 30,
        };

        let mut octx = ffmpeg_next::format::output(path)?;
        let global_header = octx
            .format()
            .flags()
            .contains(ffmpeg_next::format::Flags::GLOBAL_HEADER);

        let codec = ffmpeg_next::encoder::find(ffmpeg_next::codec::Id::MPEG4)
            .ok_or("MPEG4 encoder unavailable")?;
        let mut ost = octx.add_stream(Some(codec))?;

        let mut encoder_ctx = ffmpeg_next::codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()?;
        encoder_ctx.set_width(metadata.width);
        encoder_ctx.set_height(metadata.height);
        encoder_ctx.set_format(ffmpeg_next::format::Pixel::YUV420P);
        encoder_ctx.set_time_base(ffmpeg_next::Rational(1, self.fps));
        encoder_ctx.set_frame_rate(Some(ffmpeg_next::Rational(self.fps, 1)));
        if global_header {
            encoder_ctx.set_flags(ffmpeg_next::codec::Flags::GLOBAL_HEADER);
        }

        let encoder = encoder_ctx.open_with(ffmpeg_next::Dictionary::new())?;
        ost.set_parameters(&encoder);

        octx.write_header()?;

        let scaler = ffmpeg_next::software::scaling::Context::get(
            ffmpeg_next::format::Pixel::RGB24,
            metadata.width,
            metadata.height,
            ffmpeg_next::format::Pixel::YUV420P,
            metadata.width,
            metadata.height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )?;

        self.octx = Some(octx);
        self.encoder = Some(encoder);
        self.scaler = Some(scaler);
        self.frames_written = 0;
        Ok(())
    }

    fn write(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        if self.encoder.is_none() {
            return Err("writer not opened".into());
        }

        let mut rgb = ffmpeg_next::util::frame::video::Video::new(
            ffmpeg_next::format::Pixel::RGB24,
            self.width,
            self.height,
        );

        // Respect the destination stride row by row.
        let stride = rgb.stride(0);
        let row_bytes = self.width as usize * 3;
        {
            let dst = rgb.data_mut(0);
            let src = frame.data();
            for row in 0..self.height as usize {
                dst[row * stride..row * stride + row_bytes]
                    .copy_from_slice(&src[row * row_bytes..(row + 1) * row_bytes]);
            }
        }

        let mut yuv = ffmpeg_next::util::frame::video::Video::empty();
        self.scaler
            .as_mut()
            .ok_or("writer not opened")?
            .run(&rgb, &mut yuv)?;
        yuv.set_pts(Some(self.frames_written as i64));

        self.encoder
            .as_mut()
            .ok_or("writer not opened")?
            .send_frame(&yuv)?;
        self.drain_encoder()?;

        self.frames_written += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        if self.encoder.is_none() {
            return Ok(());
        }
        if let Some(encoder) = self.encoder.as_mut() {
            encoder.send_eof()?;
        }
        self.drain_encoder()?;
        if let Some(octx) = self.octx.as_mut() {
            octx.write_trailer()?;
        }
        self.octx = None;
        self.encoder = None;
        self.scaler = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::domain::video_reader::VideoReader;
    use crate::video::infrastructure::ffmpeg_reader::FfmpegReader;

    fn gradient_frame(width: u32, height: u32, index: usize) -> Frame {
        let mut data = Vec::with_capacity((width * height * 3) as usize);
        let value = ((index * 40) % 256) as u8;
        for _ in 0..(width * height) {
            data.extend_from_slice(&[value, value, value]);
        }
        Frame::new(data, width, height, 3, index)
    }

    #[test]
    fn test_written_clip_reads_back_with_same_frame_count() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.mp4");

        let meta = VideoMetadata::bare(160, 120, 25.0, 5);
        let mut writer = FfmpegWriter::new();
        writer.open(&path, &meta).unwrap();
        for i in 0..5 {
            writer.write(&gradient_frame(160, 120, i)).unwrap();
        }
        writer.close().unwrap();

        let mut reader = FfmpegReader::new();
        let read_meta = reader.open(&path).unwrap();
        assert_eq!(read_meta.width, 160);
        assert_eq!(read_meta.height, 120);
        assert_eq!(reader.frames().filter(|f| f.is_ok()).count(), 5);
    }

    #[test]
    fn test_write_before_open_errors() {
        let mut writer = FfmpegWriter::new();
        assert!(writer.write(&gradient_frame(32, 32, 0)).is_err());
    }

    #[test]
    fn test_close_without_open_is_a_no_op() {
        let mut writer = FfmpegWriter::new();
        assert!(writer.close().is_ok());
    }

    #[test]
    fn test_zero_fps_falls_back_to_thirty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.mp4");
        let meta = VideoMetadata::bare(160, 120, 0.0, 1);
        let mut writer = FfmpegWriter::new();
        writer.open(&path, &meta).unwrap();
        assert_eq!(writer.fps, 30);
        writer.write(&gradient_frame(160, 120, 0)).unwrap();
        writer.close().unwrap();
    }
}
