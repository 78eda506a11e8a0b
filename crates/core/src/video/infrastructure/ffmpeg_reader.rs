use std::path::Path;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_reader::VideoReader;

/// Video decoding through ffmpeg-next (libavformat + libavcodec).
///
/// Every decoded frame is scaled to RGB24 and handed out as a [`Frame`]
/// with a sequential index.
pub struct FfmpegReader {
    input_ctx: Option<ffmpeg_next::format::context::Input>,
    stream_index: usize,
}

// Safety: the reader is driven from one thread at a time; the raw pointers
// inside ffmpeg types are never shared.
unsafe impl Send for FfmpegReader {}

impl FfmpegReader {
    pub fn new() -> Self {
        Self {
            input_ctx: None,
            stream_index: 0,
        }
    }
}

impl Default for FfmpegReader {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoReader for FfmpegReader {
    fn open(&mut self, path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;

        let ictx = ffmpeg_next::format::input(path)?;
        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or("no video stream in input")?;

        self.stream_index = stream.index();

        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?;
        let decoder = codec_ctx.decoder().video()?;

        let rate = stream.rate();
        let fps = if rate.denominator() != 0 {
            rate.numerator() as f64 / rate.denominator() as f64
        } else {
            0.0
        };

        let metadata = VideoMetadata {
            width: decoder.width(),
            height: decoder.height(),
            fps,
            total_frames: stream.frames().max(0) as usize,
            codec: decoder
                .codec()
                .map(|c| c.name().to_string())
                .unwrap_or_default(),
        };

        self.input_ctx = Some(ictx);
        Ok(metadata)
    }

    fn frames(
        &mut self,
    ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_> {
        let stream_index = self.stream_index;
        let Some(ictx) = self.input_ctx.as_mut() else {
            return Box::new(std::iter::once(Err("reader not opened".into())));
        };

        match build_decode_state(ictx, stream_index) {
            Ok((decoder, scaler, width, height)) => Box::new(DecodeIter {
                ictx,
                decoder,
                scaler,
                width,
                height,
                stream_index,
                next_index: 0,
                flushing: false,
                done: false,
            }),
            Err(e) => Box::new(std::iter::once(Err(e))),
        }
    }

    fn close(&mut self) {
        self.input_ctx = None;
    }
}

type DecodeState = (
    ffmpeg_next::decoder::Video,
    ffmpeg_next::software::scaling::Context,
    u32,
    u32,
);

fn build_decode_state(
    ictx: &ffmpeg_next::format::context::Input,
    stream_index: usize,
) -> Result<DecodeState, Box<dyn std::error::Error>> {
    let stream = ictx
        .stream(stream_index)
        .ok_or("video stream disappeared between open and decode")?;
    let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?;
    let decoder = codec_ctx.decoder().video()?;

    let (width, height) = (decoder.width(), decoder.height());
    let scaler = ffmpeg_next::software::scaling::Context::get(
        decoder.format(),
        width,
        height,
        ffmpeg_next::format::Pixel::RGB24,
        width,
        height,
        ffmpeg_next::software::scaling::Flags::BILINEAR,
    )?;

    Ok((decoder, scaler, width, height))
}

/// Pull-based decode loop: one frame per `next` call, so a clip never has to
/// fit in decoder memory at once.
struct DecodeIter<'a> {
    ictx: &'a mut ffmpeg_next::format::context::Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: ffmpeg_next::software::scaling::Context,
    width: u32,
    height: u32,
    stream_index: usize,
    next_index: usize,
    flushing: bool,
    done: bool,
}

impl DecodeIter<'_> {
    fn receive_one(&mut self) -> Option<Result<Frame, Box<dyn std::error::Error>>> {
        let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
        if self.decoder.receive_frame(&mut decoded).is_err() {
            return None;
        }

        let mut rgb = ffmpeg_next::util::frame::video::Video::empty();
        if let Err(e) = self.scaler.run(&decoded, &mut rgb) {
            return Some(Err(Box::new(e)));
        }

        let pixels = strip_row_padding(&rgb, self.width, self.height);
        let frame = Frame::new(pixels, self.width, self.height, 3, self.next_index);
        self.next_index += 1;
        Some(Ok(frame))
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = Result<Frame, Box<dyn std::error::Error>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if let Some(result) = self.receive_one() {
            return Some(result);
        }
        if self.flushing {
            self.done = true;
            return None;
        }

        loop {
            let Some((stream, packet)) = self.ictx.packets().next() else {
                let _ = self.decoder.send_eof();
                self.flushing = true;
                if let Some(result) = self.receive_one() {
                    return Some(result);
                }
                self.done = true;
                return None;
            };

            if stream.index() != self.stream_index {
                continue;
            }
            if self.decoder.send_packet(&packet).is_err() {
                continue;
            }
            if let Some(result) = self.receive_one() {
                return Some(result);
            }
        }
    }
}

/// ffmpeg pads each row out to its stride; repack into a tight RGB buffer.
fn strip_row_padding(
    rgb: &ffmpeg_next::util::frame::video::Video,
    width: u32,
    height: u32,
) -> Vec<u8> {
    let stride = rgb.stride(0);
    let data = rgb.data(0);
    let row_bytes = width as usize * 3;

    let mut pixels = Vec::with_capacity(row_bytes * height as usize);
    for row in 0..height as usize {
        let start = row * stride;
        pixels.extend_from_slice(&data[start..start + row_bytes]);
    }
    pixels
}
