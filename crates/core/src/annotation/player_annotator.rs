use ab_glyph::{FontVec, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use thiserror::Error;

use crate::detection::domain::frame_detections::FrameDetections;
use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum AnnotateError {
    #[error("have {frames} frames but {detections} detection sets")]
    LengthMismatch { frames: usize, detections: usize },
    #[error("frame {index} is not an RGB24 buffer")]
    UnsupportedFrame { index: usize },
}

/// Renders tracked players onto frames: a hollow rectangle per bounding box,
/// with a `Player <id>` caption above the top-left corner.
///
/// Pure rendering — detection data is only read. Drawing happens in place on
/// the frame buffers. The caption needs a font; without one, boxes are drawn
/// uncaptioned.
pub struct PlayerAnnotator {
    color: Rgb<u8>,
    thickness: u32,
    font: Option<FontVec>,
    text_scale: f32,
}

/// Vertical gap between a box's top edge and its caption baseline.
const LABEL_OFFSET: i32 = 24;

impl PlayerAnnotator {
    pub fn new(font: Option<FontVec>) -> Self {
        Self {
            color: Rgb([255, 0, 0]),
            thickness: 2,
            font,
            text_scale: 20.0,
        }
    }

    pub fn with_style(mut self, color: [u8; 3], thickness: u32) -> Self {
        self.color = Rgb(color);
        self.thickness = thickness.max(1);
        self
    }

    /// Draws one frame's detections onto that frame.
    pub fn annotate_frame(
        &self,
        frame: &mut Frame,
        detections: &FrameDetections,
    ) -> Result<(), AnnotateError> {
        if detections.is_empty() {
            return Ok(());
        }

        let (width, height) = (frame.width(), frame.height());
        let mut canvas = RgbImage::from_raw(width, height, frame.data().to_vec()).ok_or(
            AnnotateError::UnsupportedFrame {
                index: frame.index(),
            },
        )?;

        for (id, bbox) in detections.iter() {
            let Some((x1, y1, x2, y2)) = clamp_to_canvas(bbox.x1, bbox.y1, bbox.x2, bbox.y2, width, height)
            else {
                continue;
            };

            for inset in 0..self.thickness as i32 {
                let (rx1, ry1) = (x1 + inset, y1 + inset);
                let (rx2, ry2) = (x2 - inset, y2 - inset);
                if rx2 <= rx1 || ry2 <= ry1 {
                    break;
                }
                let rect =
                    Rect::at(rx1, ry1).of_size((rx2 - rx1 + 1) as u32, (ry2 - ry1 + 1) as u32);
                draw_hollow_rect_mut(&mut canvas, rect, self.color);
            }

            if let Some(ref font) = self.font {
                let caption = format!("Player {id}");
                let ty = (y1 - LABEL_OFFSET).max(0);
                draw_text_mut(
                    &mut canvas,
                    self.color,
                    x1,
                    ty,
                    PxScale::from(self.text_scale),
                    font,
                    &caption,
                );
            }
        }

        frame.data_mut().copy_from_slice(canvas.as_raw());
        Ok(())
    }

    /// Draws a whole clip. Frame and detection sequences must be
    /// index-aligned and of equal length.
    pub fn annotate_sequence(
        &self,
        frames: &mut [Frame],
        sequence: &[FrameDetections],
    ) -> Result<(), AnnotateError> {
        if frames.len() != sequence.len() {
            return Err(AnnotateError::LengthMismatch {
                frames: frames.len(),
                detections: sequence.len(),
            });
        }
        for (frame, detections) in frames.iter_mut().zip(sequence) {
            self.annotate_frame(frame, detections)?;
        }
        Ok(())
    }
}

/// Rounds box corners to pixels and clips them to the canvas. Returns `None`
/// for boxes that degenerate or fall entirely outside.
fn clamp_to_canvas(
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
    width: u32,
    height: u32,
) -> Option<(i32, i32, i32, i32)> {
    let max_x = width as f64 - 1.0;
    let max_y = height as f64 - 1.0;
    let cx1 = x1.round().clamp(0.0, max_x) as i32;
    let cy1 = y1.round().clamp(0.0, max_y) as i32;
    let cx2 = x2.round().clamp(0.0, max_x) as i32;
    let cy2 = y2.round().clamp(0.0, max_y) as i32;
    (cx2 > cx1 && cy2 > cy1).then_some((cx1, cy1, cx2, cy2))
}
