/// YOLO-family object detector on ONNX Runtime, fronted by an IoU tracker so
/// it satisfies the persistent-identity [`TrackingModel`] contract.
///
/// Letterbox preprocessing, confidence gate, per-class NMS, COCO label
/// mapping, then identity association. Loaded from a model path supplied at
/// construction; the session and tracker state are owned for the model's
/// lifetime.
use std::path::Path;

use ndarray::Array4;

use crate::detection::domain::tracking_model::{TrackedBox, TrackingModel};
use crate::detection::infrastructure::iou_tracker::IouTracker;
use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

/// Fallback input resolution when the model's input shape is dynamic.
const DEFAULT_INPUT_SIZE: u32 = 640;

/// IoU above which two same-class boxes are considered duplicates.
const NMS_IOU_THRESHOLD: f64 = 0.45;

/// Gray fill for the letterbox padding, the value YOLO models are trained on.
const PAD_VALUE: f32 = 114.0 / 255.0;

const COCO_CLASSES: [&str; 80] = [
    "person", "bicycle", "car", "motorcycle", "airplane", "bus", "train", "truck", "boat",
    "traffic light", "fire hydrant", "stop sign", "parking meter", "bench", "bird", "cat", "dog",
    "horse", "sheep", "cow", "elephant", "bear", "zebra", "giraffe", "backpack", "umbrella",
    "handbag", "tie", "suitcase", "frisbee", "skis", "snowboard", "sports ball", "kite",
    "baseball bat", "baseball glove", "skateboard", "surfboard", "tennis racket", "bottle",
    "wine glass", "cup", "fork", "knife", "spoon", "bowl", "banana", "apple", "sandwich",
    "orange", "broccoli", "carrot", "hot dog", "pizza", "donut", "cake", "chair", "couch",
    "potted plant", "bed", "dining table", "toilet", "tv", "laptop", "mouse", "remote",
    "keyboard", "cell phone", "microwave", "oven", "toaster", "sink", "refrigerator", "book",
    "clock", "vase", "scissors", "teddy bear", "hair drier", "toothbrush",
];

pub struct OnnxPersonModel {
    session: ort::session::Session,
    tracker: IouTracker,
    confidence: f64,
    input_size: u32,
}

impl OnnxPersonModel {
    /// Loads the ONNX model and reads its input resolution from the first
    /// input's NCHW shape, falling back to 640 when the shape is dynamic.
    pub fn new(
        model_path: &Path,
        tracker: IouTracker,
        confidence: f64,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let session = ort::session::Session::builder()?.commit_from_file(model_path)?;

        let input_size = session
            .inputs()
            .first()
            .and_then(|input| {
                if let ort::value::ValueType::Tensor { ref shape, .. } = input.dtype() {
                    if shape.len() >= 4 && shape[2] > 0 {
                        Some(shape[2] as u32)
                    } else {
                        None
                    }
                } else {
                    None
                }
            })
            .unwrap_or(DEFAULT_INPUT_SIZE);

        Ok(Self {
            session,
            tracker,
            confidence,
            input_size,
        })
    }
}

impl TrackingModel for OnnxPersonModel {
    fn track(&mut self, frame: &Frame) -> Result<Vec<TrackedBox>, Box<dyn std::error::Error>> {
        let geometry = LetterboxGeometry::fit(frame.width(), frame.height(), self.input_size);
        let input = letterbox_tensor(frame, self.input_size, &geometry)?;

        let input_value = ort::value::Tensor::from_array(input)?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err("detection model produced no outputs".into());
        }
        let tensor = outputs[0].try_extract_array::<f32>()?;
        let shape = tensor.shape();
        let data = tensor
            .as_slice()
            .ok_or("detection output tensor is not contiguous")?;

        let raw = parse_predictions(data, shape, self.confidence, &geometry)?;
        let kept = nms_per_class(raw, NMS_IOU_THRESHOLD);

        let boxes: Vec<BoundingBox> = kept.iter().map(|d| d.bbox).collect();
        let assigned = self.tracker.update(&boxes);

        Ok(kept
            .into_iter()
            .zip(assigned)
            .map(|(det, (track_id, bbox))| TrackedBox {
                label: COCO_CLASSES[det.class_idx].to_string(),
                bbox,
                track_id: Some(track_id),
            })
            .collect())
    }
}

#[derive(Clone, Debug)]
struct RawDetection {
    bbox: BoundingBox,
    class_idx: usize,
    confidence: f64,
}

/// Scale and padding that map the original frame into the square model input.
#[derive(Clone, Copy, Debug, PartialEq)]
struct LetterboxGeometry {
    scale: f64,
    pad_x: f64,
    pad_y: f64,
}

impl LetterboxGeometry {
    fn fit(frame_w: u32, frame_h: u32, input_size: u32) -> Self {
        let scale = (input_size as f64 / frame_w as f64).min(input_size as f64 / frame_h as f64);
        let scaled_w = (frame_w as f64 * scale).round();
        let scaled_h = (frame_h as f64 * scale).round();
        Self {
            scale,
            pad_x: ((input_size as f64 - scaled_w) / 2.0).floor(),
            pad_y: ((input_size as f64 - scaled_h) / 2.0).floor(),
        }
    }

    /// Maps a point from model-input coordinates back to the frame.
    fn to_frame(&self, x: f64, y: f64) -> (f64, f64) {
        ((x - self.pad_x) / self.scale, (y - self.pad_y) / self.scale)
    }
}

/// Resizes the frame into the letterboxed square and normalizes to NCHW
/// float32 in [0, 1], padding with YOLO's gray.
fn letterbox_tensor(
    frame: &Frame,
    input_size: u32,
    geometry: &LetterboxGeometry,
) -> Result<Array4<f32>, Box<dyn std::error::Error>> {
    let rgb = image::RgbImage::from_raw(frame.width(), frame.height(), frame.data().to_vec())
        .ok_or("frame buffer does not form an RGB image")?;

    let scaled_w = ((frame.width() as f64 * geometry.scale).round() as u32).max(1);
    let scaled_h = ((frame.height() as f64 * geometry.scale).round() as u32).max(1);
    let resized =
        image::imageops::resize(&rgb, scaled_w, scaled_h, image::imageops::FilterType::Triangle);

    let size = input_size as usize;
    let mut tensor = Array4::<f32>::from_elem((1, 3, size, size), PAD_VALUE);
    let (off_x, off_y) = (geometry.pad_x as usize, geometry.pad_y as usize);
    for (x, y, pixel) in resized.enumerate_pixels() {
        let (tx, ty) = (off_x + x as usize, off_y + y as usize);
        for c in 0..3 {
            tensor[[0, c, ty, tx]] = pixel.0[c] as f32 / 255.0;
        }
    }
    Ok(tensor)
}

/// Decodes YOLO output rows `[cx, cy, w, h, class scores...]` above the
/// confidence floor, mapping boxes back into frame coordinates.
///
/// Accepts both `[1, features, detections]` (the usual transposed export)
/// and `[1, detections, features]` layouts.
fn parse_predictions(
    data: &[f32],
    shape: &[usize],
    confidence: f64,
    geometry: &LetterboxGeometry,
) -> Result<Vec<RawDetection>, Box<dyn std::error::Error>> {
    if shape.len() != 3 {
        return Err(format!("unexpected detection output shape: {shape:?}").into());
    }
    let transposed = shape[1] < shape[2];
    let (num_dets, num_feats) = if transposed {
        (shape[2], shape[1])
    } else {
        (shape[1], shape[2])
    };
    if num_feats < 5 {
        return Err(format!("detection rows too short: {num_feats} features").into());
    }

    let feature = |det: usize, feat: usize| -> f64 {
        if transposed {
            data[feat * num_dets + det] as f64
        } else {
            data[det * num_feats + feat] as f64
        }
    };

    let mut detections = Vec::new();
    for det in 0..num_dets {
        let mut class_idx = 0;
        let mut best = f64::MIN;
        for offset in 0..(num_feats - 4) {
            let score = feature(det, 4 + offset);
            if score > best {
                best = score;
                class_idx = offset;
            }
        }
        if best < confidence {
            continue;
        }

        let (cx, cy) = (feature(det, 0), feature(det, 1));
        let (w, h) = (feature(det, 2), feature(det, 3));
        let (x1, y1) = geometry.to_frame(cx - w / 2.0, cy - h / 2.0);
        let (x2, y2) = geometry.to_frame(cx + w / 2.0, cy + h / 2.0);

        detections.push(RawDetection {
            bbox: BoundingBox::new(x1, y1, x2, y2),
            class_idx,
            confidence: best,
        });
    }
    Ok(detections)
}

/// Greedy non-maximum suppression within each class.
fn nms_per_class(mut detections: Vec<RawDetection>, iou_threshold: f64) -> Vec<RawDetection> {
    detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    let mut kept: Vec<RawDetection> = Vec::with_capacity(detections.len());
    for det in detections {
        let duplicate = kept
            .iter()
            .any(|k| k.class_idx == det.class_idx && k.bbox.iou(&det.bbox) > iou_threshold);
        if !duplicate {
            kept.push(det);
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_letterbox_geometry_landscape() {
        // 1280x720 into 640: scale 0.5, 360 rows used, 140 pad above/below.
        let g = LetterboxGeometry::fit(1280, 720, 640);
        assert_relative_eq!(g.scale, 0.5);
        assert_relative_eq!(g.pad_x, 0.0);
        assert_relative_eq!(g.pad_y, 140.0);
    }

    #[test]
    fn test_letterbox_round_trips_coordinates() {
        let g = LetterboxGeometry::fit(1280, 720, 640);
        // Frame point (100, 200) lands at (50, 240) in the input.
        let (x, y) = g.to_frame(50.0, 240.0);
        assert_relative_eq!(x, 100.0);
        assert_relative_eq!(y, 200.0);
    }

    #[test]
    fn test_letterbox_tensor_pads_and_normalizes() {
        let frame = Frame::new(vec![255u8; 4 * 2 * 3], 4, 2, 3, 0);
        let g = LetterboxGeometry::fit(4, 2, 8);
        let tensor = letterbox_tensor(&frame, 8, &g).unwrap();
        assert_eq!(tensor.shape(), &[1, 3, 8, 8]);
        // Padded corner keeps the gray fill; the content area is white.
        assert_relative_eq!(tensor[[0, 0, 0, 0]], PAD_VALUE);
        assert_relative_eq!(tensor[[0, 0, 4, 4]], 1.0);
    }

    /// Builds a `[1, dets, feats]` row-major prediction buffer, padded with
    /// below-floor rows so the detection axis outnumbers the feature axis
    /// (as it always does in real exports).
    fn predictions(rows: &[Vec<f32>]) -> (Vec<f32>, Vec<usize>) {
        let feats = rows[0].len();
        let dets = rows.len().max(feats + 1);
        let mut data: Vec<f32> = rows.iter().flatten().copied().collect();
        data.resize(dets * feats, 0.0);
        (data, vec![1, dets, feats])
    }

    fn identity_geometry() -> LetterboxGeometry {
        LetterboxGeometry {
            scale: 1.0,
            pad_x: 0.0,
            pad_y: 0.0,
        }
    }

    #[test]
    fn test_parse_selects_best_class_and_applies_floor() {
        // Row 1: class 0 at 0.9; row 2: class 2 at 0.8; row 3 below floor.
        let (data, shape) = predictions(&[
            vec![50.0, 50.0, 20.0, 40.0, 0.9, 0.1, 0.0],
            vec![200.0, 80.0, 30.0, 30.0, 0.2, 0.1, 0.8],
            vec![300.0, 300.0, 10.0, 10.0, 0.1, 0.05, 0.0],
        ]);
        let dets = parse_predictions(&data, &shape, 0.25, &identity_geometry()).unwrap();
        assert_eq!(dets.len(), 2);
        assert_eq!(dets[0].class_idx, 0);
        assert_relative_eq!(dets[0].bbox.x1, 40.0);
        assert_relative_eq!(dets[0].bbox.y2, 70.0);
        assert_eq!(dets[1].class_idx, 2);
    }

    #[test]
    fn test_parse_handles_transposed_layout() {
        // Feature-major [1, feats, dets] export with 8 detection columns;
        // only column 0 carries a confident box.
        let row0 = [50.0f32, 50.0, 20.0, 40.0, 0.9, 0.1];
        let (feats, dets) = (6usize, 8usize);
        let mut data = vec![0.0f32; feats * dets];
        for (feat, value) in row0.iter().enumerate() {
            data[feat * dets] = *value;
        }
        let parsed =
            parse_predictions(&data, &[1, feats, dets], 0.25, &identity_geometry()).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_relative_eq!(parsed[0].bbox.x1, 40.0);
        assert_relative_eq!(parsed[0].bbox.y1, 30.0);
        assert_eq!(parsed[0].class_idx, 0);
    }

    #[test]
    fn test_parse_rejects_bad_shape() {
        assert!(parse_predictions(&[0.0; 8], &[2, 4], 0.25, &identity_geometry()).is_err());
    }

    #[test]
    fn test_nms_drops_same_class_duplicates_only() {
        let near_duplicate = |conf: f64, class_idx: usize| RawDetection {
            bbox: BoundingBox::new(0.0, 0.0, 100.0, 100.0),
            class_idx,
            confidence: conf,
        };
        let kept = nms_per_class(
            vec![
                near_duplicate(0.9, 0),
                near_duplicate(0.7, 0),
                near_duplicate(0.8, 1),
            ],
            0.45,
        );
        assert_eq!(kept.len(), 2);
        assert_relative_eq!(kept[0].confidence, 0.9);
        assert_eq!(kept[1].class_idx, 1);
    }

    #[test]
    fn test_nms_keeps_separated_boxes() {
        let at = |x: f64| RawDetection {
            bbox: BoundingBox::new(x, 0.0, x + 10.0, 10.0),
            class_idx: 0,
            confidence: 0.5,
        };
        let kept = nms_per_class(vec![at(0.0), at(100.0), at(200.0)], 0.45);
        assert_eq!(kept.len(), 3);
    }

    #[test]
    fn test_person_is_coco_class_zero() {
        assert_eq!(COCO_CLASSES[0], "person");
    }
}
