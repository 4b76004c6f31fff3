use super::nms::non_maximum_suppression;
use ndarray::{ArrayView2, ArrayViewD, Axis, Ix2};

/// One detected object in original-image pixel coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub confidence: f32,
    pub class_id: usize,
}

impl Detection {
    pub fn area(&self) -> f32 {
        (self.x2 - self.x1).max(0.0) * (self.y2 - self.y1).max(0.0)
    }

    pub fn iou(&self, other: &Detection) -> f32 {
        let ix1 = self.x1.max(other.x1);
        let iy1 = self.y1.max(other.y1);
        let ix2 = self.x2.min(other.x2);
        let iy2 = self.y2.min(other.y2);

        let intersection = (ix2 - ix1).max(0.0) * (iy2 - iy1).max(0.0);
        let union = self.area() + other.area() - intersection;
        if union <= 0.0 {
            return 0.0;
        }
        intersection / union
    }
}

/// Letterbox applied during preprocessing, and the image it was applied to.
pub struct TransformParams {
    pub orig_width: u32,
    pub orig_height: u32,
    pub scale: f32,
    pub offset_x: f32,
    pub offset_y: f32,
}

impl TransformParams {
    /// Map a network-input point back into the original image, clamped to
    /// its bounds.
    pub fn to_original(&self, x: f32, y: f32) -> (f32, f32) {
        (
            ((x - self.offset_x) / self.scale).clamp(0.0, self.orig_width as f32),
            ((y - self.offset_y) / self.scale).clamp(0.0, self.orig_height as f32),
        )
    }
}

pub struct PostProcessor {
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
    pub max_detections: usize,
}

impl PostProcessor {
    pub fn new(confidence_threshold: f32, iou_threshold: f32, max_detections: usize) -> Self {
        Self {
            confidence_threshold,
            iou_threshold,
            max_detections,
        }
    }

    /// Decode a YOLO (v8 and later) detection head.
    ///
    /// `predictions` is `[1, 4 + num_classes, num_anchors]` with boxes as
    /// `cx, cy, w, h` in network-input pixels followed by per-class scores.
    #[tracing::instrument(skip(self, predictions, transform))]
    pub fn parse_detections(
        &self,
        predictions: &ArrayViewD<f32>,
        transform: &TransformParams,
    ) -> anyhow::Result<Vec<Detection>> {
        let rows = anchor_rows(predictions)?;
        let num_channels = rows.shape()[1];

        let mut candidates = Vec::new();

        for row in rows.axis_iter(Axis(0)) {
            // argmax over class scores
            let mut confidence = f32::NEG_INFINITY;
            let mut class_id = 0usize;
            for c in 4..num_channels {
                let score = row[c];
                if score > confidence {
                    confidence = score;
                    class_id = c - 4;
                }
            }

            // NaN scores fail this comparison too
            if !(confidence >= self.confidence_threshold) {
                continue;
            }

            let (cx, cy, w, h) = (row[0], row[1], row[2], row[3]);
            if ![cx, cy, w, h].iter().all(|v| v.is_finite()) {
                continue;
            }

            let (x1, y1, x2, y2) = cxcywh_to_xyxy(cx, cy, w, h);
            let (x1, y1) = transform.to_original(x1, y1);
            let (x2, y2) = transform.to_original(x2, y2);

            // Degenerate after clamping (box entirely in the padding)
            if x2 <= x1 || y2 <= y1 {
                continue;
            }

            candidates.push(Detection {
                x1,
                y1,
                x2,
                y2,
                confidence: confidence.clamp(0.0, 1.0),
                class_id,
            });
        }

        tracing::trace!(candidates = candidates.len(), "Decoded candidates");

        Ok(non_maximum_suppression(
            candidates,
            self.iou_threshold,
            self.max_detections,
        ))
    }
}

/// View the output as `[num_anchors, 4 + num_classes]`.
fn anchor_rows<'a>(predictions: &'a ArrayViewD<'a, f32>) -> anyhow::Result<ArrayView2<'a, f32>> {
    let shape = predictions.shape();
    if shape.len() != 3 || shape[0] != 1 {
        anyhow::bail!(
            "Unexpected output shape {:?}, expected [1, 4 + num_classes, num_anchors]",
            shape
        );
    }

    let view = predictions
        .index_axis(Axis(0), 0)
        .into_dimensionality::<Ix2>()?;

    let rows = view.reversed_axes();

    if rows.shape()[1] < 5 {
        anyhow::bail!(
            "Output has {} channels per anchor, expected at least 5 (4 box + 1 class)",
            rows.shape()[1]
        );
    }

    Ok(rows)
}

/// Convert bounding box from center-width-height format to corner format
#[inline]
fn cxcywh_to_xyxy(cx: f32, cy: f32, w: f32, h: f32) -> (f32, f32, f32, f32) {
    let x1 = cx - w / 2.0;
    let y1 = cy - h / 2.0;
    let x2 = cx + w / 2.0;
    let y2 = cy + h / 2.0;
    (x1, y1, x2, y2)
}
