use super::post::Detection;

/// Class-wise greedy non-maximum suppression.
///
/// Detections come back sorted by descending confidence; a detection is
/// dropped when it overlaps an already kept detection of the same class by
/// more than `iou_threshold`. At most `max_detections` are kept.
pub fn non_maximum_suppression(
    mut detections: Vec<Detection>,
    iou_threshold: f32,
    max_detections: usize,
) -> Vec<Detection> {
    detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut kept: Vec<Detection> = Vec::with_capacity(detections.len().min(max_detections));
    for candidate in detections {
        if kept.len() >= max_detections {
            break;
        }
        let suppressed = kept.iter().any(|k| {
            k.class_id == candidate.class_id && k.iou(&candidate) > iou_threshold
        });
        if !suppressed {
            kept.push(candidate);
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(x1: f32, y1: f32, x2: f32, y2: f32, confidence: f32, class_id: usize) -> Detection {
        Detection {
            x1,
            y1,
            x2,
            y2,
            confidence,
            class_id,
        }
    }

    #[test]
    fn nms_no_overlap() {
        let dets = vec![
            det(0.0, 0.0, 1.0, 1.0, 0.6, 0),
            det(2.0, 2.0, 3.0, 3.0, 0.7, 0),
        ];
        let kept = non_maximum_suppression(dets, 0.5, 300);

        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].confidence, 0.7, "Sorted by confidence");
    }

    #[test]
    fn nms_standard_usage() {
        let dets = vec![
            det(0.0, 0.0, 4.0, 4.0, 0.6, 0),
            det(0.0, 0.0, 5.0, 5.0, 0.55, 0),
            det(6.0, 6.0, 10.0, 10.0, 0.75, 0),
        ];
        let kept = non_maximum_suppression(dets, 0.5, 300);

        assert_eq!(
            kept,
            vec![
                det(6.0, 6.0, 10.0, 10.0, 0.75, 0),
                det(0.0, 0.0, 4.0, 4.0, 0.6, 0),
            ]
        );
    }

    #[test]
    fn nms_overlap_but_different_classes() {
        let dets = vec![
            det(0.0, 0.0, 4.5, 4.5, 0.6, 0),
            det(0.0, 0.0, 5.0, 5.0, 0.55, 1),
            det(0.5, 0.5, 4.0, 4.0, 0.8, 0),
            det(6.0, 6.0, 10.0, 10.0, 0.75, 0),
        ];
        let kept = non_maximum_suppression(dets, 0.5, 300);

        assert_eq!(
            kept,
            vec![
                det(0.5, 0.5, 4.0, 4.0, 0.8, 0),
                det(6.0, 6.0, 10.0, 10.0, 0.75, 0),
                det(0.0, 0.0, 5.0, 5.0, 0.55, 1),
            ]
        );
    }

    #[test]
    fn nms_caps_detection_count() {
        let dets = (0..10)
            .map(|i| {
                let x = i as f32 * 10.0;
                det(x, 0.0, x + 5.0, 5.0, 0.5 + i as f32 * 0.01, 0)
            })
            .collect();
        let kept = non_maximum_suppression(dets, 0.5, 3);

        assert_eq!(kept.len(), 3);
        assert!(kept[0].confidence > kept[1].confidence);
        assert!(kept[1].confidence > kept[2].confidence);
    }
}
