use inference::{ClassNames, Detection, DetectionOutput};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionDto {
    pub class_id: usize,
    pub class_name: String,
    pub confidence: f64,
    pub bbox: BoundingBox,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageShape {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub detections: Vec<DetectionDto>,
    pub image_shape: ImageShape,
    pub inference_time_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub service: String,
    pub version: String,
    pub status: String,
}

impl DetectionDto {
    pub fn from_detection(detection: &Detection, names: &ClassNames) -> Self {
        Self {
            class_id: detection.class_id,
            class_name: names.resolve(detection.class_id),
            confidence: f64::from(detection.confidence),
            bbox: BoundingBox {
                x1: f64::from(detection.x1),
                y1: f64::from(detection.y1),
                x2: f64::from(detection.x2),
                y2: f64::from(detection.y2),
            },
        }
    }
}

impl PredictionResponse {
    pub fn from_output(output: &DetectionOutput, shape: ImageShape, names: &ClassNames) -> Self {
        Self {
            detections: output
                .detections
                .iter()
                .map(|detection| DetectionDto::from_detection(detection, names))
                .collect(),
            image_shape: shape,
            inference_time_ms: output.speed.inference_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inference::Speed;

    fn output() -> DetectionOutput {
        DetectionOutput {
            detections: vec![
                Detection {
                    x1: 10.0,
                    y1: 20.0,
                    x2: 110.0,
                    y2: 220.0,
                    confidence: 0.9,
                    class_id: 0,
                },
                Detection {
                    x1: 0.0,
                    y1: 0.0,
                    x2: 5.0,
                    y2: 5.0,
                    confidence: 0.3,
                    class_id: 7,
                },
            ],
            speed: Speed {
                preprocess_ms: 1.0,
                inference_ms: 12.5,
                postprocess_ms: 0.5,
            },
        }
    }

    #[test]
    fn test_prediction_response_json_shape() {
        let names = ClassNames::from_lines("person\nbicycle\n");
        let shape = ImageShape {
            width: 640,
            height: 480,
        };
        let response = PredictionResponse::from_output(&output(), shape, &names);
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["image_shape"]["width"], 640);
        assert_eq!(json["image_shape"]["height"], 480);
        assert_eq!(json["inference_time_ms"], 12.5);
        assert_eq!(json["detections"].as_array().unwrap().len(), 2);

        let first = &json["detections"][0];
        assert_eq!(first["class_id"], 0);
        assert_eq!(first["class_name"], "person");
        assert_eq!(first["bbox"]["x1"], 10.0);
        assert_eq!(first["bbox"]["y2"], 220.0);
        assert!((first["confidence"].as_f64().unwrap() - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_unknown_class_falls_back_to_id() {
        let names = ClassNames::from_lines("person\n");
        let shape = ImageShape {
            width: 10,
            height: 10,
        };
        let response = PredictionResponse::from_output(&output(), shape, &names);
        assert_eq!(response.detections[1].class_name, "7");
    }
}
