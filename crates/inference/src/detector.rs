use crate::{
    backend::{InferenceBackend, InferenceOutput},
    config::{DetectorConfig, check_input_size},
    errors::InferenceError,
    metadata::ClassNames,
    processing::post::{Detection, PostProcessor, TransformParams},
};
use common::span;
use image::RgbImage;
use preprocess::{CpuPreProcessor, DEFAULT_INPUT_SIZE, Preprocess};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Per-stage timings of one detection call, in milliseconds
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Speed {
    pub preprocess_ms: f64,
    pub inference_ms: f64,
    pub postprocess_ms: f64,
}

#[derive(Debug, Clone, Default)]
pub struct DetectionOutput {
    pub detections: Vec<Detection>,
    pub speed: Speed,
}

/// An object detector shared across request handlers.
pub trait Detector: Send + Sync {
    fn detect(&self, image: &RgbImage) -> anyhow::Result<DetectionOutput>;

    /// Class-index to name table used to label detections
    fn class_names(&self) -> &ClassNames;
}

/// YOLO detector: letterbox, forward pass, decode + NMS.
///
/// The backend sits behind a mutex so concurrent callers run the model one
/// at a time. The preprocessor keeps its letterbox buffers between calls.
pub struct YoloDetector<B: InferenceBackend> {
    backend: Mutex<B>,
    preprocessor: Mutex<CpuPreProcessor>,
    postprocessor: PostProcessor,
    names: ClassNames,
    input_size: (u32, u32),
}

impl<B: InferenceBackend> YoloDetector<B> {
    /// Load the model named by `config.model_path`.
    ///
    /// Any failure (missing file, unreadable weights, bad class-names file) is
    /// a [`InferenceError::ModelLoad`].
    pub fn load(config: &DetectorConfig) -> Result<Self, InferenceError> {
        let path = config.model_path.display();

        if !config.model_path.is_file() {
            return Err(InferenceError::model_load(path, "file not found"));
        }

        let backend =
            B::load_model(config).map_err(|e| InferenceError::model_load(&path, format!("{:#}", e)))?;

        let names = match &config.class_names_path {
            Some(names_path) => Some(ClassNames::from_file(names_path).map_err(|e| {
                InferenceError::model_load(
                    &path,
                    format!("cannot read class names {}: {}", names_path.display(), e),
                )
            })?),
            None => None,
        };

        Ok(Self::new(backend, config, names))
    }

    /// Wrap an already loaded backend.
    ///
    /// `names` overrides the class names embedded in the model; the input
    /// size comes from config, then model metadata, then the default.
    pub fn new(backend: B, config: &DetectorConfig, names: Option<ClassNames>) -> Self {
        let metadata = backend.metadata();
        let names = names.unwrap_or(metadata.names);
        let metadata_size = metadata.imgsz.filter(|&size| match check_input_size(size) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Ignoring imgsz from model metadata: {}", e);
                false
            }
        });
        let input_size = config
            .input_size
            .or(metadata_size)
            .unwrap_or(DEFAULT_INPUT_SIZE);

        if names.is_empty() {
            tracing::warn!("No class names available, labels will be class ids");
        }

        tracing::info!(
            input_width = input_size.0,
            input_height = input_size.1,
            classes = names.len(),
            confidence_threshold = config.confidence_threshold,
            iou_threshold = config.iou_threshold,
            "Detector ready"
        );

        Self {
            backend: Mutex::new(backend),
            preprocessor: Mutex::new(CpuPreProcessor::new(input_size)),
            postprocessor: PostProcessor::new(
                config.confidence_threshold,
                config.iou_threshold,
                config.max_detections,
            ),
            names,
            input_size,
        }
    }

    pub fn input_size(&self) -> (u32, u32) {
        self.input_size
    }
}

impl<B: InferenceBackend> Detector for YoloDetector<B> {
    #[tracing::instrument(skip_all, fields(width = image.width(), height = image.height()))]
    fn detect(&self, image: &RgbImage) -> anyhow::Result<DetectionOutput> {
        let start = Instant::now();
        let prepared = self
            .preprocessor
            .lock()
            .map_err(|_| anyhow::anyhow!("Preprocessor lock poisoned"))?
            .preprocess(image.as_raw(), image.width(), image.height())?;
        let preprocess_ms = millis(start.elapsed());

        let start = Instant::now();
        let InferenceOutput { predictions } = {
            let _s = span!("model_inference");
            let mut backend = self
                .backend
                .lock()
                .map_err(|_| anyhow::anyhow!("Inference backend lock poisoned"))?;
            backend.infer(&prepared.data)?
        };
        let inference_ms = millis(start.elapsed());

        let start = Instant::now();
        let transform = TransformParams {
            orig_width: image.width(),
            orig_height: image.height(),
            scale: prepared.scale,
            offset_x: prepared.offset_x,
            offset_y: prepared.offset_y,
        };
        let detections = self
            .postprocessor
            .parse_detections(&predictions.view(), &transform)?;
        let postprocess_ms = millis(start.elapsed());

        tracing::debug!(
            detections = detections.len(),
            preprocess_ms,
            inference_ms,
            postprocess_ms,
            "Image processed"
        );

        Ok(DetectionOutput {
            detections,
            speed: Speed {
                preprocess_ms,
                inference_ms,
                postprocess_ms,
            },
        })
    }

    fn class_names(&self) -> &ClassNames {
        &self.names
    }
}

fn millis(elapsed: Duration) -> f64 {
    elapsed.as_secs_f64() * 1000.0
}
