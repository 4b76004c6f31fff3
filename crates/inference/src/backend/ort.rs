use super::{InferenceBackend, InferenceOutput};
use crate::config::{Device, DetectorConfig};
use crate::metadata::{ClassNames, ModelMetadata, parse_imgsz};
use ndarray::{Array, IxDyn};
use ort::{
    session::{Session, builder::GraphOptimizationLevel},
    value::TensorRef,
};
use std::path::Path;

const INPUT_NAME: &str = "images";
const OUTPUT_NAME: &str = "output0";

pub struct OrtBackend {
    session: Session,
    metadata: ModelMetadata,
}

impl OrtBackend {
    /// Load model with specified execution provider
    pub fn load_model_with_provider(
        path: &Path,
        device: Device,
        intra_threads: usize,
    ) -> anyhow::Result<Self> {
        // Initialize ORT environment (idempotent)
        let _ = ort::init().commit();

        #[allow(unused_mut)]
        let mut builder = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(intra_threads)?;

        match device {
            #[cfg(feature = "cuda")]
            Device::Cuda => {
                tracing::info!("Initializing ONNX Runtime with CUDA execution provider");
                builder = builder.with_execution_providers([
                    ort::execution_providers::CUDAExecutionProvider::default()
                        .with_device_id(0)
                        .build()
                        .error_on_failure(),
                ])?;
            }
            #[cfg(not(feature = "cuda"))]
            Device::Cuda => {
                anyhow::bail!("CUDA requested but this build has no `cuda` feature");
            }
            Device::Cpu => {
                tracing::info!("Initializing ONNX Runtime with CPU execution provider");
            }
        }

        let session = builder.commit_from_file(path)?;
        let metadata = read_metadata(&session);

        tracing::info!(
            path = %path.display(),
            classes = metadata.names.len(),
            imgsz = ?metadata.imgsz,
            "Model loaded"
        );
        Ok(Self { session, metadata })
    }
}

impl InferenceBackend for OrtBackend {
    fn load_model(config: &DetectorConfig) -> anyhow::Result<Self> {
        Self::load_model_with_provider(&config.model_path, config.device, config.intra_threads)
    }

    fn infer(&mut self, images: &Array<f32, IxDyn>) -> anyhow::Result<InferenceOutput> {
        let outputs = self.session.run(ort::inputs![
            INPUT_NAME => TensorRef::from_array_view(images.view())?
        ])?;

        let predictions = outputs[OUTPUT_NAME].try_extract_array::<f32>()?;

        Ok(InferenceOutput {
            predictions: predictions.into_owned(),
        })
    }

    fn metadata(&self) -> ModelMetadata {
        self.metadata.clone()
    }
}

/// Ultralytics exports store `names` and `imgsz` as custom metadata keys.
/// Missing or malformed entries leave the defaults in place.
fn read_metadata(session: &Session) -> ModelMetadata {
    let Ok(model_metadata) = session.metadata() else {
        tracing::debug!("Model carries no metadata");
        return ModelMetadata::default();
    };

    let names = match model_metadata.custom("names") {
        Some(raw) => ClassNames::from_metadata(&raw).unwrap_or_else(|| {
            tracing::warn!("Could not parse class names from model metadata");
            ClassNames::default()
        }),
        _ => ClassNames::default(),
    };

    let imgsz = match model_metadata.custom("imgsz") {
        Some(raw) => parse_imgsz(&raw),
        _ => None,
    };

    ModelMetadata { names, imgsz }
}
