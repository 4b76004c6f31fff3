use thiserror::Error;

#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("Failed to load model from {path}: {reason}")]
    ModelLoad { path: String, reason: String },

    #[error("Model not loaded")]
    NotLoaded,

    #[error("Inference failed: {0:#}")]
    Inference(anyhow::Error),
}

impl InferenceError {
    pub fn model_load(path: impl std::fmt::Display, reason: impl std::fmt::Display) -> Self {
        Self::ModelLoad {
            path: path.to_string(),
            reason: reason.to_string(),
        }
    }
}
