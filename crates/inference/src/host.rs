use crate::detector::{DetectionOutput, Detector};
use crate::errors::InferenceError;
use image::RgbImage;
use std::sync::{Arc, PoisonError, RwLock};

/// Externally visible lifecycle of the hosted model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostStatus {
    Uninitialized,
    Ready,
    Degraded,
}

impl HostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HostStatus::Uninitialized => "uninitialized",
            HostStatus::Ready => "ready",
            HostStatus::Degraded => "degraded",
        }
    }
}

enum HostState {
    Uninitialized,
    Ready(Arc<dyn Detector>),
    Degraded,
}

/// Owns the single detector instance of the process.
///
/// Starts `Uninitialized`, becomes `Ready` once a detector is installed and
/// `Degraded` if it is taken out of service.
pub struct ModelHost {
    state: RwLock<HostState>,
}

impl Default for ModelHost {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelHost {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(HostState::Uninitialized),
        }
    }

    pub fn with_detector(detector: Arc<dyn Detector>) -> Self {
        Self {
            state: RwLock::new(HostState::Ready(detector)),
        }
    }

    pub fn install(&self, detector: Arc<dyn Detector>) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = HostState::Ready(detector);
        tracing::info!("Model host ready");
    }

    pub fn degrade(&self, reason: impl Into<String>) {
        let reason = reason.into();
        tracing::error!(reason = %reason, "Model host degraded");
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = HostState::Degraded;
    }

    pub fn status(&self) -> HostStatus {
        match &*self.state.read().unwrap_or_else(PoisonError::into_inner) {
            HostState::Uninitialized => HostStatus::Uninitialized,
            HostState::Ready(_) => HostStatus::Ready,
            HostState::Degraded => HostStatus::Degraded,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.status() == HostStatus::Ready
    }

    /// Shared handle to the detector, for callers that run it elsewhere
    /// (e.g. on a blocking thread pool).
    pub fn detector(&self) -> Result<Arc<dyn Detector>, InferenceError> {
        match &*self.state.read().unwrap_or_else(PoisonError::into_inner) {
            HostState::Ready(detector) => Ok(Arc::clone(detector)),
            _ => Err(InferenceError::NotLoaded),
        }
    }

    pub fn infer(&self, image: &RgbImage) -> Result<DetectionOutput, InferenceError> {
        let detector = self.detector()?;
        detector.detect(image).map_err(InferenceError::Inference)
    }
}
