pub mod backend;
pub mod config;
pub mod detector;
pub mod errors;
pub mod host;
pub mod metadata;
pub mod processing;

// Re-export commonly used types for convenience
pub use backend::{InferenceBackend, InferenceOutput};
pub use config::{Device, DetectorConfig};
pub use detector::{DetectionOutput, Detector, Speed, YoloDetector};
pub use errors::InferenceError;
pub use host::{HostStatus, ModelHost};
pub use metadata::ClassNames;
pub use processing::post::Detection;
