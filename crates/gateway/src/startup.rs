use inference::{DetectorConfig, InferenceBackend, InferenceError, ModelHost, YoloDetector};
use std::sync::Arc;

/// Load the detector once and hand it to `host`.
///
/// On error the host stays uninitialized; callers are expected to exit
/// rather than serve.
pub fn initialize<B>(host: &ModelHost, config: &DetectorConfig) -> Result<(), InferenceError>
where
    B: InferenceBackend + 'static,
{
    tracing::info!(
        model_path = %config.model_path.display(),
        device = config.device.as_str(),
        "Loading detection model"
    );

    let detector = YoloDetector::<B>::load(config)?;
    host.install(Arc::new(detector));
    Ok(())
}
