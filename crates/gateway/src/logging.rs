use crate::config::GatewayConfig;
use common::TelemetryGuard;

/// Install logging, exporting through OTLP when an endpoint is configured.
///
/// The returned guard must stay alive for the lifetime of the process.
pub fn setup_logging(config: &GatewayConfig) -> anyhow::Result<Option<TelemetryGuard>> {
    match &config.otel_endpoint {
        Some(endpoint) => {
            TelemetryGuard::init(env!("CARGO_PKG_NAME"), endpoint, config.environment).map(Some)
        }
        None => {
            common::setup_logging(config.environment)?;
            Ok(None)
        }
    }
}
