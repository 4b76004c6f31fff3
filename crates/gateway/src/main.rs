use gateway::{AppState, GatewayConfig, initialize, logging::setup_logging, run_server};
use inference::{ModelHost, backend::ort::OrtBackend};
use std::process::ExitCode;
use std::sync::Arc;

#[tokio::main]
async fn main() -> ExitCode {
    let config = match GatewayConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    let _telemetry = match setup_logging(&config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(
        environment = config.environment.as_str(),
        addr = %config.addr,
        "Starting gateway"
    );

    let host = Arc::new(ModelHost::new());
    if let Err(e) = initialize::<OrtBackend>(&host, &config.detector) {
        tracing::error!(error = %e, "Model initialization failed");
        return ExitCode::FAILURE;
    }

    let state = AppState::new(host);
    if let Err(e) = run_server(&config, state).await {
        tracing::error!(error = %e, "Server error");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
