use common::parse_var;
use inference::DetectorConfig;
use std::env;

pub use common::Environment;

pub const DEFAULT_ADDR: &str = "0.0.0.0:8000";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub environment: Environment,
    pub addr: String,
    pub max_upload_bytes: usize,
    pub otel_endpoint: Option<String>,
    pub detector: DetectorConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            addr: DEFAULT_ADDR.to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            otel_endpoint: None,
            detector: DetectorConfig::default(),
        }
    }
}

impl GatewayConfig {
    /// Load configuration from environment variables with sensible defaults
    pub fn from_env() -> anyhow::Result<Self> {
        let environment = Environment::from_env();

        let addr = env::var("GATEWAY_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_string());

        let max_upload_bytes =
            parse_var("GATEWAY_MAX_UPLOAD_BYTES")?.unwrap_or(DEFAULT_MAX_UPLOAD_BYTES);
        if max_upload_bytes == 0 {
            anyhow::bail!("GATEWAY_MAX_UPLOAD_BYTES must be greater than 0");
        }

        let otel_endpoint = env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
            .ok()
            .filter(|endpoint| !endpoint.trim().is_empty());

        Ok(Self {
            environment,
            addr,
            max_upload_bytes,
            otel_endpoint,
            detector: DetectorConfig::from_env()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear() {
        unsafe {
            env::remove_var("GATEWAY_ADDR");
            env::remove_var("GATEWAY_MAX_UPLOAD_BYTES");
            env::remove_var("OTEL_EXPORTER_OTLP_ENDPOINT");
        }
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear();
        let config = GatewayConfig::from_env().unwrap();

        assert_eq!(config.addr, DEFAULT_ADDR);
        assert_eq!(config.max_upload_bytes, 20_971_520);
        assert!(config.otel_endpoint.is_none());
    }

    #[test]
    #[serial]
    fn test_overrides() {
        clear();
        unsafe {
            env::set_var("GATEWAY_ADDR", "127.0.0.1:9000");
            env::set_var("GATEWAY_MAX_UPLOAD_BYTES", "1024");
            env::set_var("OTEL_EXPORTER_OTLP_ENDPOINT", "http://localhost:4317");
        }

        let config = GatewayConfig::from_env().unwrap();
        assert_eq!(config.addr, "127.0.0.1:9000");
        assert_eq!(config.max_upload_bytes, 1024);
        assert_eq!(
            config.otel_endpoint.as_deref(),
            Some("http://localhost:4317")
        );
        clear();
    }

    #[test]
    #[serial]
    fn test_blank_endpoint_disables_export() {
        clear();
        unsafe { env::set_var("OTEL_EXPORTER_OTLP_ENDPOINT", "  ") };

        let config = GatewayConfig::from_env().unwrap();
        assert!(config.otel_endpoint.is_none());
        clear();
    }

    #[test]
    #[serial]
    fn test_invalid_upload_limit() {
        clear();
        unsafe { env::set_var("GATEWAY_MAX_UPLOAD_BYTES", "lots") };
        assert!(GatewayConfig::from_env().is_err());

        unsafe { env::set_var("GATEWAY_MAX_UPLOAD_BYTES", "0") };
        assert!(GatewayConfig::from_env().is_err());
        clear();
    }
}
