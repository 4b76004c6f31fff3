use crate::config::Environment;
use tracing_subscriber::{
    EnvFilter, Layer, Registry,
    layer::{Identity, Layered, SubscriberExt},
    util::SubscriberInitExt,
};

/// Initialize the tracing subscriber: pretty output in development, JSON in
/// production.
///
/// Filtering follows `RUST_LOG` and defaults to `info`.
pub fn setup_logging(environment: Environment) -> anyhow::Result<()> {
    install(environment, Identity::new())
}

/// Install the global subscriber with an extra layer (e.g. OpenTelemetry)
/// stacked between the filter and the formatter.
pub(crate) fn install<L>(environment: Environment, extra: L) -> anyhow::Result<()>
where
    L: Layer<Layered<EnvFilter, Registry>> + Send + Sync + 'static,
{
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = match environment {
        Environment::Production => tracing_subscriber::fmt::layer()
            .json()
            .with_level(true)
            .boxed(),
        Environment::Development => tracing_subscriber::fmt::layer()
            .pretty()
            .with_ansi(true)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(extra)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
