use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::configuration::TelemetrySettings;

/// Install the global `tracing` subscriber.
/// `RUST_LOG` takes precedence over the configured filter.
pub fn init_telemetry(settings: &TelemetrySettings) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    if settings.json {
        registry
            .with(fmt::layer().with_writer(std::io::stdout).json())
            .init();
    } else {
        registry.with(fmt::layer().with_writer(std::io::stdout)).init();
    }
}
