use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

use crate::config::ObservabilityConfig;

/// Initialize structured logging.
///
/// `RUST_LOG` wins over the configured level. Logs go to stderr so command
/// output on stdout stays clean.
pub fn init_telemetry(settings: &ObservabilityConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.log_level))?;

    if settings.json_logs {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_writer(std::io::stderr),
            )
            .with(filter)
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .with(filter)
            .try_init()?;
    }

    tracing::debug!("SmoothTennis telemetry initialized");
    Ok(())
}

/// Generate a correlation ID for linking related operations
pub fn generate_correlation_id() -> String {
    Uuid::new_v4().to_string()
}

/// Create a span with common account provisioning attributes
pub fn create_provisioning_span(
    operation: &str,
    email: &str,
    correlation_id: &str,
) -> tracing::Span {
    tracing::info_span!(
        "account_provisioning",
        operation = operation,
        user.email = email,
        correlation.id = correlation_id,
        otel.kind = "internal"
    )
}

/// Shutdown telemetry gracefully
pub fn shutdown_telemetry() {
    tracing::debug!("SmoothTennis telemetry shutdown complete");
}
