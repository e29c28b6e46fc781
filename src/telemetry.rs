use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over `level`; `verbose` lowers the default to
/// `debug`. JSON output carries the current span and its parents.
pub fn init_telemetry(level: &str, json: bool, verbose: bool) -> Result<()> {
    let default_level = if verbose { "debug" } else { level };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))?;

    let json_layer = json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
    });
    let text_layer = (!json).then(|| tracing_subscriber::fmt::layer().with_target(false));

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .try_init()?;

    tracing::debug!("Telemetry initialized");
    Ok(())
}

/// Generate a correlation ID for linking the records of one run
pub fn generate_correlation_id() -> String {
    Uuid::new_v4().to_string()
}

/// Root span of a migration run
pub fn migration_span(correlation_id: &str) -> tracing::Span {
    tracing::info_span!("migration", correlation.id = correlation_id)
}

/// Span attached to one organization view, e.g. `role = "source"`
pub fn organization_span(role: &'static str, profile: &str) -> tracing::Span {
    tracing::info_span!("organization", role = role, profile = profile)
}
