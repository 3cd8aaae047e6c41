use std::borrow::Cow;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::EnvFilter;

/// Build a `tracing` dispatcher:
/// - EnvFilter that respects `RUST_LOG` (takes precedence) and falls back to
///   `default_level` from config
/// - fmt layer writing to stderr, so stdout stays clean for CLI tables and
///   JSON output
pub fn build_dispatch(
    service_name: impl Into<Cow<'static, str>>,
    default_level: &str,
) -> tracing::Dispatch {
    let service_name = service_name.into();
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{default_level},{service_name}={default_level}")));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr);

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer);

    tracing::Dispatch::new(subscriber)
}
