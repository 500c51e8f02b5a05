use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize structured logging for the rig.
///
/// Emits JSON events so the surrounding HTTP layer can relay capture
/// progress; the filter is taken from `RUST_LOG` with an `info` floor.
pub fn init_telemetry() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().json().with_current_span(true))
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("bookrig telemetry initialized");
    Ok(())
}
