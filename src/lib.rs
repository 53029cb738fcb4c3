pub mod config;
pub mod models;
pub mod storage; // Remote shared-folder access (Dropbox, in-memory)
pub mod pipeline;
pub mod notify; // Bitrix24 webhook summaries

use tracing_subscriber::EnvFilter;

/// Install the global `tracing` subscriber.
///
/// `RUST_LOG` wins over [`config::default_log_filter`]. Calling it again after a
/// subscriber is installed is a no-op.
pub fn init_tracing() {
    let installed = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .try_init()
        .is_ok();

    if installed {
        tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);
    }
}
