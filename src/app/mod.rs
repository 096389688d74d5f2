pub mod router;
pub mod server;
mod state;
pub mod tracing;

pub use state::{AppState, Collaborators};

use crate::config;
use crate::error::RepError;
use tokio_util::sync::CancellationToken;

/// Application entry point. Initializes tracing and configuration, then serves.
pub async fn run() -> Result<(), RepError> {
    // Handle healthcheck subcommand (for Docker healthcheck in distroless image)
    if std::env::args().nth(1).as_deref() == Some("healthcheck") {
        match crate::healthcheck().await {
            Ok(()) => std::process::exit(0),
            Err(e) => {
                eprintln!("Healthcheck failed: {e}");
                std::process::exit(1)
            }
        }
    }

    tracing::init_tracing();

    let settings = config::get_configuration()?;
    ::tracing::info!(port = settings.http_port, "Loaded settings");

    // Shared shutdown token: used by the sweeper and the server
    let shutdown_token = CancellationToken::new();

    let app_state = AppState::from_settings(&settings, shutdown_token.clone())
        .await
        .map_err(|e| RepError::Config(format!("{e:#}")))?;

    let app = router::router(app_state);

    server::serve(app, settings.http_port, shutdown_token).await
}
