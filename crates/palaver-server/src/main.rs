use tracing::info;
use tracing_subscriber::EnvFilter;

use palaver_server::{server, ServerConfig, ServerState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,palaver_server=debug")),
        )
        .init();

    info!("Starting palaver chat server v{}", env!("CARGO_PKG_VERSION"));

    let config = ServerConfig::from_env();
    info!(?config, "Loaded configuration");

    let state = ServerState::new(config)?;
    let listener = server::bind(&state.config)?;
    info!(addr = %listener.local_addr()?, "listening");

    tokio::select! {
        result = server::serve(state, listener) => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
