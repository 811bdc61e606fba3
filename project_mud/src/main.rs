mod config;
mod shutdown;

use std::sync::Arc;
use std::time::Duration;

use mud::{GameContext, PlayerRepo, Renderer};
use persistence::{MemoryStore, PlayerStore};
use player_db::PlayerDb;
use tokio::net::TcpListener;

use crate::config::{parse_cli_args, DatabaseSection, ServerConfig};
use crate::shutdown::shutdown_channel;

#[tokio::main]
async fn main() {
    observability::init_logging();

    let config = parse_cli_args();
    tracing::info!("MUD Server starting...");

    let ctx = match build_context(&config) {
        Ok(ctx) => ctx,
        Err(e) => {
            tracing::error!("Failed to start: {}", e);
            std::process::exit(1);
        }
    };

    let listener = match TcpListener::bind(&config.net.telnet_addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!(addr = %config.net.telnet_addr, "Failed to bind: {}", e);
            std::process::exit(1);
        }
    };

    let (shutdown_tx, shutdown_rx) = shutdown_channel();
    let session_config = config.session_config();
    let mut server = tokio::spawn(mud::serve(
        listener,
        ctx.clone(),
        session_config,
        config.net.max_connections,
        shutdown_rx.into_inner(),
    ));

    tokio::select! {
        _ = shutdown::wait_for_signal() => {
            tracing::info!("Shutdown signal received, stopping server...");
            shutdown_tx.trigger();
            mud::shutdown_sessions(&ctx, session_config.drain_timeout).await;
            let _ = tokio::time::timeout(Duration::from_millis(500), &mut server).await;
        }
        res = &mut server => match res {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!("TCP server error: {}", e),
            Err(e) => tracing::error!("TCP server task failed: {}", e),
        },
    }

    tracing::info!("Server stopped.");
}

fn open_store(db: &DatabaseSection) -> Result<Arc<dyn PlayerStore>, player_db::PlayerDbError> {
    if db.in_memory {
        tracing::warn!("Using in-memory player store; characters will not survive a restart");
        return Ok(Arc::new(MemoryStore::new()));
    }
    let store = PlayerDb::open(&db.path)?;
    tracing::info!(path = %db.path, players = store.count()?, "Player database opened");
    Ok(Arc::new(store))
}

fn build_context(config: &ServerConfig) -> Result<GameContext, Box<dyn std::error::Error>> {
    let store = open_store(&config.database)?;
    let modes = mud::standard_modes()?;
    let renderer = Renderer::new(config.template_dir());
    if let Some(dir) = config.template_dir() {
        tracing::info!(dir = %dir.display(), "Template overrides enabled");
    }
    Ok(GameContext::new(modes, PlayerRepo::new(store), renderer))
}
