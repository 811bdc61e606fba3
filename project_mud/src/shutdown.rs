use tokio::sync::watch;

/// Sender side, held by main.
pub struct ShutdownTx(watch::Sender<bool>);

/// Receiver side, cloned to each subsystem.
#[derive(Clone)]
pub struct ShutdownRx(watch::Receiver<bool>);

pub fn shutdown_channel() -> (ShutdownTx, ShutdownRx) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTx(tx), ShutdownRx(rx))
}

impl ShutdownTx {
    pub fn trigger(&self) {
        self.0.send_replace(true);
    }
}

impl ShutdownRx {
    /// Unwrap into the underlying receiver for crates that take one.
    pub fn into_inner(self) -> watch::Receiver<bool> {
        self.0
    }
}

/// Wait for SIGINT or SIGTERM (Unix) or Ctrl+C (all platforms).
pub async fn wait_for_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match (signal(SignalKind::interrupt()), signal(SignalKind::terminate())) {
            (Ok(mut sigint), Ok(mut sigterm)) => {
                tokio::select! {
                    _ = sigint.recv() => { tracing::info!("Received SIGINT"); }
                    _ = sigterm.recv() => { tracing::info!("Received SIGTERM"); }
                }
            }
            (Err(e), _) | (_, Err(e)) => {
                tracing::warn!("failed to register signal handlers: {}", e);
                ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c().await;
    }
}

async fn ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Received Ctrl+C"),
        Err(e) => {
            tracing::error!("failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
