use std::io;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use observability::SessionSummary;
use session::{outbox, OutboxReceiver, Player};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::watch;

use net::LineReader;

use crate::context::GameContext;
use crate::dispatch::{handle_message, logout, start};

pub const ERROR_NOTICE: &str = "We encountered an error and are logging you out.";
pub const TRANSPORT_NOTICE: &str = "Connection error, logging you out.";
pub const SHUTDOWN_NOTICE: &str = "The server is shutting down. Your character has been saved.";

#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    pub outbox_capacity: usize,
    pub max_input_length: usize,
    /// How long teardown waits for queued output to reach the client.
    pub drain_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            outbox_capacity: 64,
            max_input_length: net::MAX_LINE_LEN,
            drain_timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// The player used `quit`.
    Quit,
    /// The client hung up.
    Disconnected,
    TransportError,
    HandlerError,
    /// The outbound queue was closed from outside, e.g. a newer login took the name.
    Closed,
}

impl ExitReason {
    pub fn as_str(self) -> &'static str {
        match self {
            ExitReason::Quit => "quit",
            ExitReason::Disconnected => "disconnected",
            ExitReason::TransportError => "transport error",
            ExitReason::HandlerError => "handler error",
            ExitReason::Closed => "closed",
        }
    }

    pub fn is_clean(self) -> bool {
        !matches!(self, ExitReason::TransportError | ExitReason::HandlerError)
    }
}

/// Ensure a message ends in exactly one newline.
fn with_newline(msg: &str) -> String {
    let mut out = msg.trim_end_matches(['\r', '\n']).to_string();
    out.push('\n');
    out
}

async fn write_loop<W>(mut writer: W, mut rx: OutboxReceiver) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(msg) = rx.recv().await {
        writer.write_all(with_newline(&msg).as_bytes()).await?;
        writer.flush().await?;
    }
    writer.shutdown().await
}

/// Drive one connection from splash to teardown.
///
/// The reader side runs here; output goes through the player's outbox to a
/// spawned writer task. Whatever ends the session, the player is logged out
/// and the writer gets up to `drain_timeout` to flush before it is dropped.
pub async fn run_session<S>(
    stream: S,
    peer: Option<SocketAddr>,
    ctx: GameContext,
    config: SessionConfig,
) -> ExitReason
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let started = Instant::now();
    let (read_half, write_half) = tokio::io::split(stream);
    let (tx, rx) = outbox(config.outbox_capacity);

    let mut player = Player::new(tx.clone());
    if let Some(peer) = peer {
        player = player.with_peer(peer);
    }
    let session = player.session_id;
    tracing::info!(session = %session, peer = ?peer, "Session started");

    let mut writer = tokio::spawn(write_loop(write_half, rx));
    let splash = start(&mut player, &ctx);
    let _ = tx.push(splash).await;

    let mut reader = LineReader::new(read_half, config.max_input_length);
    let mut lines: u64 = 0;
    let reason = loop {
        let line = tokio::select! {
            res = reader.next_line() => res,
            _ = tx.closed() => break ExitReason::Closed,
        };

        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => break ExitReason::Disconnected,
            Err(e) => {
                tracing::warn!(player = %player.short_id(), "read error: {}", e);
                let _ = tx.try_push(TRANSPORT_NOTICE);
                break ExitReason::TransportError;
            }
        };
        lines += 1;

        match handle_message(&mut player, &line, &ctx) {
            Ok(res) => {
                let exit = res.is_exit();
                if !res.text.is_empty() && tx.push(res.text).await.is_err() {
                    break ExitReason::Closed;
                }
                if exit {
                    break ExitReason::Quit;
                }
            }
            Err(e) => {
                tracing::error!(player = %player.short_id(), "handler error: {}", e);
                let _ = tx.try_push(ERROR_NOTICE);
                break ExitReason::HandlerError;
            }
        }
    };

    logout(&mut player, &ctx);
    drop(tx);

    match tokio::time::timeout(config.drain_timeout, &mut writer).await {
        Ok(Ok(Ok(()))) => {}
        Ok(Ok(Err(e))) => tracing::debug!(player = %player.short_id(), "write error: {}", e),
        Ok(Err(e)) => tracing::warn!(player = %player.short_id(), "writer task failed: {}", e),
        Err(_) => {
            tracing::warn!(player = %player.short_id(), "output did not drain in time, dropping it");
            writer.abort();
        }
    }

    SessionSummary {
        session: session.to_string(),
        player: player.short_id(),
        lines,
        duration_ms: started.elapsed().as_millis(),
        reason: reason.as_str(),
        clean: reason.is_clean(),
    }
    .log();
    reason
}

/// Accept telnet clients on `listener` until `shutdown` flips.
pub async fn serve(
    listener: TcpListener,
    ctx: GameContext,
    config: SessionConfig,
    max_connections: usize,
    shutdown: watch::Receiver<bool>,
) -> io::Result<()> {
    net::run_tcp_server(listener, max_connections, shutdown, move |stream, peer| {
        let ctx = ctx.clone();
        async move {
            run_session(stream, Some(peer), ctx, config).await;
        }
    })
    .await
}

/// Close every logged-in session so each one saves and deregisters, then
/// wait up to `timeout` for the registry to empty. Returns how many
/// players were still registered when the wait ended.
pub async fn shutdown_sessions(ctx: &GameContext, timeout: Duration) -> usize {
    let online = ctx.players.snapshot();
    tracing::info!(players = online.len(), "Closing online sessions");
    for player in &online {
        let _ = player.outbox.try_push(SHUTDOWN_NOTICE);
        player.outbox.close();
    }

    let deadline = Instant::now() + timeout;
    while !ctx.players.is_empty() && Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    let remaining = ctx.players.len();
    if remaining > 0 {
        tracing::warn!(remaining, "Sessions still open after shutdown timeout");
    }
    remaining
}
