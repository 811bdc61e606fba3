use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{watch, Semaphore};

const SERVER_FULL: &[u8] = b"The server is full. Please try again later.\n";

/// Run the TCP server, handing each accepted connection to `handler` on its
/// own task. At most `max_connections` handlers run at once; extra clients
/// get a notice and are closed. Returns when `shutdown` flips to true.
pub async fn run_tcp_server<F, Fut>(
    listener: TcpListener,
    max_connections: usize,
    mut shutdown: watch::Receiver<bool>,
    handler: F,
) -> Result<(), std::io::Error>
where
    F: Fn(TcpStream, SocketAddr) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let local = listener.local_addr()?;
    let slots = Arc::new(Semaphore::new(max_connections.max(1)));
    tracing::info!(addr = %local, max_connections, "TCP server listening");

    loop {
        let accepted = tokio::select! {
            res = listener.accept() => res,
            _ = shutdown.wait_for(|stop| *stop) => {
                tracing::info!(addr = %local, "TCP server stopping");
                return Ok(());
            }
        };

        let (stream, peer) = match accepted {
            Ok(conn) => conn,
            Err(e) => {
                tracing::warn!("error accepting connection: {}", e);
                tokio::time::sleep(Duration::from_millis(100)).await;
                continue;
            }
        };

        let permit = match Arc::clone(&slots).try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                tracing::warn!(%peer, "Connection limit reached, rejecting");
                tokio::spawn(reject(stream));
                continue;
            }
        };

        tracing::info!(%peer, "New connection");
        let session = handler(stream, peer);
        tokio::spawn(async move {
            session.await;
            drop(permit);
            tracing::debug!(%peer, "Connection slot released");
        });
    }
}

async fn reject(mut stream: TcpStream) {
    let _ = stream.write_all(SERVER_FULL).await;
    let _ = stream.shutdown().await;
}
