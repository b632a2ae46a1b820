//! Command listener — accepts client connections on a Unix domain socket
//! and dispatches each received line through the [`CommandProcessor`].
//!
//! Each accepted connection gets its own handler task; the number of live
//! connections is bounded by a semaphore. Replies on one connection are
//! sent in request order (read → process → write, no pipelining).

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{Semaphore, broadcast};
use tracing::{debug, error, info, warn};

use crate::command::CommandProcessor;
use crate::daemon::ShutdownSignal;

/// Pause after an accept-level failure before retrying, so a persistent
/// error does not turn into a tight spin.
const ACCEPT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Run the command listener on the given Unix socket path.
///
/// Removes any stale socket file before binding and cleans it up on exit.
/// Accepts connections until the shutdown signal is received; in-flight
/// connection handlers run to natural completion (client disconnect).
pub async fn serve(
    socket_path: PathBuf,
    processor: Arc<CommandProcessor>,
    max_connections: usize,
    mut shutdown_rx: broadcast::Receiver<ShutdownSignal>,
) -> Result<(), std::io::Error> {
    // Remove stale socket file if it exists
    if socket_path.exists() {
        std::fs::remove_file(&socket_path)?;
    }

    // Ensure parent directory exists
    if let Some(parent) = socket_path.parent() {
        std::fs::create_dir_all(parent).ok();
    }

    let listener = UnixListener::bind(&socket_path)?;
    info!(path = %socket_path.display(), "command listener ready");

    let limiter = Arc::new(Semaphore::new(max_connections));

    loop {
        // Wait for a free connection slot before accepting.
        let permit = tokio::select! {
            _ = shutdown_rx.recv() => break,
            permit = Arc::clone(&limiter).acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => break,
            },
        };

        tokio::select! {
            _ = shutdown_rx.recv() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, _addr)) => {
                    let processor = Arc::clone(&processor);
                    tokio::spawn(async move {
                        handle_client(stream, processor).await;
                        drop(permit);
                    });
                }
                Err(e) => {
                    error!(error = %e, "failed to accept client connection");
                    drop(permit);
                    tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
                }
            },
        }
    }

    info!("command listener stopped");
    std::fs::remove_file(&socket_path).ok();
    Ok(())
}

/// Serve one client connection: read a line, dispatch it, write the reply,
/// until the client closes the stream.
async fn handle_client(stream: UnixStream, processor: Arc<CommandProcessor>) {
    debug!("client connected");
    let (read_half, mut write_half) = stream.into_split();
    let mut lines = BufReader::new(read_half).lines();

    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                debug!(command = %line, "received command");
                let mut reply = processor.process(&line);
                reply.push('\n');
                if let Err(e) = write_half.write_all(reply.as_bytes()).await {
                    warn!(error = %e, "failed to write reply");
                    break;
                }
            }
            Ok(None) => {
                debug!("client disconnected");
                break;
            }
            Err(e) => {
                warn!(error = %e, "client connection error");
                break;
            }
        }
    }
}
