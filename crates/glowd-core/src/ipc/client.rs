//! IPC client — connects to the daemon over the Unix domain socket, sends
//! one command line, and reads back the one-line reply.

use std::path::PathBuf;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tokio::time::timeout;
use tracing::debug;

/// Default client-side connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(5000);

/// Errors from the IPC client.
#[derive(Debug, thiserror::Error)]
pub enum IpcClientError {
    #[error("daemon is not running (socket not found at {0})")]
    NotRunning(PathBuf),

    #[error("timed out connecting to daemon socket at {path} after {timeout:?}")]
    ConnectTimeout { path: PathBuf, timeout: Duration },

    #[error("failed to connect to daemon socket at {path}: {source}")]
    Connect {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("connection closed before a reply was received")]
    ClosedWithoutReply,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl IpcClientError {
    /// Whether this error means the daemon could not be reached at all
    /// (as opposed to a failure while talking to it).
    pub fn is_unreachable(&self) -> bool {
        matches!(
            self,
            IpcClientError::NotRunning(_)
                | IpcClientError::ConnectTimeout { .. }
                | IpcClientError::Connect { .. }
        )
    }
}

/// Client for sending commands to a running glowd daemon.
pub struct IpcClient {
    socket_path: PathBuf,
    connect_timeout: Duration,
}

impl IpcClient {
    /// Create a new client targeting the given socket path.
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Override the connect timeout.
    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    /// Check if the daemon socket exists (daemon is likely running).
    pub fn daemon_available(&self) -> bool {
        self.socket_path.exists()
    }

    /// Send one command line and return the daemon's one-line reply.
    pub async fn send_command(&self, command: &str) -> Result<String, IpcClientError> {
        if !self.daemon_available() {
            return Err(IpcClientError::NotRunning(self.socket_path.clone()));
        }

        let stream = timeout(self.connect_timeout, UnixStream::connect(&self.socket_path))
            .await
            .map_err(|_| IpcClientError::ConnectTimeout {
                path: self.socket_path.clone(),
                timeout: self.connect_timeout,
            })?
            .map_err(|e| IpcClientError::Connect {
                path: self.socket_path.clone(),
                source: e,
            })?;

        debug!(command, "sending command");
        let (read_half, mut write_half) = stream.into_split();
        write_half.write_all(command.as_bytes()).await?;
        write_half.write_all(b"\n").await?;

        let mut lines = BufReader::new(read_half).lines();
        match lines.next_line().await? {
            Some(reply) => Ok(reply),
            None => Err(IpcClientError::ClosedWithoutReply),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use tokio::sync::broadcast;

    use crate::command::CommandProcessor;
    use crate::driver::LedDriver;
    use crate::frame::Color;
    use crate::ipc::server;

    #[test]
    fn test_client_creation() {
        let client = IpcClient::new("/tmp/glowd-test-nonexistent.sock");
        assert!(!client.daemon_available());
    }

    #[tokio::test]
    async fn test_send_to_missing_socket_is_not_running() {
        let client = IpcClient::new("/tmp/glowd-test-nonexistent.sock");
        let result = client.send_command("status").await;
        assert!(matches!(result, Err(IpcClientError::NotRunning(_))));
        assert!(result.unwrap_err().is_unreachable());
    }

    #[tokio::test]
    async fn test_integration_server_client() {
        let config = glowd_config::StripConfig {
            led_count: 8,
            ..glowd_config::StripConfig::default()
        };
        let driver = Arc::new(LedDriver::new(&config).unwrap());
        let processor = Arc::new(CommandProcessor::new(Arc::clone(&driver)));

        let dir = tempfile::TempDir::new().unwrap();
        let sock_path = dir.path().join("glowd-test.sock");

        let (shutdown_tx, _) = broadcast::channel(1);
        let server_handle = tokio::spawn(server::serve(
            sock_path.clone(),
            processor,
            4,
            shutdown_tx.subscribe(),
        ));

        // Give server time to bind
        tokio::time::sleep(Duration::from_millis(100)).await;

        let client = IpcClient::new(&sock_path);
        assert!(client.daemon_available());

        let reply = client.send_command("status").await.unwrap();
        assert_eq!(reply, "Running");

        let reply = client.send_command("fill 10,20,30").await.unwrap();
        assert_eq!(reply, "OK: Filled with RGB(10,20,30)");
        assert_eq!(driver.colors().unwrap(), vec![Color::new(10, 20, 30); 8]);

        let reply = client.send_command("bogus").await.unwrap();
        assert_eq!(reply, "ERROR: Unknown command 'bogus'");

        // Stop the listener and wait for it to clean up the socket file.
        let _ = shutdown_tx.send(crate::daemon::ShutdownSignal);
        let result = tokio::time::timeout(Duration::from_secs(2), server_handle)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());
        assert!(!sock_path.exists());
    }
}
