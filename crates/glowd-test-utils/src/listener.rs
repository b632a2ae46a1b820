//! Command listener test harness.
//!
//! Spins up the real IPC server on a socket inside a temp directory, backed
//! by a driver whose serial port is never opened, so listener and command
//! behavior can be exercised end-to-end without hardware.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use glowd_config::StripConfig;
use glowd_core::daemon::ShutdownSignal;
use glowd_core::ipc::server;
use glowd_core::{CommandProcessor, IpcClient, LedDriver};

/// A test-scoped command listener with an owned temp directory for the
/// socket file.
///
/// The temp directory is deleted automatically when this value is dropped,
/// guaranteeing cleanup even on panic.
pub struct TestListener {
    pub driver: Arc<LedDriver>,
    pub socket_path: PathBuf,
    shutdown_tx: broadcast::Sender<ShutdownSignal>,
    server: JoinHandle<Result<(), std::io::Error>>,
    _temp_dir: TempDir,
}

impl TestListener {
    /// Start a listener for a strip of `led_count` LEDs.
    pub async fn start(led_count: usize) -> Self {
        Self::start_with_max_connections(led_count, 8).await
    }

    /// Start a listener with an explicit connection bound.
    pub async fn start_with_max_connections(led_count: usize, max_connections: usize) -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let socket_path = temp_dir.path().join("glowd.sock");

        let strip = StripConfig {
            led_count,
            update_interval_ms: 10,
            ..StripConfig::default()
        };
        let driver = Arc::new(LedDriver::new(&strip).expect("failed to create driver"));
        let processor = Arc::new(CommandProcessor::new(Arc::clone(&driver)));

        let (shutdown_tx, _) = broadcast::channel(1);
        let server = tokio::spawn(server::serve(
            socket_path.clone(),
            processor,
            max_connections,
            shutdown_tx.subscribe(),
        ));

        wait_for_socket(&socket_path).await;

        Self {
            driver,
            socket_path,
            shutdown_tx,
            server,
            _temp_dir: temp_dir,
        }
    }

    /// A client pointed at this listener's socket.
    pub fn client(&self) -> IpcClient {
        IpcClient::new(&self.socket_path)
    }

    /// Stop the listener and wait for it to exit.
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(ShutdownSignal);
        let _ = tokio::time::timeout(Duration::from_secs(2), self.server).await;
    }
}

async fn wait_for_socket(path: &PathBuf) {
    for _ in 0..100 {
        if path.exists() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("listener socket {} never appeared", path.display());
}
