//! Core daemon process — startup, shutdown, and main event loop.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::{JoinError, JoinHandle};
use tracing::{error, info, warn};

use glowd_config::AppConfig;

use crate::command::CommandProcessor;
use crate::driver::{DriverError, LedDriver};
use crate::ipc;

/// Shutdown signal sent via broadcast channel.
#[derive(Debug, Clone)]
pub struct ShutdownSignal;

/// Errors from the daemon runtime.
#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    #[error(transparent)]
    Driver(#[from] DriverError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// The glowd daemon: LED driver, update loop, and command listener.
pub struct Daemon {
    config: AppConfig,
    driver: Arc<LedDriver>,
    shutdown_tx: broadcast::Sender<ShutdownSignal>,
}

impl Daemon {
    /// Create a new daemon instance with the given configuration.
    ///
    /// Fails when the strip configuration cannot back a driver (invalid
    /// LED count, empty port path).
    pub fn new(config: AppConfig) -> Result<Self, DaemonError> {
        let driver = Arc::new(LedDriver::new(&config.strip)?);
        let (shutdown_tx, _) = broadcast::channel(1);

        Ok(Self {
            config,
            driver,
            shutdown_tx,
        })
    }

    /// Run the daemon until a shutdown signal or Ctrl-C is received.
    ///
    /// An unopenable serial port is logged, not fatal: the update loop
    /// runs regardless and transmits once the port is opened.
    pub async fn run(&self) -> Result<(), DaemonError> {
        info!(
            socket = %self.config.daemon.socket_path,
            port = %self.config.strip.serial_port,
            leds = self.config.strip.led_count,
            "glowd daemon starting"
        );

        if let Err(e) = self.driver.open() {
            error!(error = %e, "could not open serial port; frames will not be transmitted");
        }
        self.driver.start_update_loop().await;

        let processor = Arc::new(CommandProcessor::new(Arc::clone(&self.driver)));
        let mut listener: JoinHandle<Result<(), std::io::Error>> =
            tokio::spawn(ipc::server::serve(
                PathBuf::from(&self.config.daemon.socket_path),
                processor,
                self.config.daemon.max_connections,
                self.shutdown_tx.subscribe(),
            ));

        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let listener_finished = tokio::select! {
            _ = shutdown_rx.recv() => {
                info!("shutdown signal received, stopping daemon");
                false
            }
            _ = tokio::signal::ctrl_c() => {
                warn!("Ctrl-C received, initiating graceful shutdown");
                let _ = self.shutdown_tx.send(ShutdownSignal);
                false
            }
            result = &mut listener => {
                warn!("command listener exited, stopping daemon");
                log_listener_exit(result);
                true
            }
        };

        if !listener_finished {
            log_listener_exit(listener.await);
        }
        self.driver.shutdown().await;

        info!("daemon stopped");
        Ok(())
    }

    /// Request a graceful shutdown of the daemon.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(ShutdownSignal);
    }

    /// The LED driver this daemon runs.
    pub fn driver(&self) -> Arc<LedDriver> {
        Arc::clone(&self.driver)
    }

    /// Get a reference to the daemon's configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

fn log_listener_exit(result: Result<Result<(), std::io::Error>, JoinError>) {
    match result {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!(error = %e, "command listener failed"),
        Err(e) => error!(error = %e, "command listener task panicked"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glowd_config::AppConfig;

    #[tokio::test]
    async fn test_daemon_creation() {
        let config = AppConfig::default();
        let daemon = Daemon::new(config).unwrap();
        assert_eq!(daemon.config().strip.led_count, 60);
        assert_eq!(daemon.driver().led_count(), 60);
    }

    #[tokio::test]
    async fn test_daemon_rejects_invalid_strip() {
        let mut config = AppConfig::default();
        config.strip.led_count = 0;
        assert!(Daemon::new(config).is_err());
    }

    #[tokio::test]
    async fn test_daemon_shutdown_before_run() {
        let daemon = Daemon::new(AppConfig::default()).unwrap();

        // Shutdown should not panic even when nothing is running.
        daemon.shutdown();
    }
}
