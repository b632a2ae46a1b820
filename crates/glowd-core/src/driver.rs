//! LED strip driver — serial connection, frame state, and the update loop.
//!
//! The driver owns the Adalight [`FrameBuffer`] and the serial port handle
//! behind a single lock, and runs a background task that retransmits the
//! current frame at a fixed cadence. Command handlers mutate the frame
//! through [`fill`](LedDriver::fill) / [`set_colors`](LedDriver::set_colors)
//! without ever touching the serial device; the next tick picks the change
//! up.

use std::io::Write;
use std::sync::{Arc, Mutex};

use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, trace, warn};

use glowd_config::StripConfig;

use crate::frame::{Color, FrameBuffer, FrameError};

/// Errors from the LED driver.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("LED count must be between 1 and 255, got {0}")]
    InvalidLedCount(usize),

    #[error("serial port path must not be empty")]
    EmptyPortName,

    #[error("serial port {port} is busy or access was denied: {source}")]
    PortBusy {
        port: String,
        #[source]
        source: serialport::Error,
    },

    #[error("no device at serial port {port}: {source}")]
    DeviceAbsent {
        port: String,
        #[source]
        source: serialport::Error,
    },

    #[error("failed to open serial port {port}: {source}")]
    Open {
        port: String,
        #[source]
        source: serialport::Error,
    },

    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error("driver state lock poisoned")]
    LockPoisoned,
}

/// Frame state and serial handle, guarded by the driver's single lock.
struct DriverState {
    frame: FrameBuffer,
    port: Option<Box<dyn SerialPort>>,
}

/// Handle to a running update loop.
struct UpdateLoopHandle {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// Driver for an Adalight LED strip on a serial port.
pub struct LedDriver {
    config: StripConfig,
    state: Arc<Mutex<DriverState>>,
    update_loop: tokio::sync::Mutex<Option<UpdateLoopHandle>>,
}

impl LedDriver {
    /// Create a driver for the given strip configuration.
    ///
    /// Rejects an LED count outside 1–255 or an empty serial port path;
    /// no half-initialized driver is ever produced.
    pub fn new(config: &StripConfig) -> Result<Self, DriverError> {
        if !(1..=255).contains(&config.led_count) {
            return Err(DriverError::InvalidLedCount(config.led_count));
        }
        if config.serial_port.is_empty() {
            return Err(DriverError::EmptyPortName);
        }

        Ok(Self {
            config: config.clone(),
            state: Arc::new(Mutex::new(DriverState {
                frame: FrameBuffer::new(config.led_count),
                port: None,
            })),
            update_loop: tokio::sync::Mutex::new(None),
        })
    }

    /// Number of LEDs this driver addresses.
    pub fn led_count(&self) -> usize {
        self.config.led_count
    }

    /// Open the serial connection. A no-op when already open.
    ///
    /// On failure the driver stays usable and the call may be retried; the
    /// error variant classifies the cause (port busy, device absent, other).
    pub fn open(&self) -> Result<(), DriverError> {
        let mut state = self.state.lock().map_err(|_| DriverError::LockPoisoned)?;
        if state.port.is_some() {
            debug!(port = %self.config.serial_port, "serial port already open");
            return Ok(());
        }

        info!(
            port = %self.config.serial_port,
            baud = self.config.baud_rate,
            "opening serial port"
        );
        let port = serialport::new(&self.config.serial_port, self.config.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(self.config.serial_timeout())
            .open()
            .map_err(|e| classify_open_error(&self.config.serial_port, e))?;

        state.port = Some(port);
        Ok(())
    }

    /// Whether the serial connection is currently open.
    pub fn is_open(&self) -> bool {
        self.state
            .lock()
            .map(|state| state.port.is_some())
            .unwrap_or(false)
    }

    /// Close the serial connection, if open. Safe to call repeatedly.
    pub fn close(&self) {
        if let Ok(mut state) = self.state.lock() {
            if state.port.take().is_some() {
                info!(port = %self.config.serial_port, "closing serial port");
            }
        }
    }

    /// Start the background update loop.
    ///
    /// Every tick the loop locks the driver state and, when the connection
    /// is open, writes the full current frame to the serial device. A write
    /// failure is logged and the loop carries on at the next tick; a closed
    /// connection just waits for the next tick. Calling this while a loop
    /// is already running is a warning no-op.
    pub async fn start_update_loop(&self) {
        let mut slot = self.update_loop.lock().await;
        if let Some(handle) = slot.as_ref() {
            if !handle.task.is_finished() {
                warn!("update loop already running");
                return;
            }
        }

        let (stop_tx, mut stop_rx) = watch::channel(false);
        let state = Arc::clone(&self.state);
        let interval = self.config.update_interval();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                    }
                    _ = ticker.tick() => transmit_frame(&state),
                }
            }
            debug!("update loop exited");
        });

        *slot = Some(UpdateLoopHandle { stop_tx, task });
        info!(interval_ms = interval.as_millis() as u64, "update loop started");
    }

    /// Stop the update loop and wait for the task to finish.
    ///
    /// Returns only after the loop has observably stopped transmitting.
    /// A no-op when no loop is running.
    pub async fn stop_update_loop(&self) {
        let mut slot = self.update_loop.lock().await;
        if let Some(handle) = slot.take() {
            let _ = handle.stop_tx.send(true);
            let _ = handle.task.await;
            info!("update loop stopped");
        }
    }

    /// Whether the update loop is currently running.
    pub async fn is_update_loop_running(&self) -> bool {
        self.update_loop
            .lock()
            .await
            .as_ref()
            .is_some_and(|handle| !handle.task.is_finished())
    }

    /// Set every LED to the same color.
    ///
    /// No serial I/O happens on this path; the next update-loop tick
    /// transmits the new frame.
    pub fn fill(&self, color: Color) -> Result<(), DriverError> {
        let mut state = self.state.lock().map_err(|_| DriverError::LockPoisoned)?;
        state.frame.fill(color);
        debug!(leds = self.config.led_count, color = %color, "filled strip");
        Ok(())
    }

    /// Replace all LED colors at once, in strip order.
    ///
    /// Fails without mutating any state when the slice length differs from
    /// the configured LED count.
    pub fn set_colors(&self, colors: &[Color]) -> Result<(), DriverError> {
        let mut state = self.state.lock().map_err(|_| DriverError::LockPoisoned)?;
        state.frame.set_colors(colors)?;
        debug!(leds = colors.len(), "replaced strip colors");
        Ok(())
    }

    /// Snapshot of the colors currently encoded in the frame.
    pub fn colors(&self) -> Result<Vec<Color>, DriverError> {
        let state = self.state.lock().map_err(|_| DriverError::LockPoisoned)?;
        Ok(state.frame.colors().to_vec())
    }

    /// Snapshot of the complete wire frame (header + triples).
    pub fn frame_snapshot(&self) -> Result<Vec<u8>, DriverError> {
        let state = self.state.lock().map_err(|_| DriverError::LockPoisoned)?;
        Ok(state.frame.as_bytes().to_vec())
    }

    /// Tear the driver down: stop the update loop, blank the strip, close
    /// the connection. Safe to call repeatedly.
    pub async fn shutdown(&self) {
        self.stop_update_loop().await;

        // Best effort: leave the strip dark on exit.
        if let Ok(mut state) = self.state.lock() {
            if let Some(port) = state.port.as_mut() {
                let blank = FrameBuffer::new(self.config.led_count);
                let _ = port.write_all(blank.as_bytes());
                let _ = port.flush();
            }
        }

        self.close();
    }
}

/// One update-loop tick: write the current frame if the port is open.
///
/// The lock covers only the buffer read and the serial write, never the
/// tick sleep, so command handlers are not blocked for the interval.
fn transmit_frame(state: &Mutex<DriverState>) {
    let mut guard = match state.lock() {
        Ok(guard) => guard,
        Err(_) => {
            error!("driver state lock poisoned; skipping tick");
            return;
        }
    };
    let DriverState { frame, port } = &mut *guard;
    let Some(port) = port.as_mut() else {
        return;
    };

    match port.write_all(frame.as_bytes()).and_then(|()| port.flush()) {
        Ok(()) => trace!(bytes = frame.as_bytes().len(), "frame transmitted"),
        Err(e) => warn!(error = %e, "failed to write frame to serial port"),
    }
}

fn classify_open_error(port: &str, err: serialport::Error) -> DriverError {
    match err.kind() {
        serialport::ErrorKind::NoDevice => DriverError::DeviceAbsent {
            port: port.to_string(),
            source: err,
        },
        serialport::ErrorKind::Io(std::io::ErrorKind::PermissionDenied) => {
            DriverError::PortBusy {
                port: port.to_string(),
                source: err,
            }
        }
        _ => DriverError::Open {
            port: port.to_string(),
            source: err,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use glowd_config::StripConfig;
    use pretty_assertions::assert_eq;

    fn test_strip(led_count: usize) -> StripConfig {
        StripConfig {
            led_count,
            update_interval_ms: 10,
            ..StripConfig::default()
        }
    }

    #[test]
    fn test_new_rejects_bad_led_count() {
        for led_count in [0usize, 256, 1000] {
            let result = LedDriver::new(&test_strip(led_count));
            assert!(matches!(result, Err(DriverError::InvalidLedCount(_))));
        }
    }

    #[test]
    fn test_new_rejects_empty_port() {
        let config = StripConfig {
            serial_port: String::new(),
            ..StripConfig::default()
        };
        assert!(matches!(
            LedDriver::new(&config),
            Err(DriverError::EmptyPortName)
        ));
    }

    #[test]
    fn test_open_missing_device_fails_and_driver_stays_usable() {
        let config = StripConfig {
            serial_port: "/dev/glowd-test-no-such-port".to_string(),
            ..test_strip(4)
        };
        let driver = LedDriver::new(&config).unwrap();

        assert!(driver.open().is_err());
        assert!(!driver.is_open());
        // Retry allowed; still fails, still usable.
        assert!(driver.open().is_err());
        driver.fill(Color::new(1, 2, 3)).unwrap();
        assert_eq!(driver.colors().unwrap(), vec![Color::new(1, 2, 3); 4]);
    }

    #[test]
    fn test_close_is_idempotent() {
        let driver = LedDriver::new(&test_strip(4)).unwrap();
        driver.close();
        driver.close();
        assert!(!driver.is_open());
    }

    #[test]
    fn test_fill_matches_uniform_set_colors() {
        let color = Color::new(10, 20, 30);
        let filled = LedDriver::new(&test_strip(8)).unwrap();
        filled.fill(color).unwrap();

        let set = LedDriver::new(&test_strip(8)).unwrap();
        set.set_colors(&vec![color; 8]).unwrap();

        assert_eq!(
            filled.frame_snapshot().unwrap(),
            set.frame_snapshot().unwrap()
        );
    }

    #[test]
    fn test_set_colors_count_mismatch_leaves_state_unchanged() {
        let driver = LedDriver::new(&test_strip(4)).unwrap();
        driver.fill(Color::new(5, 5, 5)).unwrap();
        let before = driver.frame_snapshot().unwrap();

        let result = driver.set_colors(&[Color::new(1, 1, 1); 2]);
        assert!(matches!(
            result,
            Err(DriverError::Frame(FrameError::CountMismatch { .. }))
        ));
        assert_eq!(driver.frame_snapshot().unwrap(), before);
    }

    #[test]
    fn test_concurrent_fills_never_tear_the_frame() {
        let driver = Arc::new(LedDriver::new(&test_strip(32)).unwrap());
        let palette = [
            Color::new(255, 0, 0),
            Color::new(0, 255, 0),
            Color::new(0, 0, 255),
            Color::new(255, 255, 0),
        ];

        let writers: Vec<_> = palette
            .iter()
            .map(|&color| {
                let driver = Arc::clone(&driver);
                std::thread::spawn(move || {
                    for _ in 0..200 {
                        driver.fill(color).unwrap();
                    }
                })
            })
            .collect();

        // Observe snapshots while the writers race; every snapshot must be
        // uniform — one writer's output, never a mix.
        for _ in 0..500 {
            let colors = driver.colors().unwrap();
            let first = colors[0];
            assert!(colors.iter().all(|&c| c == first));
            assert!(first == Color::BLACK || palette.contains(&first));
        }

        for writer in writers {
            writer.join().unwrap();
        }
    }

    #[tokio::test]
    async fn test_update_loop_start_is_idempotent() {
        let driver = LedDriver::new(&test_strip(4)).unwrap();

        driver.start_update_loop().await;
        driver.start_update_loop().await;
        assert!(driver.is_update_loop_running().await);

        driver.stop_update_loop().await;
        assert!(!driver.is_update_loop_running().await);
    }

    #[tokio::test]
    async fn test_update_loop_stop_is_idempotent() {
        let driver = LedDriver::new(&test_strip(4)).unwrap();
        driver.stop_update_loop().await;

        driver.start_update_loop().await;
        driver.stop_update_loop().await;
        driver.stop_update_loop().await;
        assert!(!driver.is_update_loop_running().await);
    }

    #[tokio::test]
    async fn test_update_loop_ticks_with_closed_port() {
        let driver = LedDriver::new(&test_strip(4)).unwrap();
        driver.start_update_loop().await;

        // A few ticks with no port open must not kill the loop.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(driver.is_update_loop_running().await);

        driver.fill(Color::new(7, 7, 7)).unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(driver.is_update_loop_running().await);

        driver.stop_update_loop().await;
    }

    #[tokio::test]
    async fn test_shutdown_is_idempotent() {
        let driver = LedDriver::new(&test_strip(4)).unwrap();
        driver.start_update_loop().await;

        driver.shutdown().await;
        driver.shutdown().await;
        assert!(!driver.is_update_loop_running().await);
        assert!(!driver.is_open());
    }
}
