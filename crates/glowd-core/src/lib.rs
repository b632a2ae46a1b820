#![deny(unsafe_code)]

//! glowd core daemon runtime.
//!
//! Drives an addressable LED strip over a serial link using the Adalight
//! wire protocol, and serves line-oriented text commands from local clients
//! over a Unix domain socket. The CLI is the only intended client; see the
//! `glowd-cli` crate.

/// Command parsing and dispatch.
pub mod command;
/// Async daemon runtime and shutdown signalling.
pub mod daemon;
/// LED strip driver and update loop.
pub mod driver;
/// Adalight frame encoding.
pub mod frame;
/// Line-oriented IPC server and client.
pub mod ipc;

pub use command::CommandProcessor;
pub use daemon::{Daemon, DaemonError, ShutdownSignal};
pub use driver::{DriverError, LedDriver};
pub use frame::{Color, FrameBuffer, FrameError};
pub use ipc::client::{IpcClient, IpcClientError};
