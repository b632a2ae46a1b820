//! Line-oriented IPC between the daemon and local clients.
//!
//! One request line, one reply line, UTF-8 text over a Unix domain socket.

/// Client side — used by the CLI.
pub mod client;
/// Server side — the daemon's command listener.
pub mod server;
