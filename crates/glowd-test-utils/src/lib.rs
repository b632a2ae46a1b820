#![deny(unsafe_code)]

//! Shared test utilities for the glowd workspace.
//!
//! Provides reusable fixtures, config builders, and tracing helpers so that
//! individual crate tests stay concise and consistent.
//!
//! Add this crate as a `[dev-dependency]` in any workspace member:
//!
//! ```toml
//! [dev-dependencies]
//! glowd-test-utils = { workspace = true }
//! ```

pub mod config;
pub mod listener;
pub mod tracing_setup;
