//! Command processing — one line of text in, one reply line out.
//!
//! The reply strings are part of the client wire protocol; changing them
//! breaks deployed clients.

use std::sync::Arc;

use tracing::{error, info};

use crate::driver::LedDriver;
use crate::frame::Color;

/// Parses command lines and dispatches them against the LED driver.
///
/// Stateless request→reply logic; safe to share across connection handlers.
pub struct CommandProcessor {
    driver: Arc<LedDriver>,
}

impl CommandProcessor {
    pub fn new(driver: Arc<LedDriver>) -> Self {
        Self { driver }
    }

    /// Process one command line and produce the reply line.
    pub fn process(&self, line: &str) -> String {
        let parts: Vec<&str> = line.split_whitespace().collect();

        let Some(first) = parts.first() else {
            return "ERROR: Empty command".to_string();
        };
        let action = first.to_lowercase();

        match action.as_str() {
            "fill" if parts.len() >= 2 => self.handle_fill(parts[1]),
            "status" => "Running".to_string(),
            "version" => env!("CARGO_PKG_VERSION").to_string(),
            _ => format!("ERROR: Unknown command '{action}'"),
        }
    }

    fn handle_fill(&self, arg: &str) -> String {
        let channels: Vec<&str> = arg.split(',').collect();
        if channels.len() != 3 {
            return "ERROR: Color format should be r,g,b (e.g., 255,0,0)".to_string();
        }

        let (r, g, b) = match (
            channels[0].parse::<u8>(),
            channels[1].parse::<u8>(),
            channels[2].parse::<u8>(),
        ) {
            (Ok(r), Ok(g), Ok(b)) => (r, g, b),
            (Err(e), _, _) | (_, Err(e), _) | (_, _, Err(e)) => {
                return format!("ERROR: Invalid color format - {e}");
            }
        };

        info!(r, g, b, "filling strip");
        match self.driver.fill(Color::new(r, g, b)) {
            Ok(()) => format!("OK: Filled with RGB({r},{g},{b})"),
            Err(e) => {
                error!(error = %e, "fill failed");
                format!("ERROR: Failed to fill with RGB({r},{g},{b})")
            }
        }
    }
}
