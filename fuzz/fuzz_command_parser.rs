//! Fuzz target for the command line parser.
//!
//! Run with: cargo +nightly fuzz run fuzz_command_parser
//!
//! Exercises `CommandProcessor::process()` with arbitrary input lines to
//! find panics. Every input must produce a reply string, never a crash.

#![no_main]

use std::sync::{Arc, OnceLock};

use libfuzzer_sys::fuzz_target;

use glowd_core::{CommandProcessor, LedDriver};

static PROCESSOR: OnceLock<CommandProcessor> = OnceLock::new();

fn processor() -> &'static CommandProcessor {
    PROCESSOR.get_or_init(|| {
        let config = glowd_config::StripConfig {
            led_count: 16,
            ..glowd_config::StripConfig::default()
        };
        let driver = LedDriver::new(&config).expect("driver construction");
        CommandProcessor::new(Arc::new(driver))
    })
}

fuzz_target!(|data: &[u8]| {
    if let Ok(line) = std::str::from_utf8(data) {
        let reply = processor().process(line);
        // A reply is always produced and is never empty
        assert!(!reply.is_empty());
    }
});
