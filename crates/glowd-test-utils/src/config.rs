//! Configuration builders for tests.
//!
//! Use [`TestConfigBuilder`] to create customised [`AppConfig`] values without
//! repeating boilerplate across crate boundaries.

use glowd_config::AppConfig;

/// Fluent builder for [`AppConfig`] in tests.
///
/// # Example
///
/// ```ignore
/// let config = TestConfigBuilder::new()
///     .led_count(8)
///     .socket_path("/tmp/glowd-test.sock")
///     .build();
/// ```
pub struct TestConfigBuilder {
    config: AppConfig,
}

impl TestConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
        }
    }

    pub fn socket_path(mut self, path: &str) -> Self {
        self.config.daemon.socket_path = path.to_string();
        self
    }

    pub fn max_connections(mut self, n: usize) -> Self {
        self.config.daemon.max_connections = n;
        self
    }

    pub fn serial_port(mut self, port: &str) -> Self {
        self.config.strip.serial_port = port.to_string();
        self
    }

    pub fn led_count(mut self, n: usize) -> Self {
        self.config.strip.led_count = n;
        self
    }

    pub fn update_interval_ms(mut self, ms: u64) -> Self {
        self.config.strip.update_interval_ms = ms;
        self
    }

    pub fn log_level(mut self, level: &str) -> Self {
        self.config.logging.level = level.to_string();
        self
    }

    pub fn build(self) -> AppConfig {
        self.config
    }
}

impl Default for TestConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
