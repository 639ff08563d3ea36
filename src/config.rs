// src/config.rs
//
// Process-wide configuration, fixed at startup. Loaded from an optional TOML
// file with per-field defaults; the CLI overrides the handful of knobs that
// change between deployments (port, baud, collector URL). No hot reload.

use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::time::Duration;

// ============================================================================
// Sections
// ============================================================================

/// Serial link settings for the sensor device.
#[derive(Debug, Clone, Deserialize)]
pub struct SerialConfig {
    /// Device port path (e.g. "/dev/ttyUSB0", "COM3")
    #[serde(default = "default_port")]
    pub port: String,
    /// Baud rate the sensor firmware is flashed for
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    /// Connect attempts before giving up for good
    #[serde(default = "default_connect_attempts")]
    pub connect_attempts: u32,
    /// Delay between connect attempts, seconds
    #[serde(default = "default_connect_retry_secs")]
    pub connect_retry_secs: u64,
    /// Post-connect settle delay, seconds (device firmware boot time)
    #[serde(default = "default_settle_secs")]
    pub settle_secs: u64,
    /// Serial read timeout, milliseconds
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
    /// Idle sleep between polls when no input is pending, milliseconds
    #[serde(default = "default_idle_poll_ms")]
    pub idle_poll_ms: u64,
}

/// Collector endpoint and delivery retry settings.
#[derive(Debug, Clone, Deserialize)]
pub struct CollectorConfig {
    /// Collector base URL; readings go to {base_url}/sensor
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Delivery attempts per reading
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay between delivery attempts, seconds
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
    /// Per-request HTTP timeout, seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

/// Supervisor loop settings.
#[derive(Debug, Clone, Deserialize)]
pub struct SupervisorConfig {
    /// Consecutive failures that trip the circuit breaker
    #[serde(default = "default_failure_ceiling")]
    pub failure_ceiling: u32,
    /// Cooldown after a non-delivery iteration fault, seconds
    #[serde(default = "default_fault_cooldown_secs")]
    pub fault_cooldown_secs: u64,
}

/// Top-level worker configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkerConfig {
    #[serde(default)]
    pub serial: SerialConfig,
    #[serde(default)]
    pub collector: CollectorConfig,
    #[serde(default)]
    pub supervisor: SupervisorConfig,
}

fn default_port() -> String {
    // "COM3" on Windows deployments; override with --port or [serial] port.
    "/dev/ttyUSB0".to_string()
}
fn default_baud_rate() -> u32 {
    9600
}
fn default_connect_attempts() -> u32 {
    5
}
fn default_connect_retry_secs() -> u64 {
    2
}
fn default_settle_secs() -> u64 {
    2
}
fn default_read_timeout_ms() -> u64 {
    50
}
fn default_idle_poll_ms() -> u64 {
    100
}
fn default_base_url() -> String {
    "http://127.0.0.1:8000".to_string()
}
fn default_max_attempts() -> u32 {
    3
}
fn default_retry_delay_secs() -> u64 {
    2
}
fn default_request_timeout_secs() -> u64 {
    5
}
fn default_failure_ceiling() -> u32 {
    10
}
fn default_fault_cooldown_secs() -> u64 {
    1
}

impl Default for SerialConfig {
    fn default() -> Self {
        SerialConfig {
            port: default_port(),
            baud_rate: default_baud_rate(),
            connect_attempts: default_connect_attempts(),
            connect_retry_secs: default_connect_retry_secs(),
            settle_secs: default_settle_secs(),
            read_timeout_ms: default_read_timeout_ms(),
            idle_poll_ms: default_idle_poll_ms(),
        }
    }
}

impl Default for CollectorConfig {
    fn default() -> Self {
        CollectorConfig {
            base_url: default_base_url(),
            max_attempts: default_max_attempts(),
            retry_delay_secs: default_retry_delay_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        SupervisorConfig {
            failure_ceiling: default_failure_ceiling(),
            fault_cooldown_secs: default_fault_cooldown_secs(),
        }
    }
}

impl SerialConfig {
    pub fn connect_retry_delay(&self) -> Duration {
        Duration::from_secs(self.connect_retry_secs)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_secs(self.settle_secs)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn idle_poll(&self) -> Duration {
        Duration::from_millis(self.idle_poll_ms)
    }
}

impl CollectorConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl SupervisorConfig {
    pub fn fault_cooldown(&self) -> Duration {
        Duration::from_secs(self.fault_cooldown_secs)
    }
}

// ============================================================================
// Loading
// ============================================================================

/// Configuration loading errors.
#[derive(Debug)]
pub enum ConfigError {
    /// TOML parsing failed.
    Toml(toml::de::Error),
    /// File I/O failed.
    Io(std::io::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Toml(e) => write!(f, "TOML parse error: {}", e),
            ConfigError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Toml(e) => Some(e),
            ConfigError::Io(e) => Some(e),
        }
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        ConfigError::Toml(e)
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl WorkerConfig {
    /// Parse configuration from a TOML string.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: WorkerConfig = toml::from_str(text)?;
        Ok(config)
    }

    /// Parse configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = WorkerConfig::default();
        assert_eq!(config.serial.baud_rate, 9600);
        assert_eq!(config.serial.connect_attempts, 5);
        assert_eq!(config.collector.max_attempts, 3);
        assert_eq!(config.collector.request_timeout_secs, 5);
        assert_eq!(config.supervisor.failure_ceiling, 10);
        assert_eq!(config.supervisor.fault_cooldown_secs, 1);
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = WorkerConfig::from_toml("").unwrap();
        assert_eq!(config.serial.port, "/dev/ttyUSB0");
        assert_eq!(config.collector.base_url, "http://127.0.0.1:8000");
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let config = WorkerConfig::from_toml(
            r#"
            [serial]
            port = "/dev/ttyACM1"
            baud_rate = 115200

            [collector]
            base_url = "http://collector.local:8000"
            "#,
        )
        .unwrap();

        assert_eq!(config.serial.port, "/dev/ttyACM1");
        assert_eq!(config.serial.baud_rate, 115200);
        assert_eq!(config.serial.connect_attempts, 5);
        assert_eq!(config.collector.base_url, "http://collector.local:8000");
        assert_eq!(config.collector.max_attempts, 3);
        assert_eq!(config.supervisor.failure_ceiling, 10);
    }

    #[test]
    fn test_duration_helpers() {
        let config = WorkerConfig::default();
        assert_eq!(config.serial.idle_poll(), Duration::from_millis(100));
        assert_eq!(config.collector.retry_delay(), Duration::from_secs(2));
        assert_eq!(config.supervisor.fault_cooldown(), Duration::from_secs(1));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[supervisor]\nfailure_ceiling = 4").unwrap();

        let config = WorkerConfig::from_file(file.path()).unwrap();
        assert_eq!(config.supervisor.failure_ceiling, 4);
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        assert!(WorkerConfig::from_toml("[serial]\nbaud_rate = \"fast\"").is_err());
        assert!(WorkerConfig::from_file(Path::new("/nonexistent/aquatap.toml")).is_err());
    }
}
