//! Configuration loading: TOML file with environment variable overrides.
//!
//! Reads `doorbot.toml` (or the path given on the command line). Every field
//! has a default so the file is optional. Environment variables take
//! precedence over file values.

use doorbot_core::constants::{
    DEFAULT_HEALTH_INTERVAL_SECS, DEFAULT_INPUT_DEBOUNCE_MS, DEFAULT_KEYPAD_TICK_MS,
    DEFAULT_KEYPAD_TIMEOUT_MS, DEFAULT_STALE_AFTER_SECS,
};
use doorbot_engine::{ActuationConfig, ControllerConfig, HealthConfig};
use doorbot_hardware::{LineId, OutputId};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

/// Default config file name.
pub const DEFAULT_CONFIG_PATH: &str = "doorbot.toml";

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub device: DeviceConfig,
    pub keypad: KeypadConfig,
    pub records: RecordsConfig,
    pub health: HealthSection,
    pub actuation: ActuationConfig,
    pub lines: LinesConfig,
    pub logging: LoggingConfig,
}

/// Identity of this controller.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Name sent with every activity record.
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct KeypadConfig {
    /// Inactivity window before a partial code is dropped.
    pub timeout_secs: u64,
    pub tick_ms: u64,
}

/// Membership snapshot.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RecordsConfig {
    /// CSV file replaced by the external updater.
    pub path: PathBuf,
    /// Age after which the snapshot counts as stale.
    pub stale_after_secs: u64,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct HealthSection {
    pub interval_secs: u64,
    /// Error log written by the process supervisor.
    pub error_log: PathBuf,
}

/// Line ids (BCM numbering) for every output and watched input.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LinesConfig {
    pub gate_lock: u8,
    pub strike_lock: u8,
    pub grant_indicator: u8,
    pub deny_buzzer: u8,
    pub keypad_beeper: u8,
    pub inside_buzzer: u8,
    pub status_led: u8,
    pub run_led: u8,
    pub doorbell: u8,
    pub request_to_exit: u8,
    /// Lines wired active-low.
    pub active_low: Vec<u8>,
    pub debounce_ms: u64,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

impl Config {
    /// Load configuration from `path` (if present), then apply environment
    /// overrides and validate.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but is malformed, or if the
    /// resulting configuration is invalid.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("DOORBOT_RECORDS") {
            self.records.path = PathBuf::from(val);
        }
        if let Ok(val) = std::env::var("DOORBOT_ERROR_LOG") {
            self.health.error_log = PathBuf::from(val);
        }
        if let Ok(val) = std::env::var("DOORBOT_LOG") {
            self.logging.filter = val;
        }
        if let Ok(val) = std::env::var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.device.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "device name must not be empty".to_string(),
            ));
        }

        let durations = [
            ("keypad.timeout_secs", self.keypad.timeout_secs),
            ("keypad.tick_ms", self.keypad.tick_ms),
            ("records.stale_after_secs", self.records.stale_after_secs),
            ("health.interval_secs", self.health.interval_secs),
            ("actuation.gate_release_ms", self.actuation.gate_release_ms),
            ("actuation.strike_release_ms", self.actuation.strike_release_ms),
            ("actuation.grant_indicator_ms", self.actuation.grant_indicator_ms),
            ("actuation.deny_buzzer_ms", self.actuation.deny_buzzer_ms),
        ];
        if let Some((name, _)) = durations.iter().find(|(_, value)| *value == 0) {
            return Err(ConfigError::Validation(format!("{name} must be non-zero")));
        }

        let mut seen = HashSet::new();
        for (id, line) in self.output_lines() {
            if !seen.insert(line) {
                return Err(ConfigError::Validation(format!(
                    "line {line} assigned to more than one output ({id})"
                )));
            }
        }
        for input in [self.lines.doorbell, self.lines.request_to_exit] {
            if !seen.insert(LineId::new(input)) {
                return Err(ConfigError::Validation(format!(
                    "input line {input} is also used as an output or twice as an input"
                )));
            }
        }
        Ok(())
    }

    /// Output id to line mapping.
    #[must_use]
    pub fn output_lines(&self) -> [(OutputId, LineId); 8] {
        let l = &self.lines;
        [
            (OutputId::GateLock, LineId::new(l.gate_lock)),
            (OutputId::StrikeLock, LineId::new(l.strike_lock)),
            (OutputId::GrantIndicator, LineId::new(l.grant_indicator)),
            (OutputId::DenyBuzzer, LineId::new(l.deny_buzzer)),
            (OutputId::KeypadBeeper, LineId::new(l.keypad_beeper)),
            (OutputId::InsideBuzzer, LineId::new(l.inside_buzzer)),
            (OutputId::StatusLed, LineId::new(l.status_led)),
            (OutputId::RunLed, LineId::new(l.run_led)),
        ]
    }

    #[must_use]
    pub fn active_low(&self) -> HashSet<LineId> {
        self.lines.active_low.iter().copied().map(LineId::new).collect()
    }

    #[must_use]
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.lines.debounce_ms)
    }

    #[must_use]
    pub fn controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            keypad_timeout: Duration::from_secs(self.keypad.timeout_secs),
            keypad_tick: Duration::from_millis(self.keypad.tick_ms),
            ..ControllerConfig::default()
        }
    }

    #[must_use]
    pub fn health_config(&self) -> HealthConfig {
        HealthConfig {
            interval: Duration::from_secs(self.health.interval_secs),
            stale_after: Duration::from_secs(self.records.stale_after_secs),
        }
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            name: "doorbot".to_string(),
        }
    }
}

impl Default for KeypadConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_KEYPAD_TIMEOUT_MS / 1_000,
            tick_ms: DEFAULT_KEYPAD_TICK_MS,
        }
    }
}

impl Default for RecordsConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("members.csv"),
            stale_after_secs: DEFAULT_STALE_AFTER_SECS,
        }
    }
}

impl Default for HealthSection {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_HEALTH_INTERVAL_SECS,
            error_log: PathBuf::from("logs/error/access.log"),
        }
    }
}

impl Default for LinesConfig {
    fn default() -> Self {
        Self {
            gate_lock: 17,
            strike_lock: 15,
            grant_indicator: 25,
            deny_buzzer: 24,
            keypad_beeper: 18,
            inside_buzzer: 8,
            status_led: 5,
            run_led: 7,
            doorbell: 4,
            request_to_exit: 27,
            active_low: Vec::new(),
            debounce_ms: DEFAULT_INPUT_DEBOUNCE_MS,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "doorbot=info,doorbot_engine=info,doorbot_storage=info".to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}
