//! Configuration for the worklet runtime.
//!
//! A single TOML file configures the processing thread and, optionally, a
//! default session for the `worklet` CLI.
//!
//! # TOML Format
//!
//! ```toml
//! sample_rate = 48000.0
//! origin = "https://example.com/app"
//! remainder_policy = "reject"
//! thread_name = "worklet-processing"
//!
//! [session]
//! script = "modules/gain.js"
//! module = "Gain"
//! render_quantum = 32
//! outer_block = 128
//! channels = 2
//! transport = "copy"
//! ticks = 16
//! ```
//!
//! Every field is optional; missing fields take the defaults documented on
//! [`RuntimeConfig`] and [`SessionConfig`].
//!
//! # Example
//!
//! ```rust
//! use worklet_config::{RuntimeConfig, TransportMode};
//!
//! let config = RuntimeConfig::from_toml("[session]\ntransport = \"copy\"").unwrap();
//! assert_eq!(config.sample_rate, 44100.0);
//! assert_eq!(config.session.transport, TransportMode::Copy);
//! ```

mod error;

use std::path::Path;

use serde::{Deserialize, Serialize};

pub use error::ConfigError;
pub use worklet_core::RemainderPolicy;

/// Default session sample rate in Hz.
pub const DEFAULT_SAMPLE_RATE: f32 = 44100.0;

/// Default processing thread name.
pub const DEFAULT_THREAD_NAME: &str = "worklet-processing";

/// How sample data moves between the host and the processing thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    /// Zero-copy shared memory.
    #[default]
    Shared,
    /// Per-tick buffer transfer.
    Copy,
}

impl TransportMode {
    /// Returns true for the shared-memory transport.
    pub fn is_shared(self) -> bool {
        self == TransportMode::Shared
    }
}

/// Processing thread configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Initial sample rate in Hz, until an `init` message sets one (44100).
    pub sample_rate: f32,
    /// Initial base URL for relative imports, until `init` sets one ("").
    pub origin: String,
    /// What to do when the outer block is not a multiple of the render quantum.
    pub remainder_policy: RemainderPolicy,
    /// Name given to the processing thread.
    pub thread_name: String,
    /// Default session for the CLI.
    pub session: SessionConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            origin: String::new(),
            remainder_policy: RemainderPolicy::Truncate,
            thread_name: DEFAULT_THREAD_NAME.to_string(),
            session: SessionConfig::default(),
        }
    }
}

/// A host session: which module to drive and how.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Script to import ("modules/gain.js").
    pub script: String,
    /// Module to instantiate ("Gain").
    pub module: String,
    /// Samples per `process` call (128).
    pub render_quantum: usize,
    /// Samples per tick (128).
    pub outer_block: usize,
    /// Channels per bus (1).
    pub channels: usize,
    /// Data transport (shared).
    pub transport: TransportMode,
    /// Ticks to run (8).
    pub ticks: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            script: "modules/gain.js".to_string(),
            module: "Gain".to_string(),
            render_quantum: 128,
            outer_block: 128,
            channels: 1,
            transport: TransportMode::Shared,
            ticks: 8,
        }
    }
}

impl RuntimeConfig {
    /// Load a configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        Self::from_toml(&content)
    }

    /// Load a configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: RuntimeConfig = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Save the configuration to a TOML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = self.to_toml()?;
        std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))?;
        Ok(())
    }

    /// Convert the configuration to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check values that parse but cannot be used.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.sample_rate.is_finite() && self.sample_rate > 0.0) {
            return Err(ConfigError::invalid(
                "sample_rate",
                format!("must be a positive number, got {}", self.sample_rate),
            ));
        }
        if self.thread_name.is_empty() {
            return Err(ConfigError::invalid("thread_name", "must not be empty"));
        }
        if self.session.render_quantum == 0 {
            return Err(ConfigError::invalid(
                "session.render_quantum",
                "must be non-zero",
            ));
        }
        Ok(())
    }
}
