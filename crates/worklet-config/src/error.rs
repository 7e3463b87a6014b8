//! Configuration errors.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Why a runtime configuration could not be loaded, saved, or used.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("cannot read config '{}': {source}", path.display())]
    ReadFile {
        /// File that was requested.
        path: PathBuf,
        /// I/O failure.
        #[source]
        source: io::Error,
    },

    /// The file could not be written.
    #[error("cannot write config '{}': {source}", path.display())]
    WriteFile {
        /// Destination file.
        path: PathBuf,
        /// I/O failure.
        #[source]
        source: io::Error,
    },

    /// The text is not valid TOML for [`RuntimeConfig`](crate::RuntimeConfig).
    #[error("malformed config: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// The configuration could not be rendered as TOML.
    #[error("cannot render config as TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// A field parsed but holds an unusable value.
    #[error("invalid value for '{field}': {reason}")]
    InvalidValue {
        /// Dotted field name, e.g. `session.render_quantum`.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

impl ConfigError {
    pub(crate) fn read_file(path: &Path, source: io::Error) -> Self {
        ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn write_file(path: &Path, source: io::Error) -> Self {
        ConfigError::WriteFile {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Build an [`InvalidValue`](Self::InvalidValue) error.
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            field,
            reason: reason.into(),
        }
    }

    /// Field name for [`InvalidValue`](Self::InvalidValue) errors.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            ConfigError::InvalidValue { field, .. } => Some(*field),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    fn denied() -> io::Error {
        io::Error::new(io::ErrorKind::PermissionDenied, "denied")
    }

    #[test]
    fn io_errors_name_the_file() {
        let read = ConfigError::read_file(Path::new("/etc/worklet.toml"), denied());
        assert_eq!(
            read.to_string(),
            "cannot read config '/etc/worklet.toml': denied"
        );
        let write = ConfigError::write_file(Path::new("out.toml"), denied());
        assert!(write.to_string().starts_with("cannot write config 'out.toml'"));
    }

    #[test]
    fn only_io_errors_have_a_source() {
        assert!(ConfigError::read_file(Path::new("a"), denied()).source().is_some());
        assert!(ConfigError::write_file(Path::new("a"), denied()).source().is_some());
        assert!(ConfigError::invalid("sample_rate", "zero").source().is_none());
    }

    #[test]
    fn invalid_value_reports_field() {
        let err = ConfigError::invalid("session.render_quantum", "must be non-zero");
        assert_eq!(err.field(), Some("session.render_quantum"));
        assert_eq!(
            err.to_string(),
            "invalid value for 'session.render_quantum': must be non-zero"
        );
        assert_eq!(ConfigError::read_file(Path::new("a"), denied()).field(), None);
    }
}
