//! Errors raised while building link options.

use std::path::PathBuf;
use thiserror::Error;

/// Rejected link configuration.
///
/// Only produced while options are being constructed. Rewriting an element
/// tree never fails.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Enumerated option received a value outside its valid set.
    #[error("invalid value `{value}` for option `{key}`, expected one of: {expected}")]
    InvalidValue {
        key: String,
        value: String,
        expected: &'static str,
    },

    /// Option name is not recognized.
    #[error("unknown option `{0}`")]
    UnknownOption(String),

    /// Custom attribute name is empty or not a valid HTML attribute name.
    #[error("invalid custom attribute name `{0}`")]
    InvalidAttributeName(String),

    /// Option value in a TOML document has the wrong type.
    #[error("option `{key}` must be {expected}")]
    InvalidType { key: String, expected: &'static str },

    /// TOML document could not be parsed.
    #[error("failed to parse link options: {0}")]
    Parse(String),

    /// Options file could not be read.
    #[error("failed to read link options from {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
