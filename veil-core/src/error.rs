#![forbid(unsafe_code)]

//! Common error types for Veil core concerns.

use thiserror::Error;

/// Convenient alias for identity and parameter handling results.
pub type CoreResult<T> = Result<T, IdentityError>;

/// Failures while loading or emitting identity records and bridge lines.
///
/// The first three variants carry the name of the offending parameter so a
/// caller can report exactly which field of a record is at fault.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// A required parameter or record field is absent.
    #[error("missing parameter: {0}")]
    Missing(&'static str),

    /// A parameter is present but cannot be parsed or is out of range.
    #[error("invalid parameter: {0}")]
    Invalid(&'static str),

    /// A parameter was supplied that no extractor claimed.
    #[error("unacknowledged parameter: {0}")]
    Unacknowledged(String),

    /// The record does not follow the identity file grammar.
    #[error("bad identity record syntax")]
    Syntax,

    /// I/O failure while reading or writing a record file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration parsing failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),
}
