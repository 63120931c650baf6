// Error types: arena configuration, floor image, client protocol, top-level startup

use std::path::PathBuf;
use thiserror::Error;

/// Arena configuration errors (fatal at startup)
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read arena configuration {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Embedded asset '{0}' is missing")]
    MissingAsset(String),
    #[error("Line {line}: key {key} has no value")]
    MissingValue { key: String, line: usize },
    #[error("Line {line}: invalid number '{value}' for key {key}")]
    InvalidNumber {
        key: String,
        value: String,
        line: usize,
    },
    #[error("Required key {0} not found")]
    MissingKey(&'static str),
    #[error("MAX_RANDOM_ANGLE_OFFSET must be finite and non-negative, got {0}")]
    InvalidAngleOffset(f64),
}

/// Floor image errors (fatal at startup)
#[derive(Error, Debug)]
pub enum FloorError {
    #[error("Failed to read floor image {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to decode floor image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("Embedded asset '{0}' is missing")]
    MissingAsset(String),
    #[error("Floor image has zero size ({width}x{height})")]
    Empty { width: usize, height: usize },
    #[error("Pixel buffer holds {actual} bytes, expected {expected} for {width}x{height} RGB")]
    SizeMismatch {
        width: usize,
        height: usize,
        expected: usize,
        actual: usize,
    },
}

/// Malformed client requests. Connection-local, never fatal.
#[derive(Error, Debug, PartialEq, Eq, Clone)]
pub enum ProtocolError {
    #[error("unknown command '{0}'")]
    UnknownCommand(String),
    #[error("missing argument: {0}")]
    MissingArgument(&'static str),
    #[error("too many arguments")]
    TooManyArguments,
    #[error("invalid number '{0}'")]
    InvalidNumber(String),
    #[error("{what} out of range: {value} (max {max})")]
    OutOfRange {
        what: &'static str,
        value: u64,
        max: u64,
    },
    #[error("name longer than {max} characters")]
    NameTooLong { max: usize },
    #[error("name must be printable ASCII")]
    InvalidName,
    #[error("request exceeds {0} bytes")]
    LineTooLong(usize),
    #[error("request is not valid UTF-8")]
    InvalidUtf8,
}

impl ProtocolError {
    /// Framing faults leave the byte stream in an unknown state, so the
    /// connection is dropped rather than answered.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ProtocolError::LineTooLong(_) | ProtocolError::InvalidUtf8)
    }
}

/// Top-level errors surfaced by the binary
#[derive(Error, Debug)]
pub enum SimError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Floor error: {0}")]
    Floor(#[from] FloorError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
