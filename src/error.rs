//! Error types for pgblock.

use thiserror::Error;

/// Error type for pgblock operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid startup configuration (no sources, bad address, unknown country)
    #[error("configuration error: {0}")]
    Config(String),

    /// A remote source could not be downloaded
    #[error("failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    /// Downloaded data is not in the expected format
    #[error("malformed data from {source_url}: {reason}")]
    Format { source_url: String, reason: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A background build worker panicked or was cancelled
    #[error("build task failed: {0}")]
    Task(String),
}

/// Result type alias for pgblock operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn fetch(url: &str, reason: impl ToString) -> Self {
        Error::Fetch {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn format(source_url: &str, reason: impl ToString) -> Self {
        Error::Format {
            source_url: source_url.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Error type for parsing a single blocklist line.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum EntryError {
    /// Missing `:` between label and range
    #[error("missing label separator: {0}")]
    MissingLabel(String),

    /// Missing `-` between start and end address
    #[error("missing range separator: {0}")]
    MissingRange(String),

    /// Invalid IP address
    #[error("invalid IP address: {0}")]
    InvalidIp(String),

    /// Invalid CIDR notation
    #[error("invalid CIDR notation: {0}")]
    InvalidCidr(String),

    /// Start address after end address, or mixed address families
    #[error("invalid range: {0}")]
    InvalidRange(String),
}
