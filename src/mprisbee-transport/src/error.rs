use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Failures establishing the channel. Fatal for the session.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("invalid socket address {path}: {reason}")]
    InvalidAddress { path: PathBuf, reason: &'static str },
    #[error("no peer listening at {path}: {source}")]
    Refused {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to open socket to {path}: {source}")]
    Endpoint {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Failures on an established channel. The channel stays usable; the next
/// call simply tries again.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("write failed after {written} of {total} bytes: {source}")]
    Write {
        written: usize,
        total: usize,
        source: std::io::Error,
    },
    #[error("read failed with {collected} bytes collected: {source}")]
    Read {
        collected: usize,
        source: std::io::Error,
    },
    #[error("no complete line within {waited:?} ({collected} bytes collected)")]
    TimedOut { collected: usize, waited: Duration },
    #[error("received line is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),
    #[error("message contains an embedded newline")]
    EmbeddedNewline,
}

impl ChannelError {
    /// True when the read deadline passed without a complete line.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ChannelError::TimedOut { .. })
    }
}
