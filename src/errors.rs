//! Error types for the Warp10 writer

use std::fmt;

pub type Result<T> = std::result::Result<T, WriterError>;

#[derive(Debug)]
pub enum WriterError {
    /// HTTP request failed
    Http(reqwest::Error),

    /// Delivery failure (non-200 response, timeout)
    Transport(String),

    /// Configuration error
    Config(String),

    /// A single rewrite rule carries both the Last and NextRound flags
    ConflictingFlags,

    /// Rule evaluation did not terminate within the configured round limit
    RewriteLimitExceeded(usize),

    /// A label template references a capture group the match does not have
    UnknownCaptureGroup(usize),
}

impl fmt::Display for WriterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriterError::Http(err) => write!(f, "HTTP error: {}", err),
            WriterError::Transport(msg) => write!(f, "Transport error: {}", msg),
            WriterError::Config(msg) => write!(f, "Configuration error: {}", msg),
            WriterError::ConflictingFlags => {
                write!(f, "Incompatible rewrite flags in the same rule: L and N")
            }
            WriterError::RewriteLimitExceeded(limit) => {
                write!(f, "Rewrite limit exceeded after {} rounds", limit)
            }
            WriterError::UnknownCaptureGroup(group) => {
                write!(f, "Rewrite template references unknown capture group \\{}", group)
            }
        }
    }
}

impl std::error::Error for WriterError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            WriterError::Http(err) => Some(err),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for WriterError {
    fn from(err: reqwest::Error) -> Self {
        WriterError::Http(err)
    }
}
