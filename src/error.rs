//! Unified error type for the plexclip application.
//!
//! All modules funnel their failures into [`Error`], which carries enough
//! context for API handlers to derive an HTTP status code via
//! [`Error::http_status`].

use std::fmt;

/// Unified error type covering all failure modes in plexclip.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The supplied media identifier is not a numeric rating key.
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// The requested entity could not be found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity (e.g. "item", "session").
        entity: String,
        /// The identifier that was looked up.
        id: String,
    },

    /// The caller is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// All encode slots are taken.
    #[error("Busy: all {0} encode slots are in use")]
    Busy(usize),

    /// The media server (or plex.tv) returned an error.
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Probing the source stream failed.
    #[error("Probe error: {0}")]
    Probe(String),

    /// The encoder exited non-zero; carries its captured stderr verbatim.
    #[error("Encode failed: {0}")]
    Encode(String),

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Map this error to an appropriate HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::InvalidIdentifier(_) => 400,
            Error::NotFound { .. } => 404,
            Error::Unauthorized(_) => 401,
            Error::Busy(_) => 503,
            Error::Upstream(_) => 502,
            Error::Probe(_) => 502,
            Error::Encode(_) => 500,
            Error::Io { .. } => 500,
            Error::Internal(_) => 500,
        }
    }

    /// Convenience constructor for [`Error::NotFound`].
    pub fn not_found(entity: impl Into<String>, id: impl fmt::Display) -> Self {
        Error::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Convenience constructor for [`Error::Upstream`].
    pub fn upstream(message: impl Into<String>) -> Self {
        Error::Upstream(message.into())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Upstream(e.to_string())
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
