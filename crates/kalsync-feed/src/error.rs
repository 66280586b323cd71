//! Error types for feed retrieval and parsing.
//!
//! Every stage of the feed pipeline has its own error enum so callers can
//! match on the failure that actually happened:
//! - [`AuthError`]: the server's challenge could not be answered
//! - [`NetworkError`]: the HTTP exchange failed
//! - [`ParseError`]: the ICS body could not be turned into entries
//! - [`ConfigError`]: the feed parameters are incomplete or invalid
//!
//! [`FeedError`] wraps all of them for the pipeline as a whole. The errors
//! carry owned strings only and are `Clone`, so a failed run can keep its
//! error inside a result value.

use thiserror::Error;

/// Failure to answer an authentication challenge.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// The challenge names a scheme other than `Basic` or `Digest`.
    #[error("unsupported authentication scheme '{0}'")]
    UnsupportedScheme(String),

    /// The digest challenge names a hash algorithm other than MD5.
    #[error("unsupported digest algorithm '{0}'")]
    UnsupportedAlgorithm(String),

    /// The digest challenge lacks a required parameter.
    #[error("digest challenge is missing '{0}'")]
    MissingParameter(&'static str),
}

/// Failure of the HTTP exchange with the feed server.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetworkError {
    /// Connecting or reading took longer than the configured timeout.
    #[error("request to {url} timed out")]
    Timeout { url: String },

    /// The server rejected the credentials (or none were configured).
    #[error("server at {url} rejected the credentials")]
    Unauthorized { url: String },

    /// The server answered with a non-success status.
    #[error("server at {url} answered with status {status}")]
    Protocol { status: u16, url: String },

    /// The server answered successfully but sent no content.
    #[error("server at {url} sent an empty response")]
    EmptyResponse { url: String },

    /// The connection could not be established.
    #[error("could not connect to {url}: {message}")]
    Connection { url: String, message: String },

    /// The feed URL could not be parsed.
    #[error("invalid feed url '{0}'")]
    InvalidUrl(String),

    /// The HTTP client failed for another reason.
    #[error("http client error: {0}")]
    Client(String),
}

impl NetworkError {
    /// Returns true if the failure is transient and a later run may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Connection { .. })
    }

    /// Returns the HTTP status code, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Protocol { status, .. } => Some(*status),
            Self::Unauthorized { .. } => Some(401),
            _ => None,
        }
    }
}

/// Failure to turn an ICS body into entries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// A `VEVENT` block is unusable; only that block is dropped.
    #[error("event block {index} is malformed: {reason}")]
    MalformedChunk { index: usize, reason: String },

    /// A date or date-time value could not be read.
    #[error("invalid timestamp '{value}' in {property}")]
    InvalidTimestamp { property: String, value: String },
}

impl ParseError {
    /// Returns true if the error only affects one event block.
    pub fn is_chunk_local(&self) -> bool {
        matches!(self, Self::MalformedChunk { .. })
    }

    pub(crate) fn malformed(index: usize, reason: impl Into<String>) -> Self {
        Self::MalformedChunk {
            index,
            reason: reason.into(),
        }
    }
}

/// Invalid or incomplete feed parameters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A required parameter (`url`, `user`, `pw`) was not supplied.
    #[error("missing feed parameter '{0}'")]
    MissingParameter(String),

    /// The feed URL is not usable.
    #[error("invalid feed url '{0}'")]
    InvalidUrl(String),
}

/// Any failure of the feed pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeedError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl FeedError {
    /// Returns true if a later run may succeed without user intervention.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(err) => err.is_retryable(),
            _ => false,
        }
    }
}

/// A specialized Result type for feed operations.
pub type FeedResult<T> = Result<T, FeedError>;
