//! Unified error type for the silkcast service.
//!
//! All crates funnel their failures into [`Error`], which carries enough context
//! for API handlers to derive an HTTP status code via [`Error::http_status`].

use std::fmt;
use std::path::PathBuf;

/// Unified error type covering all failure modes of a conversion request.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A request field was missing or malformed.
    #[error("Invalid input: {0}")]
    Input(String),

    /// The request was well-formed but carries a kind of input we do not accept.
    #[error("Unsupported input: {0}")]
    UnsupportedInput(String),

    /// Downloading a remote source failed (transport error or non-success status).
    #[error("Network error [{url}]: {message}")]
    Network {
        /// The URL that was being fetched.
        url: String,
        /// Human-readable error description.
        message: String,
    },

    /// A filesystem operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// An external tool could not be run or exited unsuccessfully.
    #[error("Tool error [{tool}]: {message}")]
    Tool {
        /// Name of the tool that failed.
        tool: String,
        /// Human-readable error description.
        message: String,
    },

    /// The decode-to-PCM stage failed.
    #[error("Transcode failed: {0}")]
    Transcode(#[source] Box<Error>),

    /// The PCM-to-SILK stage failed.
    #[error("Encode failed: {0}")]
    Encode(#[source] Box<Error>),

    /// The encoder reported success but left no output file behind.
    #[error("Output file was not produced: {}", path.display())]
    OutputMissing {
        /// Where the output was expected.
        path: PathBuf,
    },

    /// The requested entity could not be found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity (e.g. "file").
        entity: String,
        /// The identifier that was looked up.
        id: String,
    },

    /// The endpoint exists but the feature behind it does not.
    #[error("Not implemented: {0}")]
    NotImplemented(String),

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Map this error to an appropriate HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::Input(_) => 400,
            Error::UnsupportedInput(_) => 400,
            Error::NotFound { .. } => 404,
            Error::NotImplemented(_) => 501,
            Error::Network { .. } => 500,
            Error::Io { .. } => 500,
            Error::Tool { .. } => 500,
            Error::Transcode(_) => 500,
            Error::Encode(_) => 500,
            Error::OutputMissing { .. } => 500,
            Error::Internal(_) => 500,
        }
    }

    /// Short machine-readable code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Input(_) => "input_error",
            Error::UnsupportedInput(_) => "unsupported_input",
            Error::Network { .. } => "network_error",
            Error::Io { .. } => "io_error",
            Error::Tool { .. } => "tool_error",
            Error::Transcode(_) => "transcode_error",
            Error::Encode(_) => "encode_error",
            Error::OutputMissing { .. } => "output_missing",
            Error::NotFound { .. } => "not_found",
            Error::NotImplemented(_) => "not_implemented",
            Error::Internal(_) => "internal_error",
        }
    }

    /// Convenience constructor for [`Error::NotFound`].
    pub fn not_found(entity: impl Into<String>, id: impl fmt::Display) -> Self {
        Error::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Convenience constructor for [`Error::Tool`].
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Convenience constructor for [`Error::Network`].
    pub fn network(url: impl Into<String>, message: impl fmt::Display) -> Self {
        Error::Network {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// Wrap a runner failure as a transcode-stage failure.
    pub fn transcode(inner: Error) -> Self {
        Error::Transcode(Box::new(inner))
    }

    /// Wrap a runner failure as an encode-stage failure.
    pub fn encode(inner: Error) -> Self {
        Error::Encode(Box::new(inner))
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
