//! Unified error handling for the pelican-advertise crate
//!
//! This module provides a unified error type that consolidates all domain-specific
//! errors into a single `Error` enum, while maintaining the ability to use
//! domain-specific errors when needed.
//!
//! # Architecture
//!
//! - [`ErrorClass`] - Common interface implemented by all error types
//! - [`ErrorCategory`] - Classification of errors for handling strategies
//! - [`Error`] - Unified error enum wrapping all domain-specific errors
//!
//! # Usage
//!
//! ```rust,ignore
//! use pelican_advertise::error::{Error, ErrorCategory, ErrorClass};
//!
//! fn handle_error(err: Error) {
//!     if err.category() == ErrorCategory::ApprovalRejected {
//!         eprintln!("Ask the federation administrator to approve this server: {err}");
//!     } else if err.is_recoverable() {
//!         eprintln!("Will retry on the next tick: {err}");
//!     }
//! }
//! ```

use std::io;
use thiserror::Error;

pub use crate::advertise::error::AdvertiseError;
pub use crate::config::ConfigError;

/// Common trait for all pelican-advertise error types
pub trait ErrorClass: std::error::Error {
    /// Check if this error may clear up on a later attempt
    fn is_recoverable(&self) -> bool;

    /// Get the error category for handling strategies
    fn category(&self) -> ErrorCategory;
}

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Service name, federation endpoint or token could not be resolved
    Resolution,
    /// Our payload could not be built or encoded
    Serialization,
    /// Connection, send or body-read failure
    Transport,
    /// The director refused this server pending approval
    ApprovalRejected,
    /// The director refused the advertisement for another reason
    DirectorRejected,
    /// The director answered with something we could not decode
    DirectorProtocol,
    /// Configuration and validation errors
    Config,
    /// Local I/O errors
    Io,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Resolution => "resolution",
            Self::Serialization => "serialization",
            Self::Transport => "transport",
            Self::ApprovalRejected => "approval_rejected",
            Self::DirectorRejected => "director_rejected",
            Self::DirectorProtocol => "director_protocol",
            Self::Config => "config",
            Self::Io => "io",
            Self::Other => "other",
        }
    }
}

/// Unified error type for the pelican-advertise crate
#[derive(Error, Debug)]
pub enum Error {
    /// Director advertisement errors
    #[error(transparent)]
    Advertise(#[from] AdvertiseError),

    /// Configuration validation errors
    #[error("Config error: {0}")]
    InvalidConfig(#[from] ConfigError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),

    /// Generic error with context
    #[error("{context}")]
    Other {
        context: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl ErrorClass for Error {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Advertise(e) => e.is_recoverable(),
            Self::InvalidConfig(_) | Self::Config(_) => false,
            Self::Io(_) => true,
            Self::Http(_) => true,
            Self::Other { .. } => false,
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Advertise(e) => e.category(),
            Self::InvalidConfig(_) | Self::Config(_) => ErrorCategory::Config,
            Self::Io(_) => ErrorCategory::Io,
            Self::Http(_) => ErrorCategory::Transport,
            Self::Other { .. } => ErrorCategory::Other,
        }
    }
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a generic error with context
    pub fn other(context: impl Into<String>) -> Self {
        Self::Other {
            context: context.into(),
            source: None,
        }
    }

    /// Create a generic error with context and source
    pub fn with_source(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Other {
            context: context.into(),
            source: Some(Box::new(source)),
        }
    }
}

// Conversion from anyhow::Error
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other {
            context: format!("{err:#}"),
            source: None,
        }
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;
