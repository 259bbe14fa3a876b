//! Advertisement error types
//!
//! Each variant names the protocol step that failed. The three director
//! rejection variants are kept apart so callers can tell a misbehaving
//! director ([`AdvertiseError::DecodeResponse`]) from one that refused this
//! server ([`AdvertiseError::Rejected`], [`AdvertiseError::Director`]).

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{ErrorCategory, ErrorClass};
use crate::server::ServerType;

/// Error body returned by the director for non-2xx responses
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectorResponse {
    #[serde(default)]
    pub error: String,
    #[serde(default)]
    pub approval_error: bool,
}

/// Errors from a single server's advertisement attempt
#[derive(Error, Debug)]
pub enum AdvertiseError {
    #[error("failed to determine service name for advertising to director: {0:#}")]
    ServiceName(#[source] anyhow::Error),

    #[error("{server_type} failed to get namespaceAds from the director: {source:#}")]
    NamespaceRefresh {
        server_type: ServerType,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to create the advertisement for {server_type}: {source:#}")]
    CreateAdvertisement {
        server_type: ServerType,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to generate JSON description of {server_type}: {source}")]
    Serialize {
        server_type: ServerType,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to look up federation info: {0:#}")]
    Federation(#[source] anyhow::Error),

    #[error("Director endpoint URL is not known")]
    DirectorUnknown,

    #[error("failed to parse Federation.DirectorURL: {0}")]
    InvalidDirectorUrl(#[source] url::ParseError),

    #[error("failed to get advertisement token: {0:#}")]
    Token(#[source] anyhow::Error),

    #[error("failed to start the request for director advertisement: {}", with_causes(.0))]
    Send(#[source] reqwest::Error),

    #[error("failed to read the response body for director advertisement: {}", with_causes(.0))]
    ReadBody(#[source] reqwest::Error),

    #[error("could not decode the director's response, which responded {status} from director advertisement: {body}: {source}")]
    DecodeResponse {
        status: u16,
        body: String,
        #[source]
        source: serde_json::Error,
    },

    /// The director refused the server on approval grounds. Its message is
    /// passed through verbatim.
    #[error("the director rejected the server advertisement: {0}")]
    Rejected(String),

    #[error("error during director advertisement: {0}")]
    Director(String),
}

impl AdvertiseError {
    /// Classify a non-2xx director response
    ///
    /// A JSON `null` body decodes to an empty [`DirectorResponse`].
    pub fn from_director_response(status: u16, body: &[u8]) -> Self {
        match serde_json::from_slice::<Option<DirectorResponse>>(body) {
            Err(source) => Self::DecodeResponse {
                status,
                body: String::from_utf8_lossy(body).into_owned(),
                source,
            },
            Ok(resp) => {
                let resp = resp.unwrap_or_default();
                if resp.approval_error {
                    Self::Rejected(resp.error)
                } else {
                    Self::Director(resp.error)
                }
            }
        }
    }

    /// Whether the director explicitly refused this server
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected(_) | Self::Director(_))
    }
}

/// `err` followed by every distinct message in its `source()` chain.
/// reqwest keeps connect, DNS and TLS causes out of its own message.
fn with_causes(err: &(dyn std::error::Error + 'static)) -> String {
    let mut rendered = err.to_string();
    let mut source = err.source();

    while let Some(cause) = source {
        let text = cause.to_string();
        if !rendered.contains(&text) {
            rendered.push_str(": ");
            rendered.push_str(&text);
        }
        source = cause.source();
    }

    rendered
}

impl ErrorClass for AdvertiseError {
    fn is_recoverable(&self) -> bool {
        // Our own payload bugs and explicit approval refusals won't fix
        // themselves on the next tick.
        !matches!(
            self.category(),
            ErrorCategory::Serialization | ErrorCategory::ApprovalRejected
        )
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::ServiceName(_)
            | Self::NamespaceRefresh { .. }
            | Self::Federation(_)
            | Self::DirectorUnknown
            | Self::InvalidDirectorUrl(_)
            | Self::Token(_) => ErrorCategory::Resolution,
            Self::CreateAdvertisement { .. } | Self::Serialize { .. } => ErrorCategory::Serialization,
            Self::Send(_) | Self::ReadBody(_) => ErrorCategory::Transport,
            Self::DecodeResponse { .. } => ErrorCategory::DirectorProtocol,
            Self::Rejected(_) => ErrorCategory::ApprovalRejected,
            Self::Director(_) => ErrorCategory::DirectorRejected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_approval_rejection_is_verbatim() {
        let err = AdvertiseError::from_director_response(
            403,
            br#"{"error":"not approved","approval_error":true}"#,
        );

        assert!(matches!(err, AdvertiseError::Rejected(_)));
        assert_eq!(
            err.to_string(),
            "the director rejected the server advertisement: not approved"
        );
        assert_eq!(err.category(), ErrorCategory::ApprovalRejected);
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_generic_rejection() {
        let err = AdvertiseError::from_director_response(400, br#"{"error":"bad namespace"}"#);

        assert!(matches!(err, AdvertiseError::Director(_)));
        assert_eq!(err.to_string(), "error during director advertisement: bad namespace");
        assert!(err.is_rejection());
    }

    #[test]
    fn test_undecodable_response_keeps_status_and_body() {
        let err = AdvertiseError::from_director_response(500, b"<html>Internal Server Error</html>");

        let msg = err.to_string();
        assert!(msg.contains("could not decode"));
        assert!(msg.contains("500"));
        assert!(msg.contains("<html>Internal Server Error</html>"));
        assert_eq!(err.category(), ErrorCategory::DirectorProtocol);
        assert!(!err.is_rejection());
    }

    #[test]
    fn test_null_body_is_generic_rejection() {
        let err = AdvertiseError::from_director_response(500, b"null");

        assert!(matches!(err, AdvertiseError::Director(_)));
        assert_eq!(err.to_string(), "error during director advertisement: ");
    }

    #[test]
    fn test_with_causes_includes_root_cause() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "connection refused");
        let err = anyhow::Error::new(io)
            .context("tcp connect error")
            .context("error sending request");

        let rendered = with_causes(err.as_ref());
        assert_eq!(rendered, "error sending request: tcp connect error: connection refused");
    }

    #[test]
    fn test_with_causes_skips_repeated_messages() {
        let err = anyhow::anyhow!("connection refused").context("connect failed: connection refused");

        assert_eq!(with_causes(err.as_ref()), "connect failed: connection refused");
    }

    #[test]
    fn test_wrapped_collaborator_error_text() {
        let err = AdvertiseError::ServiceName(
            anyhow::anyhow!("no hostname").context("resolver failed"),
        );
        let msg = err.to_string();
        assert!(msg.starts_with("failed to determine service name"));
        assert!(msg.contains("resolver failed"));
        assert!(msg.contains("no hostname"));
    }

    #[test]
    fn test_resolution_errors_are_recoverable() {
        assert_eq!(AdvertiseError::DirectorUnknown.category(), ErrorCategory::Resolution);
        assert!(AdvertiseError::DirectorUnknown.is_recoverable());
    }
}
