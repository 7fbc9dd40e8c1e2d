//! Provider transport error types

use thiserror::Error;

/// Longest slice of an error body carried into the message
const MAX_BODY_CHARS: usize = 120;

/// Failure to get a usable answer from the provider
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Network, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Timeout, message)
    }

    pub fn status(code: u16, body: &str) -> Self {
        let body = body.trim();
        let message = if body.is_empty() {
            format!("Provider returned HTTP {code}")
        } else if body.chars().count() > MAX_BODY_CHARS {
            let head: String = body.chars().take(MAX_BODY_CHARS).collect();
            format!("Provider returned HTTP {code}: {}…", head.trim_end())
        } else {
            format!("Provider returned HTTP {code}: {body}")
        };
        Self::new(TransportErrorKind::Status(code), message)
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Decode, message)
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Protocol, message)
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::timeout(format!("Request timed out: {err}"))
        } else if err.is_decode() {
            Self::decode(format!("Malformed response body: {err}"))
        } else if let Some(status) = err.status() {
            Self::new(TransportErrorKind::Status(status.as_u16()), err.to_string())
        } else {
            Self::network(format!("Network error: {err}"))
        }
    }
}

/// Error classification, mostly for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// Connection refused, reset, DNS failure
    Network,
    /// Request exceeded the configured timeout
    Timeout,
    /// Non-success HTTP status
    Status(u16),
    /// Body was not valid JSON for the expected shape
    Decode,
    /// Body decoded but violates the protocol (unknown performative, bad values)
    Protocol,
}

impl TransportErrorKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Timeout => "timeout",
            Self::Status(_) => "status",
            Self::Decode => "decode",
            Self::Protocol => "protocol",
        }
    }
}
