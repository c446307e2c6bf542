/// Errors raised by the stream transport while opening or reading the research
/// stream.
///
/// These never escape a session: the controller turns them into a failed
/// `SessionState` with a user-facing message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The service could not be reached (refused, DNS, unreachable network).
    #[error("connection failed: {message}")]
    Connect { message: String },
    /// The service answered with a non-success HTTP status.
    #[error("research request failed with status {status}: {body}")]
    Status { status: u16, body: String },
    /// Reading the body failed after the stream was established.
    #[error("stream read failed: {message}")]
    Read { message: String },
    /// Any other request failure (TLS, malformed request, timeout).
    #[error("request failed: {message}")]
    Request { message: String },
}

const UNREACHABLE_PATTERNS: &[&str] = &[
    "connection refused",
    "failed to fetch",
    "network is unreachable",
    "dns error",
    "failed to lookup address",
    "no route to host",
    "error trying to connect",
];

impl TransportError {
    /// Creates a connectivity error.
    pub fn connect(message: impl Into<String>) -> Self {
        Self::Connect {
            message: message.into(),
        }
    }

    /// Creates a read error.
    pub fn read(message: impl Into<String>) -> Self {
        Self::Read {
            message: message.into(),
        }
    }

    /// Creates a generic request error.
    pub fn request(message: impl Into<String>) -> Self {
        Self::Request {
            message: message.into(),
        }
    }

    /// Returns true when the failure looks like the service is unreachable.
    pub fn is_connectivity(&self) -> bool {
        match self {
            Self::Connect { .. } => true,
            Self::Status { .. } => false,
            Self::Read { message } | Self::Request { message } => looks_unreachable(message),
        }
    }

    /// Message shown to the user when this error ends a session.
    ///
    /// Connectivity failures get a hint about the endpoint configuration.
    pub fn user_message(&self, stream_url: &str) -> String {
        if self.is_connectivity() {
            format!(
                "Unable to reach the research service at {stream_url}. \
                 Check that the stream endpoint is configured correctly and the service is running. ({self})"
            )
        } else {
            self.to_string()
        }
    }
}

pub(crate) fn looks_unreachable(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    UNREACHABLE_PATTERNS
        .iter()
        .any(|pattern| lower.contains(pattern))
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        // reqwest hides the io cause behind Display; walk the source chain so
        // the pattern match sees "connection refused" and friends.
        let mut message = err.to_string();
        let mut source = std::error::Error::source(&err);
        while let Some(inner) = source {
            message.push_str(": ");
            message.push_str(&inner.to_string());
            source = inner.source();
        }
        if err.is_connect() || looks_unreachable(&message) {
            Self::Connect { message }
        } else if err.is_body() || err.is_decode() {
            Self::Read { message }
        } else {
            Self::Request { message }
        }
    }
}

/// Errors from the remote enrichment call. Always absorbed by the summarizer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EnrichError {
    /// Network or client failure.
    #[error("enrichment request failed: {0}")]
    Request(String),
    /// Non-success HTTP status.
    #[error("enrichment request failed with status {0}")]
    Status(u16),
    /// Response body was not `{ "content": string }` or was blank.
    #[error("malformed enrichment response: {0}")]
    Malformed(String),
}

/// Top-level error type for the public client API.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// Missing or malformed endpoint configuration.
    #[error("config error: {0}")]
    Config(String),
    /// Invalid request (missing repository or query).
    #[error("validation error: {0}")]
    Validation(String),
    /// The session was aborted, usually because a newer session started.
    #[error("session cancelled")]
    Cancelled,
    /// Internal invariant violation (for example the session task vanished).
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl ClientError {
    pub(crate) fn protocol_msg(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_errors_get_actionable_hint() {
        let err = TransportError::connect("tcp connect error: Connection refused (os error 111)");
        let message = err.user_message("http://localhost:8000/research/stream");
        assert!(message.contains("Unable to reach the research service"));
        assert!(message.contains("http://localhost:8000/research/stream"));
        assert!(message.contains("Connection refused"));
    }

    #[test]
    fn unreachable_pattern_in_request_error_counts_as_connectivity() {
        let err = TransportError::request(
            "error sending request: dns error: failed to lookup address",
        );
        assert!(err.is_connectivity());
    }

    #[test]
    fn other_failures_keep_raw_message() {
        let err = TransportError::Status {
            status: 500,
            body: "boom".into(),
        };
        assert!(!err.is_connectivity());
        assert_eq!(
            err.user_message("http://x"),
            "research request failed with status 500: boom"
        );
    }
}
