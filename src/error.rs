//! Error types for g9chat.
//!
//! Every failure the chat client can observe is one variant of [`Error`]:
//! transport and API failures from the Gemini endpoint, stream decoding
//! failures, and local storage failures.  User-initiated cancellation is
//! represented by [`Error::Abort`] but is never surfaced to the user as an
//! error; see [`Error::is_abort`].
//!
//! Each variant carries a `message` meant for the terminal; the remaining
//! fields are for callers that want to branch on the failure.

use std::error;
use std::fmt;
use std::io;
use std::str::Utf8Error;
use std::sync::Arc;

type Cause = Arc<dyn error::Error + Send + Sync>;
type BoxedCause = Box<dyn error::Error + Send + Sync>;

/// The main error type for g9chat.
#[derive(Clone, Debug)]
pub enum Error {
    /// Non-2xx reply that did not map onto a narrower variant.
    Api {
        status_code: u16,
        /// Gemini status string, e.g. `FAILED_PRECONDITION`.
        status: Option<String>,
        message: String,
    },
    /// Missing or rejected API key.
    Authentication { message: String },
    /// The key may not call this model.
    Permission { message: String },
    /// Unknown model or endpoint.
    NotFound { message: String },
    /// Quota exhausted; `retry_after` is in seconds.
    RateLimit {
        message: String,
        retry_after: Option<u64>,
    },
    BadRequest { message: String },
    /// `duration` is in seconds.
    Timeout {
        message: String,
        duration: Option<f64>,
    },
    /// The user stopped generation.
    Abort { message: String },
    Connection {
        message: String,
        source: Option<Cause>,
    },
    InternalServer { message: String },
    ServiceUnavailable {
        message: String,
        retry_after: Option<u64>,
    },
    /// The model refused the prompt.
    Blocked { reason: String },
    Serialization {
        message: String,
        source: Option<Cause>,
    },
    Io {
        message: String,
        source: Arc<io::Error>,
    },
    HttpClient {
        message: String,
        source: Option<Cause>,
    },
    /// A user or configuration value was rejected.
    Validation {
        message: String,
        param: Option<String>,
    },
    Url {
        message: String,
        source: Option<url::ParseError>,
    },
    /// The event stream broke off or carried garbage.
    Streaming {
        message: String,
        source: Option<Cause>,
    },
    Encoding {
        message: String,
        source: Option<Cause>,
    },
    /// The session blob under `key` could not be read or written.
    Storage { message: String, key: String },
}

impl Error {
    pub fn api(status_code: u16, status: Option<String>, message: impl Into<String>) -> Self {
        let message = message.into();
        Error::Api {
            status_code,
            status,
            message,
        }
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Error::Authentication {
            message: message.into(),
        }
    }

    pub fn permission(message: impl Into<String>) -> Self {
        Error::Permission {
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Error::NotFound {
            message: message.into(),
        }
    }

    pub fn rate_limit(message: impl Into<String>, retry_after: Option<u64>) -> Self {
        let message = message.into();
        Error::RateLimit {
            message,
            retry_after,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Error::BadRequest {
            message: message.into(),
        }
    }

    pub fn timeout(message: impl Into<String>, duration: Option<f64>) -> Self {
        let message = message.into();
        Error::Timeout { message, duration }
    }

    pub fn abort(message: impl Into<String>) -> Self {
        Error::Abort {
            message: message.into(),
        }
    }

    pub fn connection(message: impl Into<String>, source: Option<BoxedCause>) -> Self {
        let message = message.into();
        let source = source.map(Cause::from);
        Error::Connection { message, source }
    }

    pub fn internal_server(message: impl Into<String>) -> Self {
        Error::InternalServer {
            message: message.into(),
        }
    }

    pub fn service_unavailable(message: impl Into<String>, retry_after: Option<u64>) -> Self {
        let message = message.into();
        Error::ServiceUnavailable {
            message,
            retry_after,
        }
    }

    pub fn blocked(reason: impl Into<String>) -> Self {
        Error::Blocked {
            reason: reason.into(),
        }
    }

    pub fn serialization(message: impl Into<String>, source: Option<BoxedCause>) -> Self {
        let message = message.into();
        let source = source.map(Cause::from);
        Error::Serialization { message, source }
    }

    pub fn io(message: impl Into<String>, source: io::Error) -> Self {
        let message = message.into();
        let source = Arc::new(source);
        Error::Io { message, source }
    }

    pub fn http_client(message: impl Into<String>, source: Option<BoxedCause>) -> Self {
        let message = message.into();
        let source = source.map(Cause::from);
        Error::HttpClient { message, source }
    }

    pub fn validation(message: impl Into<String>, param: Option<String>) -> Self {
        let message = message.into();
        Error::Validation { message, param }
    }

    pub fn url(message: impl Into<String>, source: Option<url::ParseError>) -> Self {
        let message = message.into();
        Error::Url { message, source }
    }

    pub fn streaming(message: impl Into<String>, source: Option<BoxedCause>) -> Self {
        let message = message.into();
        let source = source.map(Cause::from);
        Error::Streaming { message, source }
    }

    pub fn encoding(message: impl Into<String>, source: Option<BoxedCause>) -> Self {
        let message = message.into();
        let source = source.map(Cause::from);
        Error::Encoding { message, source }
    }

    pub fn storage(message: impl Into<String>, key: impl Into<String>) -> Self {
        let message = message.into();
        let key = key.into();
        Error::Storage { message, key }
    }

    pub fn is_authentication(&self) -> bool {
        matches!(self, Error::Authentication { .. })
    }

    pub fn is_rate_limit(&self) -> bool {
        matches!(self, Error::RateLimit { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout { .. })
    }

    /// True for a user-initiated stop.  Streams end silently on abort and
    /// keep whatever text already arrived.
    pub fn is_abort(&self) -> bool {
        matches!(self, Error::Abort { .. })
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation { .. })
    }

    /// True when sending the same history again might succeed.  Nothing is
    /// retried automatically.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Api { status_code, .. } => matches!(status_code, 408 | 409 | 429 | 500..=599),
            Error::Timeout { .. }
            | Error::Connection { .. }
            | Error::RateLimit { .. }
            | Error::ServiceUnavailable { .. }
            | Error::InternalServer { .. }
            | Error::Streaming { .. } => true,
            _ => false,
        }
    }

    /// The HTTP status this error stands for, when there is one.
    pub fn status_code(&self) -> Option<u16> {
        let code = match self {
            Error::Api { status_code, .. } => *status_code,
            Error::Authentication { .. } => 401,
            Error::Permission { .. } => 403,
            Error::NotFound { .. } => 404,
            Error::RateLimit { .. } => 429,
            Error::InternalServer { .. } => 500,
            Error::ServiceUnavailable { .. } => 503,
            _ => return None,
        };
        Some(code)
    }

    fn label(&self) -> &'static str {
        match self {
            Error::Api { .. } => "API error",
            Error::Authentication { .. } => "Authentication error",
            Error::Permission { .. } => "Permission denied",
            Error::NotFound { .. } => "Not found",
            Error::RateLimit { .. } => "Rate limit exceeded",
            Error::BadRequest { .. } => "Bad request",
            Error::Timeout { .. } => "Timed out",
            Error::Abort { .. } => "Generation stopped",
            Error::Connection { .. } => "Connection error",
            Error::InternalServer { .. } => "Internal server error",
            Error::ServiceUnavailable { .. } => "Service unavailable",
            Error::Blocked { .. } => "Prompt blocked by the model",
            Error::Serialization { .. } => "Serialization error",
            Error::Io { .. } => "I/O error",
            Error::HttpClient { .. } => "HTTP client error",
            Error::Validation { .. } => "Invalid value",
            Error::Url { .. } => "Bad URL",
            Error::Streaming { .. } => "Stream error",
            Error::Encoding { .. } => "Encoding error",
            Error::Storage { .. } => "Storage error",
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = self.label();
        match self {
            Error::Api {
                status_code,
                status: Some(status),
                message,
            } => write!(f, "{label} {status_code} ({status}): {message}"),
            Error::Api {
                status_code,
                message,
                ..
            } => write!(f, "{label} {status_code}: {message}"),
            Error::RateLimit {
                message,
                retry_after: Some(secs),
            }
            | Error::ServiceUnavailable {
                message,
                retry_after: Some(secs),
            } => write!(f, "{label}: {message} (retry in {secs}s)"),
            Error::Timeout {
                message,
                duration: Some(secs),
            } => write!(f, "{label} after {secs}s: {message}"),
            Error::Validation {
                message,
                param: Some(param),
            } => write!(f, "{label} for {param}: {message}"),
            Error::Storage { message, key } => write!(f, "{label} ({key}): {message}"),
            Error::Blocked { reason } => write!(f, "{label}: {reason}"),
            Error::Authentication { message }
            | Error::Permission { message }
            | Error::NotFound { message }
            | Error::RateLimit { message, .. }
            | Error::BadRequest { message }
            | Error::Timeout { message, .. }
            | Error::Abort { message }
            | Error::Connection { message, .. }
            | Error::InternalServer { message }
            | Error::ServiceUnavailable { message, .. }
            | Error::Serialization { message, .. }
            | Error::Io { message, .. }
            | Error::HttpClient { message, .. }
            | Error::Validation { message, .. }
            | Error::Url { message, .. }
            | Error::Streaming { message, .. }
            | Error::Encoding { message, .. } => write!(f, "{label}: {message}"),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::Connection { source, .. }
            | Error::Serialization { source, .. }
            | Error::HttpClient { source, .. }
            | Error::Streaming { source, .. }
            | Error::Encoding { source, .. } => source
                .as_deref()
                .map(|e| e as &(dyn error::Error + 'static)),
            Error::Io { source, .. } => Some(&**source),
            Error::Url { source, .. } => source
                .as_ref()
                .map(|e| e as &(dyn error::Error + 'static)),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::io(err.to_string(), err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::serialization(format!("bad JSON: {err}"), Some(Box::new(err)))
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::url(err.to_string(), Some(err))
    }
}

impl From<Utf8Error> for Error {
    fn from(err: Utf8Error) -> Self {
        Error::encoding(format!("invalid UTF-8: {err}"), Some(Box::new(err)))
    }
}

/// Result alias used throughout g9chat.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abort_is_not_retryable() {
        let err = Error::abort("user pressed ctrl-c");
        assert!(err.is_abort());
        assert!(!err.is_retryable());
    }

    #[test]
    fn server_errors_are_retryable() {
        assert!(Error::internal_server("boom").is_retryable());
        assert!(Error::service_unavailable("busy", Some(3)).is_retryable());
        assert!(Error::api(503, None, "busy").is_retryable());
        assert!(!Error::bad_request("nope").is_retryable());
        assert!(!Error::blocked("SAFETY").is_retryable());
    }

    #[test]
    fn display_formats() {
        let err = Error::api(409, Some("ABORTED".to_string()), "conflict");
        assert_eq!(err.to_string(), "API error 409 (ABORTED): conflict");
        let err = Error::storage("disk full", "g9_sessions");
        assert_eq!(err.to_string(), "Storage error (g9_sessions): disk full");
        let err = Error::rate_limit("slow down", Some(7));
        assert_eq!(err.to_string(), "Rate limit exceeded: slow down (retry in 7s)");
        let err = Error::blocked("SAFETY");
        assert_eq!(err.to_string(), "Prompt blocked by the model: SAFETY");
    }

    #[test]
    fn status_codes() {
        assert_eq!(Error::authentication("x").status_code(), Some(401));
        assert_eq!(Error::service_unavailable("x", None).status_code(), Some(503));
        assert_eq!(Error::streaming("x", None).status_code(), None);
    }

    #[test]
    fn json_errors_convert_to_serialization() {
        let err: Error = serde_json::from_str::<u32>("not json").unwrap_err().into();
        assert!(matches!(err, Error::Serialization { .. }));
        assert!(error::Error::source(&err).is_some());
    }
}
