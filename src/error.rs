use thiserror::Error as ThisError;

/// Closed error taxonomy for a single optimize/title/validation call.
///
/// Every failure a caller can observe is one of these variants. Transport and
/// status classification never invent new categories at runtime, so UI layers
/// can `match` exhaustively when picking a user-facing message.
#[derive(Debug, ThisError)]
pub enum Error {
    /// HTTP 401: the API key was rejected by the backend.
    #[error("API key rejected or unauthorized (401)")]
    Unauthorized,

    /// HTTP 429: quota exhausted or too many requests.
    #[error("rate limit or quota exceeded (429)")]
    RateLimited,

    /// Any non-2xx status other than 401/429.
    #[error("HTTP error: {status}")]
    Http { status: u16 },

    /// Connection-level failure (DNS, TLS, reset) before or during the body.
    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),

    /// The configured timeout elapsed before the backend answered.
    #[error("request timed out")]
    Timeout,

    /// A 2xx response whose body is not in the expected shape at all.
    #[error("backend response was not in the expected format")]
    InvalidResponse,

    /// A 2xx response that carried no content.
    #[error("backend returned no content")]
    EmptyResponse,

    /// Detected before any network I/O; the message is user-actionable.
    #[error("configuration error: {message}")]
    Configuration { message: String },
}

impl Error {
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration {
            message: message.into(),
        }
    }

    /// Map a transport-level failure onto the taxonomy.
    ///
    /// `reqwest` reports timeouts as a flavor of its own error type; callers
    /// need them distinct from other network failures.
    pub(crate) fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::Timeout
        } else {
            Error::Network(err)
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::from_transport(err)
    }
}

/// Status-line classification shared by the streaming and non-streaming paths.
///
/// `None` means "proceed to the body". Classification looks at the status only,
/// never the body, so 401/429 behave identically regardless of what the
/// backend attaches to them.
pub fn classify_status(status: u16) -> Option<Error> {
    match status {
        200..=299 => None,
        401 => Some(Error::Unauthorized),
        429 => Some(Error::RateLimited),
        other => Some(Error::Http { status: other }),
    }
}
