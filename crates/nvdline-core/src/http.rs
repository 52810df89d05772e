//! HTTP client construction and JSON GET with a sync interface.
//!
//! Uses async reqwest internally, driven on a shared tokio runtime, but presents
//! a blocking interface so callers can stay on plain threads.

use std::sync::LazyLock;
use std::time::Duration;

/// Connect timeout
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Error from a single upstream request
#[derive(Debug)]
pub enum FetchError {
    /// Non-success HTTP status or network failure
    Transport {
        status: Option<u16>,
        message: String,
    },
    /// Body is not valid JSON
    Decode(String),
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport {
                status: Some(s),
                message,
            } => write!(f, "HTTP {s}: {message}"),
            Self::Transport {
                status: None,
                message,
            } => write!(f, "HTTP error: {message}"),
            Self::Decode(msg) => write!(f, "invalid JSON body: {msg}"),
        }
    }
}

impl std::error::Error for FetchError {}

impl FetchError {
    /// Create transport error from reqwest error.
    ///
    /// The URL is stripped so query strings never end up in logs.
    pub fn from_reqwest(e: reqwest::Error) -> Self {
        Self::Transport {
            status: e.status().map(|s| s.as_u16()),
            message: e.without_url().to_string(),
        }
    }

    /// HTTP status code, if the server answered
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport { status, .. } => *status,
            Self::Decode(_) => None,
        }
    }
}

/// Options for building the HTTP client
#[derive(Debug, Clone, Default)]
pub struct HttpOptions {
    /// Disable TLS certificate verification (insecure, opt-in only)
    pub accept_invalid_certs: bool,
    /// Per-request timeout; `None` keeps the transport default (no timeout)
    pub request_timeout: Option<Duration>,
}

/// Build an async HTTP client.
pub fn build_client(opts: &HttpOptions) -> Result<reqwest::Client, FetchError> {
    let mut builder = reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .user_agent(concat!("nvdline/", env!("CARGO_PKG_VERSION")));
    if let Some(timeout) = opts.request_timeout {
        builder = builder.timeout(timeout);
    }
    if opts.accept_invalid_certs {
        log::warn!(
            "TLS certificate verification is DISABLED (accept_invalid_certs = true); \
             responses can be intercepted"
        );
        builder = builder.danger_accept_invalid_certs(true);
    }
    builder.build().map_err(FetchError::from_reqwest)
}

/// Shared tokio runtime for HTTP operations.
pub static SHARED_RUNTIME: LazyLock<tokio::runtime::Runtime> = LazyLock::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("failed to build tokio runtime")
});

/// Blocking GET returning the decoded JSON body.
///
/// Returns `Ok(None)` for an empty body or a literal `null`.
/// Any non-success status is an error; nothing is retried.
pub fn get_json(
    client: &reqwest::Client,
    url: &str,
    headers: &[(&str, &str)],
    query: &[(&str, String)],
) -> Result<Option<serde_json::Value>, FetchError> {
    let body: Result<String, reqwest::Error> = SHARED_RUNTIME.handle().block_on(async {
        let mut req = client.get(url).query(query);
        for (name, value) in headers {
            req = req.header(*name, *value);
        }
        let resp = req.send().await?.error_for_status()?;
        log::debug!("Response status code: {}", resp.status());
        resp.text().await
    });
    let body = body.map_err(FetchError::from_reqwest)?;
    parse_body(&body)
}

/// Decode a response body; empty text or `null` is "no data".
pub fn parse_body(body: &str) -> Result<Option<serde_json::Value>, FetchError> {
    if body.trim().is_empty() {
        return Ok(None);
    }
    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|e| FetchError::Decode(e.to_string()))?;
    Ok((!value.is_null()).then_some(value))
}
