//! Transport Layer for the Logs Backend
//!
//! Abstracts the HTTP round trip for testability. Provides:
//! - Fetcher trait: one query in, one decoded page out
//! - HttpTransport: blocking HTTPS client for production
//!
//! The in-process test double lives in `crate::mock`.

use std::fmt;
use std::time::Duration;

use ddtail_protocol::{LogsQuery, LogsResponse, ProtocolError};
use tracing::debug;

use super::page::Page;
use crate::config::{ServerConfig, REDACTED};

/// Header carrying the API key.
pub const API_KEY_HEADER: &str = "DD-API-KEY";

/// Header carrying the application key.
pub const APPLICATION_KEY_HEADER: &str = "DD-APPLICATION-KEY";

/// Fetcher trait for backend communication
pub trait Fetcher: Send + Sync {
    /// Execute one query and return the decoded page
    fn fetch(&self, query: &LogsQuery) -> Result<Page, TransportError>;
}

impl<F: Fetcher + ?Sized> Fetcher for &F {
    fn fetch(&self, query: &LogsQuery) -> Result<Page, TransportError> {
        (**self).fetch(query)
    }
}

impl<F: Fetcher + ?Sized> Fetcher for Box<F> {
    fn fetch(&self, query: &LogsQuery) -> Result<Page, TransportError> {
        (**self).fetch(query)
    }
}

/// Transport errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("Connection to {url} failed: {message}")]
    Connect { url: String, message: String },

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Authentication rejected ({status}): {body}")]
    Auth { status: u16, body: String },

    #[error("Backend returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Could not build request: {0}")]
    Request(String),
}

impl TransportError {
    /// Whether retrying the same request later may succeed.
    ///
    /// Connection failures, timeouts, I/O errors, 5xx and 429 are transient.
    /// Authentication, malformed bodies and other client errors are not.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Connect { .. } | Self::Timeout(_) | Self::Io(_) => true,
            Self::HttpStatus { status, .. } => is_transient_status(*status),
            Self::Auth { .. } | Self::MalformedResponse(_) | Self::Request(_) => false,
        }
    }

    /// Classify a non-success HTTP status.
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        match status {
            401 | 403 => Self::Auth { status, body },
            _ => Self::HttpStatus { status, body },
        }
    }
}

impl From<ProtocolError> for TransportError {
    fn from(err: ProtocolError) -> Self {
        TransportError::MalformedResponse(err.to_string())
    }
}

fn is_transient_status(status: u16) -> bool {
    status == 429 || (500..600).contains(&status)
}

/// Longest response body kept in an error message.
const MAX_ERROR_BODY: usize = 512;

fn clip_body(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY {
        return body.trim().to_string();
    }
    let mut end = MAX_ERROR_BODY;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", body[..end].trim_end())
}

/// HTTP transport for production use
///
/// POSTs the query as JSON to the configured endpoint with the credential
/// headers attached. One blocking client is reused for the whole session.
pub struct HttpTransport {
    client: reqwest::blocking::Client,
    url: String,
    api_key: String,
    application_key: String,
    timeout: Duration,
}

impl HttpTransport {
    /// Build a transport from server settings
    pub fn new(server: &ServerConfig) -> Result<Self, TransportError> {
        let timeout = server.timeout();
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("ddtail/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TransportError::Request(e.to_string()))?;

        Ok(Self {
            client,
            url: server.url.clone(),
            api_key: server.api_key.clone().unwrap_or_default(),
            application_key: server.application_key.clone().unwrap_or_default(),
            timeout,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn classify(&self, err: reqwest::Error) -> TransportError {
        if err.is_timeout() {
            TransportError::Timeout(self.timeout)
        } else if err.is_connect() {
            TransportError::Connect {
                url: self.url.clone(),
                message: err.to_string(),
            }
        } else if err.is_builder() {
            TransportError::Request(err.to_string())
        } else {
            TransportError::Io(err.to_string())
        }
    }
}

impl fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mask = |v: &str| if v.is_empty() { "" } else { REDACTED };
        f.debug_struct("HttpTransport")
            .field("url", &self.url)
            .field("api_key", &mask(&self.api_key))
            .field("application_key", &mask(&self.application_key))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Fetcher for HttpTransport {
    fn fetch(&self, query: &LogsQuery) -> Result<Page, TransportError> {
        debug!(
            url = %self.url,
            query = %query.query,
            from = %query.time.from,
            to = %query.time.to,
            cursor = query.start_at.as_deref().unwrap_or(""),
            "Fetching logs page"
        );

        let response = self
            .client
            .post(&self.url)
            .header(API_KEY_HEADER, &self.api_key)
            .header(APPLICATION_KEY_HEADER, &self.application_key)
            .json(query)
            .send()
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        let body = response.bytes().map_err(|e| self.classify(e))?;

        if !status.is_success() {
            let text = String::from_utf8_lossy(&body);
            return Err(TransportError::from_status(status.as_u16(), clip_body(&text)));
        }

        let decoded = LogsResponse::from_slice(&body)?;
        debug!(
            entries = decoded.logs.len(),
            status = %decoded.status,
            has_cursor = decoded.cursor().is_some(),
            "Received logs page"
        );
        Ok(Page::from_response(decoded))
    }
}
