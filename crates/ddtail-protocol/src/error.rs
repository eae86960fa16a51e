//! Error types for the wire protocol.

/// Failure to decode a response body.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Malformed response: {0}")]
    Malformed(String),
}

impl From<serde_json::Error> for ProtocolError {
    fn from(err: serde_json::Error) -> Self {
        ProtocolError::Malformed(err.to_string())
    }
}
