//! Transport-level error types.

use thiserror::Error;

use crate::request::JsonRpcError;

#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection refused, TLS failure, non-2xx status, …
    #[error("HTTP error: {0}")]
    Http(String),

    /// The node answered with a JSON-RPC error object.
    #[error("RPC error {}: {}", .0.code, .0.message)]
    Rpc(JsonRpcError),

    #[error("Request timed out after {ms}ms")]
    Timeout { ms: u64 },

    #[error("Deserialization error: {0}")]
    Deserialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl TransportError {
    /// Returns `true` if the node understood the request and rejected it.
    pub fn is_node_error(&self) -> bool {
        matches!(self, Self::Rpc(_))
    }
}
