use std::time::Duration;

use tokio_tungstenite::tungstenite;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Rpc(#[from] RpcError),
}

impl CoreError {
    /// Whether the failure happened on the wire and an identical request
    /// may succeed if sent again later. Protocol and server errors are never
    /// retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Rpc(rpc) if rpc.is_transport())
    }
}

/// Failures of a single signed round trip.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("websocket transport failure: {0}")]
    Transport(#[from] tungstenite::Error),

    #[error("timed out after {after:?} while {stage}")]
    Timeout { stage: TimeoutStage, after: Duration },

    #[error("connection closed before a response arrived")]
    ConnectionClosed,

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("server error: {message}")]
    ServerError { code: Option<i64>, message: String },
}

impl RpcError {
    /// Connection-level failures, as opposed to a response the server did
    /// send but which was malformed or an explicit rejection.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::Timeout { .. } | Self::ConnectionClosed
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutStage {
    Connect,
    Response,
}

impl std::fmt::Display for TimeoutStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connect => f.write_str("connecting"),
            Self::Response => f.write_str("awaiting the response"),
        }
    }
}
