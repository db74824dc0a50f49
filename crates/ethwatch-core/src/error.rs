use std::time::Duration;

/// Failures talking to the chain node over JSON-RPC.
///
/// `Transport`, `Timeout` and `Cancelled` mean the node could not be reached
/// (or the request was abandoned); `ServerError` and `InvalidResponse` mean
/// the node answered with something we cannot use.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("request cancelled by shutdown")]
    Cancelled,

    #[error("JSON-RPC server error {code}: {message}")]
    ServerError { code: i64, message: String },

    #[error("invalid JSON-RPC response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("RPC communication failure: {0}")]
    Rpc(#[from] RpcError),

    #[error("invalid block data: {0}")]
    InvalidBlockData(String),

    #[error("cannot determine initial chain head: {0}")]
    Startup(#[source] Box<CoreError>),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl CoreError {
    /// The node was unreachable, too slow, or the request was cancelled.
    pub fn is_transport(&self) -> bool {
        match self {
            Self::Rpc(RpcError::Transport(_) | RpcError::Timeout(_) | RpcError::Cancelled) => true,
            Self::Startup(inner) => inner.is_transport(),
            _ => false,
        }
    }

    /// The node answered, but the answer was an error object or malformed.
    pub fn is_protocol(&self) -> bool {
        match self {
            Self::Rpc(RpcError::ServerError { .. } | RpcError::InvalidResponse(_)) => true,
            Self::InvalidBlockData(_) => true,
            Self::Startup(inner) => inner.is_protocol(),
            _ => false,
        }
    }
}
