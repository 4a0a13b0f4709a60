/// Result type for [`crate::UpstreamClient`] and [`crate::ReceiptWorkerPool`]
/// operations.
pub type Result<T> = std::result::Result<T, UpstreamError>;

/// Errors returned by calls against the upstream node.
#[derive(thiserror::Error, Debug)]
pub enum UpstreamError {
    /// The transport failed to reach the upstream node.
    #[error("error contacting upstream node: {0}")]
    Transport(#[from] reqwest::Error),

    /// The upstream URL could not be parsed.
    #[error(transparent)]
    Url(#[from] url::ParseError),

    /// The upstream node replied with a JSON-RPC error object.
    #[error("upstream returned an error: {code} {message}")]
    Rpc {
        /// JSON-RPC error code.
        code: i64,
        /// JSON-RPC error message.
        message: String,
    },

    /// The response body could not be decoded as the expected shape.
    #[error("failed to decode upstream response: {0}")]
    Decode(String),

    /// A websocket subscription attempt or read failed.
    #[error("websocket subscription error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}
