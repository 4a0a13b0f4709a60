use feeindex_types::rpcmsg::JsonRpcError;

/// Errors returned to a client as a single JSON-RPC error reply. The
/// connection stays open after one of these.
#[derive(thiserror::Error, Debug)]
pub enum ClientProtocolError {
    /// The inbound frame was not valid JSON-RPC.
    #[error("malformed request: {0}")]
    Malformed(String),

    /// `method` is not one of the handlers this hub registers.
    #[error("unknown method: {0}")]
    UnknownMethod(String),

    /// The requested subscription topic is not in the allow-list.
    #[error("unknown subscription topic: {0}")]
    UnknownTopic(String),

    /// A client tried to act on a subscription that is no longer
    /// registered (e.g. the hub evicted it between registration and
    /// this request).
    #[error("client no longer registered")]
    ClientGone,
}

impl From<ClientProtocolError> for JsonRpcError {
    fn from(value: ClientProtocolError) -> Self {
        match value {
            ClientProtocolError::Malformed(message) => Self::parse_error(message),
            ClientProtocolError::UnknownMethod(method) => Self::method_not_found(&method),
            ClientProtocolError::UnknownTopic(topic) => Self::invalid_params(format!("unknown topic: {topic}")),
            ClientProtocolError::ClientGone => Self::server_error("client no longer registered"),
        }
    }
}
