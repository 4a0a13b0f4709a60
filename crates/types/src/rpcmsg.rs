//! JSON-RPC 2.0 envelope types, shared by the upstream client
//! (`feeindex-rpc`) and the subscription hub (`feeindex-hub`).

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An inbound or outbound JSON-RPC 2.0 request/response envelope.
///
/// Request and response share one wire shape in this protocol (as the
/// original daemon's `jsonrpcMessage` does): a message is a request when
/// `method` is set, a response when `result`/`error` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcMessage {
    /// Always `"2.0"`.
    pub jsonrpc: String,
    /// Request/response correlation id. Absent on subscription pushes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    /// Method name, for requests and subscription pushes
    /// (`"eth_subscription"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    /// Request parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    /// Successful response payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error response payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcMessage {
    /// Build a request envelope.
    pub fn request(id: Value, method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_owned(),
            id: Some(id),
            method: Some(method.into()),
            params: Some(params),
            result: None,
            error: None,
        }
    }

    /// Build a success response envelope.
    pub fn response(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_owned(),
            id: Some(id),
            method: None,
            params: None,
            result: Some(result),
            error: None,
        }
    }

    /// Build an error response envelope.
    pub fn error_response(id: Option<Value>, error: JsonRpcError) -> Self {
        Self { jsonrpc: "2.0".to_owned(), id, method: None, params: None, result: None, error: Some(error) }
    }

    /// Build a subscription push (`method: "eth_subscription"`).
    pub fn subscription(subscription_id: &str, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_owned(),
            id: None,
            method: Some("eth_subscription".to_owned()),
            params: Some(serde_json::json!({ "subscription": subscription_id, "result": result })),
            result: None,
            error: None,
        }
    }
}

/// JSON-RPC 2.0 error object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    /// Error code.
    pub code: i64,
    /// Human-readable message.
    pub message: String,
    /// Optional additional error data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    /// `-32601 method not found`.
    pub fn method_not_found(method: &str) -> Self {
        Self { code: -32601, message: format!("method not found: {method}"), data: None }
    }

    /// `-32602 invalid params`.
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self { code: -32602, message: message.into(), data: None }
    }

    /// `-32700 parse error`.
    pub fn parse_error(message: impl Into<String>) -> Self {
        Self { code: -32700, message: message.into(), data: None }
    }

    /// `-32000 generic server error`.
    pub fn server_error(message: impl Into<String>) -> Self {
        Self { code: -32000, message: message.into(), data: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscription_push_has_no_id() {
        let msg = JsonRpcMessage::subscription("0xabc", serde_json::json!({"number": 1}));
        assert!(msg.id.is_none());
        assert_eq!(msg.method.as_deref(), Some("eth_subscription"));
    }

    #[test]
    fn request_roundtrips_through_json() {
        let msg = JsonRpcMessage::request(serde_json::json!(1), "eth_blockNumber", serde_json::json!([]));
        let s = serde_json::to_string(&msg).unwrap();
        let back: JsonRpcMessage = serde_json::from_str(&s).unwrap();
        assert_eq!(back.method.as_deref(), Some("eth_blockNumber"));
    }
}
