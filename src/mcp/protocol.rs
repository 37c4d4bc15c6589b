// src/mcp/protocol.rs

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    #[serde(default = "default_jsonrpc")]
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Value,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Response {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorObject>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorObject {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

fn default_jsonrpc() -> String {
    "2.0".to_string()
}

impl Request {
    pub fn is_notification(&self) -> bool {
        self.id.is_null()
    }
}

impl Response {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: Value, code: i32, message: String) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(ErrorObject {
                code,
                message,
                data: None,
            }),
        }
    }
}

// Standard JSON-RPC error codes
pub mod error_codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
}

/// Tool envelope: the success shape every tool handler returns.
pub fn tool_success<T: Serialize>(value: &T) -> Value {
    let text = serde_json::to_string_pretty(value)
        .unwrap_or_else(|_| "serialization failed".to_string());
    json!({
        "content": [ { "type": "text", "text": text } ]
    })
}

/// Tool envelope: the failure shape, with a human-readable message.
pub fn tool_error(message: impl Into<String>) -> Value {
    json!({
        "content": [ { "type": "text", "text": message.into() } ],
        "isError": true
    })
}

/// Resource envelope: the single-content shape `resources/read` returns.
pub fn resource_contents<T: Serialize>(uri: &str, value: &T) -> Value {
    let text = serde_json::to_string_pretty(value)
        .unwrap_or_else(|_| "serialization failed".to_string());
    json!({
        "contents": [ { "uri": uri, "mimeType": "application/json", "text": text } ]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notifications_have_null_ids() {
        let req: Request =
            serde_json::from_str(r#"{"jsonrpc":"2.0","method":"initialized"}"#).unwrap();
        assert!(req.is_notification());
        let req: Request =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":7,"method":"tools/list"}"#).unwrap();
        assert!(!req.is_notification());
    }

    #[test]
    fn tool_envelopes_have_the_documented_shape() {
        let ok = tool_success(&serde_json::json!({"x": 1}));
        assert_eq!(ok["content"][0]["type"], "text");
        assert!(ok.get("isError").is_none());

        let err = tool_error("step failed: boom");
        assert_eq!(err["isError"], true);
        assert_eq!(err["content"][0]["text"], "step failed: boom");
    }

    #[test]
    fn error_responses_skip_the_result_field() {
        let resp = Response::error(Value::from(1), error_codes::METHOD_NOT_FOUND, "nope".into());
        let s = serde_json::to_string(&resp).unwrap();
        assert!(!s.contains("\"result\""));
        assert!(s.contains("-32601"));
    }
}
