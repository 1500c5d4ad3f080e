//! JSON-RPC 2.0 envelope types for the command surface.
//!
//! Only the handful of shapes the surface needs; batches and
//! notifications are not supported.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A JSON-RPC 2.0 request.
#[derive(Debug, Deserialize)]
pub struct Request {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: Value,
    #[serde(default)]
    pub id: Value,
}

/// A JSON-RPC 2.0 response carrying either `result` or `error`.
#[derive(Debug, Serialize, Deserialize)]
pub struct Response {
    pub jsonrpc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
    pub id: Value,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

// Standard codes
pub const PARSE_ERROR: i32 = -32700;
pub const INVALID_REQUEST: i32 = -32600;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;

// Application codes
pub const VALIDATION_ERROR: i32 = -32010;
pub const NOT_FOUND: i32 = -32011;
pub const PERSISTENCE_ERROR: i32 = -32012;
pub const UNAVAILABLE: i32 = -32013;
pub const INTERNAL_ERROR: i32 = -32603;

impl Response {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    pub fn error(id: Value, code: i32, message: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: None,
            error: Some(RpcError {
                code,
                message: message.into(),
                data,
            }),
            id,
        }
    }

    /// The id is unknown when the request could not be parsed.
    pub fn parse_error(message: impl Into<String>) -> Self {
        Self::error(Value::Null, PARSE_ERROR, message, None)
    }
}

impl Request {
    pub fn validate(&self) -> Result<(), String> {
        if self.jsonrpc != "2.0" {
            return Err("jsonrpc must be \"2.0\"".to_string());
        }
        if self.method.is_empty() {
            return Err("method must not be empty".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_without_params_defaults_to_null() {
        let req: Request = serde_json::from_str(r#"{"jsonrpc":"2.0","method":"list","id":1}"#).unwrap();
        assert_eq!(req.params, Value::Null);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn wrong_version_is_invalid() {
        let req: Request = serde_json::from_str(r#"{"jsonrpc":"1.0","method":"list","id":1}"#).unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn success_and_error_are_exclusive() {
        let ok = serde_json::to_string(&Response::success(1.into(), serde_json::json!([]))).unwrap();
        assert!(ok.contains("\"result\"") && !ok.contains("\"error\""));

        let err = serde_json::to_string(&Response::error(1.into(), NOT_FOUND, "gone", None)).unwrap();
        assert!(!err.contains("\"result\"") && err.contains("-32011"));
    }
}
