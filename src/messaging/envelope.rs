use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::domain::order::RpcError;

// ============================================================================
// Request / Reply Packets
// ============================================================================
//
// Request:  {"id", "pattern", "data", "reply_to"}
// Reply:    {"id", "response"} on success, {"id", "err"} on failure
//
// `pattern` is either a bare string ("createOrder") or {"cmd": "..."}.
//
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRequest {
    pub id: Uuid,
    pub pattern: Value,
    #[serde(default)]
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
}

impl RpcRequest {
    pub fn command(cmd: &str, data: Value, reply_to: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            pattern: serde_json::json!({ "cmd": cmd }),
            data,
            reply_to: Some(reply_to.into()),
        }
    }

    pub fn pattern_name(&self) -> Option<&str> {
        match &self.pattern {
            Value::String(name) => Some(name),
            Value::Object(fields) => fields.get("cmd").and_then(Value::as_str),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplyError {
    pub status: u16,
    pub message: String,
    /// Ids the responder could not resolve, when it reports them.
    #[serde(default, rename = "productIds", skip_serializing_if = "Vec::is_empty")]
    pub product_ids: Vec<String>,
}

impl From<RpcError> for ReplyError {
    fn from(error: RpcError) -> Self {
        Self {
            status: error.status,
            message: error.message,
            product_ids: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcReply {
    pub id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub err: Option<ReplyError>,
}

impl RpcReply {
    pub fn ok(id: Uuid, response: Value) -> Self {
        Self {
            id,
            response: Some(response),
            err: None,
        }
    }

    pub fn failed(id: Uuid, error: impl Into<ReplyError>) -> Self {
        Self {
            id,
            response: None,
            err: Some(error.into()),
        }
    }

    pub fn into_result(self) -> Result<Value, ReplyError> {
        match (self.err, self.response) {
            (Some(err), _) => Err(err),
            (None, Some(response)) => Ok(response),
            (None, None) => Ok(Value::Null),
        }
    }
}
