//! JSON-RPC message types and the one-message-per-line codec.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::DecodeError;

pub const JSONRPC_VERSION: &str = "2.0";

// ---------------------------------------------------------------------------
// Error codes
// ---------------------------------------------------------------------------

pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;
pub const TOOL_ERROR: i64 = -32000;

// ---------------------------------------------------------------------------
// Incoming
// ---------------------------------------------------------------------------

/// Incoming JSON-RPC request (or client notification when `id` is absent).
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    /// Raw `jsonrpc` field; `None` when the client omitted it.
    pub jsonrpc: Option<String>,
    /// Correlation token. `None` covers both an absent and an explicit `null` id.
    pub id: Option<Value>,
    pub method: String,
    pub params: Map<String, Value>,
}

impl Request {
    /// The id to echo back, `null` when the request carried none.
    pub fn response_id(&self) -> Value {
        self.id.clone().unwrap_or(Value::Null)
    }

    pub fn has_valid_version(&self) -> bool {
        self.jsonrpc.as_deref() == Some(JSONRPC_VERSION)
    }
}

// ---------------------------------------------------------------------------
// Outgoing
// ---------------------------------------------------------------------------

/// Outgoing JSON-RPC response. Exactly one of `result`/`error` is set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    jsonrpc: &'static str,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorObject>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorObject {
    pub code: i64,
    pub message: String,
}

impl Response {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            result: None,
            error: Some(ErrorObject {
                code,
                message: message.into(),
            }),
        }
    }
}

/// Server-originated notification (no id).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    jsonrpc: &'static str,
    pub method: String,
    pub params: Value,
}

impl Notification {
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            method: method.into(),
            params,
        }
    }

    /// A streaming chunk: `{"method":"chunk","params":{"result":value}}`.
    pub fn chunk(value: Value) -> Self {
        Self::new("chunk", serde_json::json!({ "result": value }))
    }
}

// ---------------------------------------------------------------------------
// Codec
// ---------------------------------------------------------------------------

/// Decode one input line. Callers skip blank lines before calling this.
pub fn decode(line: &str) -> Result<Request, DecodeError> {
    let value: Value = serde_json::from_str(line)?;
    let Value::Object(mut obj) = value else {
        return Err(DecodeError::NotAnObject);
    };

    let method = match obj.remove("method") {
        Some(Value::String(m)) => m,
        _ => return Err(DecodeError::MissingMethod),
    };

    let params = match obj.remove("params") {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(p)) => p,
        Some(_) => return Err(DecodeError::ParamsNotObject),
    };

    let jsonrpc = match obj.remove("jsonrpc") {
        Some(Value::String(v)) => Some(v),
        _ => None,
    };

    let id = match obj.remove("id") {
        None | Some(Value::Null) => None,
        Some(id) => Some(id),
    };

    Ok(Request {
        jsonrpc,
        id,
        method,
        params,
    })
}

/// Encode a message as a single line (no trailing newline).
///
/// Compact serde_json output escapes control characters inside strings, so the
/// result never contains a raw newline.
pub fn encode<T: Serialize>(message: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string(message)
}
