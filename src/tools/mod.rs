//! Tool capability types, registry, and executor.
//!
//! - `registry` -- immutable, ordered name -> tool table
//! - `executor` -- default resolution + direct/streaming invocation
//! - `builtin`  -- the shipped `hello` and `call_stream` tools

pub mod builtin;
pub mod executor;
pub mod registry;

use futures_util::future::BoxFuture;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::ToolError;
use crate::rpc::writer::ChunkEmitter;

pub use registry::ToolRegistry;

/// Tool arguments as received in `tools/call`.
pub type Arguments = Map<String, Value>;

/// Public description of a tool, as returned by `tools/list`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

impl ToolDescriptor {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }

    /// Schema-declared default for `property`, if any.
    pub fn default_for(&self, property: &str) -> Option<&Value> {
        self.input_schema
            .get("properties")?
            .get(property)?
            .get("default")
    }
}

/// A tool that computes one value and returns.
pub trait DirectTool: Send + Sync {
    fn call(&self, args: &Arguments) -> Result<Value, ToolError>;
}

/// A tool that emits intermediate values before returning its terminal value.
pub trait StreamingTool: Send + Sync {
    fn call<'a>(
        &'a self,
        args: &'a Arguments,
        emit: &'a ChunkEmitter,
    ) -> BoxFuture<'a, Result<Value, ToolError>>;
}

/// Call mode, fixed at registration.
pub enum ToolBody {
    Direct(Box<dyn DirectTool>),
    Streaming(Box<dyn StreamingTool>),
}

/// Registry entry: descriptor + body.
pub struct RegisteredTool {
    pub descriptor: ToolDescriptor,
    pub body: ToolBody,
}

impl RegisteredTool {
    pub fn direct(descriptor: ToolDescriptor, tool: impl DirectTool + 'static) -> Self {
        Self {
            descriptor,
            body: ToolBody::Direct(Box::new(tool)),
        }
    }

    pub fn streaming(descriptor: ToolDescriptor, tool: impl StreamingTool + 'static) -> Self {
        Self {
            descriptor,
            body: ToolBody::Streaming(Box::new(tool)),
        }
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn is_streaming(&self) -> bool {
        matches!(self.body, ToolBody::Streaming(_))
    }
}

// ---------------------------------------------------------------------------
// Argument helpers
// ---------------------------------------------------------------------------

/// Read a string argument, falling back to `default` when absent or null.
pub fn string_arg(args: &Arguments, name: &str, default: &str) -> Result<String, ToolError> {
    match args.get(name) {
        None | Some(Value::Null) => Ok(default.to_string()),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(ToolError::invalid_argument(name, "expected a string")),
    }
}

/// Read an integer argument. Whole-valued floats (`3.0`) are accepted.
pub fn integer_arg(args: &Arguments, name: &str, default: i64) -> Result<i64, ToolError> {
    match args.get(name) {
        None | Some(Value::Null) => Ok(default),
        Some(Value::Number(n)) => {
            if let Some(i) = n.as_i64() {
                Ok(i)
            } else {
                match n.as_f64() {
                    Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Ok(f as i64),
                    _ => Err(ToolError::invalid_argument(name, "expected an integer")),
                }
            }
        }
        Some(_) => Err(ToolError::invalid_argument(name, "expected an integer")),
    }
}

pub fn number_arg(args: &Arguments, name: &str, default: f64) -> Result<f64, ToolError> {
    match args.get(name) {
        None | Some(Value::Null) => Ok(default),
        Some(Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| ToolError::invalid_argument(name, "expected a number")),
        Some(_) => Err(ToolError::invalid_argument(name, "expected a number")),
    }
}
