//! Tool executor: fills schema defaults, then runs the tool in its mode.

use serde_json::Value;
use tracing::debug;

use super::{Arguments, RegisteredTool, ToolBody};
use crate::error::ToolError;
use crate::rpc::writer::ChunkEmitter;

/// Copy schema-declared defaults into `args` for every missing property.
/// Arguments the schema does not mention pass through untouched.
pub fn apply_defaults(tool: &RegisteredTool, mut args: Arguments) -> Arguments {
    if let Some(props) = tool
        .descriptor
        .input_schema
        .get("properties")
        .and_then(|p| p.as_object())
    {
        for (name, prop) in props {
            if args.contains_key(name) {
                continue;
            }
            if let Some(default) = prop.get("default") {
                args.insert(name.clone(), default.clone());
            }
        }
    }
    args
}

/// Invoke `tool`. Direct tools never touch `emit`; streaming tools write each
/// chunk through it before continuing.
pub async fn invoke(
    tool: &RegisteredTool,
    args: Arguments,
    emit: &ChunkEmitter,
) -> Result<Value, ToolError> {
    let args = apply_defaults(tool, args);
    debug!("[tools] Invoking {} with {:?}", tool.name(), args);
    match &tool.body {
        ToolBody::Direct(body) => body.call(&args),
        ToolBody::Streaming(body) => body.call(&args, emit).await,
    }
}
