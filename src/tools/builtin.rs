//! Built-in tools shipped with the server.
//!
//! - `hello`       -- direct: greets `name` (default "World")
//! - `call_stream` -- streaming: emits `count` chunks, `delay` seconds apart

use std::time::Duration;

use futures_util::future::BoxFuture;
use serde_json::{json, Value};

use super::{
    integer_arg, number_arg, string_arg, Arguments, DirectTool, RegisteredTool, StreamingTool,
    ToolDescriptor, ToolRegistry,
};
use crate::error::{RegistryError, ToolError};
use crate::rpc::writer::ChunkEmitter;

const DEFAULT_NAME: &str = "World";
const DEFAULT_COUNT: i64 = 5;
const DEFAULT_DELAY_SECS: f64 = 1.0;

/// Registry containing the built-in tools, in `tools/list` order.
pub fn registry() -> Result<ToolRegistry, RegistryError> {
    Ok(ToolRegistry::builder()
        .register(hello_tool())?
        .register(call_stream_tool())?
        .build())
}

// ---------------------------------------------------------------------------
// hello
// ---------------------------------------------------------------------------

pub struct Hello;

impl DirectTool for Hello {
    fn call(&self, args: &Arguments) -> Result<Value, ToolError> {
        let name = string_arg(args, "name", DEFAULT_NAME)?;
        Ok(Value::String(format!("Hello, {}!", name)))
    }
}

pub fn hello_tool() -> RegisteredTool {
    RegisteredTool::direct(
        ToolDescriptor::new(
            "hello",
            "Say hello to someone",
            json!({
                "type": "object",
                "properties": {
                    "name": {
                        "type": "string",
                        "description": "Name to greet",
                        "default": DEFAULT_NAME
                    }
                }
            }),
        ),
        Hello,
    )
}

// ---------------------------------------------------------------------------
// call_stream
// ---------------------------------------------------------------------------

pub struct CallStream;

impl StreamingTool for CallStream {
    fn call<'a>(
        &'a self,
        args: &'a Arguments,
        emit: &'a ChunkEmitter,
    ) -> BoxFuture<'a, Result<Value, ToolError>> {
        Box::pin(async move {
            let count = integer_arg(args, "count", DEFAULT_COUNT)?;
            let delay = number_arg(args, "delay", DEFAULT_DELAY_SECS)?.max(0.0);
            let pause = Duration::try_from_secs_f64(delay)
                .map_err(|e| ToolError::invalid_argument("delay", e.to_string()))?;

            for i in 1..=count.max(0) {
                if i > 1 && !pause.is_zero() {
                    tokio::time::sleep(pause).await;
                }
                emit.emit(json!(format!("Chunk {} of {}", i, count))).await?;
            }

            Ok(json!("Stream complete"))
        })
    }
}

pub fn call_stream_tool() -> RegisteredTool {
    RegisteredTool::streaming(
        ToolDescriptor::new(
            "call_stream",
            "Stream count messages from 1 to n",
            json!({
                "type": "object",
                "properties": {
                    "count": {
                        "type": "integer",
                        "description": "Number of chunks to emit",
                        "default": DEFAULT_COUNT
                    },
                    "delay": {
                        "type": "number",
                        "description": "Seconds to wait between chunks",
                        "default": DEFAULT_DELAY_SECS
                    }
                }
            }),
        ),
        CallStream,
    )
}
