//! Request dispatcher.
//!
//! Reads newline-delimited requests from one input stream, routes each to its
//! handler, and writes responses and chunk notifications through a single
//! `OutputWriter`. Requests are handled one at a time; input intake runs on
//! its own task so a streaming tool's pauses never stall reading.

use std::sync::Arc;

use serde_json::{json, Map, Value};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::codec::{
    self, Request, Response, INVALID_PARAMS, INVALID_REQUEST, METHOD_NOT_FOUND, TOOL_ERROR,
};
use super::writer::{ChunkEmitter, OutputWriter};
use crate::config::ServerConfig;
use crate::error::{ServerError, ToolError};
use crate::tools::{executor, ToolRegistry};

const PROTOCOL_VERSION: &str = "2024-11-05";
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

// ---------------------------------------------------------------------------
// Methods
// ---------------------------------------------------------------------------

/// Every method the server knows about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    Initialize,
    ToolsList,
    ToolsCall,
    ChatSend,
    Shutdown,
    Ping,
    /// Client notification sent after the handshake. Sent with an id it is
    /// an unknown call.
    Initialized,
    /// Client notification cancelling an earlier request. Logged only.
    Cancelled,
    Unknown(String),
}

impl Method {
    pub fn parse(name: &str) -> Self {
        match name {
            "initialize" => Method::Initialize,
            "tools/list" => Method::ToolsList,
            "tools/call" => Method::ToolsCall,
            "chat/send" => Method::ChatSend,
            "shutdown" => Method::Shutdown,
            "ping" => Method::Ping,
            "initialized" | "notifications/initialized" => Method::Initialized,
            "notifications/cancelled" => Method::Cancelled,
            other => Method::Unknown(other.to_string()),
        }
    }

    /// Call-shaped methods are answered even when the request has no id.
    pub fn is_call_shaped(&self) -> bool {
        matches!(
            self,
            Method::Initialize
                | Method::ToolsList
                | Method::ToolsCall
                | Method::ChatSend
                | Method::Shutdown
                | Method::Ping
        )
    }
}

/// What the serve loop should do after a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Shutdown,
}

/// Why `serve` returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServeOutcome {
    /// The input stream reached EOF.
    InputClosed,
    /// A `shutdown` request was answered and the server is configured to exit.
    Shutdown,
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
    server_name: String,
    exit_on_shutdown: bool,
}

impl Dispatcher {
    pub fn new(registry: Arc<ToolRegistry>, config: &ServerConfig) -> Self {
        Self {
            registry,
            server_name: config.server_name.clone(),
            exit_on_shutdown: config.exit_on_shutdown,
        }
    }

    /// Serve one request stream until EOF or shutdown.
    ///
    /// Only output I/O failures end the loop early; every per-request error is
    /// answered (or logged) and the loop moves on.
    pub async fn serve<R, W>(&self, reader: R, writer: W) -> Result<ServeOutcome, ServerError>
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let out = OutputWriter::new(writer);
        let (mut lines, intake) = spawn_line_reader(reader);

        let outcome = loop {
            let line = match lines.recv().await {
                Some(Ok(line)) => line,
                Some(Err(e)) => {
                    error!("[rpc] Input read error: {}", e);
                    intake.abort();
                    return Err(e.into());
                }
                None => break ServeOutcome::InputClosed,
            };

            match self.handle_line(&line, &out).await {
                Ok(Flow::Continue) => {}
                Ok(Flow::Shutdown) => break ServeOutcome::Shutdown,
                Err(e) => {
                    error!("[rpc] Failed to write output: {}", e);
                    intake.abort();
                    return Err(e.into());
                }
            }
        };

        intake.abort();
        info!("[rpc] Serve loop finished: {:?}", outcome);
        Ok(outcome)
    }

    /// Decode and handle one raw input line. Blank lines and undecodable lines
    /// produce no output.
    pub async fn handle_line(
        &self,
        line: &str,
        out: &OutputWriter,
    ) -> Result<Flow, std::io::Error> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(Flow::Continue);
        }

        match codec::decode(line) {
            Ok(request) => self.handle_request(request, out).await,
            Err(e) => {
                warn!("[rpc] Dropping undecodable line ({}): {}", e, line);
                Ok(Flow::Continue)
            }
        }
    }

    /// Route a decoded request and write its terminal response (plus any chunk
    /// notifications for streaming tools).
    pub async fn handle_request(
        &self,
        request: Request,
        out: &OutputWriter,
    ) -> Result<Flow, std::io::Error> {
        let method = Method::parse(&request.method);

        if request.id.is_none() && !method.is_call_shaped() {
            self.handle_client_notification(&method, &request);
            return Ok(Flow::Continue);
        }

        let id = request.response_id();
        info!("[rpc] {} id={}", request.method, id);

        if !request.has_valid_version() {
            warn!("[rpc] Rejecting request with jsonrpc={:?}", request.jsonrpc);
            out.write_message(&Response::error(id, INVALID_REQUEST, "Invalid JSON-RPC version"))
                .await?;
            return Ok(Flow::Continue);
        }

        let mut flow = Flow::Continue;
        let response = match method {
            Method::Initialize => self.handle_initialize(id),
            Method::ToolsList => self.handle_tools_list(id),
            Method::ToolsCall => self.handle_tools_call(id, &request.params, out).await?,
            Method::ChatSend => handle_chat_send(id, &request.params),
            Method::Shutdown => {
                info!("[rpc] Shutdown requested");
                if self.exit_on_shutdown {
                    flow = Flow::Shutdown;
                }
                Response::success(id, Value::Null)
            }
            Method::Ping => Response::success(id, json!({})),
            Method::Initialized | Method::Cancelled | Method::Unknown(_) => {
                warn!("[rpc] Unknown method: {}", request.method);
                Response::error(
                    id,
                    METHOD_NOT_FOUND,
                    format!("Unknown method {}", request.method),
                )
            }
        };

        out.write_message(&response).await?;
        Ok(flow)
    }

    fn handle_client_notification(&self, method: &Method, request: &Request) {
        match method {
            Method::Initialized => info!("[rpc] Client sent 'initialized' notification"),
            Method::Cancelled => info!("[rpc] Request cancelled: {:?}", request.params),
            _ => debug!("[rpc] Ignoring client notification: {}", request.method),
        }
    }

    /// `initialize` -- advertise capabilities.
    fn handle_initialize(&self, id: Value) -> Response {
        Response::success(
            id,
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {
                    "chat": true,
                    "streaming": true,
                    "tool_calls": true,
                    "shutdown": true
                },
                "serverInfo": {
                    "name": self.server_name,
                    "version": SERVER_VERSION
                }
            }),
        )
    }

    /// `tools/list` -- descriptors in registry order.
    fn handle_tools_list(&self, id: Value) -> Response {
        Response::success(id, json!({ "tools": self.registry.list() }))
    }

    /// `tools/call` -- resolve the tool, then run it. Resolution failures
    /// return before any chunk can be written.
    async fn handle_tools_call(
        &self,
        id: Value,
        params: &Map<String, Value>,
        out: &OutputWriter,
    ) -> Result<Response, std::io::Error> {
        let Some(name) = params.get("name").and_then(|v| v.as_str()) else {
            return Ok(Response::error(id, INVALID_PARAMS, "Missing tool name in params"));
        };

        let args = match params.get("arguments") {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(args)) => args.clone(),
            Some(_) => {
                return Ok(Response::error(id, INVALID_PARAMS, "`arguments` must be an object"));
            }
        };

        let Some(tool) = self.registry.get(name) else {
            warn!("[rpc] Tool not found: {}", name);
            return Ok(Response::error(id, METHOD_NOT_FOUND, "Tool not found"));
        };

        info!("[rpc] tools/call name={} args={:?}", name, args);
        let emitter = ChunkEmitter::new(out.clone());
        match executor::invoke(tool, args, &emitter).await {
            Ok(value) => {
                if tool.is_streaming() {
                    info!("[rpc] {} finished after {} chunks", name, emitter.emitted());
                }
                Ok(Response::success(id, json!({ "result": value })))
            }
            // The output stream is gone; nothing left to answer on.
            Err(ToolError::Emit(e)) => Err(e),
            Err(e) => {
                warn!("[rpc] Tool {} failed after {} chunks: {}", name, emitter.emitted(), e);
                Ok(Response::error(id, TOOL_ERROR, e.to_string()))
            }
        }
    }
}

/// `chat/send` -- echo stub.
fn handle_chat_send(id: Value, params: &Map<String, Value>) -> Response {
    let content = params
        .get("message")
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str());

    match content {
        Some(content) => Response::success(
            id,
            json!({
                "message": {
                    "role": "assistant",
                    "content": format!("Echo: {}", content)
                }
            }),
        ),
        None => Response::error(id, INVALID_PARAMS, "Missing message content"),
    }
}

// ---------------------------------------------------------------------------
// Input intake
// ---------------------------------------------------------------------------

/// Spawn a task that splits `reader` into lines and forwards them through the
/// returned channel. Lines that are not valid UTF-8 are logged and skipped.
/// The channel closes at EOF; a read error is forwarded once and ends intake.
fn spawn_line_reader<R>(
    reader: R,
) -> (
    mpsc::UnboundedReceiver<Result<String, std::io::Error>>,
    tokio::task::JoinHandle<()>,
)
where
    R: AsyncRead + Send + Unpin + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();

    let handle = tokio::spawn(async move {
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => match String::from_utf8(std::mem::take(&mut buf)) {
                    Ok(line) => {
                        if tx.send(Ok(line)).is_err() {
                            break; // Receiver dropped -- serve loop is gone.
                        }
                    }
                    Err(e) => warn!("[rpc] Dropping non-UTF-8 line: {}", e),
                },
                Err(e) => {
                    let _ = tx.send(Err(e));
                    break;
                }
            }
        }
        debug!("[rpc] Input reader exiting");
    });

    (rx, handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::writer::test_support::CaptureBuffer;
    use crate::tools::builtin;

    fn dispatcher() -> Dispatcher {
        let registry = Arc::new(builtin::registry().unwrap());
        Dispatcher::new(registry, &ServerConfig::default())
    }

    async fn run(lines: &[&str]) -> Vec<Value> {
        let d = dispatcher();
        let buf = CaptureBuffer::default();
        let out = OutputWriter::new(buf.clone());
        for line in lines {
            d.handle_line(line, &out).await.unwrap();
        }
        buf.lines()
    }

    #[test]
    fn test_method_parse() {
        assert_eq!(Method::parse("tools/call"), Method::ToolsCall);
        assert_eq!(Method::parse("Tools/Call"), Method::Unknown("Tools/Call".into()));
        assert!(Method::parse("shutdown").is_call_shaped());
        assert!(!Method::parse("initialized").is_call_shaped());
        assert!(!Method::parse("foo").is_call_shaped());
        assert_eq!(Method::parse("notifications/initialized"), Method::Initialized);
    }

    #[tokio::test]
    async fn test_hello_scenario() {
        let out = run(&[
            r#"{"jsonrpc":"2.0","id":1,"method":"tools/call","params":{"name":"hello","arguments":{"name":"Ada"}}}"#,
        ])
        .await;
        assert_eq!(out, vec![json!({"jsonrpc":"2.0","id":1,"result":{"result":"Hello, Ada!"}})]);
    }

    #[tokio::test]
    async fn test_hello_default_name() {
        let out = run(&[
            r#"{"jsonrpc":"2.0","id":"h","method":"tools/call","params":{"name":"hello"}}"#,
        ])
        .await;
        assert_eq!(out[0]["result"]["result"], "Hello, World!");
        assert_eq!(out[0]["id"], "h");
    }

    #[tokio::test]
    async fn test_stream_scenario() {
        let out = run(&[
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"call_stream","arguments":{"count":2,"delay":0}}}"#,
        ])
        .await;
        assert_eq!(
            out,
            vec![
                json!({"jsonrpc":"2.0","method":"chunk","params":{"result":"Chunk 1 of 2"}}),
                json!({"jsonrpc":"2.0","method":"chunk","params":{"result":"Chunk 2 of 2"}}),
                json!({"jsonrpc":"2.0","id":2,"result":{"result":"Stream complete"}}),
            ]
        );
    }

    #[tokio::test]
    async fn test_stream_zero_count() {
        let out = run(&[
            r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"call_stream","arguments":{"count":0,"delay":0}}}"#,
        ])
        .await;
        assert_eq!(out.len(), 1);
        assert_eq!(out[0]["id"], 3);
        assert_eq!(out[0]["result"]["result"], "Stream complete");
    }

    #[tokio::test]
    async fn test_tool_not_found_emits_no_chunks() {
        let out = run(&[
            r#"{"jsonrpc":"2.0","id":4,"method":"tools/call","params":{"name":"missing_tool","arguments":{}}}"#,
        ])
        .await;
        assert_eq!(out.len(), 1);
        assert_eq!(out[0]["id"], 4);
        assert_eq!(out[0]["error"]["code"], -32601);
        assert_eq!(out[0]["error"]["message"], "Tool not found");
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let out = run(&[
            r#"{"jsonrpc":"2.0","id":5,"method":"foo","params":{}}"#,
        ])
        .await;
        assert_eq!(out.len(), 1);
        assert_eq!(out[0]["error"]["code"], -32601);
        assert_eq!(out[0]["error"]["message"], "Unknown method foo");
    }

    #[tokio::test]
    async fn test_malformed_and_blank_lines_produce_nothing() {
        let out = run(&["{not json", "", "   ", "[1,2]", r#"{"id":1}"#]).await;
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_loop_continues_after_errors() {
        let out = run(&[
            "{not json",
            r#"{"jsonrpc":"2.0","id":1,"method":"foo"}"#,
            r#"{"jsonrpc":"2.0","id":2,"method":"ping"}"#,
        ])
        .await;
        assert_eq!(out.len(), 2);
        assert_eq!(out[1], json!({"jsonrpc":"2.0","id":2,"result":{}}));
    }

    #[tokio::test]
    async fn test_initialize_capabilities() {
        let out = run(&[r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#]).await;
        let caps = &out[0]["result"]["capabilities"];
        for cap in ["chat", "streaming", "tool_calls", "shutdown"] {
            assert_eq!(caps[cap], true, "capability {}", cap);
        }
        assert_eq!(out[0]["result"]["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(out[0]["result"]["serverInfo"]["name"], "tool-rpc");
    }

    #[tokio::test]
    async fn test_tools_list_is_stable() {
        let line = r#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#;
        let out = run(&[line, line]).await;
        assert_eq!(out.len(), 2);
        assert_eq!(out[0]["result"], out[1]["result"]);
        let tools = out[0]["result"]["tools"].as_array().unwrap();
        assert_eq!(tools[0]["name"], "hello");
        assert_eq!(tools[1]["name"], "call_stream");
        assert_eq!(tools[0]["inputSchema"]["properties"]["name"]["default"], "World");
    }

    #[tokio::test]
    async fn test_chat_send_echo() {
        let out = run(&[
            r#"{"jsonrpc":"2.0","id":9,"method":"chat/send","params":{"message":{"role":"user","content":"hi"}}}"#,
        ])
        .await;
        assert_eq!(
            out[0]["result"],
            json!({"message": {"role": "assistant", "content": "Echo: hi"}})
        );
    }

    #[tokio::test]
    async fn test_chat_send_without_content() {
        let out = run(&[
            r#"{"jsonrpc":"2.0","id":9,"method":"chat/send","params":{}}"#,
        ])
        .await;
        assert_eq!(out[0]["error"]["code"], INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_shutdown_returns_null_and_stops() {
        let d = dispatcher();
        let buf = CaptureBuffer::default();
        let out = OutputWriter::new(buf.clone());
        let flow = d
            .handle_line(r#"{"jsonrpc":"2.0","id":7,"method":"shutdown"}"#, &out)
            .await
            .unwrap();
        assert_eq!(flow, Flow::Shutdown);
        assert_eq!(buf.text(), "{\"jsonrpc\":\"2.0\",\"id\":7,\"result\":null}\n");
    }

    #[tokio::test]
    async fn test_shutdown_can_be_answered_without_exiting() {
        let config = ServerConfig {
            exit_on_shutdown: false,
            ..ServerConfig::default()
        };
        let d = Dispatcher::new(Arc::new(builtin::registry().unwrap()), &config);
        let out = OutputWriter::new(CaptureBuffer::default());
        let flow = d
            .handle_line(r#"{"jsonrpc":"2.0","id":7,"method":"shutdown"}"#, &out)
            .await
            .unwrap();
        assert_eq!(flow, Flow::Continue);
    }

    #[tokio::test]
    async fn test_call_shaped_without_id_answers_with_null_id() {
        let out = run(&[
            r#"{"jsonrpc":"2.0","method":"tools/call","params":{"name":"hello"}}"#,
            r#"{"jsonrpc":"2.0","id":null,"method":"tools/list"}"#,
        ])
        .await;
        assert_eq!(out.len(), 2);
        assert_eq!(out[0]["id"], Value::Null);
        assert_eq!(out[0]["result"]["result"], "Hello, World!");
        assert_eq!(out[1]["id"], Value::Null);
    }

    #[tokio::test]
    async fn test_client_notifications_get_no_reply() {
        let out = run(&[
            r#"{"jsonrpc":"2.0","method":"initialized"}"#,
            r#"{"jsonrpc":"2.0","method":"notifications/cancelled","params":{"requestId":1}}"#,
            r#"{"jsonrpc":"2.0","method":"foo"}"#,
            r#"{"jsonrpc":"2.0","id":null,"method":"notifications/initialized"}"#,
        ])
        .await;
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_notification_methods_with_id_are_unknown_calls() {
        let out = run(&[
            r#"{"jsonrpc":"2.0","id":3,"method":"initialized"}"#,
            r#"{"jsonrpc":"2.0","id":4,"method":"notifications/cancelled","params":{}}"#,
        ])
        .await;
        assert_eq!(out.len(), 2);
        assert_eq!(out[0]["id"], 3);
        assert_eq!(out[0]["error"]["code"], METHOD_NOT_FOUND);
        assert_eq!(out[0]["error"]["message"], "Unknown method initialized");
        assert_eq!(out[1]["id"], 4);
        assert_eq!(
            out[1]["error"]["message"],
            "Unknown method notifications/cancelled"
        );
    }

    #[tokio::test]
    async fn test_wrong_version_rejected() {
        let out = run(&[r#"{"jsonrpc":"1.0","id":1,"method":"ping"}"#]).await;
        assert_eq!(out[0]["error"]["code"], INVALID_REQUEST);
        assert_eq!(out[0]["id"], 1);
    }

    #[tokio::test]
    async fn test_tools_call_invalid_params() {
        let out = run(&[
            r#"{"jsonrpc":"2.0","id":1,"method":"tools/call","params":{}}"#,
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"hello","arguments":[1]}}"#,
        ])
        .await;
        assert_eq!(out[0]["error"]["code"], INVALID_PARAMS);
        assert_eq!(out[1]["error"]["code"], INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_tool_error_becomes_error_response() {
        let out = run(&[
            r#"{"jsonrpc":"2.0","id":8,"method":"tools/call","params":{"name":"call_stream","arguments":{"count":"x"}}}"#,
        ])
        .await;
        assert_eq!(out.len(), 1);
        assert_eq!(out[0]["id"], 8);
        assert_eq!(out[0]["error"]["code"], TOOL_ERROR);
        assert!(out[0]["error"]["message"].as_str().unwrap().contains("count"));
    }
}
