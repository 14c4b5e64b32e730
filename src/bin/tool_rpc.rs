//! Standalone tool server binary.
//!
//! Speaks newline-delimited JSON-RPC on stdin/stdout by default, or on TCP
//! connections when a listen address is configured. Logs go to stderr (and
//! optionally a rolling file), never to stdout.
//!
//! Environment variables:
//! - `TOOL_RPC_CONFIG`: path to config.json (default: `{config_dir}/tool-rpc/config.json`)
//! - `TOOL_RPC_LISTEN`: TCP address to listen on instead of stdio
//! - `TOOL_RPC_LOG_DIR`: directory for rolling log files
//! - `RUST_LOG`: tracing filter (overrides `logFilter`)

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use tool_rpc_lib::config::ServerConfig;
use tool_rpc_lib::rpc::{Dispatcher, ServeOutcome};
use tool_rpc_lib::tools::builtin;
use tool_rpc_lib::{logging, transport};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::load().context("Failed to load configuration")?;
    logging::init(&config).context("Failed to initialize logging")?;

    let registry = Arc::new(builtin::registry().context("Failed to build tool registry")?);
    let dispatcher = Dispatcher::new(registry, &config);

    match config.listen.as_deref() {
        Some(addr) => transport::serve_tcp(dispatcher, addr).await?,
        None => {
            let outcome = transport::serve_stdio(dispatcher).await?;
            info!("Exiting: {:?}", outcome);
            if outcome == ServeOutcome::Shutdown {
                // The stdin reader is parked in a blocking read that the
                // runtime cannot cancel; exit instead of waiting on it.
                std::process::exit(0);
            }
        }
    }

    Ok(())
}
