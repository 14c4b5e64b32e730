//! Transport entry points: stdio, or one request stream per TCP connection.

use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::error::{Result, ServerError};
use crate::rpc::{Dispatcher, ServeOutcome};

/// Serve stdin/stdout until EOF or shutdown.
pub async fn serve_stdio(dispatcher: Dispatcher) -> Result<ServeOutcome> {
    info!("tool-rpc serving on stdio");
    let outcome = dispatcher
        .serve(tokio::io::stdin(), tokio::io::stdout())
        .await?;
    if outcome == ServeOutcome::InputClosed {
        info!("stdin closed, shutting down");
    }
    Ok(outcome)
}

/// Bind `addr` and serve every accepted connection. Runs until the process
/// exits.
pub async fn serve_tcp(dispatcher: Dispatcher, addr: &str) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind {
            addr: addr.to_string(),
            source,
        })?;
    info!("tool-rpc listening on {}", listener.local_addr()?);
    serve_listener(dispatcher, listener).await
}

/// Accept loop. Each connection is an independent request stream with its own
/// writer; a `shutdown` on one connection closes only that connection.
pub async fn serve_listener(dispatcher: Dispatcher, listener: TcpListener) -> Result<()> {
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                warn!("Accept failed: {}", e);
                continue;
            }
        };
        info!("[{}] Client connected", peer);

        let dispatcher = dispatcher.clone();
        tokio::spawn(async move {
            let (reader, writer) = stream.into_split();
            match dispatcher.serve(reader, writer).await {
                Ok(outcome) => info!("[{}] Connection finished: {:?}", peer, outcome),
                Err(e) => error!("[{}] Connection error: {}", peer, e),
            }
        });
    }
}
