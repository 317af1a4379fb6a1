//! stdio Transport for MCP
//!
//! Handles JSON-RPC communication over stdin/stdout. Messages are handled
//! strictly one at a time: a frame is fully resolved and its response
//! written before the next frame is read.

use std::future::Future;
use std::io;

use tokio::io::{AsyncBufRead, AsyncWrite, BufReader};
use tracing::{error, info};

use super::codec;
use super::framing::{FrameReader, FrameWriter};
use super::types::{JsonRpcError, JsonRpcResponse};
use crate::server::McpServer;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("transport I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("failed to encode response: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Pump frames from `reader` through `server` to `writer`.
///
/// Returns `Ok(())` on end of input or when `shutdown` resolves, and `Err`
/// on a read or write failure. The session is closed in every case. A
/// shutdown that lands while a request is being handled drops that request.
pub async fn serve<R, W, S>(
    reader: R,
    writer: W,
    server: &mut McpServer,
    shutdown: S,
) -> Result<(), TransportError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
    S: Future<Output = ()>,
{
    let mut frames = FrameReader::new(reader);
    let mut out = FrameWriter::new(writer);
    tokio::pin!(shutdown);

    let result = loop {
        let frame = tokio::select! {
            _ = &mut shutdown => {
                info!("Shutdown requested");
                break Ok(());
            }
            frame = frames.next_frame() => frame,
        };

        let line = match frame {
            Ok(Some(line)) => line,
            Ok(None) => {
                info!("Input closed");
                break Ok(());
            }
            Err(e) => {
                error!("Failed to read frame: {}", e);
                break Err(TransportError::Io(e));
            }
        };

        let handled = tokio::select! {
            _ = &mut shutdown => None,
            response = server.handle_frame(&line) => Some(response),
        };
        let Some(response) = handled else {
            info!("Shutdown requested, abandoning in-flight request");
            break Ok(());
        };

        if let Some(response) = response {
            if let Err(e) = send(&mut out, &response).await {
                error!("Failed to write response: {}", e);
                break Err(e);
            }
        }
    };

    server.close();
    result
}

async fn send<W: AsyncWrite + Unpin>(
    out: &mut FrameWriter<W>,
    response: &JsonRpcResponse,
) -> Result<(), TransportError> {
    let line = match codec::encode(response) {
        Ok(line) => line,
        Err(e) => {
            error!("Failed to serialize response: {}", e);
            // Still answer so the client doesn't hang on this id
            let fallback = JsonRpcResponse::error(
                response.id.clone(),
                JsonRpcError::internal_error("Failed to serialize response"),
            );
            codec::encode(&fallback)?
        }
    };

    let mut bytes = line.into_bytes();
    bytes.push(b'\n');
    out.write_raw(&bytes).await?;
    Ok(())
}

/// stdio Transport for MCP server
pub struct StdioTransport;

impl StdioTransport {
    pub fn new() -> Self {
        Self
    }

    /// Serve over the process's stdin/stdout until EOF or Ctrl-C / SIGTERM
    pub async fn run(self, mut server: McpServer) -> Result<(), TransportError> {
        let reader = BufReader::new(tokio::io::stdin());
        let writer = tokio::io::stdout();
        serve(reader, writer, &mut server, shutdown_signal()).await
    }
}

impl Default for StdioTransport {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolves on Ctrl-C, or SIGTERM on Unix. A handler that cannot be
/// installed never fires.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for ctrl+c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
