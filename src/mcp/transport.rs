//! stdio transport.
//!
//! - Messages are UTF-8 encoded JSON-RPC
//! - Messages are delimited by newlines
//! - Messages must not contain embedded newlines
//! - stdin: receives messages from client
//! - stdout: sends messages to client
//! - stderr: may be used for logging (not MCP messages)
//!
//! A stdio connection is one session; its id is generated when the loop
//! starts.

use std::io;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::mcp::context::RequestContext;
use crate::mcp::dispatcher::Dispatcher;
use crate::mcp::protocol::{parse_message, JsonRpcReply};

/// A newline-delimited JSON-RPC transport over any reader/writer pair.
pub struct LineTransport<R, W> {
    reader: R,
    writer: W,
}

/// The transport bound to the process's stdin and stdout.
pub type StdioTransport = LineTransport<BufReader<tokio::io::Stdin>, tokio::io::Stdout>;

impl StdioTransport {
    /// Creates a new stdio transport.
    #[must_use]
    pub fn stdio() -> Self {
        LineTransport::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }
}

impl Default for StdioTransport {
    fn default() -> Self {
        Self::stdio()
    }
}

impl<R, W> LineTransport<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Wraps a reader and writer.
    pub const fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    /// Reads the next message line.
    ///
    /// Returns `None` once the input is closed (EOF).
    ///
    /// # Errors
    ///
    /// Returns an error if reading fails.
    pub async fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        let bytes_read = self.reader.read_line(&mut line).await?;

        if bytes_read == 0 {
            return Ok(None);
        }

        if line.ends_with('\n') {
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
        }

        Ok(Some(line))
    }

    /// Writes a reply terminated by a newline.
    ///
    /// # Errors
    ///
    /// Returns an error if serialisation or writing fails.
    pub async fn write_reply(&mut self, reply: &JsonRpcReply) -> io::Result<()> {
        let json = serde_json::to_string(reply)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        debug_assert!(
            !json.contains('\n'),
            "JSON message must not contain embedded newlines"
        );

        self.writer.write_all(json.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;

        Ok(())
    }

    /// Serves messages until the input closes.
    ///
    /// # Errors
    ///
    /// Returns an error if transport I/O fails.
    pub async fn serve(&mut self, dispatcher: &Dispatcher, session_id: &str) -> io::Result<()> {
        while let Some(line) = self.read_line().await? {
            self.handle_line(dispatcher, &line, session_id).await?;
        }
        tracing::info!(session = %session_id, "Input closed");
        Ok(())
    }

    /// Handles one input line, writing a reply if one is due.
    ///
    /// # Errors
    ///
    /// Returns an error if writing the reply fails.
    pub async fn handle_line(
        &mut self,
        dispatcher: &Dispatcher,
        line: &str,
        session_id: &str,
    ) -> io::Result<()> {
        if line.trim().is_empty() {
            return Ok(());
        }

        let reply = match parse_message(line) {
            Ok(message) => {
                dispatcher
                    .handle_message(message, RequestContext::new(), session_id)
                    .await
            }
            Err(error) => {
                tracing::debug!(code = error.error.code, "Rejected malformed message");
                Some(error.into())
            }
        };

        match reply {
            Some(reply) => self.write_reply(&reply).await,
            None => Ok(()),
        }
    }
}

/// Serves `dispatcher` on stdin/stdout until EOF or a shutdown signal.
///
/// # Errors
///
/// Returns an error if transport I/O fails.
pub async fn serve_stdio(dispatcher: &Dispatcher) -> io::Result<()> {
    let session_id = uuid::Uuid::new_v4().to_string();
    let mut transport = StdioTransport::stdio();
    tracing::info!(session = %session_id, "Serving MCP over stdio");

    tokio::select! {
        () = shutdown_signal() => Ok(()),
        result = transport.serve(dispatcher, &session_id) => result,
    }
}

/// Resolves when the process is asked to stop.
#[cfg(unix)]
pub async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let (Ok(mut sigint), Ok(mut sigterm)) = (
        signal(SignalKind::interrupt()),
        signal(SignalKind::terminate()),
    ) else {
        tracing::warn!("Could not install signal handlers");
        return std::future::pending().await;
    };

    tokio::select! {
        _ = sigint.recv() => tracing::info!("Received SIGINT, initiating graceful shutdown"),
        _ = sigterm.recv() => tracing::info!("Received SIGTERM, initiating graceful shutdown"),
    }
}

/// Resolves when the process is asked to stop.
#[cfg(windows)]
pub async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        tracing::info!("Received Ctrl+C, initiating graceful shutdown");
    } else {
        std::future::pending::<()>().await;
    }
}
