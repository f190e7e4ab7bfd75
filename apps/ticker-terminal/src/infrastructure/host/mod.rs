//! TCP Terminal Host
//!
//! Serves sessions over plain TCP to any ANSI terminal: one session per
//! connection, frames written as full-screen redraws, single-byte keys read
//! back. Intended to sit behind an SSH forward or another front end that
//! provides authentication and a pty.
//!
//! # Connection Lifecycle
//!
//! ```text
//! accept ─► SessionController::spawn ─┬─► write frames until the session ends
//!                                     └─► read keys until the peer closes
//! either side finishing ─► terminate session ─► join ─► close socket
//! ```
//!
//! Sessions start at the configured default viewport since raw TCP carries
//! no window size.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::application::session::{
    Frame, HostInput, SessionConfig, SessionController, SessionExit, SessionRegistry,
};
use crate::domain::session::{Key, Viewport};

/// Cursor home, clear screen.
const CLEAR_SCREEN: &[u8] = b"\x1b[H\x1b[2J";
const HIDE_CURSOR: &[u8] = b"\x1b[?25l";
const SHOW_CURSOR: &[u8] = b"\x1b[?25h\r\n";

const READ_BUFFER: usize = 64;

// =============================================================================
// Errors
// =============================================================================

/// Terminal host errors.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    /// Failed to bind the listen address.
    #[error("failed to bind terminal host to {0}: {1}")]
    BindFailed(String, std::io::Error),

    /// Listener I/O error.
    #[error("terminal host I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Host
// =============================================================================

struct HostContext {
    config: SessionConfig,
    viewport: Viewport,
    registry: Arc<SessionRegistry>,
    cancel: CancellationToken,
}

/// Accepts terminal connections and runs one session per connection.
pub struct TcpTerminalHost {
    listen_addr: String,
    context: Arc<HostContext>,
}

impl TcpTerminalHost {
    /// Create a host.
    ///
    /// Cancelling `cancel` stops accepting and ends every open session.
    #[must_use]
    pub fn new(
        listen_addr: String,
        config: SessionConfig,
        viewport: Viewport,
        registry: Arc<SessionRegistry>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            listen_addr,
            context: Arc::new(HostContext {
                config,
                viewport,
                registry,
                cancel,
            }),
        }
    }

    /// Bind the listen address and serve until cancelled.
    ///
    /// # Errors
    ///
    /// Returns `HostError::BindFailed` if the address cannot be bound.
    pub async fn run(self) -> Result<(), HostError> {
        let listener = TcpListener::bind(&self.listen_addr)
            .await
            .map_err(|e| HostError::BindFailed(self.listen_addr.clone(), e))?;
        self.serve(listener).await
    }

    /// Serve connections from an already bound listener until cancelled.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener's local address cannot be read.
    pub async fn serve(self, listener: TcpListener) -> Result<(), HostError> {
        let local_addr = listener.local_addr()?;
        let context = self.context;

        context.registry.set_accepting(true);
        tracing::info!(addr = %local_addr, "Terminal host listening");

        loop {
            tokio::select! {
                () = context.cancel.cancelled() => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let context = Arc::clone(&context);
                        tokio::spawn(
                            async move {
                                let exit = serve_connection(stream, peer, &context).await;
                                tracing::debug!(?exit, "Connection closed");
                            }
                            .instrument(tracing::info_span!("connection", peer = %peer)),
                        );
                    }
                    Err(e) => tracing::warn!(error = %e, "Accept failed"),
                },
            }
        }

        context.registry.set_accepting(false);
        tracing::info!("Terminal host stopped");
        Ok(())
    }
}

async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    context: &HostContext,
) -> SessionExit {
    if let Err(e) = stream.set_nodelay(true) {
        tracing::debug!(error = %e, "Failed to set TCP_NODELAY");
    }

    let handle = SessionController::spawn(
        &context.config,
        context.viewport,
        &context.cancel,
        Arc::clone(&context.registry),
        Some(peer.to_string()),
    );

    let (mut reader, mut writer) = stream.into_split();
    let input = handle.input();
    let mut frames = handle.frames();

    let read_keys = async move {
        let mut buf = [0u8; READ_BUFFER];
        loop {
            let n = match reader.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) => {
                    tracing::debug!(error = %e, "Read failed");
                    break;
                }
            };
            let keys = buf[..n]
                .iter()
                .map(|&b| Key::from_byte(b))
                .filter(|key| *key != Key::Other);
            for key in keys {
                if input.send(HostInput::Key(key)).await.is_err() {
                    return;
                }
            }
        }
    };

    let write_frames = async {
        writer.write_all(HIDE_CURSOR).await?;
        loop {
            let frame = Frame::clone(&frames.borrow_and_update());
            writer.write_all(&encode_frame(&frame)).await?;
            if frames.changed().await.is_err() {
                break;
            }
        }
        writer.write_all(SHOW_CURSOR).await?;
        writer.shutdown().await
    };

    tokio::select! {
        () = read_keys => tracing::debug!("Peer closed input"),
        result = write_frames => {
            if let Err(e) = result {
                tracing::debug!(error = %e, "Frame write failed");
            }
        }
    }

    handle.terminate();
    handle.join().await
}

/// Encode a frame as a full redraw: clear, then content clipped to the
/// viewport height with CRLF line endings.
#[must_use]
pub fn encode_frame(frame: &Frame) -> Vec<u8> {
    let mut out = Vec::with_capacity(CLEAR_SCREEN.len() + frame.content.len() + 64);
    out.extend_from_slice(CLEAR_SCREEN);

    let rows = usize::from(frame.viewport.height);
    for (i, line) in frame.content.split('\n').take(rows).enumerate() {
        if i > 0 {
            out.extend_from_slice(b"\r\n");
        }
        out.extend_from_slice(line.as_bytes());
    }
    out
}

// =============================================================================
// Tests
// =============================================================================
