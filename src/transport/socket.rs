//! Local socket channels.
//!
//! Two channel shapes sit on top of a Unix domain socket:
//!
//! - [`CommandChannel`]: write-only, one message, then closed.
//! - [`RpcChannel`]: long-lived and full-duplex, split into a frame stream
//!   and a [`FrameWriter`].

// ============================================================================
// Imports
// ============================================================================

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use futures_util::Stream;
use tokio::io::{AsyncRead, AsyncWrite, ReadHalf, WriteHalf};
use tokio::net::UnixStream;
use tracing::debug;

use crate::error::{Error, Result};

use super::framing::{FrameWriter, frames};

// ============================================================================
// Opening
// ============================================================================

/// Why a socket could not be opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unavailable {
    /// Nothing exists at the path.
    Missing,
    /// A socket file exists but nobody is listening.
    Refused,
    /// Any other failure.
    Other,
}

impl Unavailable {
    /// Classifies a connect error.
    #[must_use]
    pub fn classify(err: &std::io::Error) -> Self {
        match err.kind() {
            ErrorKind::NotFound => Self::Missing,
            ErrorKind::ConnectionRefused => Self::Refused,
            _ => Self::Other,
        }
    }

    /// Returns `true` if starting the browser side could fix this.
    #[inline]
    #[must_use]
    pub fn needs_bootstrap(self) -> bool {
        matches!(self, Self::Missing | Self::Refused)
    }
}

/// Connects to the socket at `path`.
///
/// # Errors
///
/// Returns the classification together with [`Error::Connection`] when
/// the socket is absent or refuses the connection.
pub async fn connect(path: &Path) -> std::result::Result<UnixStream, (Unavailable, Error)> {
    match UnixStream::connect(path).await {
        Ok(stream) => {
            debug!(path = %path.display(), "Socket connected");
            Ok(stream)
        }
        Err(e) => Err((Unavailable::classify(&e), Error::connection(path, e.to_string()))),
    }
}

// ============================================================================
// CommandChannel
// ============================================================================

/// Write-only, single-message channel to the command socket.
#[derive(Debug)]
pub struct CommandChannel {
    path: PathBuf,
    writer: FrameWriter<UnixStream>,
}

impl CommandChannel {
    /// Opens the command socket.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`] if the socket cannot be reached.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let stream = connect(path).await.map_err(|(_, e)| e)?;

        Ok(Self {
            path: path.to_path_buf(),
            writer: FrameWriter::new(stream),
        })
    }

    /// Returns the socket path.
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes one encoded envelope.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Write`] on a broken pipe.
    pub async fn send(&mut self, payload: Vec<u8>) -> Result<()> {
        self.writer.write_frame(payload).await
    }

    /// Closes the channel.
    pub async fn close(mut self) {
        self.writer.close().await;
    }
}

// ============================================================================
// RpcChannel
// ============================================================================

/// Full-duplex channel, generic over the byte stream so tests can use
/// in-memory pairs.
#[derive(Debug)]
pub struct RpcChannel<S> {
    stream: S,
}

impl RpcChannel<UnixStream> {
    /// Opens the RPC socket.
    ///
    /// # Errors
    ///
    /// Returns the failure classification and [`Error::Connection`].
    pub async fn open(path: &Path) -> std::result::Result<Self, (Unavailable, Error)> {
        connect(path).await.map(Self::new)
    }
}

impl<S> RpcChannel<S>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    /// Wraps an already connected stream.
    #[inline]
    #[must_use]
    pub fn new(stream: S) -> Self {
        Self { stream }
    }

    /// Splits into the inbound frame stream and the outbound writer.
    pub fn split(
        self,
    ) -> (
        impl Stream<Item = Result<Vec<u8>>> + Send + Unpin,
        FrameWriter<WriteHalf<S>>,
    ) {
        let (read, write): (ReadHalf<S>, WriteHalf<S>) = tokio::io::split(self.stream);
        (Box::pin(frames(read)), FrameWriter::new(write))
    }
}

// ============================================================================
// Tests
// ============================================================================
