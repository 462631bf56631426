//! Newline framing.
//!
//! Both channels frame a message as the serialized envelope followed by a
//! single `\n`; the browser's reader consumes input up to a newline and
//! nothing else delimits a message. Inbound, each non-blank line is one
//! frame.

// ============================================================================
// Imports
// ============================================================================

use futures_util::Stream;
use futures_util::stream;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::trace;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Frame delimiter.
pub const DELIMITER: u8 = b'\n';

// ============================================================================
// Outbound
// ============================================================================

/// Appends the delimiter to an encoded envelope.
#[inline]
#[must_use]
pub fn frame(mut payload: Vec<u8>) -> Vec<u8> {
    payload.push(DELIMITER);
    payload
}

/// Writes framed messages to a byte sink.
#[derive(Debug)]
pub struct FrameWriter<W> {
    inner: W,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    /// Wraps a writer.
    #[inline]
    #[must_use]
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Writes one encoded envelope plus delimiter and flushes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Write`] if the peer is gone.
    pub async fn write_frame(&mut self, payload: Vec<u8>) -> Result<()> {
        let framed = frame(payload);
        trace!(len = framed.len(), "Writing frame");

        self.inner
            .write_all(&framed)
            .await
            .map_err(|e| Error::write(e.to_string()))?;
        self.inner
            .flush()
            .await
            .map_err(|e| Error::write(e.to_string()))
    }

    /// Shuts down the write half.
    ///
    /// Errors are ignored; the peer may already be gone.
    pub async fn close(&mut self) {
        let _ = self.inner.shutdown().await;
    }
}

// ============================================================================
// Inbound
// ============================================================================

/// Turns a byte source into a lazy stream of frames.
///
/// Each item is one line without its delimiter; blank lines are skipped.
/// The stream ends when the peer closes the channel. An I/O error is
/// yielded once and then the stream ends.
pub fn frames<R>(reader: R) -> impl Stream<Item = Result<Vec<u8>>> + Send
where
    R: AsyncRead + Unpin + Send,
{
    let reader = Some(BufReader::new(reader));

    stream::unfold(reader, |reader| async move {
        let mut reader = reader?;

        loop {
            let mut line = Vec::new();
            match reader.read_until(DELIMITER, &mut line).await {
                Ok(0) => return None,
                Ok(_) => {
                    if line.iter().all(u8::is_ascii_whitespace) {
                        continue;
                    }
                    if line.last() == Some(&DELIMITER) {
                        line.pop();
                    }
                    trace!(len = line.len(), "Read frame");
                    return Some((Ok(line), Some(reader)));
                }
                Err(e) => return Some((Err(Error::Io(e)), None)),
            }
        }
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use futures_util::StreamExt;
    use tokio::io::AsyncReadExt;

    #[test]
    fn test_frame_appends_single_newline() {
        assert_eq!(frame(b"{}".to_vec()), b"{}\n".to_vec());
    }

    #[tokio::test]
    async fn test_frames_split_and_skip_blank_lines() {
        let input: &[u8] = b"{\"a\":1}\n\n   \n{\"b\":2}\n";
        let frames: Vec<_> = frames(input).collect().await;

        let frames: Vec<Vec<u8>> = frames.into_iter().map(|f| f.expect("frame")).collect();
        assert_eq!(frames, vec![b"{\"a\":1}".to_vec(), b"{\"b\":2}".to_vec()]);
    }

    #[tokio::test]
    async fn test_frames_keeps_unterminated_tail() {
        let input: &[u8] = b"one\ntwo";
        let frames: Vec<_> = frames(input).map(|f| f.expect("frame")).collect().await;
        assert_eq!(frames, vec![b"one".to_vec(), b"two".to_vec()]);
    }

    #[tokio::test]
    async fn test_frames_reassemble_split_reads() {
        let reader = tokio_test::io::Builder::new()
            .read(b"{\"a\":")
            .read(b"1}\n{\"b\"")
            .read(b":2}\n")
            .build();

        let frames: Vec<_> = frames(reader).map(|f| f.expect("frame")).collect().await;
        assert_eq!(frames, vec![b"{\"a\":1}".to_vec(), b"{\"b\":2}".to_vec()]);
    }

    #[tokio::test]
    async fn test_frames_end_after_read_error() {
        let reader = tokio_test::io::Builder::new()
            .read(b"ok\n")
            .read_error(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset"))
            .build();

        let frames: Vec<_> = frames(reader).collect().await;
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].as_ref().expect("first frame"), &b"ok".to_vec());
        assert!(matches!(frames[1], Err(Error::Io(_))));
    }

    #[tokio::test]
    async fn test_writer_frames_output() {
        let (client, mut server) = tokio::io::duplex(64);
        let mut writer = FrameWriter::new(client);

        writer.write_frame(b"{\"x\":false}".to_vec()).await.expect("write");
        writer.close().await;

        let mut received = Vec::new();
        server.read_to_end(&mut received).await.expect("read");
        assert_eq!(received, b"{\"x\":false}\n".to_vec());
    }

    #[tokio::test]
    async fn test_writer_reports_broken_pipe() {
        let (client, server) = tokio::io::duplex(8);
        drop(server);

        let mut writer = FrameWriter::new(client);
        let err = writer.write_frame(b"{}".to_vec()).await.unwrap_err();
        assert!(matches!(err, Error::Write { .. }));
    }
}
