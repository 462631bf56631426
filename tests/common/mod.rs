//! Shared fixtures: a scripted browser peer on a real Unix socket.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{UnixListener, UnixStream};
use tracing_subscriber::EnvFilter;

/// Installs a test subscriber once; `RUST_LOG` selects the level.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Listening side of the RPC socket.
pub struct MockBrowser {
    listener: UnixListener,
    pub path: PathBuf,
}

impl MockBrowser {
    /// Binds `name` inside `dir`.
    pub fn bind(dir: &Path, name: &str) -> Self {
        let path = dir.join(name);
        let listener = UnixListener::bind(&path).expect("bind mock browser");
        Self { listener, path }
    }

    /// Wraps an already bound listener.
    pub fn from_listener(listener: UnixListener, path: PathBuf) -> Self {
        Self { listener, path }
    }

    /// Accepts the next client.
    pub async fn accept(&self) -> Peer {
        let (stream, _) = self.listener.accept().await.expect("accept");
        Peer::new(stream)
    }
}

/// One accepted connection, spoken to line by line.
pub struct Peer {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl Peer {
    pub fn new(stream: UnixStream) -> Self {
        let (read, writer) = stream.into_split();
        Self {
            reader: BufReader::new(read),
            writer,
        }
    }

    /// Reads one frame; `None` at end of stream.
    pub async fn recv(&mut self) -> Option<Value> {
        let mut line = String::new();
        let n = self.reader.read_line(&mut line).await.expect("read frame");
        if n == 0 {
            return None;
        }
        assert!(line.ends_with('\n'), "frame without delimiter: {line:?}");
        Some(serde_json::from_str(&line).expect("frame is JSON"))
    }

    /// Reads one frame that must be a request for `method`.
    pub async fn expect_request(&mut self, method: &str) -> Value {
        let request = self.recv().await.expect("request frame");
        assert_eq!(request["jsonrpc"], "2.0");
        assert_eq!(request["method"], method);
        request
    }

    /// Writes one value as a frame.
    pub async fn send(&mut self, value: &Value) {
        let mut bytes = serde_json::to_vec(value).expect("serialize");
        bytes.push(b'\n');
        self.send_raw(&bytes).await;
    }

    /// Writes bytes unchanged.
    pub async fn send_raw(&mut self, bytes: &[u8]) {
        self.writer.write_all(bytes).await.expect("write");
        self.writer.flush().await.expect("flush");
    }

    /// Answers `request` with `result`.
    pub async fn reply(&mut self, request: &Value, result: Value) {
        self.send(&json!({"jsonrpc": "2.0", "id": request["id"], "result": result}))
            .await;
    }

    /// Serves the window-info request every new session makes.
    pub async fn serve_window_info(&mut self, windows: Value) {
        let request = self.expect_request("get-window-info").await;
        self.reply(&request, windows).await;
    }
}
