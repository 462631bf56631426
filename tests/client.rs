//! Client facade tests: command delivery and lazily connected RPC.

mod common;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;
use tokio::io::AsyncReadExt;
use tokio::net::UnixListener;

use qutebrowser_ipc::protocol::CommandEnvelope;
use qutebrowser_ipc::sender::Launcher;
use qutebrowser_ipc::transport::ProcessEndpoint;
use qutebrowser_ipc::{Backend, Client, Delivery, OpenTarget, Result, SessionState, WinId};

use common::{MockBrowser, init_tracing};

// ============================================================================
// Helpers
// ============================================================================

/// Records launches instead of starting a browser.
#[derive(Clone, Default)]
struct RecordingLauncher {
    launches: Arc<Mutex<Vec<(PathBuf, Vec<String>)>>>,
}

#[async_trait]
impl Launcher for RecordingLauncher {
    async fn launch(&self, endpoint: &ProcessEndpoint, commands: &[String]) -> Result<()> {
        self.launches
            .lock()
            .push((endpoint.program.clone(), endpoint.argv(commands)));
        Ok(())
    }
}

/// Accepts one command-socket client and returns everything it wrote.
async fn read_command_message(listener: &UnixListener) -> CommandEnvelope {
    let (mut stream, _) = listener.accept().await.expect("accept");
    let mut buf = Vec::new();
    stream.read_to_end(&mut buf).await.expect("read");
    assert_eq!(buf.last(), Some(&b'\n'));
    CommandEnvelope::decode(&buf).expect("envelope")
}

fn socket_client(dir: &Path, launcher: &RecordingLauncher) -> Client {
    Client::builder()
        .command_socket(dir.join("ipc"))
        .backend(Backend::Socket(dir.join("ipc")))
        .rpc_socket(dir.join("rpc"))
        .executable("/opt/qutebrowser/bin/qutebrowser")
        .spawn_args(["--target", "window"])
        .launcher(launcher.clone())
        .bootstrap_grace(Duration::from_millis(10))
        .build()
        .expect("build")
}

// ============================================================================
// Commands
// ============================================================================

#[tokio::test]
async fn test_open_url_over_command_socket() {
    init_tracing();
    let dir = tempfile::tempdir().expect("tempdir");
    let listener = UnixListener::bind(dir.path().join("ipc")).expect("bind");
    let launcher = RecordingLauncher::default();
    let client = socket_client(dir.path(), &launcher);

    let (delivery, envelope) = tokio::join!(
        client.open_url("https://example.com/a b", OpenTarget::Tab),
        read_command_message(&listener)
    );

    assert_eq!(delivery.expect("deliver"), Delivery::Socket);
    assert_eq!(envelope.args, vec![":open -t https://example.com/a b"]);
    assert_eq!(envelope.protocol_version, 1);
    assert!(launcher.launches.lock().is_empty());
}

#[tokio::test]
async fn test_no_instance_spawns_browser_with_commands() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let launcher = RecordingLauncher::default();
    let client = socket_client(dir.path(), &launcher);

    let delivery = client.send_commands([":config-source", ":reload"]).await?;

    assert_eq!(delivery, Delivery::Spawned);
    let launches = launcher.launches.lock();
    assert_eq!(launches.len(), 1);
    assert_eq!(launches[0].0, Path::new("/opt/qutebrowser/bin/qutebrowser"));
    assert_eq!(
        launches[0].1,
        vec!["--target", "window", ":config-source", ":reload"]
    );
    Ok(())
}

// ============================================================================
// RPC
// ============================================================================

#[tokio::test]
async fn test_window_info_connects_lazily() {
    init_tracing();
    let dir = tempfile::tempdir().expect("tempdir");
    let browser = MockBrowser::bind(dir.path(), "rpc");
    let client = socket_client(dir.path(), &RecordingLauncher::default());

    assert_eq!(client.session().state(), SessionState::Disconnected);

    let windows = json!([{"win-id": 4, "url": "https://example.com", "mode": "normal"}]);
    let (info, _peer) = tokio::join!(client.window_info(), async {
        let mut peer = browser.accept().await;
        // One sync on connect, one for the call itself
        peer.serve_window_info(windows.clone()).await;
        peer.serve_window_info(windows.clone()).await;
        peer
    });

    assert_eq!(info.expect("window info"), windows);
    assert_eq!(client.session().state(), SessionState::Connected);

    let state = client.window_state(&WinId::from(4_u64)).expect("window 4");
    assert_eq!(state.mode.as_deref(), Some("normal"));

    client.close_rpc().await;
    assert_eq!(client.session().state(), SessionState::Disconnected);
}

#[tokio::test]
async fn test_rpc_unavailable_leaves_commands_working() {
    let dir = tempfile::tempdir().expect("tempdir");
    let launcher = RecordingLauncher::default();
    let client = socket_client(dir.path(), &launcher);

    let err = client.connect_rpc(false).await.unwrap_err();
    assert!(err.is_connection_error());

    let delivery = client
        .open_url("https://example.com", OpenTarget::Window)
        .await
        .expect("command channel unaffected");
    assert_eq!(delivery, Delivery::Spawned);
}
