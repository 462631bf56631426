//! RPC session tests against a scripted browser on a real Unix socket.

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::net::UnixListener;
use tokio::sync::oneshot;

use qutebrowser_ipc::session::{Bootstrap, RpcSession, SessionState};
use qutebrowser_ipc::{Dispatcher, Error, EventKind, Result, WinId};

use common::{MockBrowser, Peer, init_tracing};

// ============================================================================
// Helpers
// ============================================================================

const GRACE: Duration = Duration::from_millis(20);

fn session_for(path: &std::path::Path) -> (RpcSession, Arc<Dispatcher>) {
    let dispatcher = Arc::new(Dispatcher::new());
    let session = RpcSession::new(path, Arc::clone(&dispatcher))
        .with_grace(GRACE)
        .with_sync_timeout(Duration::from_secs(2));
    (session, dispatcher)
}

/// Connects `session` while `browser` serves the initial window-info sync.
async fn connect(session: &RpcSession, browser: &MockBrowser, windows: Value) -> Peer {
    let (connection, peer) = tokio::join!(session.connect(false), async {
        let mut peer = browser.accept().await;
        peer.serve_window_info(windows).await;
        peer
    });
    connection.expect("connect");
    peer
}

/// Binds the RPC socket when asked to start the backend.
struct BindingBootstrap {
    path: std::path::PathBuf,
    listener_tx: Mutex<Option<oneshot::Sender<UnixListener>>>,
    calls: AtomicUsize,
}

#[async_trait]
impl Bootstrap for BindingBootstrap {
    async fn start(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let listener = UnixListener::bind(&self.path)?;
        if let Some(tx) = self.listener_tx.lock().take() {
            let _ = tx.send(listener);
        }
        Ok(())
    }
}

// ============================================================================
// Connect
// ============================================================================

#[tokio::test]
async fn test_connect_syncs_window_state() {
    init_tracing();
    let dir = tempfile::tempdir().expect("tempdir");
    let browser = MockBrowser::bind(dir.path(), "rpc");
    let (session, dispatcher) = session_for(&browser.path);

    let _peer = connect(
        &session,
        &browser,
        json!([
            {"win-id": 0, "url": "https://a.example", "title": "A"},
            {"win-id": 1, "url": "https://b.example", "private": true}
        ]),
    )
    .await;

    assert_eq!(session.state(), SessionState::Connected);

    let first = dispatcher.window(&WinId::from(0_u64)).expect("window 0");
    assert_eq!(first.url.as_deref(), Some("https://a.example"));
    assert_eq!(first.title.as_deref(), Some("A"));

    let second = dispatcher.window(&WinId::from(1_u64)).expect("window 1");
    assert_eq!(second.private, Some(true));
}

#[tokio::test]
async fn test_connect_reuses_live_connection() {
    let dir = tempfile::tempdir().expect("tempdir");
    let browser = MockBrowser::bind(dir.path(), "rpc");
    let (session, _) = session_for(&browser.path);

    let mut peer = connect(&session, &browser, json!([])).await;

    // Reuse: no second accept, no second sync
    session.connect(false).await.expect("reuse");

    let (result, ()) = tokio::join!(session.request("ping", Value::Null), async {
        let request = peer.expect_request("ping").await;
        peer.reply(&request, json!("pong")).await;
    });
    assert_eq!(result.expect("ping"), json!("pong"));
}

#[tokio::test]
async fn test_flush_replaces_connection() {
    let dir = tempfile::tempdir().expect("tempdir");
    let browser = MockBrowser::bind(dir.path(), "rpc");
    let (session, _) = session_for(&browser.path);

    let mut old_peer = connect(&session, &browser, json!([])).await;

    let (connection, _new_peer) = tokio::join!(session.connect(true), async {
        let mut peer = browser.accept().await;
        peer.serve_window_info(json!([])).await;
        peer
    });
    connection.expect("reconnect");

    // The flushed connection was closed from our side
    assert!(old_peer.recv().await.is_none());
    assert_eq!(session.state(), SessionState::Connected);
}

#[tokio::test]
async fn test_failed_window_sync_is_not_fatal() {
    let dir = tempfile::tempdir().expect("tempdir");
    let browser = MockBrowser::bind(dir.path(), "rpc");
    let (session, dispatcher) = session_for(&browser.path);

    let (connection, _peer) = tokio::join!(session.connect(false), async {
        let mut peer = browser.accept().await;
        let request = peer.expect_request("get-window-info").await;
        peer.send(&json!({
            "jsonrpc": "2.0",
            "id": request["id"],
            "error": {"code": -32601, "message": "Method not found"}
        }))
        .await;
        peer
    });

    connection.expect("connected despite failed sync");
    assert!(dispatcher.windows().is_empty());
    assert_eq!(session.state(), SessionState::Connected);
}

// ============================================================================
// Bootstrap
// ============================================================================

#[tokio::test]
async fn test_missing_socket_bootstraps_then_connects() {
    init_tracing();
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("rpc");
    let (listener_tx, listener_rx) = oneshot::channel();

    let bootstrap = Arc::new(BindingBootstrap {
        path: path.clone(),
        listener_tx: Mutex::new(Some(listener_tx)),
        calls: AtomicUsize::new(0),
    });

    let (session, _) = session_for(&path);
    let session = session.with_bootstrap(Arc::clone(&bootstrap) as Arc<dyn Bootstrap>);

    let (connection, _peer) = tokio::join!(session.connect(false), async {
        let listener = listener_rx.await.expect("bootstrap bound the socket");
        let browser = MockBrowser::from_listener(listener, path.clone());
        let mut peer = browser.accept().await;
        peer.serve_window_info(json!([])).await;
        peer
    });

    connection.expect("connected after bootstrap");
    assert_eq!(bootstrap.calls.load(Ordering::SeqCst), 1);
    assert_eq!(session.state(), SessionState::Connected);
}

#[tokio::test]
async fn test_still_unavailable_after_bootstrap() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("rpc");
    let (session, _) = session_for(&path);

    let err = session.connect(false).await.unwrap_err();
    assert!(matches!(err, Error::Connection { .. }));
    assert_eq!(session.state(), SessionState::Disconnected);

    // The host keeps running; a later attempt succeeds once the browser is up
    let browser = MockBrowser::bind(dir.path(), "rpc");
    let _peer = connect(&session, &browser, json!([])).await;
    assert_eq!(session.state(), SessionState::Connected);
}

// ============================================================================
// Requests
// ============================================================================

#[tokio::test]
async fn test_out_of_order_responses_reach_their_callers() {
    let dir = tempfile::tempdir().expect("tempdir");
    let browser = MockBrowser::bind(dir.path(), "rpc");
    let (session, _) = session_for(&browser.path);
    let mut peer = connect(&session, &browser, json!([])).await;

    let (a, b, c, ()) = tokio::join!(
        session.request("first", json!({"n": 1})),
        session.request("second", json!({"n": 2})),
        session.request("third", json!({"n": 3})),
        async {
            let mut requests = Vec::new();
            for _ in 0..3 {
                requests.push(peer.recv().await.expect("request"));
            }
            for request in requests.iter().rev() {
                let answer = json!({"method": request["method"], "n": request["params"]["n"]});
                peer.reply(request, answer).await;
            }
        }
    );

    assert_eq!(a.expect("first"), json!({"method": "first", "n": 1}));
    assert_eq!(b.expect("second"), json!({"method": "second", "n": 2}));
    assert_eq!(c.expect("third"), json!({"method": "third", "n": 3}));
}

#[tokio::test]
async fn test_error_response_carries_peer_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let browser = MockBrowser::bind(dir.path(), "rpc");
    let (session, _) = session_for(&browser.path);
    let mut peer = connect(&session, &browser, json!([])).await;

    let (result, ()) = tokio::join!(session.request("bogus", Value::Null), async {
        let request = peer.expect_request("bogus").await;
        peer.send(&json!({
            "jsonrpc": "2.0",
            "id": request["id"],
            "error": {"code": -32601, "message": "Method not found", "data": "bogus"}
        }))
        .await;
    });

    match result.unwrap_err() {
        Error::Request {
            method,
            code,
            message,
            data,
        } => {
            assert_eq!(method, "bogus");
            assert_eq!(code, -32601);
            assert_eq!(message, "Method not found");
            assert_eq!(data, Some(json!("bogus")));
        }
        other => panic!("expected request error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_close_fails_every_pending_call() {
    let dir = tempfile::tempdir().expect("tempdir");
    let browser = MockBrowser::bind(dir.path(), "rpc");
    let (session, _) = session_for(&browser.path);
    let mut peer = connect(&session, &browser, json!([])).await;

    let connection = session.live().expect("live");
    let calls: Vec<_> = (0..4)
        .map(|n| {
            let connection = connection.clone();
            tokio::spawn(async move { connection.request("slow", json!({"n": n})).await })
        })
        .collect();

    // All four are on the wire before we hang up
    for _ in 0..4 {
        peer.expect_request("slow").await;
    }
    assert_eq!(connection.pending_count(), 4);

    session.close().await;

    for call in calls {
        let err = call.await.expect("join").unwrap_err();
        assert!(err.is_connection_lost(), "unexpected error: {err}");
    }
    assert_eq!(session.state(), SessionState::Disconnected);
    assert!(peer.recv().await.is_none());
}

#[tokio::test]
async fn test_browser_exit_fails_pending_call() {
    let dir = tempfile::tempdir().expect("tempdir");
    let browser = MockBrowser::bind(dir.path(), "rpc");
    let (session, _) = session_for(&browser.path);
    let mut peer = connect(&session, &browser, json!([])).await;

    let (result, ()) = tokio::join!(session.request("slow", Value::Null), async {
        peer.expect_request("slow").await;
        drop(peer);
    });

    assert!(matches!(result.unwrap_err(), Error::ConnectionLost));
    assert_eq!(session.state(), SessionState::Disconnected);
}

#[tokio::test]
async fn test_request_timeout() {
    let dir = tempfile::tempdir().expect("tempdir");
    let browser = MockBrowser::bind(dir.path(), "rpc");
    let (session, _) = session_for(&browser.path);
    let mut peer = connect(&session, &browser, json!([])).await;

    let err = session
        .request_with_timeout("slow", Value::Null, Duration::from_millis(50))
        .await
        .unwrap_err();
    assert!(err.is_timeout());

    // A late answer is dropped and the session keeps working
    let late = peer.expect_request("slow").await;
    peer.reply(&late, json!("late")).await;

    let (result, ()) = tokio::join!(session.request("ping", Value::Null), async {
        let request = peer.expect_request("ping").await;
        peer.reply(&request, json!("pong")).await;
    });
    assert_eq!(result.expect("ping"), json!("pong"));
}

#[tokio::test]
async fn test_duplicate_response_is_dropped() {
    init_tracing();
    let dir = tempfile::tempdir().expect("tempdir");
    let browser = MockBrowser::bind(dir.path(), "rpc");
    let (session, dispatcher) = session_for(&browser.path);
    let mut peer = connect(&session, &browser, json!([])).await;

    let (first, ()) = tokio::join!(session.request("ping", Value::Null), async {
        let request = peer.expect_request("ping").await;
        peer.reply(&request, json!("first")).await;
        peer.reply(&request, json!("second")).await;
    });
    assert_eq!(first.expect("ping"), json!("first"));

    // The loop keeps serving frames after the stray answer
    let (next, ()) = tokio::join!(session.request("pong", Value::Null), async {
        let request = peer.expect_request("pong").await;
        peer.send(&json!({"jsonrpc": "2.0", "method": "title-changed", "params": {"win-id": 3, "title": "T"}}))
            .await;
        peer.reply(&request, json!(1)).await;
    });
    assert_eq!(next.expect("pong"), json!(1));

    let window = dispatcher.window(&WinId::from(3_u64)).expect("window 3");
    assert_eq!(window.title.as_deref(), Some("T"));

    let connection = session.live().expect("still connected");
    assert_eq!(connection.pending_count(), 0);
}

// ============================================================================
// Notifications
// ============================================================================

#[tokio::test]
async fn test_malformed_frame_is_skipped() {
    init_tracing();
    let dir = tempfile::tempdir().expect("tempdir");
    let browser = MockBrowser::bind(dir.path(), "rpc");
    let (session, dispatcher) = session_for(&browser.path);
    let mut peer = connect(&session, &browser, json!([])).await;

    let seen = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&seen);
    dispatcher.on(EventKind::UrlChanged, move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    let (result, ()) = tokio::join!(session.request("ping", Value::Null), async {
        let request = peer.expect_request("ping").await;
        peer.send(&json!({"jsonrpc": "2.0", "method": "url-changed", "params": {"win-id": 1, "url": "https://one"}}))
            .await;
        peer.send_raw(b"{not json at all\n").await;
        peer.send_raw(b"\n").await;
        peer.send(&json!({"jsonrpc": "2.0", "method": "url-changed", "params": {"win-id": 1, "url": "https://two"}}))
            .await;
        peer.reply(&request, json!("pong")).await;
    });

    // The response follows both notifications on the wire
    assert_eq!(result.expect("ping"), json!("pong"));
    assert_eq!(seen.load(Ordering::SeqCst), 2);

    let window = dispatcher.window(&WinId::from(1_u64)).expect("window 1");
    assert_eq!(window.url.as_deref(), Some("https://two"));
}

#[tokio::test]
async fn test_inbound_request_is_dispatched_and_acknowledged() {
    let dir = tempfile::tempdir().expect("tempdir");
    let browser = MockBrowser::bind(dir.path(), "rpc");
    let (session, dispatcher) = session_for(&browser.path);
    let mut peer = connect(&session, &browser, json!([])).await;

    let seen = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&seen);
    dispatcher.on(EventKind::NewWindow, move |event| {
        assert_eq!(event.notification.win_id(), Some(WinId::from(5_u64)));
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    peer.send(&json!({
        "jsonrpc": "2.0",
        "id": "browser-1",
        "method": "new-window",
        "params": {"win-id": 5}
    }))
    .await;

    let ack = peer.recv().await.expect("ack");
    assert_eq!(ack, json!({"jsonrpc": "2.0", "id": "browser-1", "result": true}));
    assert_eq!(seen.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_notify_reaches_browser() {
    let dir = tempfile::tempdir().expect("tempdir");
    let browser = MockBrowser::bind(dir.path(), "rpc");
    let (session, _) = session_for(&browser.path);
    let mut peer = connect(&session, &browser, json!([])).await;

    session
        .notify("set-mode", json!({"mode": "insert"}))
        .expect("notify");

    let frame = peer.recv().await.expect("notification");
    assert_eq!(
        frame,
        json!({"jsonrpc": "2.0", "method": "set-mode", "params": {"mode": "insert"}})
    );
}
