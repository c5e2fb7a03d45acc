//! End-to-end tests: the engine against a stub RelayCRM server that speaks
//! the real SSE and REST surface.

use std::{
    collections::HashMap,
    convert::Infallible,
    net::SocketAddr,
    sync::{
        Arc, Mutex,
        atomic::{AtomicU32, Ordering},
    },
    time::Duration,
};

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
};
use engine::{ConnectionState, Notifier, SyncEngine};
use futures_util::{Stream, StreamExt};
use shared::{
    config::Config,
    models::{UnreadSnapshotEntry, UnreadSnapshotResponse},
};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use url::Url;
use uuid::Uuid;

const TOKEN: &str = "integration-secret";

struct StubServer {
    stream_connects: AtomicU32,
    stream_rejects: AtomicU32,
    accept_streams: bool,
    frames: broadcast::Sender<String>,
    snapshot: UnreadSnapshotResponse,
}

impl StubServer {
    fn new(accept_streams: bool, snapshot: UnreadSnapshotResponse) -> Arc<Self> {
        let (frames, _) = broadcast::channel(64);
        Arc::new(Self {
            stream_connects: AtomicU32::new(0),
            stream_rejects: AtomicU32::new(0),
            accept_streams,
            frames,
            snapshot,
        })
    }

    fn push(&self, frame: &str) {
        // Send errors only mean no subscriber yet; tests wait for the
        // connected state before pushing.
        let _ = self.frames.send(frame.to_string());
    }
}

async fn stream_handler(
    State(state): State<Arc<StubServer>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, StatusCode> {
    if params.get("token").map(String::as_str) != Some(TOKEN) {
        return Err(StatusCode::UNAUTHORIZED);
    }
    if !state.accept_streams {
        state.stream_rejects.fetch_add(1, Ordering::SeqCst);
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }
    state.stream_connects.fetch_add(1, Ordering::SeqCst);

    let live = BroadcastStream::new(state.frames.subscribe())
        .filter_map(|frame| async move { frame.ok().map(|data| Ok(Event::default().data(data))) });
    let hello = futures_util::stream::iter(vec![Ok::<Event, Infallible>(
        Event::default().data(r#"{"type":"connected"}"#),
    )]);

    Ok(Sse::new(hello.chain(live)).keep_alive(KeepAlive::new().interval(Duration::from_secs(5))))
}

async fn snapshot_handler(
    State(state): State<Arc<StubServer>>,
) -> Json<UnreadSnapshotResponse> {
    Json(state.snapshot.clone())
}

async fn spawn_server(state: Arc<StubServer>) -> SocketAddr {
    let app = Router::new()
        .route("/api/stream", get(stream_handler))
        .route("/api/conversations/unread", get(snapshot_handler))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn config_for(addr: SocketAddr) -> Config {
    let mut config = Config::with_defaults();
    config.server_url = Url::parse(&format!("http://{addr}/")).unwrap();
    config.api_token = Some(TOKEN.to_string());
    config.reconnect_base_delay_ms = 10;
    config
}

#[derive(Debug, Default)]
struct RecordingNotifier {
    alerts: Mutex<Vec<(String, String, Uuid)>>,
}

impl Notifier for RecordingNotifier {
    fn notify(&self, title: &str, body: &str, dedup_key: Uuid) {
        self.alerts
            .lock()
            .unwrap()
            .push((title.to_string(), body.to_string(), dedup_key));
    }
}

/// Polls `check` every few milliseconds until it passes or the deadline
/// expires.
async fn eventually(what: &str, mut check: impl FnMut() -> bool) {
    let deadline = Duration::from_secs(5);
    let poll = async {
        while !check() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    };
    tokio::time::timeout(deadline, poll)
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {what}"));
}

async fn wait_for_state(engine: &SyncEngine, wanted: ConnectionState) {
    let mut states = engine.watch_connection();
    let reached = states.wait_for(|state| *state == wanted);
    tokio::time::timeout(Duration::from_secs(5), reached)
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for state {wanted}"))
        .unwrap();
}

#[tokio::test]
async fn counters_follow_snapshot_and_push_frames() {
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    let server = StubServer::new(
        true,
        UnreadSnapshotResponse {
            conversations: vec![
                UnreadSnapshotEntry {
                    conversation_id: a,
                    unread_count: 2,
                },
                UnreadSnapshotEntry {
                    conversation_id: b,
                    unread_count: 0,
                },
            ],
        },
    );
    let addr = spawn_server(server.clone()).await;

    let notifier = Arc::new(RecordingNotifier::default());
    let config = config_for(addr);
    let api = Arc::new(engine::HttpSyncApi::new(&config).unwrap());
    let engine = SyncEngine::with_parts(&config, api, notifier.clone()).unwrap();

    engine.start().await;
    wait_for_state(&engine, ConnectionState::Connected).await;

    // Snapshot is the ground truth at startup.
    assert_eq!(engine.unread_count(a), 2);
    assert_eq!(engine.unread_count(b), 0);

    // Push raises A to an absolute 3.
    server.push(&format!(
        r#"{{"type":"new_message","conversation_id":"{a}","counterparty_name":"Ada","preview":"see you at 3","unread_count":3}}"#
    ));
    eventually("new_message to land", || engine.unread_count(a) == 3).await;
    assert_eq!(engine.unread_count(b), 0);

    // The alert was attempted with the conversation as dedup key.
    eventually("notification to record", || {
        !notifier.alerts.lock().unwrap().is_empty()
    })
    .await;
    assert_eq!(notifier.alerts.lock().unwrap()[0].2, a);

    // A marked_read frame zeroes the counter.
    server.push(&format!(r#"{{"type":"marked_read","conversation_id":"{a}"}}"#));
    eventually("marked_read to land", || engine.unread_count(a) == 0).await;

    // unread_sync floors listed conversations at one.
    server.push(&format!(
        r#"{{"type":"unread_sync","conversation_ids":["{b}"]}}"#
    ));
    eventually("unread_sync to land", || engine.unread_count(b) == 1).await;

    // Garbage and unknown frames are dropped without killing the channel.
    server.push("{definitely not json");
    server.push(r#"{"type":"presence_update","user_id":"x"}"#);
    server.push(&format!(
        r#"{{"type":"new_message","conversation_id":"{b}","counterparty_name":"Bo","preview":"hi","unread_count":4}}"#
    ));
    eventually("channel to survive garbage", || {
        engine.unread_count(b) == 4
    })
    .await;
    assert_eq!(engine.connection_state(), ConnectionState::Connected);
}

#[tokio::test]
async fn duplicate_connect_keeps_a_single_channel() {
    let server = StubServer::new(true, UnreadSnapshotResponse::default());
    let addr = spawn_server(server.clone()).await;

    let config = config_for(addr);
    let engine = SyncEngine::new(&config).unwrap();

    engine.connect();
    engine.connect();
    wait_for_state(&engine, ConnectionState::Connected).await;
    engine.connect();

    // Give a duplicate connection a chance to show up before asserting.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(server.stream_connects.load(Ordering::SeqCst), 1);

    engine.disconnect();
    assert_eq!(engine.connection_state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn exhausted_reconnect_attempts_settle_disconnected() {
    let server = StubServer::new(false, UnreadSnapshotResponse::default());
    let addr = spawn_server(server.clone()).await;

    let config = config_for(addr);
    let engine = SyncEngine::new(&config).unwrap();

    engine.connect();
    wait_for_state(&engine, ConnectionState::Error).await;
    wait_for_state(&engine, ConnectionState::Disconnected).await;

    // Initial attempt plus max_reconnect_attempts retries.
    assert_eq!(server.stream_rejects.load(Ordering::SeqCst), 6);

    // Manual reconnect resumes trying.
    engine.reconnect().await;
    eventually("manual reconnect to retry", || {
        server.stream_rejects.load(Ordering::SeqCst) > 6
    })
    .await;
    engine.disconnect();
}

#[tokio::test]
async fn disconnect_cancels_pending_reconnect_timer() {
    let server = StubServer::new(false, UnreadSnapshotResponse::default());
    let addr = spawn_server(server.clone()).await;

    let mut config = config_for(addr);
    // Long enough that a stale timer would fire only after our teardown
    // window, short enough to catch it if cancellation were broken.
    config.reconnect_base_delay_ms = 100;
    let engine = SyncEngine::new(&config).unwrap();

    engine.connect();
    wait_for_state(&engine, ConnectionState::Error).await;
    let seen = server.stream_rejects.load(Ordering::SeqCst);
    engine.disconnect();

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(
        server.stream_rejects.load(Ordering::SeqCst),
        seen,
        "a cancelled reconnect timer must not open a new connection"
    );
    assert_eq!(engine.connection_state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn connect_without_credential_is_a_quiet_no_op() {
    let server = StubServer::new(true, UnreadSnapshotResponse::default());
    let addr = spawn_server(server.clone()).await;

    let mut config = config_for(addr);
    config.api_token = None;
    let engine = SyncEngine::new(&config).unwrap();

    engine.connect();
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(engine.connection_state(), ConnectionState::Disconnected);
    assert_eq!(server.stream_connects.load(Ordering::SeqCst), 0);
}
