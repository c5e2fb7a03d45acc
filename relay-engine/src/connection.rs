//! Long-lived push channel to the RelayCRM server.
//!
//! One connection per process. The transport is an SSE GET carrying the
//! bearer credential as a query parameter (this transport cannot set
//! headers). Transport faults trigger exponential-backoff reconnects; a
//! deliberate `disconnect` cancels the read task and any pending reconnect
//! timer so a stale timer can never open a duplicate channel.

use std::{
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicU32, Ordering},
    },
    time::Duration,
};

use futures_util::StreamExt;
use reqwest::Client;
use shared::config::Config;
use tokio::{sync::watch, task::JoinHandle, time::sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::{dispatch::EventDispatcher, error::Result, sse::SseParser};

/// Pause between the teardown and the fresh connect of a manual reconnect.
const MANUAL_RECONNECT_DELAY: Duration = Duration::from_millis(500);

/// Lifecycle of the push channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Initial state; also terminal after exhausted reconnect attempts.
    Disconnected,
    /// Transport open is in flight.
    Connecting,
    /// Channel is live and delivering frames.
    Connected,
    /// Transport fault observed; a reconnect is scheduled or imminent.
    Error,
}

impl ConnectionState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Handle the dispatcher uses to feed connection-level frames back into the
/// state machine (`connected` acknowledgements reset the backoff).
#[derive(Debug, Clone)]
pub struct ConnectionLink {
    state: watch::Sender<ConnectionState>,
    attempts: Arc<AtomicU32>,
}

impl ConnectionLink {
    pub(crate) fn new(state: watch::Sender<ConnectionState>, attempts: Arc<AtomicU32>) -> Self {
        Self { state, attempts }
    }

    /// The channel is confirmed live; reset the backoff attempt counter.
    pub(crate) fn mark_connected(&self) {
        self.attempts.store(0, Ordering::SeqCst);
        self.state.send_replace(ConnectionState::Connected);
    }

    fn set_state(&self, state: ConnectionState) {
        self.state.send_replace(state);
    }
}

/// Exponential backoff without jitter: the channel is per-user, so there is
/// no fleet-wide thundering herd to spread out.
pub(crate) fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base * 2_u32.saturating_pow(attempt)
}

struct Runner {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Owner of the push channel: connect, detect faults, reconnect with
/// backoff, tear down on demand.
pub struct EventStreamConnection {
    client: Client,
    stream_url: Url,
    token: Option<String>,
    base_delay: Duration,
    max_attempts: u32,
    dispatcher: Arc<EventDispatcher>,
    state_tx: watch::Sender<ConnectionState>,
    // Keeps the watch channel alive while no external subscriber exists.
    _state_rx: watch::Receiver<ConnectionState>,
    attempts: Arc<AtomicU32>,
    runner: Mutex<Option<Runner>>,
}

impl std::fmt::Debug for EventStreamConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventStreamConnection")
            .field("stream_url", &self.stream_url.as_str())
            .field("state", &self.current_state())
            .finish_non_exhaustive()
    }
}

impl EventStreamConnection {
    /// Builds the connection from configuration. Does not open the channel.
    pub fn new(config: &Config, dispatcher: Arc<EventDispatcher>) -> Result<Self> {
        let stream_url = config.server_url.join("api/stream")?;
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        Ok(Self {
            client: Client::new(),
            stream_url,
            token: config.api_token.clone(),
            base_delay: Duration::from_millis(config.reconnect_base_delay_ms),
            max_attempts: config.max_reconnect_attempts,
            dispatcher,
            state_tx,
            _state_rx: state_rx,
            attempts: Arc::new(AtomicU32::new(0)),
            runner: Mutex::new(None),
        })
    }

    /// Opens the push channel. Idempotent: a call while already connecting
    /// or connected is a no-op. Without a credential this is also a no-op
    /// and the state stays `Disconnected`; an unauthenticated session gets
    /// no real-time updates but does not error.
    pub fn connect(&self) {
        let Some(token) = self.token.clone() else {
            debug!("no credential configured; push channel stays disconnected");
            return;
        };

        let mut runner = self.runner.lock().unwrap_or_else(PoisonError::into_inner);
        if runner.as_ref().is_some_and(|r| !r.handle.is_finished()) {
            debug!("push channel already active; ignoring connect");
            return;
        }

        let mut url = self.stream_url.clone();
        url.query_pairs_mut().append_pair("token", &token);

        let cancel = CancellationToken::new();
        let worker = StreamWorker {
            client: self.client.clone(),
            url,
            dispatcher: Arc::clone(&self.dispatcher),
            link: ConnectionLink::new(self.state_tx.clone(), Arc::clone(&self.attempts)),
            base_delay: self.base_delay,
            max_attempts: self.max_attempts,
            cancel: cancel.clone(),
        };
        let handle = tokio::spawn(worker.run());
        *runner = Some(Runner { cancel, handle });
    }

    /// Tears down the channel and cancels any pending reconnect timer.
    /// Always safe to call.
    pub fn disconnect(&self) {
        let runner = self
            .runner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(runner) = runner {
            runner.cancel.cancel();
        }
        self.state_tx.send_replace(ConnectionState::Disconnected);
    }

    /// Manual recovery: disconnect, pause briefly, then connect with a
    /// fresh attempt budget. The path out of exhausted automatic retries.
    pub async fn reconnect(&self) {
        self.disconnect();
        sleep(MANUAL_RECONNECT_DELAY).await;
        self.attempts.store(0, Ordering::SeqCst);
        self.connect();
    }

    /// Current state, for passive status indicators.
    #[must_use]
    pub fn current_state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    /// Watch subscription for status indicators that want push updates.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }
}

impl Drop for EventStreamConnection {
    fn drop(&mut self) {
        if let Some(runner) = self
            .runner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            runner.cancel.cancel();
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum StreamFault {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("server closed the stream")]
    Closed,
}

struct StreamWorker {
    client: Client,
    url: Url,
    dispatcher: Arc<EventDispatcher>,
    link: ConnectionLink,
    base_delay: Duration,
    max_attempts: u32,
    cancel: CancellationToken,
}

impl StreamWorker {
    async fn run(self) {
        loop {
            self.link.set_state(ConnectionState::Connecting);

            let fault = tokio::select! {
                () = self.cancel.cancelled() => return,
                fault = self.stream_once() => fault,
            };
            warn!(%fault, "push channel fault");
            self.link.set_state(ConnectionState::Error);

            let attempt = self.link.attempts.load(Ordering::SeqCst);
            if attempt >= self.max_attempts {
                warn!(
                    attempts = attempt,
                    "reconnect attempts exhausted; push channel settling disconnected"
                );
                self.link.set_state(ConnectionState::Disconnected);
                return;
            }
            let delay = backoff_delay(self.base_delay, attempt);
            self.link.attempts.store(attempt + 1, Ordering::SeqCst);
            debug!(?delay, attempt, "scheduling reconnect");

            tokio::select! {
                () = self.cancel.cancelled() => return,
                () = sleep(delay) => {}
            }
        }
    }

    /// Opens the stream and pumps frames until a transport fault. Always
    /// returns a fault; a cleanly closed stream is still a reason to
    /// reconnect.
    async fn stream_once(&self) -> StreamFault {
        let response = match self.client.get(self.url.clone()).send().await {
            Ok(response) => match response.error_for_status() {
                Ok(response) => response,
                Err(error) => return StreamFault::Transport(error),
            },
            Err(error) => return StreamFault::Transport(error),
        };

        self.link.mark_connected();
        info!("push channel connected");

        let mut stream = response.bytes_stream();
        let mut parser = SseParser::new();
        while let Some(chunk) = stream.next().await {
            let bytes = match chunk {
                Ok(bytes) => bytes,
                Err(error) => return StreamFault::Transport(error),
            };
            for event in parser.push_chunk(&String::from_utf8_lossy(&bytes)) {
                if event.data.is_empty() {
                    continue;
                }
                self.dispatcher.dispatch_raw(&event.data, &self.link);
            }
        }
        StreamFault::Closed
    }
}
