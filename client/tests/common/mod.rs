//! Shared test doubles: a scriptable transport and a stub REST source.
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tether_client::core::ChatEntry;
use tether_client::{Channel, ClientError, Plan, RemoteSource, Transport, TransportEvent};
use tokio::sync::mpsc;

pub type CallLog = Arc<Mutex<Vec<&'static str>>>;
pub type SentFrames = Arc<Mutex<Vec<String>>>;

/// A transport whose connect attempts play back pre-queued scripts.
/// Attempts with no script queued are refused.
pub struct MockTransport {
    calls: CallLog,
    scripts: Arc<Mutex<VecDeque<Script>>>,
}

/// Test-side handle for scripting and inspecting a [`MockTransport`].
pub struct MockHandle {
    calls: CallLog,
    scripts: Arc<Mutex<VecDeque<Script>>>,
}

struct Script {
    accept: bool,
    fail_sends: bool,
    events: Option<mpsc::UnboundedReceiver<TransportEvent>>,
    // Keeps the channel open even if the test drops its
    // `ConnectionScript`; closure is scripted via `TransportEvent::Closed`.
    keep_alive: Option<mpsc::UnboundedSender<TransportEvent>>,
    sent: SentFrames,
}

/// The live side of an accepted connection: feed events in, watch
/// frames go out.
pub struct ConnectionScript {
    pub events: mpsc::UnboundedSender<TransportEvent>,
    pub sent: SentFrames,
}

impl MockTransport {
    pub fn new() -> (Self, MockHandle) {
        let calls: CallLog = Arc::default();
        let scripts: Arc<Mutex<VecDeque<Script>>> = Arc::default();
        (
            Self {
                calls: Arc::clone(&calls),
                scripts: Arc::clone(&scripts),
            },
            MockHandle { calls, scripts },
        )
    }
}

impl MockHandle {
    /// Queue a successful connection.
    pub fn accept_next(&self) -> ConnectionScript {
        self.script(false)
    }

    /// Queue a connection whose sends all fail.
    pub fn accept_next_failing_sends(&self) -> ConnectionScript {
        self.script(true)
    }

    /// Queue a refused connection attempt.
    pub fn refuse_next(&self) {
        self.scripts.lock().unwrap().push_back(Script {
            accept: false,
            fail_sends: false,
            events: None,
            keep_alive: None,
            sent: Arc::default(),
        });
    }

    /// Ordered log of `connect` and `close` calls so far.
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    fn script(&self, fail_sends: bool) -> ConnectionScript {
        let (tx, rx) = mpsc::unbounded_channel();
        let sent: SentFrames = Arc::default();
        self.scripts.lock().unwrap().push_back(Script {
            accept: true,
            fail_sends,
            events: Some(rx),
            keep_alive: Some(tx.clone()),
            sent: Arc::clone(&sent),
        });
        ConnectionScript { events: tx, sent }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(&self) -> tether_client::Result<Box<dyn Channel>> {
        self.calls.lock().unwrap().push("connect");
        let script = self.scripts.lock().unwrap().pop_front();
        match script {
            Some(Script {
                accept: true,
                fail_sends,
                events: Some(events),
                keep_alive,
                sent,
            }) => Ok(Box::new(MockChannel {
                events,
                _keep_alive: keep_alive,
                sent,
                fail_sends,
                calls: Arc::clone(&self.calls),
            })),
            _ => Err(ClientError::Transport("connection refused".into())),
        }
    }
}

struct MockChannel {
    events: mpsc::UnboundedReceiver<TransportEvent>,
    _keep_alive: Option<mpsc::UnboundedSender<TransportEvent>>,
    sent: SentFrames,
    fail_sends: bool,
    calls: CallLog,
}

#[async_trait]
impl Channel for MockChannel {
    async fn send(&mut self, text: &str) -> tether_client::Result<()> {
        if self.fail_sends {
            return Err(ClientError::Transport("send failed".into()));
        }
        self.sent.lock().unwrap().push(text.to_string());
        Ok(())
    }

    async fn next_event(&mut self) -> Option<TransportEvent> {
        self.events.recv().await
    }

    async fn close(&mut self) {
        self.calls.lock().unwrap().push("close");
    }
}

/// In-memory [`RemoteSource`] with switchable failures.
#[derive(Default)]
pub struct StubRemote {
    pub history: Mutex<Vec<ChatEntry>>,
    pub fail_history: AtomicBool,
    pub fail_persist: AtomicBool,
    /// Per-call delay before a persist resolves; zero means immediate.
    pub persist_delay: Mutex<Duration>,
    pub persisted: Mutex<Vec<Vec<ChatEntry>>>,
    pub plan_pages: Mutex<VecDeque<Vec<Plan>>>,
    pub plan_fetches: AtomicU32,
}

impl StubRemote {
    pub fn with_history(history: Vec<ChatEntry>) -> Self {
        Self {
            history: Mutex::new(history),
            ..Self::default()
        }
    }

    /// Queue plan snapshots; the last page repeats once the queue runs
    /// out.
    pub fn queue_plan_pages(&self, pages: Vec<Vec<Plan>>) {
        self.plan_pages.lock().unwrap().extend(pages);
    }
}

#[async_trait]
impl RemoteSource for StubRemote {
    async fn chat_history(&self, _client_id: &str) -> tether_client::Result<Vec<ChatEntry>> {
        if self.fail_history.load(Ordering::SeqCst) {
            return Err(ClientError::Transport("history unavailable".into()));
        }
        Ok(self.history.lock().unwrap().clone())
    }

    async fn persist_entries(
        &self,
        _client_id: &str,
        entries: &[ChatEntry],
    ) -> tether_client::Result<()> {
        let delay = *self.persist_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.fail_persist.load(Ordering::SeqCst) {
            return Err(ClientError::Transport("persist unavailable".into()));
        }
        self.persisted.lock().unwrap().push(entries.to_vec());
        Ok(())
    }

    async fn plans(&self, _team_id: &str) -> tether_client::Result<Vec<Plan>> {
        self.plan_fetches.fetch_add(1, Ordering::SeqCst);
        let mut pages = self.plan_pages.lock().unwrap();
        if pages.len() > 1 {
            Ok(pages.pop_front().unwrap_or_default())
        } else {
            Ok(pages.front().cloned().unwrap_or_default())
        }
    }
}

/// Route client logs through the test harness when RUST_LOG is set.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Poll `cond` until it holds; panics after 1000 tries. Sleeps between
/// tries, which under paused time advances the clock instantly.
pub async fn eventually<F: Fn() -> bool>(cond: F, what: &str) {
    for _ in 0..1000 {
        if cond() {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
    panic!("timed out waiting for {what}");
}
