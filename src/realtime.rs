//! Realtime change notifications.
//!
//! The push transport is shared with unrelated notifications and may carry
//! events for other boards, so every envelope is run through [`EventFilter`]
//! before it is allowed to trigger anything. Envelopes are only ever used as a
//! cue to reload; their payload is never merged into the board.

use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::header::ACCEPT;
use reqwest::{Response, Url};
use serde::Deserialize;
use serde_json::Value;
use tokio::task::JoinHandle;

use crate::api::RequestContext;
use crate::fields::ChangeKind;

/// Upper bound on buffered, not yet terminated SSE data.
const MAX_SSE_BUFFER_BYTES: usize = 1024 * 1024;

/// Payload keys that scope an event to a board.
const SCOPE_KEYS: [&str; 4] = ["projectId", "project_id", "boardId", "board_id"];

/// Message as delivered by the push transport.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub payload: Value,
}

/// Signal emitted by an [`EventSource`].
#[derive(Debug, Clone, PartialEq)]
pub enum RealtimeSignal {
    Connected,
    /// Connection lost or closed, with the reason if it failed.
    Disconnected(Option<String>),
    Envelope(Envelope),
}

/// Push connection state, for display only.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connected,
    Failed(String),
}

impl ConnectionState {
    pub fn label(&self) -> String {
        match self {
            ConnectionState::Connected => "live".to_string(),
            ConnectionState::Disconnected => "offline".to_string(),
            ConnectionState::Failed(e) => format!("offline ({e})"),
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }
}

/// Result of inspecting one envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    WrongChannel,
    MissingKind,
    OtherBoard(String),
    /// A well-formed event that does not affect tasks.
    Unrelated(String),
    Reload(ChangeKind),
}

/// Decides whether an envelope concerns the mounted board.
#[derive(Debug, Clone)]
pub struct EventFilter {
    channel: String,
    board_id: String,
}

impl EventFilter {
    pub fn new(channel: impl Into<String>, board_id: impl Into<String>) -> Self {
        EventFilter {
            channel: channel.into(),
            board_id: board_id.into(),
        }
    }

    pub fn inspect(&self, envelope: &Envelope) -> Verdict {
        if envelope.event_type != self.channel {
            return Verdict::WrongChannel;
        }
        let Some(kind) = envelope.payload.get("kind").and_then(Value::as_str) else {
            return Verdict::MissingKind;
        };
        // Unscoped events may be ours; a missed update is worse than an extra reload.
        if let Some(scope) = scope_id(&envelope.payload) {
            if scope != self.board_id {
                return Verdict::OtherBoard(scope);
            }
        }
        match ChangeKind::from_kind(kind) {
            Some(change) => Verdict::Reload(change),
            None => Verdict::Unrelated(kind.to_string()),
        }
    }
}

fn scope_id(payload: &Value) -> Option<String> {
    SCOPE_KEYS.iter().find_map(|key| match payload.get(*key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Short-lived message describing a remote change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub text: String,
    pub expires_at: Instant,
}

impl Notice {
    pub fn new(text: impl Into<String>, ttl: Duration) -> Self {
        Notice {
            text: text.into(),
            expires_at: Instant::now() + ttl,
        }
    }

    pub fn is_active(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Callback receiving realtime signals.
pub type SignalSink = Arc<dyn Fn(RealtimeSignal) + Send + Sync>;

/// A push transport the board can subscribe to.
pub trait EventSource {
    /// Begin delivering signals to `sink`. Must be called inside a tokio runtime.
    fn start(&self, sink: SignalSink) -> Subscription;
}

/// Handle to a running subscription. Dropping it stops delivery.
#[derive(Debug)]
pub struct Subscription {
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    pub fn new(task: JoinHandle<()>) -> Self {
        Subscription { task: Some(task) }
    }

    /// A subscription that never delivers anything, used when realtime is off.
    pub fn disabled() -> Self {
        Subscription { task: None }
    }

    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Server-sent events stream, one JSON envelope per `data:` block.
#[derive(Clone)]
pub struct SseEventSource {
    client: reqwest::Client,
    url: Url,
    context: RequestContext,
    reconnect_delay: Duration,
}

impl SseEventSource {
    pub fn new(client: reqwest::Client, url: Url, context: RequestContext, reconnect_delay: Duration) -> Self {
        SseEventSource {
            client,
            url,
            context,
            reconnect_delay,
        }
    }

    async fn run(self, sink: SignalSink) {
        loop {
            match self.stream_once(&sink).await {
                Ok(()) => {
                    tracing::info!(url = %self.url, "Event stream closed");
                    sink(RealtimeSignal::Disconnected(None));
                }
                Err(e) => {
                    tracing::warn!(url = %self.url, error = %e, "Event stream failed");
                    sink(RealtimeSignal::Disconnected(Some(e)));
                }
            }
            tokio::time::sleep(self.reconnect_delay).await;
        }
    }

    async fn stream_once(&self, sink: &SignalSink) -> Result<(), String> {
        let request = self
            .context
            .apply(self.client.get(self.url.clone()))
            .header(ACCEPT, "text/event-stream");
        let response = request.send().await.map_err(|e| e.to_string())?;
        if !response.status().is_success() {
            return Err(format!("HTTP {}", response.status().as_u16()));
        }

        tracing::info!(url = %self.url, "Event stream connected");
        sink(RealtimeSignal::Connected);
        pump_events(response, sink).await
    }
}

impl EventSource for SseEventSource {
    fn start(&self, sink: SignalSink) -> Subscription {
        Subscription::new(tokio::spawn(self.clone().run(sink)))
    }
}

async fn pump_events(response: Response, sink: &SignalSink) -> Result<(), String> {
    use futures_util::StreamExt;

    let mut stream = response.bytes_stream();
    let mut buffer: Vec<u8> = Vec::new();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| e.to_string())?;
        buffer.extend_from_slice(&chunk);
        if buffer.len() > MAX_SSE_BUFFER_BYTES {
            return Err("event buffer exceeded 1 MiB".to_string());
        }

        while let Some(block) = next_event_block(&mut buffer) {
            let Ok(block) = std::str::from_utf8(&block) else {
                tracing::debug!("Dropping non UTF-8 event");
                continue;
            };
            let Some(data) = event_data(block) else {
                continue;
            };
            match serde_json::from_str::<Envelope>(&data) {
                Ok(envelope) => sink(RealtimeSignal::Envelope(envelope)),
                Err(e) => tracing::debug!(%e, bytes = data.len(), "Dropping malformed event"),
            }
        }
    }
    Ok(())
}

/// Split off the next blank-line terminated event block, if complete.
fn next_event_block(buffer: &mut Vec<u8>) -> Option<Vec<u8>> {
    let lf = buffer.windows(2).position(|w| w == b"\n\n").map(|p| (p, 2));
    let crlf = buffer.windows(4).position(|w| w == b"\r\n\r\n").map(|p| (p, 4));
    let (pos, delim) = match (lf, crlf) {
        (Some(a), Some(b)) => if a.0 <= b.0 { a } else { b },
        (Some(a), None) => a,
        (None, Some(b)) => b,
        (None, None) => return None,
    };
    let block = buffer[..pos].to_vec();
    buffer.drain(..pos + delim);
    Some(block)
}

/// Join the `data:` lines of an event block.
fn event_data(block: &str) -> Option<String> {
    let lines: Vec<&str> = block
        .lines()
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|rest| rest.strip_prefix(' ').unwrap_or(rest))
        .collect();
    (!lines.is_empty()).then(|| lines.join("\n"))
}
