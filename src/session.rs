//! A mounted board: state, load sequencing, drops and realtime reloads.
//!
//! `BoardSession` is owned by exactly one loop (the TUI or `tb watch`). All I/O
//! runs on spawned tasks which report back as [`SessionEvent`]s; the owner feeds
//! those to [`BoardSession::handle`] one at a time, so the board is only ever
//! mutated from one place and in a well-defined order.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::api::TaskRepository;
use crate::board::BoardState;
use crate::drag::{resolve_drop, DropOutcome, DropResult, StatusUpdate};
use crate::error::BoardError;
use crate::fields::{ChangeKind, PersistFailurePolicy};
use crate::realtime::{
    ConnectionState, EventFilter, EventSource, Notice, RealtimeSignal, SignalSink, Subscription, Verdict,
};
use crate::task::Task;

/// Completion of background work, delivered back to the owning loop.
#[derive(Debug)]
pub enum SessionEvent {
    Loaded { seq: u64, result: Result<Vec<Task>, BoardError> },
    Persisted { update: StatusUpdate, result: Result<(), BoardError> },
    Realtime(RealtimeSignal),
}

/// What handling an event did, for callers that report progress.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Reloaded { tasks: usize },
    LoadFailed(String),
    StaleLoadIgnored,
    Persisted(StatusUpdate),
    PersistFailed { update: StatusUpdate, reloading: bool },
    ReloadTriggered(ChangeKind),
    EventDiscarded(Verdict),
    ConnectionChanged(ConnectionState),
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub channel: String,
    pub notice_ttl: Duration,
    pub on_persist_failure: PersistFailurePolicy,
}

impl Default for SessionOptions {
    fn default() -> Self {
        SessionOptions {
            channel: "tenant_notification".to_string(),
            notice_ttl: Duration::from_secs(4),
            on_persist_failure: PersistFailurePolicy::LogOnly,
        }
    }
}

pub struct BoardSession<R: TaskRepository> {
    board_id: String,
    repo: Arc<R>,
    board: BoardState,
    filter: EventFilter,
    options: SessionOptions,
    load_seq: u64,
    loading: bool,
    load_error: Option<String>,
    connection: ConnectionState,
    was_connected: bool,
    notice: Option<Notice>,
    in_flight: usize,
    /// A load was invalidated by a local move and must be reissued once
    /// the pending writes land.
    resync_after_write: bool,
    tx: UnboundedSender<SessionEvent>,
}

impl<R: TaskRepository> BoardSession<R> {
    /// Create a session and the receiver its background work reports to.
    pub fn new(
        board_id: impl Into<String>,
        repo: Arc<R>,
        options: SessionOptions,
    ) -> (Self, UnboundedReceiver<SessionEvent>) {
        let board_id = board_id.into();
        let (tx, rx) = mpsc::unbounded_channel();
        let session = BoardSession {
            filter: EventFilter::new(options.channel.clone(), board_id.clone()),
            board_id,
            repo,
            board: BoardState::new(),
            options,
            load_seq: 0,
            loading: false,
            load_error: None,
            connection: ConnectionState::Disconnected,
            was_connected: false,
            notice: None,
            in_flight: 0,
            resync_after_write: false,
            tx,
        };
        (session, rx)
    }

    pub fn board(&self) -> &BoardState {
        &self.board
    }

    pub fn board_id(&self) -> &str {
        &self.board_id
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }

    pub fn connection(&self) -> &ConnectionState {
        &self.connection
    }

    /// Status updates sent but not yet answered.
    pub fn pending_writes(&self) -> usize {
        self.in_flight
    }

    /// The current notice, if it has not expired.
    pub fn notice(&self, now: Instant) -> Option<&str> {
        self.notice
            .as_ref()
            .filter(|n| n.is_active(now))
            .map(|n| n.text.as_str())
    }

    /// Start an authoritative reload. Any earlier reload still in flight is
    /// superseded and its result will be ignored.
    pub fn reload(&mut self) -> u64 {
        self.load_seq += 1;
        self.loading = true;
        let seq = self.load_seq;
        let repo = Arc::clone(&self.repo);
        let board_id = self.board_id.clone();
        let tx = self.tx.clone();
        tracing::debug!(board = %board_id, seq, "Reloading board");
        tokio::spawn(async move {
            let result = repo.list_tasks(&board_id).await;
            let _ = tx.send(SessionEvent::Loaded { seq, result });
        });
        seq
    }

    /// Apply a finished drag gesture, then persist the new status in the background.
    pub fn drop_card(&mut self, drop: &DropResult) -> DropOutcome {
        let outcome = resolve_drop(&mut self.board, drop);
        match &outcome {
            DropOutcome::Moved(update) => {
                tracing::info!(task = %update.task_id, status = %update.status, "Card moved");
                let can_persist = self.repo.can_persist();
                if can_persist {
                    self.persist(update.clone());
                } else {
                    tracing::warn!(task = %update.task_id, "No credentials, move kept locally only");
                }
                if can_persist && self.loading {
                    // The load in flight predates this move; reload after the write instead.
                    self.load_seq += 1;
                    self.resync_after_write = true;
                }
            }
            DropOutcome::Rejected => {
                tracing::debug!(task = %drop.task_id, "Drop no longer matches the board");
            }
            DropOutcome::Cancelled | DropOutcome::Unchanged => {}
        }
        outcome
    }

    fn persist(&mut self, update: StatusUpdate) {
        self.in_flight += 1;
        let repo = Arc::clone(&self.repo);
        let board_id = self.board_id.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = repo
                .update_task_status(&board_id, &update.task_id, update.status)
                .await;
            let _ = tx.send(SessionEvent::Persisted { update, result });
        });
    }

    /// Sink that forwards realtime signals into this session's event queue.
    pub fn signal_sink(&self) -> SignalSink {
        let tx = self.tx.clone();
        Arc::new(move |signal| {
            let _ = tx.send(SessionEvent::Realtime(signal));
        })
    }

    pub fn subscribe<S: EventSource + ?Sized>(&self, source: &S) -> Subscription {
        source.start(self.signal_sink())
    }

    /// Apply one completed background event.
    pub fn handle(&mut self, event: SessionEvent) -> Effect {
        match event {
            SessionEvent::Loaded { seq, result } => self.on_loaded(seq, result),
            SessionEvent::Persisted { update, result } => self.on_persisted(update, result),
            SessionEvent::Realtime(signal) => self.on_signal(signal),
        }
    }

    fn on_loaded(&mut self, seq: u64, result: Result<Vec<Task>, BoardError>) -> Effect {
        if seq != self.load_seq {
            tracing::debug!(seq, latest = self.load_seq, "Ignoring superseded load");
            return Effect::StaleLoadIgnored;
        }
        self.loading = false;
        match result {
            Ok(tasks) => {
                let count = tasks.len();
                self.board.replace_all(tasks);
                self.load_error = None;
                tracing::info!(board = %self.board_id, tasks = count, "Board loaded");
                Effect::Reloaded { tasks: count }
            }
            Err(e) => {
                let mut message = e.user_message();
                if e.is_auth() && !self.repo.can_persist() {
                    message.push_str(" (no token configured)");
                }
                tracing::warn!(board = %self.board_id, error = %e, "Board load failed");
                self.load_error = Some(message.clone());
                Effect::LoadFailed(message)
            }
        }
    }

    fn on_persisted(&mut self, update: StatusUpdate, result: Result<(), BoardError>) -> Effect {
        self.in_flight = self.in_flight.saturating_sub(1);
        let resync = self.resync_after_write && self.in_flight == 0;
        if resync {
            self.resync_after_write = false;
        }
        match result {
            Ok(()) => {
                tracing::info!(task = %update.task_id, status = %update.status, "Status saved");
                if resync {
                    self.reload();
                }
                Effect::Persisted(update)
            }
            Err(e) => {
                tracing::warn!(task = %update.task_id, status = %update.status, error = %e, "Failed to save status");
                let reloading =
                    resync || self.options.on_persist_failure == PersistFailurePolicy::Reload;
                if reloading {
                    self.reload();
                }
                Effect::PersistFailed { update, reloading }
            }
        }
    }

    fn on_signal(&mut self, signal: RealtimeSignal) -> Effect {
        match signal {
            RealtimeSignal::Connected => {
                // Changes made while we were offline were never announced.
                let missed_events = self.was_connected
                    || matches!(self.connection, ConnectionState::Failed(_));
                if missed_events {
                    self.reload();
                }
                self.was_connected = true;
                self.connection = ConnectionState::Connected;
            }
            RealtimeSignal::Disconnected(reason) => {
                self.connection = match reason {
                    Some(e) => ConnectionState::Failed(e),
                    None => ConnectionState::Disconnected,
                };
            }
            RealtimeSignal::Envelope(envelope) => {
                return match self.filter.inspect(&envelope) {
                    Verdict::Reload(change) => {
                        tracing::info!(board = %self.board_id, ?change, "Remote change, reloading");
                        self.notice = Some(Notice::new(change.notice(), self.options.notice_ttl));
                        self.reload();
                        Effect::ReloadTriggered(change)
                    }
                    verdict => {
                        tracing::debug!(?verdict, "Discarded realtime event");
                        Effect::EventDiscarded(verdict)
                    }
                };
            }
        }
        Effect::ConnectionChanged(self.connection.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{HttpTaskRepository, RequestContext};
    use crate::drag::Slot;
    use crate::fields::ColumnId;
    use crate::realtime::Envelope;
    use crate::task::TaskId;
    use crate::tenant::{StaticToken, TenantResolver};
    use serde_json::json;
    use std::sync::Mutex;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// In-memory repository recording every call.
    #[derive(Default)]
    struct FakeRepo {
        tasks: Mutex<Vec<Task>>,
        fail_writes: bool,
        no_token: bool,
        lists: Mutex<Vec<String>>,
        updates: Mutex<Vec<(String, TaskId, ColumnId)>>,
    }

    impl FakeRepo {
        fn with_tasks(tasks: Vec<Task>) -> Self {
            FakeRepo {
                tasks: Mutex::new(tasks),
                ..Default::default()
            }
        }
    }

    impl TaskRepository for FakeRepo {
        async fn list_tasks(&self, board_id: &str) -> Result<Vec<Task>, BoardError> {
            self.lists.lock().unwrap().push(board_id.to_string());
            Ok(self.tasks.lock().unwrap().clone())
        }

        async fn update_task_status(
            &self,
            board_id: &str,
            task_id: &TaskId,
            status: ColumnId,
        ) -> Result<(), BoardError> {
            self.updates
                .lock()
                .unwrap()
                .push((board_id.to_string(), task_id.clone(), status));
            if self.fail_writes {
                return Err(BoardError::Http { status: 500, body: "boom".into() });
            }
            for task in self.tasks.lock().unwrap().iter_mut() {
                if &task.id == task_id {
                    task.status = Some(status.token().to_string());
                }
            }
            Ok(())
        }

        fn can_persist(&self) -> bool {
            !self.no_token
        }
    }

    fn t1_todo() -> Vec<Task> {
        vec![Task::new("t1", "First", Some("todo"))]
    }

    fn move_t1_to_in_progress() -> DropResult {
        DropResult {
            task_id: "t1".into(),
            source: Slot::new(ColumnId::Todo, 0),
            destination: Some(Slot::new(ColumnId::InProgress, 0)),
        }
    }

    fn notification(payload: serde_json::Value) -> SessionEvent {
        let envelope: Envelope = serde_json::from_value(json!({
            "type": "tenant_notification",
            "payload": payload,
        }))
        .unwrap();
        SessionEvent::Realtime(RealtimeSignal::Envelope(envelope))
    }

    async fn load(session: &mut BoardSession<FakeRepo>, rx: &mut UnboundedReceiver<SessionEvent>) -> Effect {
        session.reload();
        let event = rx.recv().await.unwrap();
        session.handle(event)
    }

    #[tokio::test]
    async fn test_initial_load_buckets_tasks() {
        let repo = Arc::new(FakeRepo::with_tasks(t1_todo()));
        let (mut session, mut rx) = BoardSession::new("42", repo.clone(), SessionOptions::default());
        assert_eq!(load(&mut session, &mut rx).await, Effect::Reloaded { tasks: 1 });
        assert!(session.board().column(ColumnId::Backlog).is_empty());
        assert_eq!(session.board().column(ColumnId::Todo)[0].id.as_str(), "t1");
        assert!(!session.is_loading());
        assert_eq!(repo.lists.lock().unwrap().as_slice(), ["42"]);
    }

    #[tokio::test]
    async fn test_superseded_load_is_ignored() {
        let repo = Arc::new(FakeRepo::with_tasks(t1_todo()));
        let (mut session, mut rx) = BoardSession::new("42", repo, SessionOptions::default());
        let first = session.reload();
        let second = session.reload();
        assert!(second > first);

        let stale = SessionEvent::Loaded {
            seq: first,
            result: Ok(vec![Task::new("old", "Old", Some("done"))]),
        };
        assert_eq!(session.handle(stale), Effect::StaleLoadIgnored);
        assert!(session.board().is_empty());
        assert!(session.is_loading());

        // Drain both spawned loads; only the latest applies.
        let mut applied = 0;
        for _ in 0..2 {
            if let Effect::Reloaded { .. } = session.handle(rx.recv().await.unwrap()) {
                applied += 1;
            }
        }
        assert_eq!(applied, 1);
        assert_eq!(session.board().column(ColumnId::Todo).len(), 1);
        assert!(session.board().find(&"old".into()).is_none());
    }

    #[tokio::test]
    async fn test_drop_is_optimistic_and_persisted_once() {
        let repo = Arc::new(FakeRepo::with_tasks(t1_todo()));
        let (mut session, mut rx) = BoardSession::new("42", repo.clone(), SessionOptions::default());
        load(&mut session, &mut rx).await;

        let outcome = session.drop_card(&move_t1_to_in_progress());
        assert!(matches!(outcome, DropOutcome::Moved(_)));
        // Visible before the write completes.
        assert!(session.board().column(ColumnId::Todo).is_empty());
        assert_eq!(session.board().column(ColumnId::InProgress)[0].id.as_str(), "t1");
        assert_eq!(session.pending_writes(), 1);

        let effect = session.handle(rx.recv().await.unwrap());
        assert!(matches!(effect, Effect::Persisted(_)));
        assert_eq!(session.pending_writes(), 0);
        let updates = repo.updates.lock().unwrap();
        assert_eq!(
            updates.as_slice(),
            [("42".to_string(), TaskId::from("t1"), ColumnId::InProgress)]
        );
    }

    async fn settle(session: &mut BoardSession<FakeRepo>, rx: &mut UnboundedReceiver<SessionEvent>) -> Vec<Effect> {
        let mut effects = Vec::new();
        while session.is_loading() || session.pending_writes() > 0 {
            effects.push(session.handle(rx.recv().await.unwrap()));
        }
        effects
    }

    #[tokio::test]
    async fn test_load_started_before_drop_cannot_undo_it() {
        let repo = Arc::new(FakeRepo::with_tasks(t1_todo()));
        let (mut session, mut rx) = BoardSession::new("42", repo.clone(), SessionOptions::default());
        load(&mut session, &mut rx).await;

        session.reload();
        let done = DropResult {
            task_id: "t1".into(),
            source: Slot::new(ColumnId::Todo, 0),
            destination: Some(Slot::new(ColumnId::Done, 0)),
        };
        assert!(matches!(session.drop_card(&done), DropOutcome::Moved(_)));

        let effects = settle(&mut session, &mut rx).await;
        assert_eq!(effects.iter().filter(|e| **e == Effect::StaleLoadIgnored).count(), 1);
        assert!(matches!(effects.last(), Some(Effect::Reloaded { tasks: 1 })));
        assert!(session.board().column(ColumnId::Todo).is_empty());
        assert_eq!(session.board().column(ColumnId::Done)[0].id.as_str(), "t1");
        assert_eq!(repo.lists.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_failed_write_after_invalidated_load_still_resyncs() {
        let repo = Arc::new(FakeRepo {
            tasks: Mutex::new(t1_todo()),
            fail_writes: true,
            ..Default::default()
        });
        let (mut session, mut rx) = BoardSession::new("42", repo, SessionOptions::default());
        load(&mut session, &mut rx).await;

        session.reload();
        session.drop_card(&move_t1_to_in_progress());
        let effects = settle(&mut session, &mut rx).await;
        assert!(effects.iter().any(|e| matches!(e, Effect::PersistFailed { reloading: true, .. })));
        assert!(!session.is_loading());
        assert_eq!(session.board().column(ColumnId::Todo).len(), 1);
    }

    #[tokio::test]
    async fn test_noop_and_cancelled_drops_send_nothing() {
        let repo = Arc::new(FakeRepo::with_tasks(t1_todo()));
        let (mut session, mut rx) = BoardSession::new("42", repo.clone(), SessionOptions::default());
        load(&mut session, &mut rx).await;
        let before = session.board().clone();

        let mut gesture = move_t1_to_in_progress();
        gesture.destination = Some(gesture.source);
        assert_eq!(session.drop_card(&gesture), DropOutcome::Unchanged);
        gesture.destination = None;
        assert_eq!(session.drop_card(&gesture), DropOutcome::Cancelled);

        assert_eq!(session.board(), &before);
        assert_eq!(session.pending_writes(), 0);
        assert!(repo.updates.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_write_keeps_optimistic_state() {
        let repo = Arc::new(FakeRepo {
            tasks: Mutex::new(t1_todo()),
            fail_writes: true,
            ..Default::default()
        });
        let (mut session, mut rx) = BoardSession::new("42", repo.clone(), SessionOptions::default());
        load(&mut session, &mut rx).await;

        session.drop_card(&move_t1_to_in_progress());
        let effect = session.handle(rx.recv().await.unwrap());
        assert!(matches!(effect, Effect::PersistFailed { reloading: false, .. }));
        assert_eq!(session.board().column(ColumnId::InProgress).len(), 1);
        assert!(session.load_error().is_none());
        assert_eq!(repo.lists.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_write_reloads_when_configured() {
        let repo = Arc::new(FakeRepo {
            tasks: Mutex::new(t1_todo()),
            fail_writes: true,
            ..Default::default()
        });
        let options = SessionOptions {
            on_persist_failure: PersistFailurePolicy::Reload,
            ..Default::default()
        };
        let (mut session, mut rx) = BoardSession::new("42", repo.clone(), options);
        load(&mut session, &mut rx).await;

        session.drop_card(&move_t1_to_in_progress());
        let effect = session.handle(rx.recv().await.unwrap());
        assert!(matches!(effect, Effect::PersistFailed { reloading: true, .. }));
        assert_eq!(session.handle(rx.recv().await.unwrap()), Effect::Reloaded { tasks: 1 });
        // Server truth wins again.
        assert_eq!(session.board().column(ColumnId::Todo)[0].id.as_str(), "t1");
    }

    #[tokio::test]
    async fn test_without_token_moves_stay_local() {
        let repo = Arc::new(FakeRepo {
            tasks: Mutex::new(t1_todo()),
            no_token: true,
            ..Default::default()
        });
        let (mut session, mut rx) = BoardSession::new("42", repo.clone(), SessionOptions::default());
        load(&mut session, &mut rx).await;

        assert!(matches!(session.drop_card(&move_t1_to_in_progress()), DropOutcome::Moved(_)));
        assert_eq!(session.pending_writes(), 0);
        assert!(repo.updates.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_event_for_other_board_changes_nothing() {
        let repo = Arc::new(FakeRepo::with_tasks(t1_todo()));
        let (mut session, mut rx) = BoardSession::new("Y", repo.clone(), SessionOptions::default());
        load(&mut session, &mut rx).await;
        let before = session.board().clone();

        let effect = session.handle(notification(json!({"kind": "task_created", "projectId": "X"})));
        assert_eq!(effect, Effect::EventDiscarded(Verdict::OtherBoard("X".into())));
        assert_eq!(session.board(), &before);
        assert!(!session.is_loading());
        assert_eq!(repo.lists.lock().unwrap().len(), 1);
        assert!(session.notice(Instant::now()).is_none());
    }

    #[tokio::test]
    async fn test_matching_event_reloads_and_shows_notice() {
        let repo = Arc::new(FakeRepo::with_tasks(t1_todo()));
        let (mut session, mut rx) = BoardSession::new("42", repo.clone(), SessionOptions::default());
        load(&mut session, &mut rx).await;

        repo.tasks.lock().unwrap().push(Task::new("t2", "Second", Some("review")));
        let effect = session.handle(notification(json!({"kind": "task_created", "projectId": "42"})));
        assert_eq!(effect, Effect::ReloadTriggered(ChangeKind::Created));
        assert_eq!(session.notice(Instant::now()), Some("Task created"));
        assert!(session.notice(Instant::now() + Duration::from_secs(5)).is_none());

        assert_eq!(session.handle(rx.recv().await.unwrap()), Effect::Reloaded { tasks: 2 });
        assert_eq!(session.board().column(ColumnId::Review)[0].id.as_str(), "t2");
    }

    #[tokio::test]
    async fn test_connection_state_and_catch_up_reload() {
        let repo = Arc::new(FakeRepo::with_tasks(t1_todo()));
        let (mut session, _rx) = BoardSession::new("42", repo.clone(), SessionOptions::default());

        assert_eq!(
            session.handle(SessionEvent::Realtime(RealtimeSignal::Connected)),
            Effect::ConnectionChanged(ConnectionState::Connected)
        );
        assert!(!session.is_loading());

        session.handle(SessionEvent::Realtime(RealtimeSignal::Disconnected(Some("reset".into()))));
        assert_eq!(session.connection(), &ConnectionState::Failed("reset".into()));

        session.handle(SessionEvent::Realtime(RealtimeSignal::Connected));
        assert!(session.connection().is_connected());
        assert!(session.is_loading());
    }

    #[tokio::test]
    async fn test_first_success_after_failed_connect_catches_up() {
        let repo = Arc::new(FakeRepo::with_tasks(t1_todo()));
        let (mut session, _rx) = BoardSession::new("42", repo, SessionOptions::default());

        session.handle(SessionEvent::Realtime(RealtimeSignal::Disconnected(Some("refused".into()))));
        assert!(!session.is_loading());

        session.handle(SessionEvent::Realtime(RealtimeSignal::Connected));
        assert!(session.connection().is_connected());
        assert!(session.is_loading());
    }

    #[tokio::test]
    async fn test_load_failure_sets_banner_and_recovers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/projects/42/tasks"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({"error": "unauthorized"})))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/projects/42/tasks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"tasks": []})))
            .mount(&server)
            .await;

        let context = RequestContext::new(
            Arc::new(TenantResolver::default()),
            Arc::new(StaticToken::new(None)),
        );
        let repo = Arc::new(HttpTaskRepository::new(&server.uri(), context, Duration::from_secs(5)).unwrap());
        let (mut session, mut rx) = BoardSession::new("42", repo, SessionOptions::default());

        session.reload();
        let effect = session.handle(rx.recv().await.unwrap());
        assert_eq!(
            effect,
            Effect::LoadFailed("Request failed with HTTP 401: unauthorized (no token configured)".into())
        );
        assert!(session.load_error().is_some());

        session.reload();
        assert_eq!(session.handle(rx.recv().await.unwrap()), Effect::Reloaded { tasks: 0 });
        assert!(session.load_error().is_none());
    }

    #[tokio::test]
    async fn test_end_to_end_against_http_backend() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/projects/42/tasks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "tasks": [
                    {"id": "t1", "title": "First", "status": "todo"},
                    {"id": "t9", "title": "Odd", "status": "weird_unknown_value"}
                ]
            })))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path("/projects/42/tasks/t1"))
            .and(body_json(json!({"status": "IN_PROGRESS"})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/projects/42/tasks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "tasks": [
                    {"id": "t1", "title": "First", "status": "IN_PROGRESS"},
                    {"id": "t3", "title": "New", "status": "done"}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let context = RequestContext::new(
            Arc::new(TenantResolver::default()),
            Arc::new(StaticToken::new(Some("tok".into()))),
        );
        let repo = Arc::new(HttpTaskRepository::new(&server.uri(), context, Duration::from_secs(5)).unwrap());
        let (mut session, mut rx) = BoardSession::new("42", repo, SessionOptions::default());

        // Mount.
        session.reload();
        assert_eq!(session.handle(rx.recv().await.unwrap()), Effect::Reloaded { tasks: 2 });
        assert_eq!(session.board().column(ColumnId::Todo)[0].id.as_str(), "t1");
        assert_eq!(session.board().column(ColumnId::Backlog)[0].id.as_str(), "t9");

        // Local drag.
        session.drop_card(&move_t1_to_in_progress());
        assert!(session.board().column(ColumnId::Todo).is_empty());
        assert_eq!(session.board().column(ColumnId::InProgress)[0].id.as_str(), "t1");
        assert!(matches!(session.handle(rx.recv().await.unwrap()), Effect::Persisted(_)));

        // Remote change.
        let effect = session.handle(notification(json!({"kind": "task_created", "projectId": "42"})));
        assert_eq!(effect, Effect::ReloadTriggered(ChangeKind::Created));
        assert_eq!(session.handle(rx.recv().await.unwrap()), Effect::Reloaded { tasks: 2 });
        assert_eq!(session.board().column(ColumnId::Done)[0].id.as_str(), "t3");
        assert!(session.board().find(&"t9".into()).is_none());
    }
}
