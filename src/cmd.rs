use std::sync::Arc;

use clap::Subcommand;
use clap_complete::{generate, Shell};

use crate::api::{endpoint, parse_base_url, HttpTaskRepository, RequestContext, TaskRepository};
use crate::board::BoardState;
use crate::config::Settings;
use crate::display::{print_board, summary_line};
use crate::error::BoardError;
use crate::fields::ColumnId;
use crate::realtime::{SseEventSource, Subscription};
use crate::session::{BoardSession, Effect, SessionOptions};
use crate::task::TaskId;
use crate::tenant::{StaticToken, TenantResolver, TokenChain, TokenFile, TokenProvider};

#[derive(Subcommand)]
pub enum Commands {
    /// Open the live Kanban board (default).
    Board,
    /// Load the board once and print every column.
    List,
    /// Set a task's status directly.
    Move {
        /// Task id.
        task_id: String,
        /// Target column.
        #[arg(value_enum)]
        status: ColumnId,
    },
    /// Follow the board without a UI, printing reloads and notices until Ctrl-C.
    Watch,
    /// Generate shell completion scripts.
    Completions {
        /// Shell to generate completions for.
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Tenant and token providers for every outgoing request.
pub fn build_context(settings: &Settings) -> RequestContext {
    let tenant = TenantResolver::new(&settings.api_url, settings.tenant.clone());
    let mut tokens: Vec<Box<dyn TokenProvider>> =
        vec![Box::new(StaticToken::new(settings.token.clone()))];
    if let Some(path) = &settings.token_file {
        tokens.push(Box::new(TokenFile::new(path.clone())));
    }
    RequestContext::new(Arc::new(tenant), Arc::new(TokenChain::new(tokens)))
}

pub fn build_repository(
    settings: &Settings,
    context: RequestContext,
) -> Result<HttpTaskRepository, BoardError> {
    HttpTaskRepository::new(&settings.api_url, context, settings.request_timeout)
}

/// Event stream client. The stream is long-lived, so only connecting is bounded.
pub fn build_event_source(
    settings: &Settings,
    context: RequestContext,
) -> Result<SseEventSource, BoardError> {
    let base = parse_base_url(&settings.api_url)?;
    let segments: Vec<&str> = settings
        .events_path
        .split('/')
        .filter(|s| !s.is_empty())
        .collect();
    let client = reqwest::Client::builder()
        .connect_timeout(settings.request_timeout)
        .build()
        .map_err(BoardError::Network)?;
    Ok(SseEventSource::new(
        client,
        endpoint(&base, &segments),
        context,
        settings.reconnect_delay,
    ))
}

pub fn session_options(settings: &Settings) -> SessionOptions {
    SessionOptions {
        channel: settings.channel.clone(),
        notice_ttl: settings.notice_ttl,
        on_persist_failure: settings.on_persist_failure,
    }
}

/// Everything a live session needs, wired from settings.
pub struct LiveBoard {
    pub session: BoardSession<HttpTaskRepository>,
    pub events: tokio::sync::mpsc::UnboundedReceiver<crate::session::SessionEvent>,
    pub subscription: Subscription,
    pub tenant: Option<String>,
}

/// Build the session, start the realtime subscription and kick off the first load.
/// Must run inside a tokio runtime.
pub fn open_live_board(settings: &Settings) -> Result<LiveBoard, BoardError> {
    let context = build_context(settings);
    let tenant = context.tenant();
    let repo = build_repository(settings, context.clone())?;
    let (mut session, events) =
        BoardSession::new(settings.project.clone(), Arc::new(repo), session_options(settings));

    let subscription = if settings.realtime_enabled {
        session.subscribe(&build_event_source(settings, context)?)
    } else {
        tracing::info!("Realtime updates disabled");
        Subscription::disabled()
    };
    session.reload();

    Ok(LiveBoard {
        session,
        events,
        subscription,
        tenant,
    })
}

/// Launch the board TUI.
pub fn cmd_board(settings: &Settings) {
    let live = match open_live_board(settings) {
        Ok(live) => live,
        Err(e) => {
            eprintln!("Error: {}", e.user_message());
            std::process::exit(1);
        }
    };
    if let Err(e) = crate::tui::run::run_board(live) {
        eprintln!("Error running board: {}", e);
        std::process::exit(1);
    }
}

/// Print every column of the board once.
pub async fn cmd_list(settings: &Settings) {
    let repo = match build_repository(settings, build_context(settings)) {
        Ok(repo) => repo,
        Err(e) => {
            eprintln!("Error: {}", e.user_message());
            std::process::exit(1);
        }
    };
    match repo.list_tasks(&settings.project).await {
        Ok(tasks) => {
            let board = BoardState::from_tasks(tasks);
            tracing::info!(board = %settings.project, tasks = board.len(), "Board loaded");
            print_board(&board);
        }
        Err(e) => {
            eprintln!("Error: {}", e.user_message());
            std::process::exit(1);
        }
    }
}

/// Persist a status change without going through the board.
pub async fn cmd_move(settings: &Settings, task_id: &str, status: ColumnId) {
    let context = build_context(settings);
    if !context.has_token() {
        eprintln!("Warning: no token configured; the server may reject this change.");
    }
    let repo = match build_repository(settings, context) {
        Ok(repo) => repo,
        Err(e) => {
            eprintln!("Error: {}", e.user_message());
            std::process::exit(1);
        }
    };
    let task_id = TaskId::new(task_id);
    match repo
        .update_task_status(&settings.project, &task_id, status)
        .await
    {
        Ok(()) => println!("Moved task {} to {}", task_id, status.title()),
        Err(e) => {
            eprintln!("Error: {}", e.user_message());
            std::process::exit(1);
        }
    }
}

/// Follow the board headlessly until Ctrl-C.
pub async fn cmd_watch(settings: &Settings) {
    let LiveBoard {
        mut session,
        mut events,
        subscription,
        tenant,
    } = match open_live_board(settings) {
        Ok(live) => live,
        Err(e) => {
            eprintln!("Error: {}", e.user_message());
            std::process::exit(1);
        }
    };

    match &tenant {
        Some(t) => println!("Watching board {} (tenant {})", settings.project, t),
        None => println!("Watching board {}", settings.project),
    }

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            Some(event) = events.recv() => {
                let effect = session.handle(event);
                report(&effect, session.board());
            }
        }
    }
    drop(subscription);
}

fn report(effect: &Effect, board: &BoardState) {
    let now = chrono::Local::now().format("%H:%M:%S");
    match effect {
        Effect::Reloaded { .. } => println!("[{now}] {}", summary_line(board)),
        Effect::LoadFailed(message) => eprintln!("[{now}] {message}"),
        Effect::ReloadTriggered(kind) => println!("[{now}] {}", kind.notice()),
        Effect::ConnectionChanged(state) => println!("[{now}] connection: {}", state.label()),
        Effect::PersistFailed { update, .. } => {
            eprintln!("[{now}] could not save task {}", update.task_id)
        }
        Effect::Persisted(_) | Effect::StaleLoadIgnored | Effect::EventDiscarded(_) => {}
    }
}

/// Generate shell completion scripts.
pub fn cmd_completions(shell: Shell) {
    use crate::cli::Cli;
    use clap::CommandFactory;

    let mut app = Cli::command();
    let app_name = app.get_name().to_string();
    generate(shell, &mut app, app_name, &mut std::io::stdout());
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::fields::PersistFailurePolicy;

    fn settings(api_url: &str) -> Settings {
        Settings {
            api_url: api_url.to_string(),
            project: "42".to_string(),
            tenant: None,
            token: Some("secret".to_string()),
            token_file: None,
            request_timeout: Duration::from_secs(5),
            realtime_enabled: true,
            channel: "tenant_notification".to_string(),
            events_path: "/events/stream".to_string(),
            reconnect_delay: Duration::from_millis(100),
            notice_ttl: Duration::from_secs(4),
            on_persist_failure: PersistFailurePolicy::Reload,
        }
    }

    #[test]
    fn test_context_resolves_tenant_from_url() {
        let context = build_context(&settings("https://acme.example.com/api"));
        assert_eq!(context.tenant().as_deref(), Some("acme"));
        assert!(context.has_token());
    }

    #[test]
    fn test_explicit_tenant_wins() {
        let mut s = settings("https://acme.example.com/api");
        s.tenant = Some("globex".into());
        assert_eq!(build_context(&s).tenant().as_deref(), Some("globex"));
    }

    #[test]
    fn test_session_options_follow_settings() {
        let options = session_options(&settings("http://localhost:8080"));
        assert_eq!(options.channel, "tenant_notification");
        assert_eq!(options.on_persist_failure, PersistFailurePolicy::Reload);
    }

    #[test]
    fn test_invalid_url_is_reported() {
        let s = settings("not a url");
        let err = build_repository(&s, build_context(&s)).err().unwrap();
        assert!(matches!(err, BoardError::InvalidUrl(_)));
    }

    #[tokio::test]
    async fn test_live_board_without_realtime() {
        let mut s = settings("http://127.0.0.1:9");
        s.realtime_enabled = false;
        let live = open_live_board(&s).unwrap();
        assert!(!live.subscription.is_active());
        assert!(live.session.is_loading());
    }
}
