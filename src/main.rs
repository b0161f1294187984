//! # tb - Realtime Task Board
//!
//! A terminal Kanban board for one project of a multi-tenant task tracker.
//!
//! ## Key Features
//!
//! - **Five fixed columns**: Backlog, To-Do, In Progress, Review, Done. Any server
//!   status is classified into one of them.
//! - **Optimistic moves**: a dropped card moves at once; the new status is saved in
//!   the background.
//! - **Live updates**: task changes announced on the tenant's event stream reload
//!   the board, with a short notice in the status bar.
//! - **Tenant aware**: the tenant is taken from the API URL (path or subdomain) or
//!   set explicitly, and sent as `X-Tenant-ID` on every request.
//!
//! ## Quick Start
//!
//! ```bash
//! # Open the board
//! tb --api-url https://acme.example.com/api --project 42
//!
//! # Print the board once
//! tb list
//!
//! # Move a task without the UI
//! tb move 1234 in-progress
//!
//! # Follow changes headlessly
//! tb watch
//! ```
//!
//! Settings live in `~/.taskboard/config.toml`; environment variables
//! (`TASKBOARD_API_URL`, `TASKBOARD_PROJECT`, `TASKBOARD_TENANT`,
//! `TASKBOARD_TOKEN`) and flags override it. The board writes its log to
//! `~/.taskboard/taskboard.log`.

use std::fs::{self, OpenOptions};
use std::sync::Mutex;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub mod api;
pub mod board;
pub mod cli;
pub mod cmd;
pub mod config;
pub mod display;
pub mod drag;
pub mod error;
pub mod fields;
pub mod realtime;
pub mod session;
pub mod task;
pub mod tenant;
pub mod tui {
    pub mod board;
    pub mod colors;
    pub mod enums;
    pub mod run;
}

use cli::Cli;
use cmd::*;
use config::Settings;

/// Initialise tracing. The board owns the terminal, so it logs to a file (or
/// nowhere if the file cannot be opened); other commands log to stderr.
fn init_tracing(to_file: bool, default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    if !to_file {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
            .init();
        return;
    }

    let log_file = config::data_dir().and_then(|dir| {
        fs::create_dir_all(&dir).ok()?;
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join("taskboard.log"))
            .ok()
    });

    match log_file {
        Some(file) => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
                .init();
        }
        None => {
            tracing_subscriber::registry().with(filter).init();
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let command = cli.command.as_ref().map_or(CommandKind::Board, CommandKind::of);

    // Completions need no settings or network.
    if let Some(Commands::Completions { shell }) = &cli.command {
        cmd_completions(*shell);
        return;
    }

    match command {
        CommandKind::Board => init_tracing(true, "info"),
        CommandKind::Headless => init_tracing(false, "warn"),
    }

    let settings = match Settings::load(cli.config.as_deref(), cli.overrides()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    tracing::debug!(api_url = %settings.api_url, project = %settings.project, "Settings loaded");

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to start async runtime: {}", e);
            std::process::exit(1);
        }
    };

    match cli.command {
        None | Some(Commands::Board) => {
            let _guard = runtime.enter();
            cmd_board(&settings);
        }
        Some(Commands::List) => runtime.block_on(cmd_list(&settings)),
        Some(Commands::Move { task_id, status }) => {
            runtime.block_on(cmd_move(&settings, &task_id, status))
        }
        Some(Commands::Watch) => runtime.block_on(cmd_watch(&settings)),
        Some(Commands::Completions { .. }) => unreachable!("completions handled above"),
    }
}

/// Where a command's logs should go.
enum CommandKind {
    Board,
    Headless,
}

impl CommandKind {
    fn of(command: &Commands) -> Self {
        match command {
            Commands::Board => CommandKind::Board,
            _ => CommandKind::Headless,
        }
    }
}
