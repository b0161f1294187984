use std::path::PathBuf;

use clap::Parser;

use crate::cmd::Commands;
use crate::config::Overrides;

/// Live Kanban board for a multi-tenant project tracker.
/// Settings come from ~/.taskboard/config.toml, the environment, or the flags below.
#[derive(Parser)]
#[command(name = "tb", version, about = "Realtime collaborative task board")]
pub struct Cli {
    /// Path to the TOML config file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Base URL of the task API.
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Project (board) id.
    #[arg(long, global = true)]
    pub project: Option<String>,

    /// Tenant id, overriding what the API URL implies.
    #[arg(long, global = true)]
    pub tenant: Option<String>,

    /// Bearer token.
    #[arg(long, global = true)]
    pub token: Option<String>,

    /// Defaults to `board`.
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            api_url: self.api_url.clone(),
            project: self.project.clone(),
            tenant: self.tenant.clone(),
            token: self.token.clone(),
        }
    }
}
