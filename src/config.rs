//! Configuration loading.
//!
//! Settings come from `~/.taskboard/config.toml` (or `--config`), then the
//! `TASKBOARD_*` environment variables, then command-line flags, each layer
//! overriding the previous one.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fmt};

use serde::Deserialize;
use thiserror::Error;

use crate::fields::PersistFailurePolicy;

const DEFAULT_CHANNEL: &str = "tenant_notification";
const DEFAULT_EVENTS_PATH: &str = "/events/stream";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_RECONNECT_MS: u64 = 2000;
const DEFAULT_NOTICE_SECS: u64 = 4;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("no API URL configured (use --api-url, TASKBOARD_API_URL or api_url in {0})")]
    MissingApiUrl(ConfigLocation),
    #[error("no board configured (use --project, TASKBOARD_PROJECT or project in {0})")]
    MissingProject(ConfigLocation),
}

/// Where the config file was looked for, for error messages.
#[derive(Debug)]
pub struct ConfigLocation(Option<PathBuf>);

impl fmt::Display for ConfigLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Some(path) => write!(f, "{}", path.display()),
            None => f.write_str("the config file"),
        }
    }
}

/// Raw file contents. Every field is optional so partial files are fine.
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub api_url: Option<String>,
    pub project: Option<String>,
    pub tenant: Option<String>,
    pub token: Option<String>,
    pub token_file: Option<String>,
    pub request_timeout_secs: Option<u64>,
    #[serde(default)]
    pub realtime: RealtimeConfig,
    #[serde(default)]
    pub sync: SyncConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RealtimeConfig {
    pub enabled: Option<bool>,
    pub channel: Option<String>,
    pub events_path: Option<String>,
    pub reconnect_delay_ms: Option<u64>,
    pub notice_ttl_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SyncConfig {
    pub on_persist_failure: Option<PersistFailurePolicy>,
}

/// Values given on the command line.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub api_url: Option<String>,
    pub project: Option<String>,
    pub tenant: Option<String>,
    pub token: Option<String>,
}

/// Fully resolved settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub api_url: String,
    pub project: String,
    pub tenant: Option<String>,
    pub token: Option<String>,
    pub token_file: Option<PathBuf>,
    pub request_timeout: Duration,
    pub realtime_enabled: bool,
    pub channel: String,
    pub events_path: String,
    pub reconnect_delay: Duration,
    pub notice_ttl: Duration,
    pub on_persist_failure: PersistFailurePolicy,
}

impl FileConfig {
    /// Load from `path`. A missing file is an empty config.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(FileConfig::default());
        }
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

impl Settings {
    /// Read the config file (explicit path or the default location) and layer
    /// environment and command-line values on top.
    pub fn load(config_path: Option<&Path>, overrides: Overrides) -> Result<Self, ConfigError> {
        let path = config_path.map(Path::to_path_buf).or_else(default_config_path);
        let file = match &path {
            Some(p) => FileConfig::load(p)?,
            None => FileConfig::default(),
        };
        Self::resolve(file, env_overrides(), overrides, path)
    }

    fn resolve(
        file: FileConfig,
        env: Overrides,
        cli: Overrides,
        path: Option<PathBuf>,
    ) -> Result<Self, ConfigError> {
        let pick = |cli: Option<String>, env: Option<String>, file: Option<String>| {
            cli.or(env)
                .or(file.map(|v| expand_env_vars(&v)))
                .filter(|v| !v.trim().is_empty())
        };

        let api_url = pick(cli.api_url, env.api_url, file.api_url)
            .ok_or_else(|| ConfigError::MissingApiUrl(ConfigLocation(path.clone())))?;
        let project = pick(cli.project, env.project, file.project)
            .ok_or_else(|| ConfigError::MissingProject(ConfigLocation(path.clone())))?;
        let realtime = file.realtime;

        Ok(Settings {
            api_url: api_url.trim_end_matches('/').to_string(),
            project,
            tenant: pick(cli.tenant, env.tenant, file.tenant),
            token: pick(cli.token, env.token, file.token),
            token_file: file.token_file.map(|p| expand_home(&expand_env_vars(&p))),
            request_timeout: Duration::from_secs(file.request_timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
            realtime_enabled: realtime.enabled.unwrap_or(true),
            channel: realtime.channel.unwrap_or_else(|| DEFAULT_CHANNEL.to_string()),
            events_path: realtime.events_path.unwrap_or_else(|| DEFAULT_EVENTS_PATH.to_string()),
            reconnect_delay: Duration::from_millis(realtime.reconnect_delay_ms.unwrap_or(DEFAULT_RECONNECT_MS)),
            notice_ttl: Duration::from_secs(realtime.notice_ttl_secs.unwrap_or(DEFAULT_NOTICE_SECS)),
            on_persist_failure: file.sync.on_persist_failure.unwrap_or_default(),
        })
    }
}

/// `~/.taskboard`, where config, token and log files live.
pub fn data_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".taskboard"))
}

pub fn default_config_path() -> Option<PathBuf> {
    data_dir().map(|dir| dir.join("config.toml"))
}

fn env_overrides() -> Overrides {
    let var = |name: &str| env::var(name).ok();
    Overrides {
        api_url: var("TASKBOARD_API_URL"),
        project: var("TASKBOARD_PROJECT"),
        tenant: var("TASKBOARD_TENANT"),
        token: var("TASKBOARD_TOKEN"),
    }
}

fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

/// Replace `${VAR}` with the variable's value (empty when unset).
pub fn expand_env_vars(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let name = &after[..end];
                if !name.is_empty() {
                    out.push_str(&env::var(name).unwrap_or_default());
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}
