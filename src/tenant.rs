//! Tenant and credential providers injected into the repository client.
//!
//! Both are synchronous reads with no I/O beyond a small file read, so the
//! client can ask for them on every request and pick up changes immediately.

use std::fs;
use std::path::PathBuf;

/// Header carrying the tenant identifier on every outbound request.
pub const TENANT_HEADER: &str = "X-Tenant-ID";

/// Supplies the tenant header, if any, for outbound requests.
pub trait TenantProvider: Send + Sync {
    fn tenant_header(&self) -> Option<(&'static str, String)>;
}

/// Supplies the bearer token, if any.
pub trait TokenProvider: Send + Sync {
    fn bearer_token(&self) -> Option<String>;
}

/// Resolves the tenant from an explicit override, the API path or the API host.
#[derive(Debug, Clone, Default)]
pub struct TenantResolver {
    explicit: Option<String>,
    host: Option<String>,
    path: String,
}

impl TenantResolver {
    pub fn new(api_url: &str, explicit: Option<String>) -> Self {
        let (host, path) = split_url(api_url);
        TenantResolver {
            explicit: explicit.filter(|t| !t.trim().is_empty()),
            host,
            path,
        }
    }

    /// Tenant id in effect, if one can be determined.
    pub fn resolve(&self) -> Option<String> {
        if let Some(tenant) = &self.explicit {
            return Some(tenant.trim().to_string());
        }
        tenant_from_path(&self.path).or_else(|| self.host.as_deref().and_then(tenant_from_host))
    }
}

impl TenantProvider for TenantResolver {
    fn tenant_header(&self) -> Option<(&'static str, String)> {
        self.resolve().map(|tenant| (TENANT_HEADER, tenant))
    }
}

fn split_url(url: &str) -> (Option<String>, String) {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    let (authority, path) = match rest.find('/') {
        Some(i) => (&rest[..i], &rest[i..]),
        None => (rest, "/"),
    };
    let host = authority
        .rsplit_once('@')
        .map_or(authority, |(_, h)| h)
        .split(':')
        .next()
        .unwrap_or_default()
        .to_lowercase();
    ((!host.is_empty()).then_some(host), path.to_string())
}

/// `/t/{tenant}/...` path prefix.
fn tenant_from_path(path: &str) -> Option<String> {
    let mut segments = path.split('/').filter(|s| !s.is_empty());
    match (segments.next(), segments.next()) {
        (Some("t"), Some(tenant)) => Some(tenant.to_string()),
        _ => None,
    }
}

/// First label of a host like `acme.board.example.com`.
fn tenant_from_host(host: &str) -> Option<String> {
    if host.parse::<std::net::IpAddr>().is_ok() {
        return None;
    }
    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() < 3 {
        return None;
    }
    match labels[0] {
        "" | "www" | "api" => None,
        tenant => Some(tenant.to_string()),
    }
}

/// Token fixed at startup (from a flag, environment or config).
#[derive(Debug, Clone, Default)]
pub struct StaticToken(Option<String>);

impl StaticToken {
    pub fn new(token: Option<String>) -> Self {
        StaticToken(token.filter(|t| !t.trim().is_empty()))
    }
}

impl TokenProvider for StaticToken {
    fn bearer_token(&self) -> Option<String> {
        self.0.clone()
    }
}

/// Token read from a file on each request, so a refreshed token is picked up.
#[derive(Debug, Clone)]
pub struct TokenFile {
    path: PathBuf,
}

impl TokenFile {
    pub fn new(path: PathBuf) -> Self {
        TokenFile { path }
    }
}

impl TokenProvider for TokenFile {
    fn bearer_token(&self) -> Option<String> {
        match fs::read_to_string(&self.path) {
            Ok(content) => {
                let token = content.trim();
                (!token.is_empty()).then(|| token.to_string())
            }
            Err(e) => {
                tracing::debug!(path = %self.path.display(), %e, "No token file");
                None
            }
        }
    }
}

/// First provider that yields a token wins.
pub struct TokenChain(Vec<Box<dyn TokenProvider>>);

impl TokenChain {
    pub fn new(providers: Vec<Box<dyn TokenProvider>>) -> Self {
        TokenChain(providers)
    }
}

impl TokenProvider for TokenChain {
    fn bearer_token(&self) -> Option<String> {
        self.0.iter().find_map(|p| p.bearer_token())
    }
}
