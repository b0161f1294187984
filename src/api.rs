//! Task repository client.
//!
//! A stateless wrapper over the board REST API. Every request carries the
//! tenant header and bearer token supplied by the injected providers; the
//! client never decides either itself.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use reqwest::{Method, RequestBuilder, Response, Url};
use serde::Serialize;

use crate::error::BoardError;
use crate::fields::ColumnId;
use crate::task::{Task, TaskId, TaskList};
use crate::tenant::{TenantProvider, TokenProvider};

const CONNECT_TIMEOUT_SECS: u64 = 10;
const MAX_ERROR_BODY_BYTES: usize = 32 * 1024;

/// Source of truth for a board's tasks.
pub trait TaskRepository: Send + Sync + 'static {
    fn list_tasks(&self, board_id: &str) -> impl Future<Output = Result<Vec<Task>, BoardError>> + Send;

    fn update_task_status(
        &self,
        board_id: &str,
        task_id: &TaskId,
        status: ColumnId,
    ) -> impl Future<Output = Result<(), BoardError>> + Send;

    /// Whether an auth context is present, so writes are worth attempting.
    fn can_persist(&self) -> bool;
}

#[derive(Serialize)]
struct StatusPatch<'a> {
    status: &'a str,
}

/// Shared request decoration for the REST client and the event stream.
#[derive(Clone)]
pub struct RequestContext {
    tenant: Arc<dyn TenantProvider>,
    token: Arc<dyn TokenProvider>,
}

impl RequestContext {
    pub fn new(tenant: Arc<dyn TenantProvider>, token: Arc<dyn TokenProvider>) -> Self {
        RequestContext { tenant, token }
    }

    pub fn has_token(&self) -> bool {
        self.token.bearer_token().is_some()
    }

    pub fn tenant(&self) -> Option<String> {
        self.tenant.tenant_header().map(|(_, value)| value)
    }

    /// Attach tenant and auth headers. Without a token the request goes out
    /// unauthenticated and the server decides.
    pub fn apply(&self, mut builder: RequestBuilder) -> RequestBuilder {
        if let Some((name, value)) = self.tenant.tenant_header() {
            builder = builder.header(name, value);
        }
        if let Some(token) = self.token.bearer_token() {
            builder = builder.bearer_auth(token);
        }
        builder
    }
}

/// Parse and sanity-check an API base URL.
pub fn parse_base_url(raw: &str) -> Result<Url, BoardError> {
    let url = Url::parse(raw).map_err(|e| BoardError::InvalidUrl(format!("{raw}: {e}")))?;
    if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
        return Err(BoardError::InvalidUrl(raw.to_string()));
    }
    Ok(url)
}

/// Append path segments to a base URL, percent-encoding each one.
pub fn endpoint(base: &Url, segments: &[&str]) -> Url {
    let mut url = base.clone();
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    url
}

pub fn http_client(timeout: Duration) -> Result<reqwest::Client, BoardError> {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .timeout(timeout)
        .build()
        .map_err(BoardError::Network)
}

/// REST implementation of [`TaskRepository`].
#[derive(Clone)]
pub struct HttpTaskRepository {
    client: reqwest::Client,
    base_url: Url,
    context: RequestContext,
}

impl HttpTaskRepository {
    pub fn new(base_url: &str, context: RequestContext, timeout: Duration) -> Result<Self, BoardError> {
        Ok(HttpTaskRepository {
            client: http_client(timeout)?,
            base_url: parse_base_url(base_url)?,
            context,
        })
    }

    fn request(&self, method: Method, segments: &[&str]) -> RequestBuilder {
        let url = endpoint(&self.base_url, segments);
        self.context.apply(self.client.request(method, url))
    }
}

impl TaskRepository for HttpTaskRepository {
    async fn list_tasks(&self, board_id: &str) -> Result<Vec<Task>, BoardError> {
        let response = self
            .request(Method::GET, &["projects", board_id, "tasks"])
            .send()
            .await
            .map_err(BoardError::Network)?;
        let response = ensure_success(response).await?;
        let body = response.text().await.map_err(BoardError::Network)?;
        let list: TaskList = serde_json::from_str(&body)?;
        Ok(list.into_tasks())
    }

    async fn update_task_status(
        &self,
        board_id: &str,
        task_id: &TaskId,
        status: ColumnId,
    ) -> Result<(), BoardError> {
        let response = self
            .request(Method::PATCH, &["projects", board_id, "tasks", task_id.as_str()])
            .json(&StatusPatch { status: status.token() })
            .send()
            .await
            .map_err(BoardError::Network)?;
        ensure_success(response).await?;
        Ok(())
    }

    fn can_persist(&self) -> bool {
        self.context.has_token()
    }
}

/// Turn a non-2xx response into [`BoardError::Http`], reading the body as text.
async fn ensure_success(response: Response) -> Result<Response, BoardError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = read_capped_error_body(response).await;
    Err(BoardError::Http { status: status.as_u16(), body })
}

async fn read_capped_error_body(response: Response) -> String {
    use futures_util::StreamExt;

    let mut body = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let Ok(chunk) = chunk else { break };
        body.extend_from_slice(&chunk);
        if body.len() > MAX_ERROR_BODY_BYTES {
            body.truncate(MAX_ERROR_BODY_BYTES);
            let text = String::from_utf8_lossy(&body);
            return format!("{text}...(truncated)");
        }
    }
    String::from_utf8_lossy(&body).into_owned()
}
