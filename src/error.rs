//! Error types for talking to the board backend.

use thiserror::Error;

/// Failure of a repository call.
#[derive(Debug, Error)]
pub enum BoardError {
    /// The request never produced an HTTP response.
    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),

    /// The server answered with a non-2xx status. `body` is the raw response text.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid API URL: {0}")]
    InvalidUrl(String),
}

impl BoardError {
    /// Message suitable for an inline banner.
    ///
    /// JSON error bodies with an `error` or `message` string are reduced to that
    /// string; anything else is shown as received.
    pub fn user_message(&self) -> String {
        match self {
            BoardError::Network(e) => format!("Network error: {e}"),
            BoardError::Http { status, body } => {
                let detail = error_detail(body);
                if detail.is_empty() {
                    format!("Request failed with HTTP {status}")
                } else {
                    format!("Request failed with HTTP {status}: {detail}")
                }
            }
            BoardError::Decode(e) => format!("Unexpected response from server: {e}"),
            BoardError::InvalidUrl(url) => format!("Invalid API URL: {url}"),
        }
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, BoardError::Http { status: 401 | 403, .. })
    }
}

fn error_detail(body: &str) -> String {
    let body = body.trim();
    if let Ok(serde_json::Value::Object(map)) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["error", "message", "detail"] {
            if let Some(serde_json::Value::String(s)) = map.get(key) {
                return s.clone();
            }
        }
    }
    body.to_string()
}
