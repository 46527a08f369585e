//! Registry error taxonomy

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    /// DNS, connect or stream failure below HTTP
    #[error("Request failed: {0}")]
    Transport(String),

    /// Non-2xx status without a usable error body
    #[error("{}", format_status(.status, .reason))]
    Status { status: u16, reason: Option<String> },

    /// Non-2xx status carrying a structured `message`
    #[error("{0}")]
    Server(String),

    /// 2xx response that is an HTML page, typically a login redirect
    #[error("{0}")]
    Html(String),

    /// 2xx response whose body is not the expected JSON
    #[error("Invalid JSON response: {0}")]
    Json(String),

    /// JSON body with a non-empty `error` field
    #[error("{0}")]
    Logical(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn format_status(status: &u16, reason: &Option<String>) -> String {
    match reason.as_deref().filter(|r| !r.is_empty()) {
        Some(reason) => format!("The server responded with status {}: {}", status, reason),
        None => format!("The server responded with status {}", status),
    }
}

impl RegistryError {
    /// Wrap a reqwest error, dropping the URL so the token query parameter
    /// never ends up in a message.
    pub(crate) fn transport(e: reqwest::Error) -> Self {
        RegistryError::Transport(e.without_url().to_string())
    }

    /// HTTP status for status-derived errors
    pub fn status(&self) -> Option<u16> {
        match self {
            RegistryError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
