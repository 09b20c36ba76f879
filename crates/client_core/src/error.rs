use shared::error::ErrorBody;
use thiserror::Error;

pub const SERVER_ERROR_FALLBACK: &str = "Server error";
pub const TRANSPORT_ERROR_MESSAGE: &str = "Could not connect to the server";
pub const UNEXPECTED_ERROR_MESSAGE: &str = "Unexpected error";

/// Failure of a single call against one of the external services.
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    /// The service answered with a non-2xx status.
    #[error("server responded with status {status}: {}", .detail.as_deref().unwrap_or("no detail"))]
    Server { status: u16, detail: Option<String> },
    /// No response could be obtained.
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("unexpected failure: {0}")]
    Unexpected(String),
}

impl ClientError {
    pub fn server(status: u16, body: &[u8]) -> Self {
        let detail = serde_json::from_slice::<ErrorBody>(body)
            .ok()
            .and_then(|body| body.detail_message());
        Self::Server { status, detail }
    }

    /// Classifies a reqwest failure the way a browser client would: anything
    /// raised before a response arrived is a transport problem, while body
    /// decoding and request-building failures are unexpected.
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_builder() || err.is_decode() || err.is_body() {
            Self::Unexpected(err.to_string())
        } else if let Some(status) = err.status() {
            Self::Server {
                status: status.as_u16(),
                detail: None,
            }
        } else {
            Self::Transport(err.to_string())
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Server { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Single human-readable message for display.
    pub fn user_message(&self) -> String {
        self.user_message_or(SERVER_ERROR_FALLBACK)
    }

    /// Like [`ClientError::user_message`], with a caller-chosen fallback for
    /// server errors that carry no `detail`.
    pub fn user_message_or(&self, server_fallback: &str) -> String {
        match self {
            Self::Server {
                detail: Some(detail),
                ..
            } => detail.clone(),
            Self::Server { detail: None, .. } => server_fallback.to_string(),
            Self::Transport(_) => TRANSPORT_ERROR_MESSAGE.to_string(),
            Self::Unexpected(_) => UNEXPECTED_ERROR_MESSAGE.to_string(),
        }
    }
}
