use crate::domain_model::*;
use crate::domain_port::*;
use reqwest::StatusCode;

/// Outcome of a failed refresh cycle, fanned out to every waiter of that cycle.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RefreshError {
    #[error("no refresh token stored")]
    MissingRefreshToken,
    #[error("refresh rejected: {0}")]
    Rejected(String),
    #[error("refresh request failed: {0}")]
    Transport(#[from] TransportError),
    #[error("token store error: {0}")]
    Store(#[from] StoreError),
    #[error("refresh coordinator is not running")]
    Unavailable,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Non-2xx response. `request` is `None` when the failing call cannot be replayed.
    #[error("request failed with status {}", .response.status)]
    Status {
        request: Option<Box<ApiRequest>>,
        response: ApiResponse,
    },
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("session expired: {0}")]
    SessionExpired(RefreshError),
    #[error("backend error {code}: {message}")]
    Backend { code: u16, message: String },
    #[error("invalid response body: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Status { response, .. } => Some(response.status),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(error: serde_json::Error) -> Self {
        ApiError::Decode(error.to_string())
    }
}
