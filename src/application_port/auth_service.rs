use super::ApiError;
use crate::domain_model::*;
use crate::domain_port::*;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),
    #[error("unexpected login response: {0}")]
    InvalidResponse(String),
    #[error("no stored session")]
    NoSession,
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("token store error: {0}")]
    Store(#[from] StoreError),
}

#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Exchanges credentials for a token pair and loads the profile.
    async fn login(&self, credentials: Credentials) -> Result<UserProfile, AuthError>;
    async fn logout(&self) -> Result<(), AuthError>;
    /// Rebuilds the auth state from stored tokens, refreshing them when needed.
    async fn restore_session(&self) -> Result<UserProfile, AuthError>;
    async fn fetch_profile(&self) -> Result<UserProfile, AuthError>;
    fn current_state(&self) -> AuthState;
}
