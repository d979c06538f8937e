use crate::domain_model::*;

#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(String),
    #[error("corrupt token file: {0}")]
    Corrupt(String),
}

/// Sole owner of the persisted token pair. The session layer never caches tokens;
/// every read goes through here.
#[async_trait::async_trait]
pub trait TokenStore: Send + Sync {
    async fn access_token(&self) -> Result<Option<AccessToken>, StoreError>;
    async fn refresh_token(&self) -> Result<Option<RefreshToken>, StoreError>;
    async fn set_access_token(&self, token: AccessToken) -> Result<(), StoreError>;
    async fn set_refresh_token(&self, token: RefreshToken) -> Result<(), StoreError>;
    async fn clear(&self) -> Result<(), StoreError>;

    async fn save_pair(&self, pair: &TokenPair) -> Result<(), StoreError> {
        self.set_access_token(pair.access_token.clone()).await?;
        self.set_refresh_token(pair.refresh_token.clone()).await
    }
}
