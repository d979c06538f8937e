use crate::domain_model::*;
use crate::domain_port::*;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

/// Persisted shape shared by the token store backends.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredTokens {
    pub access_token: Option<AccessToken>,
    pub refresh_token: Option<RefreshToken>,
    pub saved_at: Option<DateTime<Utc>>,
}

#[derive(Default)]
pub struct MemoryTokenStore {
    tokens: RwLock<StoredTokens>,
    clears: AtomicUsize,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pair(pair: TokenPair) -> Self {
        Self {
            tokens: RwLock::new(StoredTokens {
                access_token: Some(pair.access_token),
                refresh_token: Some(pair.refresh_token),
                saved_at: Some(Utc::now()),
            }),
            clears: AtomicUsize::new(0),
        }
    }

    /// Number of `clear` calls so far.
    pub fn clear_count(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl TokenStore for MemoryTokenStore {
    async fn access_token(&self) -> Result<Option<AccessToken>, StoreError> {
        Ok(self.tokens.read().await.access_token.clone())
    }

    async fn refresh_token(&self) -> Result<Option<RefreshToken>, StoreError> {
        Ok(self.tokens.read().await.refresh_token.clone())
    }

    async fn set_access_token(&self, token: AccessToken) -> Result<(), StoreError> {
        let mut tokens = self.tokens.write().await;
        tokens.access_token = Some(token);
        tokens.saved_at = Some(Utc::now());
        Ok(())
    }

    async fn set_refresh_token(&self, token: RefreshToken) -> Result<(), StoreError> {
        let mut tokens = self.tokens.write().await;
        tokens.refresh_token = Some(token);
        tokens.saved_at = Some(Utc::now());
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        *self.tokens.write().await = StoredTokens::default();
        self.clears.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn save_pair_then_clear() {
        let store = MemoryTokenStore::new();
        assert_eq!(store.access_token().await.unwrap(), None);

        store
            .save_pair(&TokenPair {
                access_token: AccessToken("a1".into()),
                refresh_token: RefreshToken("r1".into()),
            })
            .await
            .unwrap();
        assert_eq!(store.access_token().await.unwrap(), Some(AccessToken("a1".into())));
        assert_eq!(store.refresh_token().await.unwrap(), Some(RefreshToken("r1".into())));

        store.clear().await.unwrap();
        assert_eq!(store.refresh_token().await.unwrap(), None);
        assert_eq!(store.clear_count(), 1);
    }
}
