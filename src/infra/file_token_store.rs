use super::StoredTokens;
use crate::domain_model::*;
use crate::domain_port::*;
use chrono::Utc;
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::sync::RwLock;

/// JSON file backed store. The file is read once and then cached; writes go to a
/// sibling temp file and are renamed into place.
pub struct FileTokenStore {
    path: PathBuf,
    cache: RwLock<Option<StoredTokens>>,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: RwLock::new(None),
        }
    }

    async fn read_file(&self) -> Result<StoredTokens, StoreError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => {
                serde_json::from_slice(&bytes).map_err(|e| StoreError::Corrupt(e.to_string()))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(StoredTokens::default()),
            Err(e) => Err(StoreError::Io(e.to_string())),
        }
    }

    async fn write_file(&self, tokens: &StoredTokens) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::Io(e.to_string()))?;
        }
        let bytes =
            serde_json::to_vec_pretty(tokens).map_err(|e| StoreError::Corrupt(e.to_string()))?;
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(|e| StoreError::Io(e.to_string()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| StoreError::Io(e.to_string()))
    }

    async fn snapshot(&self) -> Result<StoredTokens, StoreError> {
        if let Some(tokens) = self.cache.read().await.as_ref() {
            return Ok(tokens.clone());
        }
        let mut cache = self.cache.write().await;
        if let Some(tokens) = cache.as_ref() {
            return Ok(tokens.clone());
        }
        let tokens = self.read_file().await?;
        *cache = Some(tokens.clone());
        Ok(tokens)
    }

    /// Reads report a corrupt file, but writes start over from an empty record so a
    /// new login can replace it. The cache only changes once the file is written.
    async fn update(&self, apply: impl FnOnce(&mut StoredTokens)) -> Result<(), StoreError> {
        let mut cache = self.cache.write().await;
        let mut tokens = match cache.as_ref() {
            Some(tokens) => tokens.clone(),
            None => self.read_file().await.unwrap_or_else(|e| {
                tracing::warn!(error = %e, path = %self.path.display(), "discarding unreadable token file");
                StoredTokens::default()
            }),
        };
        apply(&mut tokens);
        tokens.saved_at = Some(Utc::now());
        self.write_file(&tokens).await?;
        *cache = Some(tokens);
        Ok(())
    }
}

#[async_trait::async_trait]
impl TokenStore for FileTokenStore {
    async fn access_token(&self) -> Result<Option<AccessToken>, StoreError> {
        Ok(self.snapshot().await?.access_token)
    }

    async fn refresh_token(&self) -> Result<Option<RefreshToken>, StoreError> {
        Ok(self.snapshot().await?.refresh_token)
    }

    async fn set_access_token(&self, token: AccessToken) -> Result<(), StoreError> {
        self.update(|tokens| tokens.access_token = Some(token)).await
    }

    async fn set_refresh_token(&self, token: RefreshToken) -> Result<(), StoreError> {
        self.update(|tokens| tokens.refresh_token = Some(token)).await
    }

    async fn clear(&self) -> Result<(), StoreError> {
        let mut cache = self.cache.write().await;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(StoreError::Io(e.to_string())),
        }
        *cache = Some(StoredTokens::default());
        Ok(())
    }
}
