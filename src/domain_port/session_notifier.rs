#[async_trait::async_trait]
pub trait SessionExpiredNotifier: Send + Sync {
    /// Called once per failed refresh cycle, after the token store has been cleared.
    async fn session_expired(&self, reason: &str);
}
