use crate::domain_model::*;
use crate::domain_port::*;
use tokio::sync::{broadcast, watch};

const EVENT_CAP: usize = 64;

/// Reactive auth state for the UI layer. Session expiry lands here through
/// `SessionExpiredNotifier`; subscribers decide how to navigate.
pub struct AuthStateHub {
    state: watch::Sender<AuthState>,
    events: broadcast::Sender<SessionEvent>,
    login_redirect: String,
}

impl AuthStateHub {
    pub fn new(login_redirect: impl Into<String>) -> Self {
        let (state, _) = watch::channel(AuthState::Anonymous);
        let (events, _) = broadcast::channel(EVENT_CAP);
        Self {
            state,
            events,
            login_redirect: login_redirect.into(),
        }
    }

    pub fn subscribe_state(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn current(&self) -> AuthState {
        self.state.borrow().clone()
    }

    pub fn signed_in(&self, profile: UserProfile) {
        let username = profile.username.clone();
        self.state.send_replace(AuthState::Authenticated(profile));
        self.emit(SessionEvent::LoggedIn { username });
    }

    pub fn profile_loaded(&self, profile: UserProfile) {
        self.state.send_replace(AuthState::Authenticated(profile));
    }

    pub fn signed_out(&self) {
        self.state.send_replace(AuthState::Anonymous);
        self.emit(SessionEvent::LoggedOut);
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is not an error.
        if self.events.send(event).is_err() {
            tracing::trace!("session event dropped, no subscribers");
        }
    }
}

#[async_trait::async_trait]
impl SessionExpiredNotifier for AuthStateHub {
    async fn session_expired(&self, reason: &str) {
        tracing::info!(reason, redirect_to = %self.login_redirect, "session expired");
        self.state.send_replace(AuthState::Anonymous);
        self.emit(SessionEvent::Expired {
            reason: reason.to_string(),
            redirect_to: self.login_redirect.clone(),
        });
    }
}
