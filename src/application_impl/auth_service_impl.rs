use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use crate::session::{AuthStateHub, SessionManager};
use std::sync::Arc;

pub struct RealAuthService {
    transport: Arc<dyn HttpTransport>,
    session: Arc<SessionManager>,
    token_store: Arc<dyn TokenStore>,
    auth_state: Arc<AuthStateHub>,
    login_path: String,
    profile_path: String,
}

impl RealAuthService {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        session: Arc<SessionManager>,
        token_store: Arc<dyn TokenStore>,
        auth_state: Arc<AuthStateHub>,
        login_path: impl Into<String>,
        profile_path: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            session,
            token_store,
            auth_state,
            login_path: login_path.into(),
            profile_path: profile_path.into(),
        }
    }

    async fn load_profile(&self) -> Result<UserProfile, AuthError> {
        let profile: UserProfile = self.session.get_json(&self.profile_path).await?;
        Ok(profile)
    }
}

#[async_trait::async_trait]
impl AuthService for RealAuthService {
    async fn login(&self, credentials: Credentials) -> Result<UserProfile, AuthError> {
        // Login goes straight to the transport: a 401 here means bad credentials,
        // not an expired session.
        let request = ApiRequest::post(self.session.url(&self.login_path))
            .json(&credentials)
            .map_err(ApiError::from)?;
        let response = self.transport.execute(&request).await?;

        let envelope: Envelope<TokenPair> = response.decode().map_err(|e| {
            AuthError::InvalidResponse(format!("status {}: {e}", response.status))
        })?;
        if !response.is_success() || !envelope.is_success() {
            let message = envelope
                .message
                .unwrap_or_else(|| format!("login failed with code {}", envelope.code));
            tracing::info!(username = %credentials.username, %message, "login rejected");
            return Err(AuthError::InvalidCredentials(message));
        }
        let pair = envelope
            .data
            .filter(TokenPair::is_complete)
            .ok_or_else(|| AuthError::InvalidResponse("login response carried no token pair".to_string()))?;

        self.token_store.save_pair(&pair).await?;
        let profile = self.load_profile().await?;
        self.auth_state.signed_in(profile.clone());
        tracing::info!(username = %profile.username, "logged in");
        Ok(profile)
    }

    async fn logout(&self) -> Result<(), AuthError> {
        self.token_store.clear().await?;
        self.auth_state.signed_out();
        tracing::info!("logged out");
        Ok(())
    }

    async fn restore_session(&self) -> Result<UserProfile, AuthError> {
        let has_access = self.token_store.access_token().await?.is_some();
        let has_refresh = self.token_store.refresh_token().await?.is_some();
        if !has_access && !has_refresh {
            return Err(AuthError::NoSession);
        }

        let profile = self.load_profile().await?;
        self.auth_state.signed_in(profile.clone());
        tracing::info!(username = %profile.username, "session restored");
        Ok(profile)
    }

    async fn fetch_profile(&self) -> Result<UserProfile, AuthError> {
        let profile = self.load_profile().await?;
        self.auth_state.profile_loaded(profile.clone());
        Ok(profile)
    }

    fn current_state(&self) -> AuthState {
        self.auth_state.current()
    }
}
