use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_port::*;
use crate::infra::*;
use crate::logger::*;
use crate::session::*;
use crate::settings::Settings;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Composition root: wires transport, token store, refresh coordinator, session
/// manager and auth service from settings.
pub struct StorefrontClient {
    pub auth_service: Arc<dyn AuthService>,
    pub session: Arc<SessionManager>,
    pub auth_state: Arc<AuthStateHub>,
    pub token_store: Arc<dyn TokenStore>,
    coordinator_handle: Mutex<Option<JoinHandle<()>>>,
    cancel: CancellationToken,
}

impl StorefrontClient {
    pub fn try_new(settings: &Settings) -> anyhow::Result<Self> {
        let transport: Arc<dyn HttpTransport> = match settings.api.backend.as_str() {
            "fake" => Arc::new(FakeBackend::new()),
            "real" => Arc::new(ReqwestTransport::new(Duration::from_secs(
                settings.api.timeout_secs,
            ))?),
            other => return Err(anyhow::anyhow!("Unknown api backend: {}", other)),
        };

        let token_store: Arc<dyn TokenStore> = match settings.token_store.backend.as_str() {
            "memory" => Arc::new(MemoryTokenStore::new()),
            "file" => {
                let path = settings
                    .token_store
                    .path
                    .as_deref()
                    .ok_or_else(|| anyhow::anyhow!("token_store.path is required for the file backend"))?;
                Arc::new(FileTokenStore::new(path))
            }
            other => return Err(anyhow::anyhow!("Unknown token store backend: {}", other)),
        };

        Ok(Self::with_parts(settings, transport, token_store))
    }

    /// Builds the client around an existing transport and store.
    pub fn with_parts(
        settings: &Settings,
        transport: Arc<dyn HttpTransport>,
        token_store: Arc<dyn TokenStore>,
    ) -> Self {
        let api = &settings.api;
        let auth_state = Arc::new(AuthStateHub::new(api.login_redirect.clone()));

        let refresh_url = crate::session::join_url(&api.base_url, &api.refresh_path);
        let endpoint = RefreshEndpoint::new(transport.clone(), refresh_url);
        let notifier: Arc<dyn SessionExpiredNotifier> = auth_state.clone();
        let cancel = CancellationToken::new();
        let (refresh, coordinator_handle) =
            RefreshCoordinator::new(token_store.clone(), endpoint, notifier).spawn(cancel.clone());

        let session = Arc::new(SessionManager::new(
            transport.clone(),
            token_store.clone(),
            refresh,
            api.base_url.clone(),
            api.refresh_path.clone(),
        ));

        let auth_service: Arc<dyn AuthService> = Arc::new(RealAuthService::new(
            transport,
            session.clone(),
            token_store.clone(),
            auth_state.clone(),
            api.login_path.clone(),
            api.profile_path.clone(),
        ));

        info!(base_url = %api.base_url, backend = %api.backend, "storefront client ready");

        Self {
            auth_service,
            session,
            auth_state,
            token_store,
            coordinator_handle: Mutex::new(Some(coordinator_handle)),
            cancel,
        }
    }

    pub async fn shutdown(&self) {
        info!("storefront client shutting down...");
        self.cancel.cancel();

        let handle = self
            .coordinator_handle
            .lock()
            .ok()
            .and_then(|mut lock| lock.take());
        if let Some(handle) = handle {
            let r = handle.await;
            info!("refresh coordinator stopped: {:?}", r);
        }
    }
}
