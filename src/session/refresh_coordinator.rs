use super::RefreshEndpoint;
use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use futures_util::future::BoxFuture;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const MAILBOX_CAP: usize = 256;

pub type TokenReply = Result<AccessToken, RefreshError>;

type Waiter = oneshot::Sender<TokenReply>;

enum Command {
    AcquireToken { respond_to: Waiter },
}

/// At most one refresh exists at a time; it lives inside `Refreshing`.
enum RefreshState {
    Idle,
    Refreshing { waiters: Vec<Waiter> },
}

/// Cloneable front of the coordinator task.
#[derive(Clone)]
pub struct RefreshHandle {
    tx: mpsc::Sender<Command>,
    phase: watch::Receiver<RefreshPhase>,
}

impl RefreshHandle {
    /// Joins the current refresh cycle, starting one if none is running, and waits
    /// for its outcome.
    pub async fn fresh_token(&self) -> TokenReply {
        let (respond_to, rx) = oneshot::channel();
        if self
            .tx
            .send(Command::AcquireToken { respond_to })
            .await
            .is_err()
        {
            return Err(RefreshError::Unavailable);
        }
        rx.await.unwrap_or(Err(RefreshError::Unavailable))
    }

    pub fn phase(&self) -> watch::Receiver<RefreshPhase> {
        self.phase.clone()
    }

    pub fn is_refreshing(&self) -> bool {
        *self.phase.borrow() == RefreshPhase::Refreshing
    }
}

struct RefreshContext {
    token_store: Arc<dyn TokenStore>,
    endpoint: RefreshEndpoint,
    notifier: Arc<dyn SessionExpiredNotifier>,
}

impl RefreshContext {
    async fn try_refresh(&self) -> Result<TokenPair, RefreshError> {
        let refresh_token = self
            .token_store
            .refresh_token()
            .await?
            .ok_or(RefreshError::MissingRefreshToken)?;

        let pair = self.endpoint.refresh(&refresh_token).await?;
        self.token_store.save_pair(&pair).await?;
        Ok(pair)
    }

    /// One full cycle. A failure clears the store and notifies exactly once.
    async fn run_cycle(self: Arc<Self>) -> Result<TokenPair, RefreshError> {
        let result = self.try_refresh().await;
        match &result {
            Ok(pair) => {
                tracing::info!(access_token = ?pair.access_token, "token refresh succeeded");
            }
            Err(e) => {
                tracing::warn!(error = %e, "token refresh failed, ending session");
                if let Err(store_error) = self.token_store.clear().await {
                    tracing::error!(error = %store_error, "failed to clear token store");
                }
                self.notifier.session_expired(&e.to_string()).await;
            }
        }
        result
    }
}

pub struct RefreshCoordinator {
    context: Arc<RefreshContext>,
}

impl RefreshCoordinator {
    pub fn new(
        token_store: Arc<dyn TokenStore>,
        endpoint: RefreshEndpoint,
        notifier: Arc<dyn SessionExpiredNotifier>,
    ) -> Self {
        Self {
            context: Arc::new(RefreshContext {
                token_store,
                endpoint,
                notifier,
            }),
        }
    }

    /// Starts the coordinator task. It stops taking requests on `cancel` or once every
    /// handle is dropped. A refresh already in flight still runs to completion so a
    /// rotated refresh token is saved before the task exits.
    pub fn spawn(self, cancel: CancellationToken) -> (RefreshHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(MAILBOX_CAP);
        let (phase_tx, phase_rx) = watch::channel(RefreshPhase::Idle);
        let handle = tokio::spawn(coordinator_loop(self.context, rx, phase_tx, cancel));
        (
            RefreshHandle {
                tx,
                phase: phase_rx,
            },
            handle,
        )
    }
}

type RefreshFuture = BoxFuture<'static, Result<TokenPair, RefreshError>>;

async fn settle(in_flight: &mut Option<RefreshFuture>) -> Result<TokenPair, RefreshError> {
    match in_flight {
        Some(refresh) => refresh.await,
        None => std::future::pending().await,
    }
}

async fn coordinator_loop(
    context: Arc<RefreshContext>,
    mut rx: mpsc::Receiver<Command>,
    phase_tx: watch::Sender<RefreshPhase>,
    cancel: CancellationToken,
) {
    tracing::debug!(endpoint = context.endpoint.url(), "refresh coordinator starting");

    let mut state = RefreshState::Idle;
    let mut in_flight: Option<RefreshFuture> = None;
    let mut closed = false;

    loop {
        if closed && in_flight.is_none() {
            break;
        }

        tokio::select! {
            biased;

            _ = cancel.cancelled(), if !closed => {
                tracing::info!(in_flight = in_flight.is_some(), "refresh coordinator shut down by cancel");
                closed = true;
            }

            outcome = settle(&mut in_flight) => {
                in_flight = None;
                let waiters = match std::mem::replace(&mut state, RefreshState::Idle) {
                    RefreshState::Refreshing { waiters } => waiters,
                    RefreshState::Idle => Vec::new(),
                };
                let reply = outcome.map(|pair| pair.access_token);
                tracing::debug!(waiters = waiters.len(), ok = reply.is_ok(), "draining refresh waiters");
                for waiter in waiters {
                    // A dropped receiver only means that caller went away.
                    let _ = waiter.send(reply.clone());
                }
                phase_tx.send_replace(RefreshPhase::Idle);
            }

            command = rx.recv(), if !closed => {
                match command {
                    Some(Command::AcquireToken { respond_to }) => match &mut state {
                        RefreshState::Idle => {
                            tracing::info!("access token rejected, starting refresh");
                            phase_tx.send_replace(RefreshPhase::Refreshing);
                            in_flight = Some(Box::pin(context.clone().run_cycle()));
                            state = RefreshState::Refreshing {
                                waiters: vec![respond_to],
                            };
                        }
                        RefreshState::Refreshing { waiters } => {
                            waiters.push(respond_to);
                            tracing::debug!(queued = waiters.len(), "refresh in flight, request queued");
                        }
                    },
                    None => closed = true,
                }
            }
        }
    }

    if let RefreshState::Refreshing { waiters } = state {
        for waiter in waiters {
            let _ = waiter.send(Err(RefreshError::Unavailable));
        }
    }
    phase_tx.send_replace(RefreshPhase::Idle);
    tracing::debug!("refresh coordinator stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::{FakeBackend, MemoryTokenStore};
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct RecordingNotifier {
        reasons: Mutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl SessionExpiredNotifier for RecordingNotifier {
        async fn session_expired(&self, reason: &str) {
            self.reasons.lock().unwrap().push(reason.to_string());
        }
    }

    async fn setup(
        backend: Arc<FakeBackend>,
        store: Arc<MemoryTokenStore>,
    ) -> (RefreshHandle, Arc<RecordingNotifier>, CancellationToken) {
        let notifier = Arc::new(RecordingNotifier::default());
        let endpoint = RefreshEndpoint::new(backend, "http://fake/auth/refreshtoken");
        let coordinator = RefreshCoordinator::new(store, endpoint, notifier.clone());
        let cancel = CancellationToken::new();
        let (handle, _join) = coordinator.spawn(cancel.clone());
        (handle, notifier, cancel)
    }

    #[tokio::test]
    async fn concurrent_waiters_share_one_refresh() {
        let backend = Arc::new(FakeBackend::new());
        let pair = backend.issue_session("ann");
        backend.set_refresh_delay(Duration::from_millis(50));
        let store = Arc::new(MemoryTokenStore::with_pair(pair));
        let (handle, notifier, _cancel) = setup(backend.clone(), store.clone()).await;

        let replies = futures_util::future::join_all((0..5).map(|_| handle.fresh_token())).await;

        assert_eq!(backend.refresh_calls(), 1);
        let first = replies[0].as_ref().unwrap().clone();
        for reply in &replies {
            assert_eq!(reply.as_ref().unwrap(), &first);
        }
        assert_eq!(store.access_token().await.unwrap(), Some(first));
        assert!(notifier.reasons.lock().unwrap().is_empty());
        assert!(!handle.is_refreshing());
    }

    #[tokio::test]
    async fn phase_is_refreshing_only_while_cycle_runs() {
        let backend = Arc::new(FakeBackend::new());
        let pair = backend.issue_session("ann");
        backend.set_refresh_delay(Duration::from_millis(50));
        let store = Arc::new(MemoryTokenStore::with_pair(pair));
        let (handle, _notifier, _cancel) = setup(backend, store).await;

        assert!(!handle.is_refreshing());
        let mut phase = handle.phase();
        let waiter = tokio::spawn({
            let handle = handle.clone();
            async move { handle.fresh_token().await }
        });

        phase.changed().await.unwrap();
        assert_eq!(*phase.borrow_and_update(), RefreshPhase::Refreshing);

        waiter.await.unwrap().unwrap();
        assert!(!handle.is_refreshing());
    }

    #[tokio::test]
    async fn failed_refresh_rejects_all_waiters_and_clears_once() {
        let backend = Arc::new(FakeBackend::new());
        let pair = backend.issue_session("ann");
        backend.set_refresh_delay(Duration::from_millis(30));
        backend.reject_refresh(true);
        let store = Arc::new(MemoryTokenStore::with_pair(pair));
        let (handle, notifier, _cancel) = setup(backend.clone(), store.clone()).await;

        let replies = futures_util::future::join_all((0..3).map(|_| handle.fresh_token())).await;

        assert_eq!(backend.refresh_calls(), 1);
        for reply in replies {
            assert!(matches!(reply, Err(RefreshError::Rejected(_))));
        }
        assert_eq!(store.clear_count(), 1);
        assert_eq!(store.refresh_token().await.unwrap(), None);
        assert_eq!(notifier.reasons.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missing_refresh_token_fails_without_calling_endpoint() {
        let backend = Arc::new(FakeBackend::new());
        let store = Arc::new(MemoryTokenStore::new());
        let (handle, notifier, _cancel) = setup(backend.clone(), store.clone()).await;

        let reply = handle.fresh_token().await;

        assert!(matches!(reply, Err(RefreshError::MissingRefreshToken)));
        assert_eq!(backend.refresh_calls(), 0);
        assert_eq!(store.clear_count(), 1);
        assert_eq!(notifier.reasons.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn cancelled_coordinator_answers_unavailable() {
        let backend = Arc::new(FakeBackend::new());
        let store = Arc::new(MemoryTokenStore::new());
        let notifier = Arc::new(RecordingNotifier::default());
        let endpoint = RefreshEndpoint::new(backend, "http://fake/auth/refreshtoken");
        let cancel = CancellationToken::new();
        let (handle, join) = RefreshCoordinator::new(store, endpoint, notifier).spawn(cancel.clone());

        cancel.cancel();
        join.await.unwrap();

        assert!(matches!(
            handle.fresh_token().await,
            Err(RefreshError::Unavailable)
        ));
    }

    #[tokio::test]
    async fn cancel_lets_the_refresh_in_flight_finish() {
        let backend = Arc::new(FakeBackend::new());
        let pair = backend.issue_session("ann");
        backend.set_refresh_delay(Duration::from_millis(50));
        let store = Arc::new(MemoryTokenStore::with_pair(pair.clone()));
        let notifier = Arc::new(RecordingNotifier::default());
        let endpoint = RefreshEndpoint::new(backend.clone(), "http://fake/auth/refreshtoken");
        let cancel = CancellationToken::new();
        let (handle, join) =
            RefreshCoordinator::new(store.clone(), endpoint, notifier).spawn(cancel.clone());

        let waiter = tokio::spawn({
            let handle = handle.clone();
            async move { handle.fresh_token().await }
        });
        let mut phase = handle.phase();
        phase.changed().await.unwrap();
        cancel.cancel();

        let token = waiter.await.unwrap().unwrap();
        join.await.unwrap();

        assert_eq!(backend.refresh_calls(), 1);
        assert_eq!(store.access_token().await.unwrap(), Some(token));
        assert_ne!(store.refresh_token().await.unwrap(), Some(pair.refresh_token));
        assert!(matches!(
            handle.fresh_token().await,
            Err(RefreshError::Unavailable)
        ));
    }

    #[tokio::test]
    async fn next_cycle_starts_fresh_after_previous_settles() {
        let backend = Arc::new(FakeBackend::new());
        let pair = backend.issue_session("ann");
        let store = Arc::new(MemoryTokenStore::with_pair(pair));
        let (handle, _notifier, _cancel) = setup(backend.clone(), store).await;

        let first = handle.fresh_token().await.unwrap();
        let second = handle.fresh_token().await.unwrap();

        assert_eq!(backend.refresh_calls(), 2);
        assert_ne!(first, second);
    }
}
