use crate::domain_model::*;
use crate::domain_port::*;
use reqwest::header::AUTHORIZATION;
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

pub const FAKE_LOGIN_PATH: &str = "/auth/login";
pub const FAKE_REFRESH_PATH: &str = "/auth/refreshtoken";
pub const FAKE_PROFILE_PATH: &str = "/api/users/profile";

pub const DEMO_USERNAME: &str = "demo";
pub const DEMO_PASSWORD: &str = "demo-password";

struct FakeUser {
    profile: UserProfile,
    password: String,
}

#[derive(Default)]
struct BackendState {
    users: HashMap<String, FakeUser>,
    access_tokens: HashMap<String, String>,
    refresh_tokens: HashMap<String, String>,
    seen: Vec<(String, Option<String>)>,
}

#[derive(Deserialize)]
struct LoginBody {
    username: String,
    password: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshBody {
    refresh_token: String,
}

/// In-process stand-in for the storefront API. Refresh tokens rotate on every use,
/// so replaying an old refresh token is rejected like a real backend would.
pub struct FakeBackend {
    state: Mutex<BackendState>,
    refresh_calls: AtomicUsize,
    refresh_delay: Mutex<Duration>,
    reject_refresh: AtomicBool,
    deny_access: AtomicBool,
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeBackend {
    pub fn new() -> Self {
        let backend = Self {
            state: Mutex::new(BackendState::default()),
            refresh_calls: AtomicUsize::new(0),
            refresh_delay: Mutex::new(Duration::ZERO),
            reject_refresh: AtomicBool::new(false),
            deny_access: AtomicBool::new(false),
        };
        backend.add_user(DEMO_USERNAME, DEMO_PASSWORD);
        backend
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BackendState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn add_user(&self, username: &str, password: &str) -> UserProfile {
        let profile = UserProfile {
            id: UserId(uuid::Uuid::new_v4()),
            username: username.to_string(),
            email: Some(format!("{username}@storefront.test")),
            roles: vec!["buyer".to_string()],
        };
        self.lock().users.insert(
            username.to_string(),
            FakeUser {
                profile: profile.clone(),
                password: password.to_string(),
            },
        );
        profile
    }

    /// Signs `username` in without going through the login endpoint.
    pub fn issue_session(&self, username: &str) -> TokenPair {
        if !self.lock().users.contains_key(username) {
            self.add_user(username, "");
        }
        Self::issue_pair(&mut self.lock(), username)
    }

    fn issue_pair(state: &mut BackendState, username: &str) -> TokenPair {
        let access = format!("access-{}", uuid::Uuid::new_v4().simple());
        let refresh = format!("refresh-{}", uuid::Uuid::new_v4().simple());
        state
            .access_tokens
            .insert(access.clone(), username.to_string());
        state
            .refresh_tokens
            .insert(refresh.clone(), username.to_string());
        TokenPair {
            access_token: AccessToken(access),
            refresh_token: RefreshToken(refresh),
        }
    }

    /// Every access token issued so far now answers 401.
    pub fn expire_access_tokens(&self) {
        self.lock().access_tokens.clear();
    }

    pub fn revoke_refresh_tokens(&self) {
        self.lock().refresh_tokens.clear();
    }

    pub fn set_refresh_delay(&self, delay: Duration) {
        *self
            .refresh_delay
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = delay;
    }

    pub fn reject_refresh(&self, reject: bool) {
        self.reject_refresh.store(reject, Ordering::SeqCst);
    }

    /// Protected endpoints answer 401 even for freshly issued tokens.
    pub fn deny_access(&self, deny: bool) {
        self.deny_access.store(deny, Ordering::SeqCst);
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    /// `Authorization` header values received for `path`, in arrival order.
    pub fn authorizations_for(&self, path: &str) -> Vec<Option<String>> {
        self.lock()
            .seen
            .iter()
            .filter(|(seen_path, _)| seen_path == path)
            .map(|(_, auth)| auth.clone())
            .collect()
    }

    fn respond<T: serde::Serialize>(status: StatusCode, body: &T) -> Result<ApiResponse, TransportError> {
        ApiResponse::json(status, body).map_err(|e| TransportError::InvalidRequest(e.to_string()))
    }

    fn login(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        let body: LoginBody = serde_json::from_slice(request.body.as_deref().unwrap_or_default())
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;
        let mut state = self.lock();
        let valid = state
            .users
            .get(&body.username)
            .is_some_and(|user| user.password == body.password);
        if !valid {
            return Self::respond(
                StatusCode::UNAUTHORIZED,
                &Envelope::<()>::err(401, "invalid username or password"),
            );
        }
        let pair = Self::issue_pair(&mut state, &body.username);
        Self::respond(StatusCode::OK, &Envelope::ok(pair))
    }

    async fn refresh(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self
            .refresh_delay
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if self.reject_refresh.load(Ordering::SeqCst) {
            return Self::respond(
                StatusCode::OK,
                &Envelope::<()>::err(401, "refresh token expired"),
            );
        }

        let body: RefreshBody = serde_json::from_slice(request.body.as_deref().unwrap_or_default())
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;
        let mut state = self.lock();
        match state.refresh_tokens.remove(&body.refresh_token) {
            Some(username) => {
                let pair = Self::issue_pair(&mut state, &username);
                Self::respond(StatusCode::OK, &Envelope::ok(pair))
            }
            None => Self::respond(
                StatusCode::OK,
                &Envelope::<()>::err(401, "invalid refresh token"),
            ),
        }
    }

    fn protected(&self, request: &ApiRequest, path: &str) -> Result<ApiResponse, TransportError> {
        let state = self.lock();
        let username = request
            .authorization()
            .and_then(|value| value.strip_prefix("Bearer "))
            .and_then(|token| state.access_tokens.get(token))
            .filter(|_| !self.deny_access.load(Ordering::SeqCst));
        let Some(username) = username else {
            return Self::respond(
                StatusCode::UNAUTHORIZED,
                &Envelope::<()>::err(401, "unauthorized"),
            );
        };

        if request.method == Method::GET && path == FAKE_PROFILE_PATH {
            return match state.users.get(username) {
                Some(user) => Self::respond(StatusCode::OK, &Envelope::ok(&user.profile)),
                None => Self::respond(
                    StatusCode::NOT_FOUND,
                    &Envelope::<()>::err(404, "user not found"),
                ),
            };
        }

        Self::respond(
            StatusCode::OK,
            &Envelope::ok(json!({
                "method": request.method.as_str(),
                "path": path,
                "user": username,
            })),
        )
    }
}

#[async_trait::async_trait]
impl HttpTransport for FakeBackend {
    async fn execute(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        let path = request.path();
        let authorization = request.authorization().map(str::to_string);
        self.lock().seen.push((path.clone(), authorization));

        if request.method == Method::POST && path == FAKE_LOGIN_PATH {
            self.login(request)
        } else if request.method == Method::POST && path == FAKE_REFRESH_PATH {
            self.refresh(request).await
        } else {
            self.protected(request, &path)
        }
    }
}
