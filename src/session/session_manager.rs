use super::RefreshHandle;
use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use nanoid::nanoid;
use reqwest::StatusCode;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::Instrument;

/// Authenticated front door for every API call.
///
/// Requests get the stored access token attached. A 401 hands the request to the
/// refresh coordinator; once a new token arrives the request is replayed exactly
/// once. Callers only ever see the 401 when the session cannot be recovered.
pub struct SessionManager {
    transport: Arc<dyn HttpTransport>,
    token_store: Arc<dyn TokenStore>,
    refresh: RefreshHandle,
    base_url: String,
    refresh_path: String,
}

impl SessionManager {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        token_store: Arc<dyn TokenStore>,
        refresh: RefreshHandle,
        base_url: impl Into<String>,
        refresh_path: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            token_store,
            refresh,
            base_url: base_url.into(),
            refresh_path: refresh_path.into(),
        }
    }

    /// Absolute URL for an API path; absolute URLs pass through unchanged.
    pub fn url(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }

    pub fn refresh_phase(&self) -> watch::Receiver<RefreshPhase> {
        self.refresh.phase()
    }

    pub fn is_refreshing(&self) -> bool {
        self.refresh.is_refreshing()
    }

    pub async fn attach_auth(&self, request: &mut ApiRequest) {
        match self.token_store.access_token().await {
            Ok(Some(token)) => {
                if !request.set_bearer(&token.0) {
                    tracing::warn!("stored access token is not a valid header value");
                }
            }
            Ok(None) => tracing::trace!("no access token, sending unauthenticated"),
            Err(e) => tracing::warn!(error = %e, "token store read failed, sending unauthenticated"),
        }
    }

    pub async fn send(&self, mut request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let span = tracing::debug_span!(
            "api_request",
            id = %nanoid!(8),
            method = %request.method,
            path = %request.path(),
        );

        async move {
            self.attach_auth(&mut request).await;
            match self.dispatch(request).await {
                Ok(response) => Ok(response),
                Err(error) => self.handle_response_error(error).await,
            }
        }
        .instrument(span)
        .await
    }

    /// Recovers from an expired access token; every other error is returned as is.
    pub async fn handle_response_error(&self, error: ApiError) -> Result<ApiResponse, ApiError> {
        if !self.is_recoverable(&error) {
            tracing::trace!(error = %error, "passing error through");
            return Err(error);
        }

        let (mut request, response) = match error {
            ApiError::Status {
                request: Some(request),
                response,
            } => (request, response),
            other => return Err(other),
        };
        request.retried = true;

        match self.refresh.fresh_token().await {
            Ok(token) => {
                tracing::debug!(url = %request.url, "replaying request with refreshed token");
                if !request.set_bearer(&token.0) {
                    tracing::warn!("refreshed access token is not a valid header value");
                }
                self.dispatch(*request).await
            }
            Err(RefreshError::MissingRefreshToken) => Err(ApiError::Status {
                request: Some(request),
                response,
            }),
            Err(e) => Err(ApiError::SessionExpired(e)),
        }
    }

    fn is_recoverable(&self, error: &ApiError) -> bool {
        match error {
            ApiError::Status {
                request: Some(request),
                response,
            } => {
                response.status == StatusCode::UNAUTHORIZED
                    && !request.retried
                    && !self.is_refresh_endpoint(request)
            }
            _ => false,
        }
    }

    fn is_refresh_endpoint(&self, request: &ApiRequest) -> bool {
        let refresh_path = self.refresh_path.trim_end_matches('/');
        !refresh_path.is_empty() && request.path().trim_end_matches('/').ends_with(refresh_path)
    }

    async fn dispatch(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let response = self.transport.execute(&request).await?;
        if response.is_success() {
            Ok(response)
        } else {
            Err(ApiError::Status {
                request: Some(Box::new(request)),
                response,
            })
        }
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.send(ApiRequest::get(self.url(path))).await?;
        decode_envelope(&response)
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = ApiRequest::post(self.url(path)).json(body)?;
        let response = self.send(request).await?;
        decode_envelope(&response)
    }

    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.send(ApiRequest::delete(self.url(path))).await?;
        Ok(())
    }
}

pub(crate) fn join_url(base_url: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    let base = base_url.trim_end_matches('/');
    if path.starts_with('/') {
        format!("{base}{path}")
    } else {
        format!("{base}/{path}")
    }
}

/// Unwraps `{ code, data, message }`; a non-200 code becomes `ApiError::Backend`.
pub(crate) fn decode_envelope<T: DeserializeOwned>(response: &ApiResponse) -> Result<T, ApiError> {
    let envelope: Envelope<T> = response.decode()?;
    if !envelope.is_success() {
        return Err(ApiError::Backend {
            code: envelope.code,
            message: envelope.message.unwrap_or_default(),
        });
    }
    envelope
        .data
        .ok_or_else(|| ApiError::Decode("response carried no data".to_string()))
}
