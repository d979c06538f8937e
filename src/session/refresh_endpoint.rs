use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use serde::Serialize;
use std::sync::Arc;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshBody<'a> {
    refresh_token: &'a str,
}

/// Direct call to the refresh endpoint. Goes straight to the transport so a 401
/// here can never re-enter the session manager.
pub struct RefreshEndpoint {
    transport: Arc<dyn HttpTransport>,
    url: String,
}

impl RefreshEndpoint {
    pub fn new(transport: Arc<dyn HttpTransport>, url: impl Into<String>) -> Self {
        Self {
            transport,
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn refresh(&self, refresh_token: &RefreshToken) -> Result<TokenPair, RefreshError> {
        let request = ApiRequest::post(&self.url)
            .json(&RefreshBody {
                refresh_token: &refresh_token.0,
            })
            .map_err(|e| RefreshError::Rejected(format!("cannot encode refresh body: {e}")))?;

        let response = self.transport.execute(&request).await?;

        let envelope = match response.decode::<Envelope<TokenPair>>() {
            Ok(envelope) => envelope,
            Err(e) => {
                return Err(RefreshError::Rejected(if response.is_success() {
                    format!("malformed refresh response: {e}")
                } else {
                    format!("refresh endpoint returned status {}", response.status)
                }));
            }
        };

        if !response.is_success() || !envelope.is_success() {
            let message = envelope.message.unwrap_or_else(|| {
                format!(
                    "refresh failed with status {} and code {}",
                    response.status.as_u16(),
                    envelope.code
                )
            });
            return Err(RefreshError::Rejected(message));
        }

        match envelope.data {
            Some(pair) if pair.is_complete() => Ok(pair),
            Some(_) => Err(RefreshError::Rejected(
                "refresh response carried an empty token".to_string(),
            )),
            None => Err(RefreshError::Rejected(
                "refresh response carried no data".to_string(),
            )),
        }
    }
}
