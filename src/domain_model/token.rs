use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessToken(pub String);

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RefreshToken(pub String);

// Tokens end up in log lines through `?` formatting; only a prefix is ever shown.
fn redacted(token: &str, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let prefix: String = token.chars().take(6).collect();
    write!(f, "{prefix}…")
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(")?;
        redacted(&self.0, f)?;
        f.write_str(")")
    }
}

impl fmt::Debug for RefreshToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RefreshToken(")?;
        redacted(&self.0, f)?;
        f.write_str(")")
    }
}

impl AccessToken {
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

/// Access/refresh pair as returned by the login and refresh endpoints.
/// Extra fields in the payload (user info, expiry hints) are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: AccessToken,
    pub refresh_token: RefreshToken,
}

impl TokenPair {
    pub fn is_complete(&self) -> bool {
        !self.access_token.0.is_empty() && !self.refresh_token.0.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshPhase {
    Idle,
    Refreshing,
}
