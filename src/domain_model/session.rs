use super::UserProfile;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AuthState {
    #[default]
    Anonymous,
    Authenticated(UserProfile),
}

impl AuthState {
    pub fn profile(&self) -> Option<&UserProfile> {
        match self {
            AuthState::Anonymous => None,
            AuthState::Authenticated(profile) => Some(profile),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthState::Authenticated(_))
    }
}

/// Broadcast to UI subscribers; `Expired` is their cue to navigate to `redirect_to`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    LoggedIn { username: String },
    LoggedOut,
    Expired { reason: String, redirect_to: String },
}
