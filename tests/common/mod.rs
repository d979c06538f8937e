#![allow(dead_code)]

use std::sync::Arc;
use storefront_session::client::StorefrontClient;
use storefront_session::domain_port::*;
use storefront_session::settings::*;

pub fn settings(base_url: &str) -> Settings {
    Settings {
        api: Api {
            backend: "fake".to_string(),
            base_url: base_url.to_string(),
            login_path: "/auth/login".to_string(),
            refresh_path: "/auth/refreshtoken".to_string(),
            profile_path: "/api/users/profile".to_string(),
            timeout_secs: 5,
            login_redirect: "/login".to_string(),
        },
        token_store: TokenStoreSettings {
            backend: "memory".to_string(),
            path: None,
        },
        log: Log {
            filter: "debug".to_string(),
        },
    }
}

pub fn client(
    base_url: &str,
    transport: Arc<dyn HttpTransport>,
    token_store: Arc<dyn TokenStore>,
) -> StorefrontClient {
    StorefrontClient::with_parts(&settings(base_url), transport, token_store)
}
