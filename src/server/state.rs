use std::sync::Arc;

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;

use super::config::AppSettings;
use crate::api::ApiClient;
use crate::oauth::AuthClient;

/// Shared state for dashboard route handlers.
#[derive(Clone)]
pub(super) struct AppState {
    pub(super) auth: Arc<AuthClient>,
    pub(super) api: Arc<ApiClient>,
    pub(super) settings: AppSettings,
}

// PrivateCookieJar requires Key to be extractable from state
impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.settings.cookie_key.clone()
    }
}
