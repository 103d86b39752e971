use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::extract::PrivateCookieJar;

use super::cookies::JarStore;
use super::state::AppState;
use crate::session::Session;

/// Credential session built from the request's encrypted cookies.
///
/// Handlers hand the jar back with [`into_jar`](CookieSession::into_jar) so
/// token writes and deletions made during the request reach the browser.
///
/// ```rust,ignore
/// async fn handler(State(state): State<AppState>, session: CookieSession) -> impl IntoResponse {
///     let result = load_playlists(&state.api, &session).await.map(Json);
///     (session.into_jar(), result)
/// }
/// ```
pub(super) struct CookieSession(Session<JarStore>);

impl CookieSession {
    pub(super) fn into_jar(self) -> PrivateCookieJar {
        self.0.into_store().into_jar()
    }
}

impl std::ops::Deref for CookieSession {
    type Target = Session<JarStore>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromRequestParts<AppState> for CookieSession {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = PrivateCookieJar::from_request_parts(parts, state).await?;
        Ok(Self(Session::new(
            JarStore::new(jar),
            state.settings.secure_cookies,
        )))
    }
}
