use url::Url;

use crate::error::Error;
use crate::oauth::AuthClient;
use crate::session::{CredentialStore, Session};

/// Start an authorization: store a fresh anti-forgery state and return the
/// Spotify authorization URL to redirect to.
///
/// # Errors
///
/// Returns [`Error::Configuration`] if the client id or redirect URI is
/// missing; nothing is stored in that case.
pub async fn begin_authorization<S: CredentialStore>(
    client: &AuthClient,
    session: &Session<S>,
) -> Result<Url, Error> {
    let request = client.authorization_url()?;
    session.store_auth_state(request.state).await;
    Ok(request.url)
}

/// Query parameters Spotify appends to the redirect URI.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    /// Set instead of `code` when the user denies access.
    pub error: Option<String>,
}

/// Terminal result of a callback, rendered as a redirect to the landing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    Connected,
    Failed(String),
}

impl CallbackOutcome {
    fn failed(reason: impl Into<String>) -> Self {
        Self::Failed(reason.into())
    }

    /// Failure marker, e.g. `state_mismatch`.
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Connected => None,
            Self::Failed(reason) => Some(reason),
        }
    }

    /// Landing location carrying the outcome marker in its query.
    #[must_use]
    pub fn redirect_location(&self, landing: &str) -> String {
        match self {
            Self::Connected => format!("{landing}?spotify_connected=true"),
            Self::Failed(reason) => {
                format!("{landing}?error={}", urlencoding::encode(reason))
            }
        }
    }
}

/// Complete an authorization: validate the anti-forgery state, exchange the
/// code, and persist the resulting tokens.
///
/// The stored state is deleted on every invocation, before it is compared.
/// Token cookies are only written on a successful exchange.
pub async fn handle_callback<S: CredentialStore>(
    client: &AuthClient,
    session: &Session<S>,
    params: CallbackParams,
) -> CallbackOutcome {
    let stored = session.take_auth_state().await;

    if let Err(e) = verify_state(params.state.as_deref(), stored.as_deref()) {
        tracing::warn!(
            received = params.state.is_some(),
            stored = stored.is_some(),
            "OAuth state mismatch"
        );
        return CallbackOutcome::from(&e);
    }

    if let Err(e) = client.config().client_credentials() {
        tracing::error!(error = %e, "Cannot complete Spotify authorization");
        return CallbackOutcome::from(&e);
    }

    if let Some(error) = params.error {
        tracing::warn!(error = %error, "Spotify authorization denied");
        return CallbackOutcome::Failed(error);
    }

    let Some(code) = params.code else {
        return CallbackOutcome::failed("missing_code");
    };

    match client.exchange_code(&code).await {
        Ok(token) => {
            session.store_tokens(&token).await;
            tracing::info!(expires_in = ?token.expires_in, "Spotify account connected");
            CallbackOutcome::Connected
        }
        Err(e) => {
            tracing::error!(error = %e, "Token exchange failed");
            CallbackOutcome::from(&e)
        }
    }
}

fn verify_state(received: Option<&str>, expected: Option<&str>) -> Result<(), Error> {
    match (received, expected) {
        (Some(received), Some(expected)) if received == expected => Ok(()),
        _ => Err(Error::StateMismatch),
    }
}

impl From<&Error> for CallbackOutcome {
    fn from(error: &Error) -> Self {
        Self::failed(error.callback_marker())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oauth::OAuthConfig;
    use crate::session::{CredentialKey, MemoryStore};

    fn configured_client() -> AuthClient {
        AuthClient::new(
            OAuthConfig::new()
                .with_client("id", "secret")
                .with_redirect_uri("http://127.0.0.1:9/cb".parse().unwrap())
                .with_token_url("http://127.0.0.1:9/api/token".parse().unwrap()),
        )
    }

    fn params(code: Option<&str>, state: Option<&str>) -> CallbackParams {
        CallbackParams {
            code: code.map(str::to_string),
            state: state.map(str::to_string),
            error: None,
        }
    }

    #[tokio::test]
    async fn begin_stores_state_matching_url() {
        let client = configured_client();
        let session = Session::new(MemoryStore::new(), true);

        let url = begin_authorization(&client, &session).await.unwrap();
        let store = session.into_store();

        let writes = store.writes_to(CredentialKey::AuthState);
        assert_eq!(writes.len(), 1);
        assert!(writes[0].policy.http_only);
        assert!(writes[0].policy.secure);
        let state = url
            .query_pairs()
            .find(|(k, _)| k == "state")
            .map(|(_, v)| v.into_owned());
        assert_eq!(state.as_deref(), Some(writes[0].value.as_str()));
    }

    #[tokio::test]
    async fn begin_without_config_stores_nothing() {
        let client = AuthClient::new(OAuthConfig::new());
        let session = Session::new(MemoryStore::new(), false);

        let err = begin_authorization(&client, &session).await.unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        assert!(session.into_store().writes().is_empty());
    }

    #[tokio::test]
    async fn mismatched_state_deletes_state_once_and_writes_no_tokens() {
        let client = configured_client();
        let store = MemoryStore::new().with(CredentialKey::AuthState, "expected");
        let session = Session::new(store, false);

        let outcome = handle_callback(&client, &session, params(Some("c"), Some("forged"))).await;
        assert_eq!(outcome.reason(), Some("state_mismatch"));

        let store = session.into_store();
        assert_eq!(store.delete_count(CredentialKey::AuthState), 1);
        assert!(store.writes().is_empty());
    }

    #[tokio::test]
    async fn missing_state_is_mismatch() {
        let client = configured_client();
        let session = Session::new(MemoryStore::new(), false);

        let outcome = handle_callback(&client, &session, params(Some("c"), None)).await;
        assert_eq!(outcome, CallbackOutcome::Failed("state_mismatch".into()));
        assert_eq!(
            session.into_store().delete_count(CredentialKey::AuthState),
            1
        );
    }

    #[tokio::test]
    async fn matching_state_without_secret_is_missing_credentials() {
        let client = AuthClient::new(
            OAuthConfig::new()
                .with_client_id("id")
                .with_redirect_uri("http://127.0.0.1:9/cb".parse().unwrap()),
        );
        let store = MemoryStore::new().with(CredentialKey::AuthState, "s");
        let session = Session::new(store, false);

        let outcome = handle_callback(&client, &session, params(Some("c"), Some("s"))).await;
        assert_eq!(outcome.reason(), Some("missing_credentials"));

        let store = session.into_store();
        assert_eq!(store.delete_count(CredentialKey::AuthState), 1);
        assert!(store.writes().is_empty());
    }

    #[tokio::test]
    async fn upstream_denial_is_forwarded() {
        let client = configured_client();
        let store = MemoryStore::new().with(CredentialKey::AuthState, "s");
        let session = Session::new(store, false);

        let mut p = params(None, Some("s"));
        p.error = Some("access_denied".into());
        let outcome = handle_callback(&client, &session, p).await;
        assert_eq!(outcome.reason(), Some("access_denied"));
    }

    #[tokio::test]
    async fn unreachable_token_endpoint_is_network_error() {
        let client = configured_client();
        let store = MemoryStore::new().with(CredentialKey::AuthState, "s");
        let session = Session::new(store, false);

        let outcome = handle_callback(&client, &session, params(Some("c"), Some("s"))).await;
        assert_eq!(outcome.reason(), Some("network_error"));
        assert!(session.into_store().writes().is_empty());
    }

    #[test]
    fn state_must_be_present_on_both_sides() {
        assert!(verify_state(Some("s"), Some("s")).is_ok());
        assert!(matches!(
            verify_state(Some("s"), Some("t")),
            Err(Error::StateMismatch)
        ));
        assert!(matches!(verify_state(None, Some("s")), Err(Error::StateMismatch)));
        assert!(matches!(verify_state(Some("s"), None), Err(Error::StateMismatch)));
        assert!(matches!(verify_state(None, None), Err(Error::StateMismatch)));
    }

    #[test]
    fn redirect_locations() {
        assert_eq!(
            CallbackOutcome::Connected.redirect_location("/"),
            "/?spotify_connected=true"
        );
        assert_eq!(
            CallbackOutcome::Failed("invalid grant".into()).redirect_location("/"),
            "/?error=invalid%20grant"
        );
    }
}
