use crate::error::Error;
use crate::oauth::AuthClient;
use crate::session::{CredentialKey, CredentialStore, Session};
use crate::types::{AccessToken, RefreshToken};

/// Resolves and refreshes the access token held in a [`Session`].
///
/// Expiry is handled reactively: a stored access token is returned as-is and
/// staleness is detected by the caller through a 401. The cookie's `Max-Age`
/// makes the browser drop the token once it expires, which lands on the
/// refresh path below.
pub struct TokenManager<'a, S> {
    client: &'a AuthClient,
    session: &'a Session<S>,
}

impl<'a, S: CredentialStore> TokenManager<'a, S> {
    #[must_use]
    pub fn new(client: &'a AuthClient, session: &'a Session<S>) -> Self {
        Self { client, session }
    }

    /// Access token for an outbound call, refreshing if only a refresh token is stored.
    ///
    /// `Ok(None)` means no token is available and re-authorization is needed.
    /// If neither token is stored no network call is made.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Network`] if the token endpoint is unreachable (stored
    /// tokens are kept), or [`Error::Configuration`] if client credentials are missing.
    pub async fn resolve_access_token(&self) -> Result<Option<AccessToken>, Error> {
        let (access, refresh) = self.session.tokens().await;

        if let Some(access) = access {
            return Ok(Some(access));
        }
        let Some(refresh) = refresh else {
            return Ok(None);
        };

        match self.refresh_with(&refresh).await {
            Ok(token) => Ok(Some(token)),
            Err(Error::TokenExchange { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Exchange the stored refresh token for a new access token.
    ///
    /// Always calls the token endpoint; the stored access token is never reused.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotAuthenticated`] if no refresh token is stored,
    /// [`Error::TokenExchange`] if the token endpoint rejects it (both tokens
    /// are cleared), or [`Error::Network`] / [`Error::Configuration`].
    pub async fn refresh(&self) -> Result<AccessToken, Error> {
        let refresh = self
            .session
            .get(CredentialKey::RefreshToken)
            .await
            .map(RefreshToken::from)
            .ok_or(Error::NotAuthenticated)?;
        self.refresh_with(&refresh).await
    }

    async fn refresh_with(&self, refresh: &RefreshToken) -> Result<AccessToken, Error> {
        match self.client.refresh(refresh).await {
            Ok(token) => {
                self.session.store_tokens(&token).await;
                tracing::debug!(
                    rotated = token.refresh_token.is_some(),
                    expires_in = ?token.expires_in,
                    "Spotify access token refreshed"
                );
                Ok(token.access_token())
            }
            Err(e @ Error::TokenExchange { .. }) => {
                tracing::warn!(error = %e, "Refresh rejected, clearing stored tokens");
                self.session.clear_tokens().await;
                Err(e)
            }
            Err(e) => {
                tracing::error!(error = %e, "Token refresh failed");
                Err(e)
            }
        }
    }
}
