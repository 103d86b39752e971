use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;
use url::Url;

use crate::csrf;
use crate::error::Error;
use crate::types::{AccessToken, RefreshToken};

/// Scopes requested from Spotify on every authorization.
pub const DEFAULT_SCOPES: &[&str] = &[
    "user-read-private",
    "user-read-email",
    "user-top-read",
    "user-read-currently-playing",
    "user-read-playback-state",
    "playlist-read-private",
    "playlist-read-collaborative",
    "user-library-read",
];

/// Spotify `OAuth2` configuration.
///
/// Client credentials may be absent: the server still starts, and every
/// endpoint that needs them answers with [`Error::Configuration`].
///
/// ```rust,ignore
/// use spotify_dashboard::OAuthConfig;
///
/// let config = OAuthConfig::new()
///     .with_client("my-client-id", "my-secret")
///     .with_redirect_uri("http://127.0.0.1:3000/api/auth/callback/spotify".parse()?);
/// ```
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct OAuthConfig {
    pub(crate) client_id: Option<String>,
    pub(crate) client_secret: Option<String>,
    pub(crate) redirect_uri: Option<Url>,
    pub(crate) auth_url: Url,
    pub(crate) token_url: Url,
    pub(crate) api_base: Url,
    pub(crate) scopes: Vec<String>,
}

/// Client id and secret, borrowed from a complete [`OAuthConfig`].
#[derive(Debug, Clone, Copy)]
pub struct ClientCredentials<'a> {
    pub client_id: &'a str,
    pub client_secret: &'a str,
    pub redirect_uri: &'a Url,
}

impl ClientCredentials<'_> {
    /// `Authorization` header value: `Basic base64(client_id:client_secret)`.
    #[must_use]
    pub fn basic_authorization(&self) -> String {
        let raw = format!("{}:{}", self.client_id, self.client_secret);
        format!("Basic {}", STANDARD.encode(raw))
    }
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl OAuthConfig {
    /// Configuration pointing at the public Spotify endpoints, without credentials.
    #[must_use]
    pub fn new() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            redirect_uri: None,
            auth_url: "https://accounts.spotify.com/authorize"
                .parse()
                .expect("valid default URL"),
            token_url: "https://accounts.spotify.com/api/token"
                .parse()
                .expect("valid default URL"),
            api_base: "https://api.spotify.com/v1"
                .parse()
                .expect("valid default URL"),
            scopes: DEFAULT_SCOPES.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    #[must_use]
    pub fn with_client(
        mut self,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        self.client_id = Some(client_id.into());
        self.client_secret = Some(client_secret.into());
        self
    }

    #[must_use]
    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    #[must_use]
    pub fn with_client_secret(mut self, client_secret: impl Into<String>) -> Self {
        self.client_secret = Some(client_secret.into());
        self
    }

    #[must_use]
    pub fn with_redirect_uri(mut self, uri: Url) -> Self {
        self.redirect_uri = Some(uri);
        self
    }

    /// Override the Spotify authorization endpoint.
    #[must_use]
    pub fn with_auth_url(mut self, url: Url) -> Self {
        self.auth_url = url;
        self
    }

    /// Override the Spotify token endpoint.
    #[must_use]
    pub fn with_token_url(mut self, url: Url) -> Self {
        self.token_url = url;
        self
    }

    /// Override the Spotify Web API base (default `https://api.spotify.com/v1`).
    #[must_use]
    pub fn with_api_base(mut self, url: Url) -> Self {
        self.api_base = url;
        self
    }

    #[must_use]
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    #[must_use]
    pub fn client_id(&self) -> Option<&str> {
        self.client_id.as_deref()
    }

    #[must_use]
    pub fn redirect_uri(&self) -> Option<&Url> {
        self.redirect_uri.as_ref()
    }

    #[must_use]
    pub fn auth_url(&self) -> &Url {
        &self.auth_url
    }

    #[must_use]
    pub fn token_url(&self) -> &Url {
        &self.token_url
    }

    #[must_use]
    pub fn api_base(&self) -> &Url {
        &self.api_base
    }

    #[must_use]
    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    /// Client id and redirect URI, as required to start an authorization.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if either value is absent.
    pub fn authorize_params(&self) -> Result<(&str, &Url), Error> {
        match (self.client_id.as_deref(), self.redirect_uri.as_ref()) {
            (Some(id), Some(uri)) => Ok((id, uri)),
            _ => Err(Error::Configuration(
                "Missing Spotify API credentials".into(),
            )),
        }
    }

    /// Everything a token exchange needs.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if client id, secret or redirect URI is absent.
    pub fn client_credentials(&self) -> Result<ClientCredentials<'_>, Error> {
        match (
            self.client_id.as_deref(),
            self.client_secret.as_deref(),
            self.redirect_uri.as_ref(),
        ) {
            (Some(client_id), Some(client_secret), Some(redirect_uri)) => Ok(ClientCredentials {
                client_id,
                client_secret,
                redirect_uri,
            }),
            _ => Err(Error::Configuration(
                "Missing Spotify API credentials".into(),
            )),
        }
    }
}

/// `OAuth2` authorization client for the Spotify accounts service.
pub struct AuthClient {
    config: OAuthConfig,
    http: reqwest::Client,
}

/// Authorization URL plus the anti-forgery state to remember for the callback.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct AuthorizationRequest {
    pub url: Url,
    pub state: String,
}

/// Token response from the Spotify token endpoint.
#[derive(Debug, Clone, Deserialize)]
#[non_exhaustive]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

impl TokenResponse {
    #[must_use]
    pub fn access_token(&self) -> AccessToken {
        AccessToken::from(self.access_token.clone())
    }

    /// Rotated refresh token, when the token endpoint issued one.
    #[must_use]
    pub fn refresh_token(&self) -> Option<RefreshToken> {
        self.refresh_token.clone().map(RefreshToken::from)
    }
}

/// Error body of a rejected token request (RFC 6749 §5.2).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

impl AuthClient {
    /// Create a new Spotify auth client.
    #[must_use]
    pub fn new(config: OAuthConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    /// Use a custom HTTP client (for connection pool reuse, timeouts or testing).
    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    #[must_use]
    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    /// Generate an authorization URL with a fresh anti-forgery state.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the client id or redirect URI is missing.
    pub fn authorization_url(&self) -> Result<AuthorizationRequest, Error> {
        let (client_id, redirect_uri) = self.config.authorize_params()?;
        let state = csrf::generate_state();
        let scope = self.config.scopes.join(" ");

        let mut url = self.config.auth_url.clone();
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", client_id)
            .append_pair("scope", &scope)
            .append_pair("redirect_uri", redirect_uri.as_str())
            .append_pair("state", &state);

        Ok(AuthorizationRequest { url, state })
    }

    /// Exchange an authorization code for an access/refresh token pair.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] without a network call if credentials are
    /// missing, [`Error::Network`] on transport failure, or
    /// [`Error::TokenExchange`] if the token endpoint rejects the code.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse, Error> {
        let credentials = self.config.client_credentials()?;
        let params = [
            ("code", code),
            ("redirect_uri", credentials.redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
        ];
        self.request_token(&credentials, &params, "token exchange")
            .await
    }

    /// Exchange a refresh token for a new access token.
    ///
    /// # Errors
    ///
    /// Same as [`exchange_code`](Self::exchange_code).
    pub async fn refresh(&self, refresh_token: &RefreshToken) -> Result<TokenResponse, Error> {
        let credentials = self.config.client_credentials()?;
        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token.as_str()),
        ];
        self.request_token(&credentials, &params, "token refresh")
            .await
    }

    async fn request_token(
        &self,
        credentials: &ClientCredentials<'_>,
        params: &[(&str, &str)],
        operation: &'static str,
    ) -> Result<TokenResponse, Error> {
        let response = self
            .http
            .post(self.config.token_url.clone())
            .header(
                reqwest::header::AUTHORIZATION,
                credentials.basic_authorization(),
            )
            .form(params)
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            let detail: TokenErrorBody = serde_json::from_slice(&body).unwrap_or_default();
            tracing::warn!(
                operation,
                status = status.as_u16(),
                error = ?detail.error,
                "Spotify token endpoint rejected request"
            );
            return Err(Error::TokenExchange {
                status: status.as_u16(),
                error: detail.error,
                description: detail.error_description,
            });
        }

        serde_json::from_slice(&body).map_err(|source| Error::MalformedUpstreamResponse {
            context: operation,
            source,
        })
    }
}
