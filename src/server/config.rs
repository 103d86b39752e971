use std::net::SocketAddr;
use std::time::Duration;

use axum_extra::extract::cookie::Key;
use url::Url;

use crate::error::Error;
use crate::oauth::OAuthConfig;

/// Settings shared by config and runtime state.
#[derive(Clone)]
pub(crate) struct AppSettings {
    pub(crate) cookie_key: Key,
    pub(crate) secure_cookies: bool,
    pub(crate) landing_path: String,
    pub(crate) upstream_timeout: Duration,
}

impl AppSettings {
    fn defaults() -> Self {
        Self {
            cookie_key: Key::generate(),
            secure_cookies: true,
            landing_path: "/".into(),
            upstream_timeout: Duration::from_secs(10),
        }
    }
}

/// Dashboard server configuration.
///
/// Use [`from_env()`](DashboardConfig::from_env) for convention-based setup,
/// or [`new()`](DashboardConfig::new) with `with_*` methods for full control.
pub struct DashboardConfig {
    pub(super) oauth: OAuthConfig,
    pub(super) settings: AppSettings,
    pub(super) bind_addr: SocketAddr,
}

impl DashboardConfig {
    #[must_use]
    pub fn new(oauth: OAuthConfig) -> Self {
        Self {
            oauth,
            settings: AppSettings::defaults(),
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
        }
    }

    /// Create config from environment variables.
    ///
    /// # Env vars (all optional)
    /// - `SPOTIFY_CLIENT_ID`, `SPOTIFY_CLIENT_SECRET`, `SPOTIFY_REDIRECT_URI`:
    ///   app credentials; endpoints needing a missing one answer 500
    /// - `SPOTIFY_AUTH_URL`, `SPOTIFY_TOKEN_URL`, `SPOTIFY_API_BASE`: endpoint overrides
    /// - `SPOTIFY_SCOPES`: comma-separated scopes
    /// - `APP_ENV`: `production` turns on `Secure` cookies
    /// - `COOKIE_KEY`: cookie encryption key (at least 64 bytes)
    /// - `UPSTREAM_TIMEOUT_SECS`: per-call timeout towards Spotify (default 10)
    /// - `BIND_ADDR`: listen address (default `127.0.0.1:3000`)
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if a value is set but invalid.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`from_env()`](Self::from_env), reading values through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if a value is set but invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let parse_url = |name: &str| -> Result<Option<Url>, Error> {
            lookup(name)
                .map(|raw| {
                    raw.parse()
                        .map_err(|e| Error::Configuration(format!("{name}: {e}")))
                })
                .transpose()
        };

        let mut oauth = OAuthConfig::new();
        if let Some(id) = lookup("SPOTIFY_CLIENT_ID").filter(|v| !v.is_empty()) {
            oauth = oauth.with_client_id(id);
        }
        if let Some(secret) = lookup("SPOTIFY_CLIENT_SECRET").filter(|v| !v.is_empty()) {
            oauth = oauth.with_client_secret(secret);
        }
        if let Some(uri) = parse_url("SPOTIFY_REDIRECT_URI")? {
            oauth = oauth.with_redirect_uri(uri);
        }
        if let Some(url) = parse_url("SPOTIFY_AUTH_URL")? {
            oauth = oauth.with_auth_url(url);
        }
        if let Some(url) = parse_url("SPOTIFY_TOKEN_URL")? {
            oauth = oauth.with_token_url(url);
        }
        if let Some(url) = parse_url("SPOTIFY_API_BASE")? {
            oauth = oauth.with_api_base(url);
        }
        if let Some(scopes) = lookup("SPOTIFY_SCOPES") {
            oauth = oauth.with_scopes(
                scopes
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect(),
            );
        }

        let production = lookup("APP_ENV").is_some_and(|v| v == "production");

        let cookie_key = match lookup("COOKIE_KEY") {
            Some(k) => Key::try_from(k.as_bytes()).map_err(|_| {
                Error::Configuration(
                    "COOKIE_KEY is set but invalid (must be at least 64 bytes). \
                     Remove the env var to use an ephemeral key, or provide a valid key."
                        .into(),
                )
            })?,
            None => Key::generate(),
        };

        let mut config = Self::new(oauth)
            .with_cookie_key(cookie_key)
            .with_secure_cookies(production);

        if let Some(secs) = lookup("UPSTREAM_TIMEOUT_SECS") {
            let secs: u64 = secs
                .parse()
                .map_err(|e| Error::Configuration(format!("UPSTREAM_TIMEOUT_SECS: {e}")))?;
            config = config.with_upstream_timeout(Duration::from_secs(secs));
        }
        if let Some(addr) = lookup("BIND_ADDR") {
            let addr: SocketAddr = addr
                .parse()
                .map_err(|e| Error::Configuration(format!("BIND_ADDR: {e}")))?;
            config = config.with_bind_addr(addr);
        }

        Ok(config)
    }

    #[must_use]
    pub fn with_cookie_key(mut self, key: Key) -> Self {
        self.settings.cookie_key = key;
        self
    }

    #[must_use]
    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.settings.secure_cookies = secure;
        self
    }

    /// Page the OAuth callback redirects back to (default `/`).
    #[must_use]
    pub fn with_landing_path(mut self, path: impl Into<String>) -> Self {
        self.settings.landing_path = path.into();
        self
    }

    #[must_use]
    pub fn with_upstream_timeout(mut self, timeout: Duration) -> Self {
        self.settings.upstream_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    #[must_use]
    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }

    #[must_use]
    pub fn oauth(&self) -> &OAuthConfig {
        &self.oauth
    }

    #[must_use]
    pub fn secure_cookies(&self) -> bool {
        self.settings.secure_cookies
    }
}
