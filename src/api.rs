use std::sync::Arc;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::Error;
use crate::oauth::AuthClient;
use crate::session::{CredentialStore, Session};
use crate::token::TokenManager;
use crate::types::AccessToken;

/// Caller-supplied parts of an upstream request.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    /// Merged over the defaults; `Authorization` is ignored.
    pub headers: HeaderMap,
    pub body: Option<serde_json::Value>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            method: Method::GET,
            headers: HeaderMap::new(),
            body: None,
        }
    }
}

impl RequestOptions {
    #[must_use]
    pub fn get() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: reqwest::header::HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    #[must_use]
    pub fn with_json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Per-call refresh state: a 401 moves `Fresh` to `RetriedOnce`, exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attempt {
    Fresh,
    RetriedOnce,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    message: Option<String>,
}

/// Spotify Web API client that authenticates every call from a [`Session`].
pub struct ApiClient {
    auth: Arc<AuthClient>,
    http: reqwest::Client,
    api_base: Url,
}

impl ApiClient {
    /// API base is taken from the auth client's configuration.
    #[must_use]
    pub fn new(auth: Arc<AuthClient>, http: reqwest::Client) -> Self {
        let api_base = auth.config().api_base().clone();
        Self {
            auth,
            http,
            api_base,
        }
    }

    #[must_use]
    pub fn auth(&self) -> &AuthClient {
        &self.auth
    }

    /// Send `path` (relative to the API base, query included) with the
    /// session's bearer token.
    ///
    /// On a 401 the token is refreshed once and the call retried once; at most
    /// two API calls are made.
    ///
    /// # Errors
    ///
    /// - [`Error::NotAuthenticated`] if no token can be resolved.
    /// - [`Error::AuthenticationExpired`] if the 401 survives the refresh, or the
    ///   refresh or the retry fails. Stored tokens are only cleared when the
    ///   token endpoint rejects the refresh.
    /// - [`Error::Upstream`] for any other non-success status.
    /// - [`Error::Network`] on transport failure or timeout of the first call.
    pub async fn request<S: CredentialStore>(
        &self,
        session: &Session<S>,
        path: &str,
        options: &RequestOptions,
    ) -> Result<reqwest::Response, Error> {
        let tokens = TokenManager::new(&self.auth, session);
        let mut token = tokens
            .resolve_access_token()
            .await?
            .ok_or(Error::NotAuthenticated)?;
        let mut attempt = Attempt::Fresh;

        loop {
            let response = match (attempt, self.send(path, options, &token).await) {
                (_, Ok(response)) => response,
                (Attempt::Fresh, Err(e)) => return Err(e),
                (Attempt::RetriedOnce, Err(e)) => {
                    tracing::warn!(path, error = %e, "Retry after refresh failed");
                    return Err(Error::AuthenticationExpired);
                }
            };
            let status = response.status();

            if status.is_success() {
                return Ok(response);
            }

            match (attempt, status) {
                (Attempt::Fresh, StatusCode::UNAUTHORIZED) => {
                    tracing::debug!(path, "Spotify returned 401, refreshing once");
                    token = match tokens.refresh().await {
                        Ok(token) => token,
                        Err(e @ Error::Configuration(_)) => return Err(e),
                        Err(e) => {
                            tracing::warn!(path, error = %e, "Refresh after 401 failed");
                            return Err(Error::AuthenticationExpired);
                        }
                    };
                    attempt = Attempt::RetriedOnce;
                }
                (Attempt::Fresh, _) => return Err(upstream_error(response).await),
                (Attempt::RetriedOnce, _) => {
                    tracing::warn!(path, status = status.as_u16(), "Retry after refresh failed");
                    return Err(Error::AuthenticationExpired);
                }
            }
        }
    }

    /// GET `path` and decode the JSON body into `T`.
    ///
    /// # Errors
    ///
    /// As [`request`](Self::request), plus [`Error::MalformedUpstreamResponse`].
    pub async fn get_json<T: DeserializeOwned, S: CredentialStore>(
        &self,
        session: &Session<S>,
        path: &'static str,
    ) -> Result<T, Error> {
        self.get_json_at(session, path, path).await
    }

    /// GET a dynamic `path`, decoding errors under `context`.
    ///
    /// # Errors
    ///
    /// As [`get_json`](Self::get_json).
    pub async fn get_json_at<T: DeserializeOwned, S: CredentialStore>(
        &self,
        session: &Session<S>,
        path: &str,
        context: &'static str,
    ) -> Result<T, Error> {
        let response = self.request(session, path, &RequestOptions::get()).await?;
        decode(response, context).await
    }

    /// GET `path`, treating `204 No Content` or an empty body as `None`.
    ///
    /// # Errors
    ///
    /// As [`get_json`](Self::get_json).
    pub async fn get_optional_json<T: DeserializeOwned, S: CredentialStore>(
        &self,
        session: &Session<S>,
        path: &'static str,
    ) -> Result<Option<T>, Error> {
        let response = self.request(session, path, &RequestOptions::get()).await?;
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        let body = response.bytes().await?;
        if body.is_empty() {
            return Ok(None);
        }
        serde_json::from_slice(&body)
            .map(Some)
            .map_err(|source| Error::MalformedUpstreamResponse {
                context: path,
                source,
            })
    }

    fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.api_base.as_str().trim_end_matches('/'), path)
    }

    async fn send(
        &self,
        path: &str,
        options: &RequestOptions,
        token: &AccessToken,
    ) -> Result<reqwest::Response, Error> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        for (name, value) in &options.headers {
            if name != AUTHORIZATION {
                headers.insert(name.clone(), value.clone());
            }
        }

        let mut request = self
            .http
            .request(options.method.clone(), self.url_for(path))
            .headers(headers)
            .bearer_auth(token.as_str());
        if let Some(body) = &options.body {
            request = request.json(body);
        }

        Ok(request.send().await?)
    }
}

async fn decode<T: DeserializeOwned>(
    response: reqwest::Response,
    context: &'static str,
) -> Result<T, Error> {
    let body = response.bytes().await?;
    serde_json::from_slice(&body)
        .map_err(|source| Error::MalformedUpstreamResponse { context, source })
}

async fn upstream_error(response: reqwest::Response) -> Error {
    let status = response.status();
    let body = response.bytes().await.unwrap_or_default();
    let message = serde_json::from_slice::<ApiErrorBody>(&body)
        .ok()
        .and_then(|b| b.error.message)
        .unwrap_or_else(|| {
            format!(
                "Spotify API error: {} {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("")
            )
            .trim_end()
            .to_string()
        });
    tracing::warn!(status = status.as_u16(), message = %message, "Spotify API request failed");
    Error::Upstream {
        status: status.as_u16(),
        message,
    }
}
