//! Mock Spotify accounts + Web API server shared by the integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Form, Json, Router};
use serde_json::json;
use tokio::net::TcpListener;

use spotify_dashboard::api::ApiClient;
use spotify_dashboard::oauth::{AuthClient, OAuthConfig};

pub const CODE: &str = "good-code";
pub const CODE_ACCESS: &str = "code-access";
pub const CODE_REFRESH: &str = "code-refresh";
pub const VALID_ACCESS: &str = "valid-access";
pub const STALE_ACCESS: &str = "stale-access";
pub const REFRESHED_ACCESS: &str = "refreshed-access";
pub const REFRESH: &str = "refresh-1";
pub const ROTATED_REFRESH: &str = "refresh-2";

/// How long `/v1/slow` takes to answer.
pub const SLOW_RESPONSE: Duration = Duration::from_secs(2);

/// One API request as seen by the mock.
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub path: String,
    pub headers: HeaderMap,
}

#[derive(Default)]
struct MockState {
    token_calls: AtomicUsize,
    api_calls: AtomicUsize,
    reject_refresh: AtomicBool,
    rotate_refresh: AtomicBool,
    always_unauthorized: AtomicBool,
    valid_tokens: Mutex<HashSet<String>>,
    token_grants: Mutex<Vec<HashMap<String, String>>>,
    token_auth: Mutex<Vec<Option<String>>>,
    seen: Mutex<Vec<SeenRequest>>,
}

/// Handle to a running mock; dropped servers keep running until the test ends.
#[derive(Clone)]
pub struct MockSpotify {
    pub addr: SocketAddr,
    state: Arc<MockState>,
}

impl MockSpotify {
    pub async fn start() -> Self {
        let state = Arc::new(MockState::default());
        {
            let mut valid = state.valid_tokens.lock().unwrap();
            valid.insert(VALID_ACCESS.to_string());
            valid.insert(CODE_ACCESS.to_string());
        }

        let app = Router::new()
            .route("/api/token", post(token))
            .fallback(api)
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Self { addr, state }
    }

    pub fn oauth_config(&self) -> OAuthConfig {
        let base = format!("http://{}", self.addr);
        OAuthConfig::new()
            .with_client("test-client", "test-secret")
            .with_redirect_uri(
                "http://localhost:3000/api/auth/callback/spotify"
                    .parse()
                    .unwrap(),
            )
            .with_auth_url(format!("{base}/authorize").parse().unwrap())
            .with_token_url(format!("{base}/api/token").parse().unwrap())
            .with_api_base(format!("{base}/v1").parse().unwrap())
    }

    pub fn api_client(&self) -> ApiClient {
        api_client_with(self.oauth_config(), reqwest::Client::new())
    }

    /// API client whose calls give up after `timeout`.
    pub fn api_client_with_timeout(&self, timeout: Duration) -> ApiClient {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("build http client");
        api_client_with(self.oauth_config(), http)
    }

    /// Issue a new refresh token with every refresh grant.
    pub fn rotate_refresh(&self) {
        self.state.rotate_refresh.store(true, Ordering::SeqCst);
    }

    /// Answer every refresh grant with `400 invalid_grant`.
    pub fn reject_refresh(&self) {
        self.state.reject_refresh.store(true, Ordering::SeqCst);
    }

    /// Answer every API call with 401, whatever the token.
    pub fn always_unauthorized(&self) {
        self.state.always_unauthorized.store(true, Ordering::SeqCst);
    }

    pub fn token_calls(&self) -> usize {
        self.state.token_calls.load(Ordering::SeqCst)
    }

    pub fn api_calls(&self) -> usize {
        self.state.api_calls.load(Ordering::SeqCst)
    }

    /// Form bodies posted to the token endpoint, oldest first.
    pub fn token_grants(&self) -> Vec<HashMap<String, String>> {
        self.state.token_grants.lock().unwrap().clone()
    }

    /// `Authorization` headers sent to the token endpoint.
    pub fn token_auth_headers(&self) -> Vec<Option<String>> {
        self.state.token_auth.lock().unwrap().clone()
    }

    pub fn seen(&self) -> Vec<SeenRequest> {
        self.state.seen.lock().unwrap().clone()
    }
}

async fn token(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    state.token_calls.fetch_add(1, Ordering::SeqCst);
    state.token_auth.lock().unwrap().push(
        headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    );
    state.token_grants.lock().unwrap().push(form.clone());

    match form.get("grant_type").map(String::as_str) {
        Some("authorization_code") if form.get("code").map(String::as_str) == Some(CODE) => {
            Json(json!({
                "access_token": CODE_ACCESS,
                "token_type": "Bearer",
                "expires_in": 3600,
                "refresh_token": CODE_REFRESH,
                "scope": "user-read-private"
            }))
            .into_response()
        }
        Some("refresh_token") if !state.reject_refresh.load(Ordering::SeqCst) => {
            state
                .valid_tokens
                .lock()
                .unwrap()
                .insert(REFRESHED_ACCESS.to_string());
            let mut body = json!({
                "access_token": REFRESHED_ACCESS,
                "token_type": "Bearer",
                "expires_in": 3600
            });
            if state.rotate_refresh.load(Ordering::SeqCst) {
                body["refresh_token"] = json!(ROTATED_REFRESH);
            }
            Json(body).into_response()
        }
        Some("refresh_token") => (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "invalid_grant",
                "error_description": "Refresh token revoked"
            })),
        )
            .into_response(),
        _ => (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "invalid_grant",
                "error_description": "Invalid authorization code"
            })),
        )
            .into_response(),
    }
}

async fn api(State(state): State<Arc<MockState>>, uri: Uri, headers: HeaderMap) -> Response {
    state.api_calls.fetch_add(1, Ordering::SeqCst);
    let path = uri
        .path_and_query()
        .map_or_else(|| uri.path().to_string(), |pq| pq.as_str().to_string());
    state.seen.lock().unwrap().push(SeenRequest {
        path: path.clone(),
        headers: headers.clone(),
    });

    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string);
    let authorized = !state.always_unauthorized.load(Ordering::SeqCst)
        && bearer.is_some_and(|t| state.valid_tokens.lock().unwrap().contains(&t));
    if !authorized {
        return spotify_error(StatusCode::UNAUTHORIZED, "The access token expired");
    }

    let route = path.split('?').next().unwrap_or_default();
    match route {
        "/v1/me" => Json(profile()).into_response(),
        "/v1/me/top/artists" => Json(top_artists()).into_response(),
        "/v1/me/top/tracks" => Json(top_tracks()).into_response(),
        "/v1/me/player/currently-playing" => StatusCode::NO_CONTENT.into_response(),
        "/v1/me/playlists" => Json(playlists()).into_response(),
        "/v1/me/tracks" => Json(json!({ "items": [], "total": 1234 })).into_response(),
        "/v1/me/albums" => Json(json!({ "items": [], "total": 56 })).into_response(),
        "/v1/echo" => Json(json!({
            "content_type": header_str(&headers, "content-type"),
            "x_trace": header_str(&headers, "x-trace"),
        }))
        .into_response(),
        "/v1/playlists/road-trip" => Json(playlist_detail()).into_response(),
        "/v1/slow" => {
            tokio::time::sleep(SLOW_RESPONSE).await;
            Json(json!({})).into_response()
        }
        _ => spotify_error(StatusCode::NOT_FOUND, "Resource not found"),
    }
}

pub fn api_client_with(config: OAuthConfig, http: reqwest::Client) -> ApiClient {
    let auth = Arc::new(AuthClient::new(config).with_http_client(http.clone()));
    ApiClient::new(auth, http)
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn spotify_error(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(json!({ "error": { "status": status.as_u16(), "message": message } })),
    )
        .into_response()
}

// -- Fixtures -----------------------------------------------------------------

pub fn profile() -> serde_json::Value {
    json!({
        "id": "listener-1",
        "display_name": "Listener",
        "images": [{ "url": "https://i.scdn.co/image/me", "height": 64, "width": 64 }],
        "followers": { "total": 1234 }
    })
}

pub fn top_artists() -> serde_json::Value {
    json!({
        "total": 48,
        "items": [
            {
                "name": "Boards of Canada",
                "genres": ["idm", "ambient"],
                "images": [{ "url": "https://i.scdn.co/image/boc" }],
                "external_urls": { "spotify": "https://open.spotify.com/artist/boc" },
                "popularity": 61
            },
            {
                "name": "Aphex Twin",
                "genres": ["idm", "electronica"],
                "images": [],
                "external_urls": {},
                "popularity": 70
            }
        ]
    })
}

pub fn top_tracks() -> serde_json::Value {
    json!({
        "total": 50,
        "items": [{
            "id": "t1",
            "name": "Roygbiv",
            "artists": [{ "name": "Boards of Canada" }],
            "album": { "images": [{ "url": "https://i.scdn.co/image/mhtrtc" }] },
            "external_urls": { "spotify": "https://open.spotify.com/track/t1" },
            "duration_ms": 151000
        }]
    })
}

pub fn playlists() -> serde_json::Value {
    json!({
        "total": 7,
        "items": [{
            "id": "road-trip",
            "name": "Road Trip",
            "description": "Long drives",
            "owner": { "display_name": "Listener" },
            "external_urls": { "spotify": "https://open.spotify.com/playlist/road-trip" },
            "images": [{ "url": "https://i.scdn.co/image/road" }],
            "tracks": { "total": 2 }
        }]
    })
}

pub fn playlist_detail() -> serde_json::Value {
    json!({
        "id": "road-trip",
        "name": "Road Trip",
        "description": null,
        "owner": { "display_name": "Listener" },
        "external_urls": {},
        "images": null,
        "tracks": {
            "total": 3,
            "items": [
                { "track": {
                    "id": "a", "name": "Dayvan Cowboy",
                    "artists": [{ "name": "Boards of Canada" }],
                    "external_urls": {}, "duration_ms": 300000
                } },
                { "track": null },
                { "track": {
                    "id": "b", "name": "Windowlicker",
                    "artists": [{ "name": "Aphex Twin" }, { "name": "Richard D. James" }],
                    "external_urls": {}, "duration_ms": 65500
                } }
            ]
        }
    })
}
