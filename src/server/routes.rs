use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Json, Router};
use axum_extra::extract::PrivateCookieJar;
use serde_json::json;
use tower_http::trace::TraceLayer;

use super::config::DashboardConfig;
use super::extractor::CookieSession;
use super::state::AppState;
use crate::api::ApiClient;
use crate::authorize::{self, CallbackParams};
use crate::error::Error;
use crate::oauth::AuthClient;
use crate::projection;
use crate::token::TokenManager;
use crate::types::PlaylistId;

/// Create the dashboard router (auth flow plus Spotify projections).
///
/// # Errors
///
/// Returns [`Error::Network`] if the HTTP client cannot be built.
pub fn dashboard_routes(config: DashboardConfig) -> Result<Router, Error> {
    let http = reqwest::Client::builder()
        .timeout(config.settings.upstream_timeout)
        .build()?;
    let auth = Arc::new(AuthClient::new(config.oauth).with_http_client(http.clone()));
    let api = Arc::new(ApiClient::new(auth.clone(), http));

    let state = AppState {
        auth,
        api,
        settings: config.settings,
    };

    let router = Router::new()
        .route("/api/auth/spotify", get(login))
        .route("/api/auth/callback/spotify", get(callback))
        .route("/api/spotify/dashboard", get(dashboard))
        .route("/api/spotify/playlists", get(playlists))
        .route("/api/spotify/playlist/{id}", get(playlist))
        .route("/api/spotify/public-playlist/{id}", get(playlist))
        .route("/api/spotify/refresh-token", get(refresh_token))
        .route("/api/spotify/logout", get(logout).post(logout))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Ok(router)
}

// ── Authorization ──────────────────────────────────────────────────

async fn login(State(state): State<AppState>, session: CookieSession) -> Response {
    match authorize::begin_authorization(&state.auth, &*session).await {
        Ok(url) => (session.into_jar(), Redirect::to(url.as_str())).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn callback(
    State(state): State<AppState>,
    session: CookieSession,
    Query(params): Query<CallbackParams>,
) -> (PrivateCookieJar, Redirect) {
    let outcome = authorize::handle_callback(&state.auth, &*session, params).await;
    let location = outcome.redirect_location(&state.settings.landing_path);
    (session.into_jar(), Redirect::to(&location))
}

// ── Projections ────────────────────────────────────────────────────

async fn dashboard(State(state): State<AppState>, session: CookieSession) -> impl IntoResponse {
    let result = projection::load_dashboard(&state.api, &*session)
        .await
        .inspect_err(|e| tracing::error!(error = %e, "Failed to fetch Spotify dashboard data"))
        .map(Json);
    (session.into_jar(), result)
}

async fn playlists(State(state): State<AppState>, session: CookieSession) -> impl IntoResponse {
    let result = projection::load_playlists(&state.api, &*session)
        .await
        .inspect_err(|e| tracing::error!(error = %e, "Failed to fetch Spotify playlists"))
        .map(Json);
    (session.into_jar(), result)
}

async fn playlist(
    State(state): State<AppState>,
    session: CookieSession,
    Path(id): Path<PlaylistId>,
) -> impl IntoResponse {
    let result = projection::load_playlist(&state.api, &*session, &id)
        .await
        .inspect_err(|e| tracing::error!(error = %e, playlist = %id, "Failed to fetch Spotify playlist"))
        .map(Json);
    (session.into_jar(), result)
}

// ── Token maintenance ──────────────────────────────────────────────

async fn refresh_token(State(state): State<AppState>, session: CookieSession) -> Response {
    let result = TokenManager::new(&state.auth, &*session).refresh().await;
    let jar = session.into_jar();
    match result {
        Ok(token) => (jar, Json(json!({ "access_token": token.as_str() }))).into_response(),
        Err(Error::NotAuthenticated) => (
            StatusCode::UNAUTHORIZED,
            jar,
            Json(json!({ "error": "No refresh token found" })),
        )
            .into_response(),
        Err(Error::TokenExchange {
            description, error, ..
        }) => {
            let message = description
                .or(error)
                .unwrap_or_else(|| "Failed to refresh token".to_string());
            (
                StatusCode::UNAUTHORIZED,
                jar,
                Json(json!({ "error": message })),
            )
                .into_response()
        }
        Err(e) => (jar, e).into_response(),
    }
}

async fn logout(session: CookieSession) -> (PrivateCookieJar, Json<serde_json::Value>) {
    session.clear_tokens().await;
    tracing::info!("Spotify logout");
    (
        session.into_jar(),
        Json(json!({ "message": "Logged out from Spotify" })),
    )
}
