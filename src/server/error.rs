use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::error::Error;

/// JSON error body returned by every dashboard endpoint.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: &'static str,
}

impl Error {
    /// HTTP status this error is reported with.
    ///
    /// Upstream 4xx/5xx statuses are passed through; anything else Spotify
    /// answered with becomes 502.
    #[must_use]
    pub fn http_status(&self) -> StatusCode {
        match self {
            Self::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::StateMismatch => StatusCode::BAD_REQUEST,
            Self::NotAuthenticated | Self::AuthenticationExpired => StatusCode::UNAUTHORIZED,
            Self::Upstream { status, .. } => StatusCode::from_u16(*status)
                .ok()
                .filter(|s| s.is_client_error() || s.is_server_error())
                .unwrap_or(StatusCode::BAD_GATEWAY),
            Self::TokenExchange { .. }
            | Self::Network(_)
            | Self::MalformedUpstreamResponse { .. } => StatusCode::BAD_GATEWAY,
        }
    }

    /// Stable machine-readable code for the JSON body.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::StateMismatch => "STATE_MISMATCH",
            Self::TokenExchange { .. } => "TOKEN_EXCHANGE_ERROR",
            Self::NotAuthenticated => "NOT_AUTHENTICATED",
            Self::AuthenticationExpired => "AUTHENTICATION_EXPIRED",
            Self::Upstream { .. } => "UPSTREAM_ERROR",
            Self::Network(_) => "NETWORK_ERROR",
            Self::MalformedUpstreamResponse { .. } => "MALFORMED_UPSTREAM_RESPONSE",
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.http_status();
        if status.is_server_error() {
            tracing::error!(error = %self, code = self.code(), "Dashboard request failed");
        }
        let body = ErrorBody {
            error: self.to_string(),
            code: self.code(),
        };
        (status, Json(body)).into_response()
    }
}
