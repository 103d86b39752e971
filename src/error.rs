/// Errors raised by the token lifecycle, the authenticated fetch wrapper and
/// the resource projections.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Client id, client secret or redirect URI is missing or invalid.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Anti-forgery state on the callback did not match the stored value.
    #[error("OAuth state mismatch")]
    StateMismatch,

    /// The token endpoint rejected a code or refresh exchange.
    #[error("Token exchange rejected ({status}): {}", exchange_detail(.error, .description))]
    TokenExchange {
        status: u16,
        error: Option<String>,
        description: Option<String>,
    },

    /// No usable access token and no refresh token to obtain one.
    #[error("Not authenticated with Spotify")]
    NotAuthenticated,

    /// A 401 could not be resolved by one refresh-and-retry.
    #[error("Spotify authentication failed. Please reconnect.")]
    AuthenticationExpired,

    /// Any other non-success response from the Spotify Web API.
    #[error("{message}")]
    Upstream { status: u16, message: String },

    /// Transport failure reaching Spotify.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Spotify answered with a payload that does not match the expected shape.
    #[error("Malformed {context} response: {source}")]
    MalformedUpstreamResponse {
        context: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl Error {
    /// True for the two failures that mean the user must authorize again.
    #[must_use]
    pub fn requires_reauthorization(&self) -> bool {
        matches!(self, Self::NotAuthenticated | Self::AuthenticationExpired)
    }

    /// Marker put on the landing redirect when an authorization callback
    /// fails with this error.
    #[must_use]
    pub fn callback_marker(&self) -> &str {
        match self {
            Self::StateMismatch => "state_mismatch",
            Self::Configuration(_) => "missing_credentials",
            Self::Network(_) => "network_error",
            Self::TokenExchange {
                error: Some(code), ..
            } => code.as_str(),
            _ => "token_exchange_failed",
        }
    }

    /// Upstream OAuth error code carried by a rejected token exchange.
    #[must_use]
    pub fn oauth_error_code(&self) -> Option<&str> {
        match self {
            Self::TokenExchange { error, .. } => error.as_deref(),
            _ => None,
        }
    }
}

fn exchange_detail<'a>(error: &'a Option<String>, description: &'a Option<String>) -> &'a str {
    description
        .as_deref()
        .or(error.as_deref())
        .unwrap_or("no detail")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_exchange_message_prefers_description() {
        let err = Error::TokenExchange {
            status: 400,
            error: Some("invalid_grant".into()),
            description: Some("Refresh token revoked".into()),
        };
        assert_eq!(
            err.to_string(),
            "Token exchange rejected (400): Refresh token revoked"
        );
        assert_eq!(err.oauth_error_code(), Some("invalid_grant"));
    }

    #[test]
    fn token_exchange_message_without_detail() {
        let err = Error::TokenExchange {
            status: 500,
            error: None,
            description: None,
        };
        assert_eq!(err.to_string(), "Token exchange rejected (500): no detail");
        assert_eq!(err.oauth_error_code(), None);
    }

    #[test]
    fn callback_markers() {
        assert_eq!(Error::StateMismatch.callback_marker(), "state_mismatch");
        assert_eq!(
            Error::Configuration("Missing Spotify API credentials".into()).callback_marker(),
            "missing_credentials"
        );
        let rejected = |error: Option<&str>| Error::TokenExchange {
            status: 400,
            error: error.map(str::to_string),
            description: None,
        };
        assert_eq!(rejected(Some("invalid_grant")).callback_marker(), "invalid_grant");
        assert_eq!(rejected(None).callback_marker(), "token_exchange_failed");
    }

    #[test]
    fn reauthorization_kinds() {
        assert!(Error::NotAuthenticated.requires_reauthorization());
        assert!(Error::AuthenticationExpired.requires_reauthorization());
        assert!(!Error::StateMismatch.requires_reauthorization());
        assert!(
            !Error::Upstream {
                status: 404,
                message: "nope".into()
            }
            .requires_reauthorization()
        );
    }
}
