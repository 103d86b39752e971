#![doc = include_str!("../README.md")]

pub mod api;
pub mod authorize;
pub mod csrf;
pub mod error;
pub mod models;
pub mod oauth;
pub mod projection;
pub mod server;
pub mod session;
pub mod token;
pub mod types;
pub mod views;

// Re-exports for convenient access
pub use api::{ApiClient, RequestOptions};
pub use authorize::{CallbackOutcome, CallbackParams, begin_authorization, handle_callback};
pub use csrf::generate_state;
pub use error::Error;
pub use oauth::{AuthClient, AuthorizationRequest, OAuthConfig, TokenResponse};
pub use session::{CookiePolicy, CredentialKey, CredentialStore, MemoryStore, Session};
pub use token::TokenManager;
pub use types::{AccessToken, PlaylistId, RefreshToken};
