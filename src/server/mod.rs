//! Axum server for the dashboard.
//!
//! Credentials live in encrypted cookies; every handler builds a
//! [`Session`](crate::session::Session) over the request's cookie jar and
//! returns the jar with its response.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use spotify_dashboard::server::{DashboardConfig, dashboard_routes};
//!
//! let config = DashboardConfig::from_env()?;
//! let addr = config.bind_addr();
//! let app = dashboard_routes(config)?;
//! let listener = tokio::net::TcpListener::bind(addr).await?;
//! axum::serve(listener, app).await?;
//! ```

mod config;
mod cookies;
mod error;
mod extractor;
mod routes;
mod state;

pub use config::DashboardConfig;
pub use cookies::JarStore;
pub use error::ErrorBody;
pub use routes::dashboard_routes;

/// Re-export cookie key type for builder API.
pub use axum_extra::extract::cookie::Key as CookieKey;
