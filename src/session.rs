//! Credential store capability and the per-request session context.
//!
//! The server backs the store with encrypted cookies (see
//! [`server`](crate::server)); tests substitute [`MemoryStore`].

use std::collections::HashMap;

use time::Duration;
use tokio::sync::Mutex;

use crate::oauth::TokenResponse;
use crate::types::{AccessToken, RefreshToken};

/// Lifetime of the anti-forgery state between redirect and callback.
pub const AUTH_STATE_TTL: Duration = Duration::minutes(5);

/// Entries held in the credential store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialKey {
    AuthState,
    AccessToken,
    RefreshToken,
}

impl CredentialKey {
    /// Cookie name backing this entry.
    #[must_use]
    pub fn cookie_name(self) -> &'static str {
        match self {
            Self::AuthState => "spotify_auth_state",
            Self::AccessToken => "spotify_access_token",
            Self::RefreshToken => "spotify_refresh_token",
        }
    }
}

/// How a stored value is persisted on the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CookiePolicy {
    pub http_only: bool,
    pub secure: bool,
    /// `None` keeps the value for the browser session.
    pub max_age: Option<Duration>,
}

impl CookiePolicy {
    /// HTTP-only, `Secure` when `secure` is set, no expiry.
    #[must_use]
    pub fn http_only(secure: bool) -> Self {
        Self {
            http_only: true,
            secure,
            max_age: None,
        }
    }

    #[must_use]
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }
}

/// Key/value capability over the user's credential cookies.
pub trait CredentialStore: Send {
    fn get(&self, key: CredentialKey) -> Option<String>;

    fn set(&mut self, key: CredentialKey, value: String, policy: CookiePolicy);

    fn delete(&mut self, key: CredentialKey);
}

/// Request-scoped session context handed to every handler and to
/// [`TokenManager`](crate::token::TokenManager).
///
/// The lock is only held for individual store operations, never across
/// network I/O, so concurrent fetches of one projection can share it.
pub struct Session<S> {
    store: Mutex<S>,
    secure_cookies: bool,
}

impl<S: CredentialStore> Session<S> {
    #[must_use]
    pub fn new(store: S, secure_cookies: bool) -> Self {
        Self {
            store: Mutex::new(store),
            secure_cookies,
        }
    }

    pub async fn get(&self, key: CredentialKey) -> Option<String> {
        self.store.lock().await.get(key)
    }

    pub async fn set(&self, key: CredentialKey, value: String, policy: CookiePolicy) {
        self.store.lock().await.set(key, value, policy);
    }

    pub async fn delete(&self, key: CredentialKey) {
        self.store.lock().await.delete(key);
    }

    /// Read the stored anti-forgery state and delete it in the same step.
    pub async fn take_auth_state(&self) -> Option<String> {
        let mut store = self.store.lock().await;
        let state = store.get(CredentialKey::AuthState);
        store.delete(CredentialKey::AuthState);
        state
    }

    pub async fn store_auth_state(&self, state: String) {
        let policy = CookiePolicy::http_only(self.secure_cookies).with_max_age(AUTH_STATE_TTL);
        self.set(CredentialKey::AuthState, state, policy).await;
    }

    /// Current access and refresh token, read together.
    pub async fn tokens(&self) -> (Option<AccessToken>, Option<RefreshToken>) {
        let store = self.store.lock().await;
        (
            store.get(CredentialKey::AccessToken).map(AccessToken::from),
            store.get(CredentialKey::RefreshToken).map(RefreshToken::from),
        )
    }

    /// Persist a token response.
    ///
    /// The access token expires with the upstream `expires_in`; the refresh
    /// token is only overwritten when the response carries one.
    pub async fn store_tokens(&self, token: &TokenResponse) {
        let mut access_policy = CookiePolicy::http_only(self.secure_cookies);
        if let Some(expires_in) = token.expires_in {
            let seconds = i64::try_from(expires_in).unwrap_or(i64::MAX);
            access_policy = access_policy.with_max_age(Duration::seconds(seconds));
        }

        let mut store = self.store.lock().await;
        store.set(
            CredentialKey::AccessToken,
            token.access_token.clone(),
            access_policy,
        );
        if let Some(refresh) = &token.refresh_token {
            store.set(
                CredentialKey::RefreshToken,
                refresh.clone(),
                CookiePolicy::http_only(self.secure_cookies),
            );
        }
    }

    /// Drop both tokens (logout or a refresh the token endpoint rejected).
    pub async fn clear_tokens(&self) {
        let mut store = self.store.lock().await;
        store.delete(CredentialKey::AccessToken);
        store.delete(CredentialKey::RefreshToken);
    }

    /// Hand the store back, e.g. to attach the cookie jar to a response.
    pub fn into_store(self) -> S {
        self.store.into_inner()
    }
}

/// One write recorded by [`MemoryStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreWrite {
    pub key: CredentialKey,
    pub value: String,
    pub policy: CookiePolicy,
}

/// In-memory credential store that records every write and delete.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    values: HashMap<CredentialKey, String>,
    writes: Vec<StoreWrite>,
    deletes: Vec<CredentialKey>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a value without recording it as a write.
    #[must_use]
    pub fn with(mut self, key: CredentialKey, value: impl Into<String>) -> Self {
        self.values.insert(key, value.into());
        self
    }

    #[must_use]
    pub fn value(&self, key: CredentialKey) -> Option<&str> {
        self.values.get(&key).map(String::as_str)
    }

    #[must_use]
    pub fn writes(&self) -> &[StoreWrite] {
        &self.writes
    }

    /// Writes for one key, oldest first.
    #[must_use]
    pub fn writes_to(&self, key: CredentialKey) -> Vec<&StoreWrite> {
        self.writes.iter().filter(|w| w.key == key).collect()
    }

    #[must_use]
    pub fn deletes(&self) -> &[CredentialKey] {
        &self.deletes
    }

    #[must_use]
    pub fn delete_count(&self, key: CredentialKey) -> usize {
        self.deletes.iter().filter(|k| **k == key).count()
    }
}

impl CredentialStore for MemoryStore {
    fn get(&self, key: CredentialKey) -> Option<String> {
        self.values.get(&key).cloned()
    }

    fn set(&mut self, key: CredentialKey, value: String, policy: CookiePolicy) {
        self.values.insert(key, value.clone());
        self.writes.push(StoreWrite { key, value, policy });
    }

    fn delete(&mut self, key: CredentialKey) {
        self.values.remove(&key);
        self.deletes.push(key);
    }
}
