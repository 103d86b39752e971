use axum_extra::extract::PrivateCookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};

use crate::session::{CookiePolicy, CredentialKey, CredentialStore};

/// Credential store over the request's encrypted cookie jar.
///
/// Writes accumulate in the jar; return it from the handler (see
/// [`into_jar`](Self::into_jar)) so the `Set-Cookie` headers reach the browser.
pub struct JarStore {
    jar: PrivateCookieJar,
}

impl JarStore {
    #[must_use]
    pub fn new(jar: PrivateCookieJar) -> Self {
        Self { jar }
    }

    #[must_use]
    pub fn into_jar(self) -> PrivateCookieJar {
        self.jar
    }
}

impl CredentialStore for JarStore {
    fn get(&self, key: CredentialKey) -> Option<String> {
        self.jar
            .get(key.cookie_name())
            .map(|c| c.value().to_string())
    }

    fn set(&mut self, key: CredentialKey, value: String, policy: CookiePolicy) {
        self.jar = self.jar.clone().add(build_cookie(key, value, policy));
    }

    fn delete(&mut self, key: CredentialKey) {
        self.jar = self.jar.clone().remove(removal_cookie(key));
    }
}

/// Cookie for `key` under `policy`, scoped to the whole site.
pub(super) fn build_cookie(
    key: CredentialKey,
    value: String,
    policy: CookiePolicy,
) -> Cookie<'static> {
    let mut cookie = Cookie::build((key.cookie_name(), value))
        .http_only(policy.http_only)
        .secure(policy.secure)
        .same_site(SameSite::Lax)
        .path("/")
        .build();
    if let Some(max_age) = policy.max_age {
        cookie.set_max_age(max_age);
    }
    cookie
}

/// Removal cookie; path must match [`build_cookie`].
pub(super) fn removal_cookie(key: CredentialKey) -> Cookie<'static> {
    Cookie::build((key.cookie_name(), "")).path("/").build()
}
