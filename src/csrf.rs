use rand::Rng;
use rand::distr::Alphanumeric;

/// Length of the anti-forgery `state` value sent to the authorization endpoint.
pub const STATE_LENGTH: usize = 16;

/// Generates a random anti-forgery `state` parameter for `OAuth2`.
///
/// Returns a 16-character string drawn from `[A-Za-z0-9]`.
#[must_use]
pub fn generate_state() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(STATE_LENGTH)
        .map(char::from)
        .collect()
}
