pub mod error;
pub mod users;

pub use error::AuthError;

use crate::core::types::Identity;
use crate::token::{TokenService, Verification};

use tracing::{event, Level};

/// Picks the access token for a request.
///
/// A non-empty cookie wins. Otherwise the second whitespace separated
/// segment of the `Authorization` header is used, whatever the scheme.
pub fn extract_token(cookie: Option<String>, header: Option<String>) -> Option<String> {
    match cookie {
        Some(token) if !token.is_empty() => Some(token),
        _ => header
            .as_deref()
            .and_then(|h| h.split_whitespace().nth(1))
            .map(str::to_string),
    }
}

pub fn authenticate(
    tokens: &TokenService,
    cookie: Option<String>,
    header: Option<String>,
) -> Result<Identity, AuthError> {
    let token = extract_token(cookie, header).ok_or(AuthError::AuthenticationRequired)?;

    match tokens.verify_access_token(&token) {
        Verification::Valid(identity) => Ok(identity),
        Verification::Invalid => {
            event!(Level::DEBUG, "Rejected access token");
            Err(AuthError::AuthenticationRejected)
        }
    }
}
