pub mod error;
pub mod reply;

use std::sync::Arc;

use warp::hyper::body::Bytes;
use warp::{Filter, Rejection};

use crate::auth;
use crate::core::types::Identity;
use crate::token::TokenService;

/// Guard for protected routes: extracts the caller's identity or rejects.
pub fn authenticated(
    tokens: Arc<TokenService>,
) -> impl Filter<Extract = (Identity,), Error = Rejection> + Clone {
    let with_tokens = warp::any().map(move || tokens.clone());

    warp::cookie::optional::<String>("accessToken")
        .and(warp::header::optional::<String>("authorization"))
        .and(with_tokens)
        .and_then(|cookie, header, tokens: Arc<TokenService>| async move {
            reply::accept(auth::authenticate(&tokens, cookie, header))
        })
}

#[derive(serde::Deserialize)]
struct TokenBody {
    token: Option<String>,
}

/// A token from the named cookie, else from a JSON `{"token": ..}` body.
pub fn cookie_or_body_token(
    cookie: &'static str,
) -> impl Filter<Extract = (Option<String>,), Error = Rejection> + Clone {
    warp::cookie::optional::<String>(cookie)
        .and(warp::body::bytes())
        .map(|cookie: Option<String>, body: Bytes| match cookie {
            Some(token) if !token.is_empty() => Some(token),
            _ => serde_json::from_slice::<TokenBody>(&body)
                .ok()
                .and_then(|b| b.token)
                .filter(|t| !t.is_empty()),
        })
}
