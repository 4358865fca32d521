use url::Url;
use warp::http::header::{HeaderValue, LOCATION, SET_COOKIE};
use warp::http::StatusCode;
use warp::reply::{Reply, Response};
use warp::Rejection;

use super::error::ApiError;
use crate::core::types::{IssuedToken, TokenKind, TokenPair, UserId};
use crate::oidc::types::{Nonce, NONCE_COOKIE, NONCE_MAX_AGE_SECS};

const COOKIE_ATTRIBUTES: &str = "HttpOnly; Path=/; SameSite=None; Secure";

pub fn cookie(name: &str, value: &str, max_age: u64) -> String {
    format!("{}={}; Max-Age={}; {}", name, value, max_age, COOKIE_ATTRIBUTES)
}

fn token_cookie(kind: TokenKind, token: &IssuedToken) -> String {
    cookie(kind.cookie_name(), &token.token, token.expires_in_seconds)
}

pub fn token_cookies(tokens: &TokenPair) -> Vec<String> {
    vec![
        token_cookie(TokenKind::Access, &tokens.access_token),
        token_cookie(TokenKind::Refresh, &tokens.refresh_token),
    ]
}

pub fn cleared_token_cookies() -> Vec<String> {
    vec![
        cookie(TokenKind::Access.cookie_name(), "", 0),
        cookie(TokenKind::Refresh.cookie_name(), "", 0),
    ]
}

pub fn nonce_cookie(nonce: &Nonce) -> String {
    cookie(NONCE_COOKIE, nonce.as_str(), NONCE_MAX_AGE_SECS)
}

pub fn cleared_nonce_cookie() -> String {
    cookie(NONCE_COOKIE, "", 0)
}

/// A reply with `Set-Cookie` headers appended.
pub struct WithCookies<R> {
    inner: R,
    cookies: Vec<String>,
}

impl<R: Reply> WithCookies<R> {
    pub fn new(inner: R, cookies: Vec<String>) -> Self {
        Self { inner, cookies }
    }
}

impl<R: Reply> Reply for WithCookies<R> {
    fn into_response(self) -> Response {
        let mut response = self.inner.into_response();
        for cookie in self.cookies {
            match HeaderValue::from_str(&cookie) {
                Ok(value) => {
                    response.headers_mut().append(SET_COOKIE, value);
                }
                Err(_) => return StatusCode::INTERNAL_SERVER_ERROR.into_response(),
            }
        }
        response
    }
}

pub fn found(location: &Url) -> Response {
    match HeaderValue::from_str(location.as_str()) {
        Ok(value) => {
            let mut response = StatusCode::FOUND.into_response();
            response.headers_mut().insert(LOCATION, value);
            response
        }
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct Delivered<'a> {
    tokens: &'a TokenPair,
    user_id: &'a UserId,
}

#[derive(serde::Serialize)]
struct Success<T> {
    success: T,
}

/// Sets both token cookies and either redirects to `redirect` or
/// repeats the pair in a JSON body.
pub fn deliver_tokens(
    user_id: &UserId,
    tokens: &TokenPair,
    redirect: Option<&Url>,
    mut extra_cookies: Vec<String>,
) -> WithCookies<Response> {
    let inner = match redirect {
        Some(url) => found(url),
        None => warp::reply::json(&Success {
            success: Delivered { tokens, user_id },
        })
        .into_response(),
    };

    let mut cookies = token_cookies(tokens);
    cookies.append(&mut extra_cookies);
    WithCookies::new(inner, cookies)
}

pub fn json_encode(
    value: Result<impl serde::Serialize, impl Into<ApiError>>,
) -> Result<impl Reply, Rejection> {
    value
        .map(|v| warp::reply::json(&v))
        .map_err(|e| warp::reject::custom::<ApiError>(e.into()))
}

pub fn accept<T, E>(result: Result<T, E>) -> Result<T, Rejection>
where
    E: Into<ApiError>,
{
    result.map_err(|e| warp::reject::custom(e.into()))
}

pub fn reply<T, E>(result: Result<T, E>) -> Result<Response, Rejection>
where
    T: Reply,
    E: Into<ApiError>,
{
    result
        .map(|t| t.into_response())
        .map_err(|e| warp::reject::custom(e.into()))
}
