use std::sync::Arc;

use warp::Filter;

use crate::http::encoding::{self, reply};
use crate::http::server::context::{AuthContext, LoginRequest, SignupRequest};

pub fn users_endpoint(
    context: Arc<AuthContext>,
) -> impl warp::Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let with_context = warp::any().map(move || context.clone());

    let signup = warp::path::end()
        .and(warp::post())
        .and(with_context.clone())
        .and(warp::body::json())
        .and_then(|context: Arc<AuthContext>, req: SignupRequest| async move {
            reply::reply(context.signup(req).await)
        });

    let login = warp::path("login")
        .and(warp::path::end())
        .and(warp::post())
        .and(with_context.clone())
        .and(warp::body::json())
        .and_then(|context: Arc<AuthContext>, req: LoginRequest| async move {
            reply::reply(context.login(req).await)
        });

    let logout = warp::path("logout")
        .and(warp::path::end())
        .and(warp::delete())
        .and(with_context.clone())
        .and(encoding::cookie_or_body_token("refreshToken"))
        .and_then(|context: Arc<AuthContext>, token| async move {
            reply::reply(context.logout(token).await)
        });

    warp::path("users").and(signup.or(login).or(logout))
}

pub fn session_endpoint(
    context: Arc<AuthContext>,
) -> impl warp::Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let tokens = context.tokens.clone();
    let with_context = warp::any().map(move || context.clone());

    warp::path("session")
        .and(warp::path::end())
        .and(warp::get())
        .and(encoding::authenticated(tokens))
        .and(with_context)
        .map(|identity, context: Arc<AuthContext>| warp::reply::json(&context.session(identity)))
}
