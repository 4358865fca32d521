use std::sync::Arc;

use warp::Filter;

use crate::http::encoding::{self, reply};
use crate::http::server::context::AuthContext;

// Refresh token rotation
pub fn token_endpoint(
    context: Arc<AuthContext>,
) -> impl warp::Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let with_context = warp::any().map(move || context.clone());

    warp::path("token")
        .and(warp::path::end())
        .and(warp::post())
        .and(with_context)
        .and(encoding::cookie_or_body_token("refreshToken"))
        .and_then(|context: Arc<AuthContext>, token| async move {
            reply::reply(context.refresh(token).await)
        })
}
