use std::sync::Arc;

use warp::Filter;

use crate::http::encoding::reply;
use crate::http::server::context::AuthContext;
use crate::oidc::models::CallbackParams;
use crate::oidc::types::NONCE_COOKIE;

pub fn federation_endpoint(
    context: Arc<AuthContext>,
) -> impl warp::Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let with_context = warp::any().map(move || context.clone());

    let initiate = warp::path::param::<String>()
        .and(warp::path::end())
        .and(warp::get())
        .and(with_context.clone())
        .and_then(|provider: String, context: Arc<AuthContext>| async move {
            reply::reply(context.initiate(&provider).await)
        });

    // form_post providers POST the parameters, query providers redirect with them.
    let params = warp::get()
        .and(warp::query::<CallbackParams>())
        .or(warp::post().and(warp::body::form::<CallbackParams>()))
        .unify();

    let callback = warp::path::param::<String>()
        .and(warp::path("callback"))
        .and(warp::path::end())
        .and(with_context.clone())
        .and(warp::cookie::optional::<String>(NONCE_COOKIE))
        .and(params)
        .and_then(
            |provider: String, context: Arc<AuthContext>, nonce, params| async move {
                reply::reply(context.callback(&provider, nonce, params).await)
            },
        );

    warp::path("login").and(initiate.or(callback))
}
