use std::net::SocketAddr;
use std::sync::Arc;

use url::Url;
use warp::{Filter, Rejection, Reply};

pub mod context;
mod endpoints;

pub use context::AuthContext;

use endpoints::{
    federation::federation_endpoint,
    token::token_endpoint,
    users::{session_endpoint, users_endpoint},
};

use super::encoding::error::handle_reject;

/// Every route under `/auth`, with errors rendered.
pub fn routes(context: Arc<AuthContext>) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    let users = users_endpoint(context.clone());
    let token = token_endpoint(context.clone());
    let session = session_endpoint(context.clone());
    let federation = federation_endpoint(context);

    warp::path("auth")
        .and(users.or(token).or(session).or(federation))
        .recover(handle_reject)
        .with(warp::log("http-api"))
}

#[derive(Debug)]
pub struct Server {
    context: Arc<AuthContext>,
    allowed_origins: Vec<Url>,
}

impl Server {
    pub fn new(context: Arc<AuthContext>, allowed_origins: Vec<Url>) -> Self {
        Self {
            context,
            allowed_origins,
        }
    }

    pub async fn serve(self, addr: SocketAddr) {
        let origins: Vec<String> = self
            .allowed_origins
            .iter()
            .map(|u| u.origin().ascii_serialization())
            .collect();

        let cors = warp::cors()
            .allow_origins(origins.iter().map(String::as_str))
            .allow_credentials(true)
            .allow_methods(vec!["GET", "POST", "DELETE"])
            .allow_headers(vec!["authorization", "content-type"]);

        let routes = routes(self.context).with(cors);

        warp::serve(routes).run(addr).await;
    }
}
