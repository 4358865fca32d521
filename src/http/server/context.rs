use std::sync::Arc;

use warp::http::StatusCode;
use warp::reply::Response;

use crate::auth::users::{DirectoryError, UserDirectory};
use crate::core::types::{Identity, Password, UserId};
use crate::http::encoding::error::ApiError;
use crate::http::encoding::reply::{self, WithCookies};
use crate::oidc::models::CallbackParams;
use crate::oidc::types::Nonce;
use crate::oidc::FederationCoordinator;
use crate::token::TokenService;

#[derive(Debug, serde::Deserialize)]
pub struct LoginRequest {
    #[serde(alias = "email")]
    pub username: String,
    pub password: String,
}

#[derive(Debug, serde::Deserialize)]
pub struct SignupRequest {
    #[serde(alias = "email")]
    pub username: String,
    pub password: String,
}

#[derive(Debug, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub user_id: UserId,
}

/// Shared state behind every route.
#[derive(Debug)]
pub struct AuthContext {
    pub tokens: Arc<TokenService>,
    pub users: Arc<dyn UserDirectory>,
    pub federation: FederationCoordinator,
}

fn no_refresh_token() -> ApiError {
    ApiError::simple(StatusCode::UNAUTHORIZED, "No refresh token given!")
}

impl AuthContext {
    #[tracing::instrument(skip(self, req), fields(username = %req.username))]
    pub async fn login(&self, req: LoginRequest) -> Result<WithCookies<Response>, ApiError> {
        let user_id = self
            .users
            .verify_password(&req.username, &Password(req.password))
            .await?
            .ok_or_else(|| {
                ApiError::complex(
                    StatusCode::BAD_REQUEST,
                    "Username or password is incorrect",
                    &["email", "password"],
                )
            })?;

        let tokens = self
            .tokens
            .issue_token_pair(&Identity::from(user_id.clone()))
            .await?;
        Ok(reply::deliver_tokens(&user_id, &tokens, None, vec![]))
    }

    #[tracing::instrument(skip(self, req), fields(username = %req.username))]
    pub async fn signup(&self, req: SignupRequest) -> Result<WithCookies<Response>, ApiError> {
        let user_id = self
            .users
            .create_user(&req.username, &Password(req.password))
            .await
            .map_err(|e| match e {
                DirectoryError::UsernameTaken => ApiError::complex(
                    StatusCode::BAD_REQUEST,
                    "Email already exists!",
                    &["email"],
                ),
                e => ApiError::from(e),
            })?;

        let tokens = self
            .tokens
            .issue_token_pair(&Identity::from(user_id.clone()))
            .await?;
        Ok(reply::deliver_tokens(&user_id, &tokens, None, vec![]))
    }

    pub async fn refresh(&self, token: Option<String>) -> Result<WithCookies<Response>, ApiError> {
        let token = token.ok_or_else(no_refresh_token)?;
        let session = self
            .tokens
            .rotate_refresh_token(&token)
            .await?
            .ok_or_else(|| ApiError::simple(StatusCode::UNAUTHORIZED, "Invalid refresh token"))?;

        Ok(reply::deliver_tokens(
            &session.identity.id,
            &session.tokens,
            None,
            vec![],
        ))
    }

    pub async fn logout(&self, token: Option<String>) -> Result<WithCookies<StatusCode>, ApiError> {
        let token = token.ok_or_else(no_refresh_token)?;
        self.tokens.delete_refresh_token(&token).await?;

        Ok(WithCookies::new(
            StatusCode::NO_CONTENT,
            reply::cleared_token_cookies(),
        ))
    }

    pub fn session(&self, identity: Identity) -> SessionInfo {
        SessionInfo {
            user_id: identity.id,
        }
    }

    pub async fn initiate(&self, provider: &str) -> Result<WithCookies<Response>, ApiError> {
        let redirect = self.federation.initiate(provider).await?;

        Ok(WithCookies::new(
            reply::found(&redirect.location),
            vec![reply::nonce_cookie(&redirect.nonce)],
        ))
    }

    /// A successful callback spends the nonce cookie.
    pub async fn callback(
        &self,
        provider: &str,
        nonce: Option<String>,
        params: CallbackParams,
    ) -> Result<WithCookies<Response>, ApiError> {
        let login = self
            .federation
            .callback(provider, nonce.map(Nonce), params)
            .await?;

        Ok(reply::deliver_tokens(
            &login.user_id,
            &login.tokens,
            login.redirect.as_ref(),
            vec![reply::cleared_nonce_cookie()],
        ))
    }
}
