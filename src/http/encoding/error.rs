use std::collections::BTreeMap;
use std::fmt::Display;

use tracing::{event, Level};
use warp::http::StatusCode;
use warp::reply::Response;
use warp::{Rejection, Reply};

use crate::auth::users::DirectoryError;
use crate::auth::AuthError;
use crate::oidc::FederationError;
use crate::token;

const INTERNAL_ERROR: &str = "Something went wrong";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A single message.
    Simple,
    /// Messages keyed by the form field they belong to.
    Complex,
    /// A fault the client cannot act on.
    Unknown,
}

/// Every error a client can see, in one shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub kind: ErrorKind,
    pub code: StatusCode,
    pub message: String,
    pub details: BTreeMap<String, String>,
}

impl warp::reject::Reject for ApiError {}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
enum Payload<'a> {
    SimpleError(&'a str),
    ComplexError(&'a BTreeMap<String, String>),
    UnknownError(&'a str),
}

#[derive(serde::Serialize)]
struct Body<'a> {
    #[serde(flatten)]
    payload: Payload<'a>,
    code: u16,
}

impl ApiError {
    pub fn simple(code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Simple,
            code,
            message: message.into(),
            details: BTreeMap::new(),
        }
    }

    /// The same message attached to each of `fields`.
    pub fn complex(code: StatusCode, message: impl Into<String>, fields: &[&str]) -> Self {
        let message = message.into();
        let details = fields
            .iter()
            .map(|f| (f.to_string(), message.clone()))
            .collect();

        Self {
            kind: ErrorKind::Complex,
            code,
            message,
            details,
        }
    }

    /// Logs `cause` and hides it from the client.
    pub fn internal(cause: &dyn Display) -> Self {
        event!(Level::ERROR, error = %cause, "Request failed");
        Self {
            kind: ErrorKind::Unknown,
            code: StatusCode::INTERNAL_SERVER_ERROR,
            message: INTERNAL_ERROR.to_string(),
            details: BTreeMap::new(),
        }
    }

    fn body(&self) -> Body<'_> {
        let payload = match self.kind {
            ErrorKind::Simple => Payload::SimpleError(&self.message),
            ErrorKind::Complex => Payload::ComplexError(&self.details),
            ErrorKind::Unknown => Payload::UnknownError(&self.message),
        };

        Body {
            payload,
            code: self.code.as_u16(),
        }
    }
}

impl Reply for ApiError {
    fn into_response(self) -> Response {
        let json = warp::reply::json(&self.body());
        warp::reply::with_status(json, self.code).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::AuthenticationRequired | AuthError::AuthenticationRejected => {
                Self::simple(StatusCode::UNAUTHORIZED, e.to_string())
            }
        }
    }
}

impl From<token::Error> for ApiError {
    fn from(e: token::Error) -> Self {
        Self::internal(&e)
    }
}

impl From<DirectoryError> for ApiError {
    fn from(e: DirectoryError) -> Self {
        match e {
            DirectoryError::UsernameTaken => {
                Self::complex(StatusCode::BAD_REQUEST, "User already exists", &["email"])
            }
            DirectoryError::ThirdPartyAccount => Self::complex(
                StatusCode::BAD_REQUEST,
                "User already exists with third party account",
                &["email"],
            ),
            DirectoryError::Store(_) | DirectoryError::Hashing(_) => Self::internal(&e),
        }
    }
}

impl From<FederationError> for ApiError {
    fn from(e: FederationError) -> Self {
        use FederationError::*;

        match e {
            UnsupportedProvider(_) | MissingEmail => Self::simple(StatusCode::BAD_REQUEST, e.to_string()),
            MissingNonce | ClientNotInitialized(_) => {
                Self::simple(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
            NonceMismatch => Self::simple(StatusCode::UNAUTHORIZED, e.to_string()),
            InvalidCallback(ref reason) => {
                event!(Level::INFO, %reason, "Rejected federation callback");
                Self::simple(StatusCode::BAD_REQUEST, "Invalid callback")
            }
            Discovery(_) | Exchange(_) | Encoding(_) => Self::internal(&e),
            Token(e) => e.into(),
            Directory(e) => e.into(),
        }
    }
}

pub async fn handle_reject(err: Rejection) -> Result<impl Reply, Rejection> {
    match err.find::<ApiError>() {
        Some(e) => Ok(e.clone().into_response()),
        None => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Provider;
    use crate::db::StoreError;

    fn json(error: &ApiError) -> serde_json::Value {
        serde_json::to_value(error.body()).unwrap()
    }

    #[test]
    fn simple_errors_keep_the_legacy_shape() {
        let error = ApiError::from(FederationError::MissingNonce);
        assert_eq!(
            json(&error),
            serde_json::json!({"simpleError": "Missing nonce!", "code": 500})
        );
    }

    #[test]
    fn complex_errors_are_keyed_by_field() {
        let error = ApiError::complex(
            StatusCode::BAD_REQUEST,
            "Username or password is incorrect",
            &["email", "password"],
        );
        assert_eq!(
            json(&error),
            serde_json::json!({
                "complexError": {
                    "email": "Username or password is incorrect",
                    "password": "Username or password is incorrect"
                },
                "code": 400
            })
        );
    }

    #[test]
    fn infrastructure_faults_are_hidden() {
        let error = ApiError::from(token::Error::Store(StoreError::Unavailable(
            "connection refused".into(),
        )));
        assert_eq!(error.kind, ErrorKind::Unknown);
        assert_eq!(
            json(&error),
            serde_json::json!({"unknownError": "Something went wrong", "code": 500})
        );
    }

    #[test]
    fn federation_statuses() {
        let status = |e: FederationError| ApiError::from(e).code;

        assert_eq!(status(FederationError::UnsupportedProvider("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status(FederationError::MissingEmail), StatusCode::BAD_REQUEST);
        assert_eq!(status(FederationError::MissingNonce), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            status(FederationError::ClientNotInitialized(Provider::Google)),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(status(FederationError::NonceMismatch), StatusCode::UNAUTHORIZED);
        assert_eq!(
            status(FederationError::Directory(DirectoryError::ThirdPartyAccount)),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn both_authentication_failures_are_unauthorized() {
        let required = ApiError::from(AuthError::AuthenticationRequired);
        let rejected = ApiError::from(AuthError::AuthenticationRejected);

        assert_eq!(required.code, StatusCode::UNAUTHORIZED);
        assert_eq!(rejected.code, StatusCode::UNAUTHORIZED);
        assert_ne!(required.message, rejected.message);
    }
}
