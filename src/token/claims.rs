use crate::core::types::{Identity, TokenId, UserId};

#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct SignedClaims {
    pub id: UserId,
    pub iat: u64,
    pub exp: u64,
    pub jti: TokenId,
}

impl SignedClaims {
    pub fn identity(&self) -> Identity {
        Identity { id: self.id.clone() }
    }
}
