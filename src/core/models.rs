use super::types::*;

#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub password: Option<HashedPassword>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderLink {
    pub provider: Provider,
    pub provider_user_id: String,
    pub user_id: UserId,
}

/// A logged in user together with the pair issued for them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub identity: Identity,
    pub tokens: TokenPair,
}
