use super::schema::*;

#[derive(Debug)]
#[derive(Queryable, Insertable)]
#[table_name = "refresh_tokens"]
pub struct RefreshToken {
    pub token_hash: String,
    pub invalid_after: i64,
}

#[derive(Debug)]
#[derive(Queryable, Insertable)]
#[table_name = "users"]
pub struct User {
    pub id: String,
    pub username: String,
    pub password_hash: Option<String>,
}

#[derive(Debug)]
#[derive(Queryable, Insertable)]
#[table_name = "auth_providers"]
pub struct AuthProvider {
    pub provider: String,
    pub provider_user_id: String,
    pub user_id: String,
}
