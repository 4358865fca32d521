use std::convert::TryFrom;
use std::fmt::Debug;

use crate::auth::users::{DirectoryError, UserDirectory};
use crate::core::models::User;
use crate::core::types::{HashedPassword, HashedRefreshToken, Password, Provider, UserId};
use crate::util::hash::HashingService;
use crate::util::random::FromRandom;

use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use tokio::task::block_in_place;
use tracing::{event, Level};

use super::{models, schema, CredentialStore, StoreError};

embed_migrations!("migrations");

type PgPool = Pool<ConnectionManager<PgConnection>>;

pub struct DbStore {
    pool: PgPool,
    hasher: HashingService,
}

impl Debug for DbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbStore").finish()
    }
}

fn to_db_time(secs: u64) -> i64 {
    i64::try_from(secs).unwrap_or(i64::MAX)
}

fn is_unique_violation(e: &DieselError) -> bool {
    matches!(e, DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _))
}

impl DbStore {
    pub fn acquire(uri: &str, hasher: HashingService) -> Result<Self, StoreError> {
        let pool = Pool::builder()
            .max_size(10)
            .build(ConnectionManager::new(uri))?;
        Ok(Self { pool, hasher })
    }

    fn conn(&self) -> Result<PooledConnection<ConnectionManager<PgConnection>>, StoreError> {
        Ok(self.pool.get()?)
    }

    pub fn migrate(&self) -> Result<(), StoreError> {
        embedded_migrations::run(&self.conn()?)?;
        event!(Level::INFO, "Ran migrations");
        Ok(())
    }

    pub fn list_users(&self) -> Result<Vec<User>, StoreError> {
        use schema::users::dsl::{username, users};

        let results = block_in_place(|| {
            let conn = self.conn()?;
            users
                .order(username)
                .get_results::<models::User>(&conn)
                .map_err(StoreError::from)
        })?;

        Ok(results
            .into_iter()
            .map(|u| User {
                id: UserId(u.id),
                username: u.username,
                password: u.password_hash.map(HashedPassword),
            })
            .collect())
    }
}

#[async_trait::async_trait]
impl CredentialStore for DbStore {
    async fn exists(&self, token: &HashedRefreshToken) -> Result<bool, StoreError> {
        use schema::refresh_tokens::dsl::refresh_tokens;

        block_in_place(|| {
            let conn = self.conn()?;
            let found = diesel::select(diesel::dsl::exists(refresh_tokens.find(&token.0)))
                .get_result::<bool>(&conn)?;
            Ok(found)
        })
    }

    async fn insert(&self, token: &HashedRefreshToken, invalid_after: u64) -> Result<(), StoreError> {
        use schema::refresh_tokens::dsl::refresh_tokens;

        let model = models::RefreshToken {
            token_hash: token.0.clone(),
            invalid_after: to_db_time(invalid_after),
        };

        block_in_place(|| {
            let conn = self.conn()?;
            let inserted = diesel::insert_into(refresh_tokens)
                .values(&model)
                .execute(&conn);

            match inserted {
                Ok(_) => Ok(()),
                Err(e) if is_unique_violation(&e) => Err(StoreError::AlreadyExists),
                Err(e) => Err(e.into()),
            }
        })
    }

    async fn delete(&self, token: &HashedRefreshToken) -> Result<bool, StoreError> {
        use schema::refresh_tokens::dsl::refresh_tokens;

        block_in_place(|| {
            let conn = self.conn()?;
            let removed = diesel::delete(refresh_tokens.find(&token.0)).execute(&conn)?;
            Ok(removed > 0)
        })
    }

    async fn purge_expired(&self, now: u64) -> Result<usize, StoreError> {
        use schema::refresh_tokens::dsl::{invalid_after, refresh_tokens};

        block_in_place(|| {
            let conn = self.conn()?;
            let cutoff = to_db_time(now);
            Ok(diesel::delete(refresh_tokens.filter(invalid_after.le(cutoff))).execute(&conn)?)
        })
    }
}

#[async_trait::async_trait]
impl UserDirectory for DbStore {
    async fn get_or_create_by_provider(
        &self,
        provider: Provider,
        provider_user_id: &str,
        email: &str,
    ) -> Result<UserId, DirectoryError> {
        use schema::auth_providers::dsl::{self as links, auth_providers};
        use schema::users::dsl::users;

        block_in_place(|| {
            let conn = self.conn()?;
            let result = conn.transaction::<_, DieselError, _>(|| {
                let existing = auth_providers
                    .find((provider.as_str(), provider_user_id))
                    .select(links::user_id)
                    .first::<String>(&conn)
                    .optional()?;

                if let Some(id) = existing {
                    return Ok(id);
                }

                let user = models::User {
                    id: UserId::from_random().0,
                    username: email.to_string(),
                    password_hash: None,
                };
                diesel::insert_into(users).values(&user).execute(&conn)?;

                let link = models::AuthProvider {
                    provider: provider.as_str().to_string(),
                    provider_user_id: provider_user_id.to_string(),
                    user_id: user.id.clone(),
                };
                diesel::insert_into(auth_providers).values(&link).execute(&conn)?;

                event!(Level::INFO, %provider, user_id = %user.id, "Created third party user");
                Ok(user.id)
            });

            match result {
                Ok(id) => Ok(UserId(id)),
                Err(e) if is_unique_violation(&e) => Err(DirectoryError::UsernameTaken),
                Err(e) => Err(StoreError::from(e).into()),
            }
        })
    }

    async fn create_user(&self, username: &str, password: &Password) -> Result<UserId, DirectoryError> {
        use schema::users::dsl::users;

        let hashed = self.hasher.hash(password)?;
        let model = models::User {
            id: UserId::from_random().0,
            username: username.to_string(),
            password_hash: Some(hashed.0),
        };

        block_in_place(|| {
            let conn = self.conn()?;
            let created = diesel::insert_into(users)
                .values(&model)
                .get_result::<models::User>(&conn);

            match created {
                Ok(user) => Ok(UserId(user.id)),
                Err(e) if is_unique_violation(&e) => Err(DirectoryError::UsernameTaken),
                Err(e) => Err(StoreError::from(e).into()),
            }
        })
    }

    async fn verify_password(
        &self,
        username: &str,
        password: &Password,
    ) -> Result<Option<UserId>, DirectoryError> {
        use schema::users::dsl::{self as cols, users};

        let found = block_in_place(|| {
            let conn = self.conn()?;
            users
                .filter(cols::username.eq(username))
                .first::<models::User>(&conn)
                .optional()
                .map_err(StoreError::from)
        })?;

        let user = match found {
            Some(user) => user,
            None => return Ok(None),
        };

        let hashed = user
            .password_hash
            .map(HashedPassword)
            .ok_or(DirectoryError::ThirdPartyAccount)?;

        if self.hasher.verify(password, &hashed)? {
            Ok(Some(UserId(user.id)))
        } else {
            Ok(None)
        }
    }
}
