use crate::core::types::{HashedPassword, HashedRefreshToken, Password};

use super::random::{FromRandom, Salt};

#[derive(Debug, thiserror::Error)]
#[error("password hashing failed: {0}")]
pub struct HashError(#[from] argon2::Error);

/// Peppered argon2 hashing for passwords, SHA-512 digests for refresh tokens.
pub struct HashingService {
    secret_key: String,
}

impl std::fmt::Debug for HashingService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "HashingService {{ ... }}")
    }
}

impl HashingService {
    pub fn with_secret_key(secret_key: String) -> Self {
        Self { secret_key }
    }

    fn get_config(&self) -> argon2::Config {
        let mut config = argon2::Config::default();
        config.secret = self.secret_key.as_bytes();
        config
    }

    pub fn hash(&self, password: &Password) -> Result<HashedPassword, HashError> {
        let salt = Salt::from_random();
        let hash = argon2::hash_encoded(
            password.as_ref().as_bytes(),
            salt.0.as_bytes(),
            &self.get_config(),
        )?;

        Ok(hash.into())
    }

    pub fn verify(&self, password: &Password, hashed: &HashedPassword) -> Result<bool, HashError> {
        let result = argon2::verify_encoded_ext(
            hashed.as_ref(),
            password.as_ref().as_bytes(),
            self.secret_key.as_bytes(),
            &[],
        )?;
        Ok(result)
    }
}

pub fn digest_refresh_token(token: &str) -> HashedRefreshToken {
    use sha2::Digest;

    let digest = sha2::Sha512::digest(token.as_bytes());
    base64::encode_config(digest, base64::URL_SAFE).into()
}
