use crate::core::types::{Identity, TokenId, TokenKind};
use crate::util::random::FromRandom;

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};

use super::claims::SignedClaims;
use super::{Error, Verification};

pub struct SigningSecret(String);

impl SigningSecret {
    pub fn new(secret: impl Into<String>) -> Result<Self, Error> {
        let secret = secret.into();
        if secret.is_empty() {
            return Err(Error::EmptySecret);
        }
        Ok(Self(secret))
    }

    fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl PartialEq for SigningSecret {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl std::fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SigningSecret(..)")
    }
}

/// Signs and verifies one kind of token with one secret.
pub struct TokenSigner {
    kind: TokenKind,
    secret: EncodingKey,
    public: DecodingKey<'static>,
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TokenSigner {{ kind: {:?}, .. }}", self.kind)
    }
}

impl TokenSigner {
    pub fn new(kind: TokenKind, secret: &SigningSecret) -> Self {
        Self {
            kind,
            secret: EncodingKey::from_secret(secret.as_bytes()),
            public: DecodingKey::from_secret(secret.as_bytes()).into_static(),
        }
    }

    pub fn kind(&self) -> TokenKind {
        self.kind
    }

    pub fn sign(&self, identity: &Identity, ttl: u64, now: u64) -> Result<String, Error> {
        let claims = SignedClaims {
            id: identity.id.clone(),
            iat: now,
            exp: now.saturating_add(ttl),
            jti: TokenId::from_random(),
        };

        let header = Header::new(Algorithm::HS256);
        Ok(jsonwebtoken::encode(&header, &claims, &self.secret)?)
    }

    /// Any failure (malformed, forged, expired) is the same `Invalid`.
    pub fn verify(&self, token: &str, now: u64) -> Verification {
        if token.is_empty() {
            return Verification::Invalid;
        }

        // Expiry is checked against our clock, not the library's.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;

        match jsonwebtoken::decode::<SignedClaims>(token, &self.public, &validation) {
            Ok(data) if data.claims.exp > now => Verification::Valid(data.claims.identity()),
            _ => Verification::Invalid,
        }
    }
}
