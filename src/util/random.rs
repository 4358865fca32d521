use crate::core::types::{TokenId, UserId};
use crate::oidc::types::Nonce;

pub trait FromRandom {
    fn from_random() -> Self;
}

impl FromRandom for TokenId {
    fn from_random() -> Self {
        TokenId(random_string(32))
    }
}

impl FromRandom for Nonce {
    fn from_random() -> Self {
        Nonce(random_string(32))
    }
}

impl FromRandom for UserId {
    fn from_random() -> Self {
        UserId(random_string(24))
    }
}

#[derive(Debug)]
pub struct Salt(pub String);

impl FromRandom for Salt {
    fn from_random() -> Self {
        Salt(random_string(16))
    }
}

fn random_string(size: usize) -> String {
    use rand::Rng;

    let s: String = rand::thread_rng()
        .sample_iter(rand::distributions::Alphanumeric)
        .take(size)
        .map(char::from)
        .collect();
    base64::encode_config(s, base64::URL_SAFE_NO_PAD)
}
