use std::fmt;

pub const NONCE_COOKIE: &str = "nonce";
pub const NONCE_MAX_AGE_SECS: u64 = 15 * 60;

#[derive(Clone, Debug, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Nonce(pub String);

impl Nonce {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// How the provider hands the callback parameters back.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ResponseMode {
    FormPost,
    Query,
}

impl ResponseMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FormPost => "form_post",
            Self::Query => "query",
        }
    }
}

impl fmt::Display for ResponseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
