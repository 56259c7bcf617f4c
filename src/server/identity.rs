//! Stream identity
//!
//! The token in the subscription path, `/camera<identity>`. Fixed for the
//! lifetime of the server.

use std::fmt;

use rand::Rng;

use crate::error::{Error, Result};

/// Subscription path prefix
pub const PATH_PREFIX: &str = "/camera";

const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const GENERATED_LEN: usize = 8;

/// Immutable stream identity token
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StreamIdentity(String);

impl StreamIdentity {
    /// Random identity of 8 characters from `[a-z0-9]`
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let token = (0..GENERATED_LEN)
            .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
            .collect();
        Self(token)
    }

    /// Explicit identity. Must be non-empty ASCII alphanumerics, `-` or `_`.
    pub fn new(token: impl Into<String>) -> Result<Self> {
        let token = token.into();
        if token.is_empty() {
            return Err(Error::Config("stream identity is empty".into()));
        }
        if let Some(c) = token
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
        {
            return Err(Error::Config(format!(
                "stream identity {:?} contains invalid character {:?}",
                token, c
            )));
        }
        Ok(Self(token))
    }

    /// Explicit identity if given, random otherwise
    pub fn from_config(token: Option<&str>) -> Result<Self> {
        match token {
            Some(token) => Self::new(token),
            None => Ok(Self::generate()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Subscription path for this identity
    pub fn path(&self) -> String {
        format!("{}{}", PATH_PREFIX, self.0)
    }

    /// Whether a request path addresses this stream exactly
    pub fn matches_path(&self, path: &str) -> bool {
        path.strip_prefix(PATH_PREFIX) == Some(self.0.as_str())
    }
}

impl fmt::Display for StreamIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
