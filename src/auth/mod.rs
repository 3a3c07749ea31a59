//! Access-token storage
//!
//! File-backed bearer-token persistence with expiry inspection. Tokens are
//! JWTs issued by the platform's identity provider; only the `exp` claim is
//! inspected here — signature verification is the server's job, not the
//! client's. The interactive login flows that obtain a token in the first
//! place live outside this crate.

use crate::error::Result;
use chrono::Utc;
use jsonwebtoken::{decode, decode_header, DecodingKey, Validation};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default token file, relative to the working directory
pub const DEFAULT_AUTH_FILE: &str = ".auth";

/// Supplies a bearer token on demand
pub trait TokenProvider {
    /// Current token, absent when none is available
    fn get_token(&self) -> Option<String>;
}

impl TokenProvider for String {
    fn get_token(&self) -> Option<String> {
        Some(self.clone())
    }
}

/// File-backed token store.
///
/// `load` returns the stored token only while it is still valid; expired or
/// undecodable tokens read as absent, prompting the caller to obtain a fresh
/// one.
#[derive(Debug, Clone)]
pub struct AuthStore {
    path: PathBuf,
}

impl AuthStore {
    /// Create a store backed by the given file
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the token file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored token, absent when missing or expired
    pub fn load(&self) -> Option<String> {
        let token = fs::read_to_string(&self.path).ok()?;
        let token = token.trim().to_string();
        if token.is_empty() || token_expired(&token) {
            debug!(path = %self.path.display(), "stored token missing or expired");
            return None;
        }
        Some(token)
    }

    /// Persist a token for later sessions
    pub fn save(&self, token: &str) -> Result<()> {
        fs::write(&self.path, token)?;
        Ok(())
    }
}

impl Default for AuthStore {
    fn default() -> Self {
        Self::new(DEFAULT_AUTH_FILE)
    }
}

impl TokenProvider for AuthStore {
    fn get_token(&self) -> Option<String> {
        self.load()
    }
}

#[derive(Debug, Deserialize)]
struct Claims {
    exp: Option<i64>,
}

/// Check whether a JWT's `exp` claim is in the past.
///
/// Undecodable tokens and tokens without an expiry count as expired.
pub fn token_expired(token: &str) -> bool {
    let Ok(header) = decode_header(token) else {
        return true;
    };
    let mut validation = Validation::new(header.alg);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    match decode::<Claims>(token, &DecodingKey::from_secret(&[]), &validation) {
        Ok(data) => match data.claims.exp {
            Some(exp) => exp <= Utc::now().timestamp(),
            None => true,
        },
        Err(_) => true,
    }
}
