//! Admin authentication
//!
//! Credential checks are always delegated to the store's own authentication
//! facility; nothing here compares against fixed credentials.

use crate::Result;
use argon2::{
    password_hash::{rand_core::OsRng, SaltString},
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Name of the cookie carrying the session token
pub const SESSION_COOKIE: &str = "ministry_session";

/// An authenticated admin session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub email: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminUser {
    pub email: String,
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Exchange credentials for a session; wrong credentials yield `Error::Auth`
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session>;

    /// The admin owning `token`, or `None` if the session is unknown or expired
    async fn session_user(&self, token: &str) -> Result<Option<AdminUser>>;

    async fn sign_out(&self, token: &str) -> Result<()>;
}

/// Hash a password with argon2 for storage
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| crate::Error::Auth(format!("failed to hash password: {}", e)))
}

/// Verify `password` against a stored argon2 hash
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let hash = match PasswordHash::new(stored_hash) {
        Ok(hash) => hash,
        Err(err) => {
            tracing::error!("failed to parse password hash: {}", err);
            return false;
        }
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &hash)
        .is_ok()
}

/// Extract the session token from a `Cookie` header value
pub fn session_token_from_cookies(header: &str) -> Option<&str> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hash_roundtrip() {
        let hash = hash_password("hunter2").unwrap();
        assert!(verify_password("hunter2", &hash));
        assert!(!verify_password("hunter3", &hash));
    }

    #[test]
    fn test_malformed_hash_never_verifies() {
        assert!(!verify_password("anything", "not-a-hash"));
    }

    #[test]
    fn test_session_cookie_lookup() {
        let header = "theme=dark; ministry_session=abc-123; lang=english";
        assert_eq!(session_token_from_cookies(header), Some("abc-123"));
        assert_eq!(session_token_from_cookies("theme=dark"), None);
        assert_eq!(session_token_from_cookies("ministry_session="), None);
    }
}
