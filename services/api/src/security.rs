//! services/api/src/security.rs
//!
//! Identity and token primitives: bearer-token signing and verification,
//! password hashing, secure password generation, and principal resolution
//! against the built-in admin set and the persistent account store.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::BuiltinUser;
use crate::error::AppError;
use meams_core::domain::Role;
use meams_core::ports::AccountStore;

/// Alphabet for generated passwords: letters, digits, and a fixed symbol set.
const PASSWORD_CHARSET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789!@#$%^&*";

//=========================================================================================
// Token Claims and Signer
//=========================================================================================

/// The signed token envelope. `sub` is the username.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

/// Issues and verifies HS256 bearer tokens with a shared secret.
///
/// Verification failures are indistinguishable to callers: malformed, bad
/// signature, and expired all surface as `InvalidCredentials`.
#[derive(Clone)]
pub struct TokenSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenSigner {
    pub fn new(secret: &str, ttl_minutes: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::minutes(ttl_minutes),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Encodes `{sub, role, iat, exp}` with the configured lifetime.
    pub fn issue(&self, username: &str, role: Role) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = Claims {
            sub: username.to_string(),
            role,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        jsonwebtoken::encode(&Header::default(), &claims, &self.encoding)
            .map_err(|_| AppError::InvalidCredentials)
    }

    /// Decodes and validates a token, including its expiry.
    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        let mut validation = Validation::default();
        validation.leeway = 0;
        jsonwebtoken::decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|_| AppError::InvalidCredentials)
    }
}

//=========================================================================================
// Password Hashing
//=========================================================================================

/// Hashes a password with argon2 and a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AppError::InvalidCredentials)
}

/// Verifies a password against a stored argon2 hash. An unparseable hash
/// verifies as false rather than erroring.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// Generates a password drawn uniformly from [`PASSWORD_CHARSET`] using the
/// OS RNG.
pub fn generate_secure_password(length: usize) -> String {
    let mut rng = rand::rng();
    (0..length)
        .map(|_| PASSWORD_CHARSET[rng.random_range(0..PASSWORD_CHARSET.len())] as char)
        .collect()
}

//=========================================================================================
// Principal Resolution
//=========================================================================================

/// The identity a verified credential resolves to.
#[derive(Debug, Clone)]
pub struct ResolvedPrincipal {
    pub username: String,
    pub role: Role,
    pub active: bool,
    pub first_login: bool,
    /// True when the principal came from the built-in set.
    pub builtin: bool,
}

/// Authenticates an identifier (username or email) and password against the
/// built-in set first, then the persistent store.
///
/// Built-in credentials are compared verbatim; persistent credentials go
/// through the argon2 verifier. Returns `None` on any mismatch so callers
/// cannot distinguish unknown users from wrong passwords.
pub async fn authenticate(
    builtins: &[BuiltinUser],
    accounts: &dyn AccountStore,
    identifier: &str,
    password: &str,
) -> Result<Option<ResolvedPrincipal>, AppError> {
    if let Some(user) = builtins.iter().find(|u| u.username == identifier) {
        if user.password == password {
            return Ok(Some(ResolvedPrincipal {
                username: user.username.clone(),
                role: Role::Admin,
                active: true,
                first_login: false,
                builtin: true,
            }));
        }
        return Ok(None);
    }

    let principal = match accounts.find_by_identifier(identifier).await? {
        Some(p) => p,
        None => return Ok(None),
    };
    if !verify_password(password, &principal.password_hash) {
        return Ok(None);
    }
    Ok(Some(ResolvedPrincipal {
        username: principal.username,
        role: principal.role,
        active: principal.active,
        first_login: principal.first_login,
        builtin: false,
    }))
}

/// Resolves a username to its current principal state, with the built-in set
/// shadowing the persistent store.
pub async fn resolve_principal(
    builtins: &[BuiltinUser],
    accounts: &dyn AccountStore,
    username: &str,
) -> Result<Option<ResolvedPrincipal>, AppError> {
    if let Some(user) = builtins.iter().find(|u| u.username == username) {
        return Ok(Some(ResolvedPrincipal {
            username: user.username.clone(),
            role: Role::Admin,
            active: true,
            first_login: false,
            builtin: true,
        }));
    }
    Ok(accounts
        .find_by_username(username)
        .await?
        .map(|p| ResolvedPrincipal {
            username: p.username,
            role: p.role,
            active: p.active,
            first_login: p.first_login,
            builtin: false,
        }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_token_round_trips() {
        let signer = TokenSigner::new("test-secret", 30);
        let token = signer.issue("tech1", Role::Staff).unwrap();
        let claims = signer.verify(&token).unwrap();
        assert_eq!(claims.sub, "tech1");
        assert_eq!(claims.role, Role::Staff);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn tampered_token_is_rejected() {
        let signer = TokenSigner::new("test-secret", 30);
        let token = signer.issue("tech1", Role::Staff).unwrap();
        let other = TokenSigner::new("other-secret", 30);
        assert!(other.verify(&token).is_err());
        assert!(signer.verify("not-a-token").is_err());
    }

    #[test]
    fn password_hash_round_trips() {
        let hash = hash_password("p@ss").unwrap();
        assert!(verify_password("p@ss", &hash));
        assert!(!verify_password("wrong", &hash));
        assert!(!verify_password("p@ss", "garbage-hash"));
    }

    #[test]
    fn generated_password_uses_charset() {
        let password = generate_secure_password(12);
        assert_eq!(password.len(), 12);
        assert!(password
            .bytes()
            .all(|b| PASSWORD_CHARSET.contains(&b)));
    }

    #[test]
    fn generated_passwords_differ() {
        assert_ne!(generate_secure_password(12), generate_secure_password(12));
    }
}
