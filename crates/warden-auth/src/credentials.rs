//! Password hashing and verification.

use crate::error::{AuthError, AuthResult};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use warden_common_secret::SecretString;

/// Checks presented passwords against stored argon2 hashes.
///
/// Stateless apart from a dummy hash used to spend the same time on unknown
/// usernames as on real ones.
#[derive(Clone)]
pub struct CredentialVerifier {
    argon2: Argon2<'static>,
    dummy_hash: String,
}

impl CredentialVerifier {
    /// Verifier with argon2id default parameters.
    pub fn new() -> AuthResult<Self> {
        Self::with_argon2(Argon2::default())
    }

    /// Verifier with explicit argon2 parameters.
    pub fn with_argon2(argon2: Argon2<'static>) -> AuthResult<Self> {
        let salt = SaltString::generate(&mut OsRng);
        let dummy_hash = argon2
            .hash_password(b"warden-timing-equalizer", &salt)
            .map_err(|e| AuthError::PasswordHash(e.to_string()))?
            .to_string();

        Ok(Self { argon2, dummy_hash })
    }

    /// Hash a password into a PHC string with a fresh random salt.
    pub fn hash(&self, password: &SecretString) -> AuthResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(password.expose_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AuthError::PasswordHash(e.to_string()))
    }

    /// Whether `password` matches `stored_hash`. Malformed hashes never match.
    pub fn verify(&self, password: &SecretString, stored_hash: &str) -> bool {
        match PasswordHash::new(stored_hash) {
            Ok(parsed) => self
                .argon2
                .verify_password(password.expose_bytes(), &parsed)
                .is_ok(),
            Err(_) => false,
        }
    }

    /// Spend one verification's worth of time, then fail.
    pub fn reject(&self, password: &SecretString) -> bool {
        let _ = self.verify(password, &self.dummy_hash);
        false
    }
}

impl std::fmt::Debug for CredentialVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialVerifier").finish_non_exhaustive()
    }
}
