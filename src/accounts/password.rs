//! Credential hashing.
//!
//! Secrets are stored as Argon2id PHC strings with a random per-account salt.
//! Verification goes through the PHC verifier, which compares tags in constant time.

use anyhow::{Result, anyhow};
use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{self, SaltString},
};
use rand::rngs::OsRng;

/// Verified when the identifier is unknown so both login failures cost the same.
const DUMMY_SECRET: &str = "roster-timing-equalizer";

#[derive(Clone)]
pub struct CredentialHasher {
    argon2: Argon2<'static>,
    dummy_hash: String,
}

impl std::fmt::Debug for CredentialHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialHasher")
            .field("algorithm", &"argon2id")
            .finish_non_exhaustive()
    }
}

impl CredentialHasher {
    /// Argon2id with the crate's default parameters.
    ///
    /// # Errors
    /// Returns an error if the dummy hash cannot be computed.
    pub fn new() -> Result<Self> {
        Self::with_argon2(Argon2::default())
    }

    /// # Errors
    /// Returns an error if the dummy hash cannot be computed.
    pub fn with_argon2(argon2: Argon2<'static>) -> Result<Self> {
        let dummy_hash = hash_with(&argon2, DUMMY_SECRET)?;
        Ok(Self { argon2, dummy_hash })
    }

    /// # Errors
    /// Returns an error if hashing fails.
    pub fn hash(&self, secret: &str) -> Result<String> {
        hash_with(&self.argon2, secret)
    }

    /// `Ok(false)` on mismatch; `Err` only when the stored hash is unusable.
    ///
    /// # Errors
    /// Returns an error if `stored_hash` is not a valid PHC string.
    pub fn verify(&self, secret: &str, stored_hash: &str) -> Result<bool> {
        let parsed =
            PasswordHash::new(stored_hash).map_err(|e| anyhow!("invalid stored hash: {e}"))?;
        match self.argon2.verify_password(secret.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(e) => Err(anyhow!("failed to verify credential: {e}")),
        }
    }

    /// Burn one verification against a fixed hash. Always reports a mismatch.
    pub fn verify_dummy(&self, secret: &str) {
        let _ = self.verify(secret, &self.dummy_hash);
    }
}

fn hash_with(argon2: &Argon2<'static>, secret: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    argon2
        .hash_password(secret.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| anyhow!("failed to hash credential: {e}"))
}
