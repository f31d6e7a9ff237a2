//! Token generation and password hashing.
//!
//! - Session and super tokens: 32 bytes from the thread-local CSPRNG,
//!   hex encoded (64 chars). Only their SHA-256 digests are ever stored.
//! - Passwords: Argon2id PHC strings behind the [`PasswordHasher`] trait so
//!   tests can run with cheap parameters.

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{
        self, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString, rand_core::OsRng,
    },
};
use rand::Rng;
use sha2::{Digest, Sha256};

/// Failure modes of the password capability.
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    /// Plaintext does not match the digest
    #[error("password mismatch")]
    Mismatch,

    /// The stored digest is not a parseable PHC string
    #[error("malformed password hash: {0}")]
    Malformed(String),

    #[error("hashing failed: {0}")]
    Hashing(String),
}

/// Opaque hash/verify capability.
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, plaintext: &str) -> Result<String, PasswordError>;

    fn verify(&self, digest: &str, plaintext: &str) -> Result<(), PasswordError>;
}

/// Argon2id hasher.
#[derive(Clone)]
pub struct Argon2Hasher {
    params: Params,
}

impl Argon2Hasher {
    pub fn new() -> Self {
        Self {
            params: Params::default(),
        }
    }

    /// Use explicit cost parameters (memory KiB, iterations, lanes).
    pub fn with_params(m_cost: u32, t_cost: u32, p_cost: u32) -> Result<Self, PasswordError> {
        let params = Params::new(m_cost, t_cost, p_cost, None)
            .map_err(|e| PasswordError::Hashing(e.to_string()))?;
        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }
}

impl Default for Argon2Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl PasswordHasher for Argon2Hasher {
    fn hash(&self, plaintext: &str) -> Result<String, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2()
            .hash_password(plaintext.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| PasswordError::Hashing(e.to_string()))
    }

    fn verify(&self, digest: &str, plaintext: &str) -> Result<(), PasswordError> {
        let parsed = PasswordHash::new(digest).map_err(|e| PasswordError::Malformed(e.to_string()))?;

        // Parameters come from the PHC string, not from `self.params`.
        match Argon2::default().verify_password(plaintext.as_bytes(), &parsed) {
            Ok(()) => Ok(()),
            Err(password_hash::Error::Password) => Err(PasswordError::Mismatch),
            Err(e) => Err(PasswordError::Malformed(e.to_string())),
        }
    }
}

/// Generate a session or super token.
///
/// 64 hex characters (32 bytes of randomness).
pub fn generate_token() -> String {
    let bytes: [u8; 32] = rand::random();
    hex::encode(bytes)
}

/// SHA-256 hex digest of a token, used as the storage key.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

const ALPHANUMERIC_LOWER: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const PASSWORD_CHARS: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz23456789";

/// Random username for quick-signup: a letter followed by `len - 1`
/// lowercase alphanumerics, so it always passes username validation.
pub fn generate_username(len: usize) -> String {
    let mut rng = rand::rng();
    let first = char::from(b'a' + rng.random_range(0..26u8));
    std::iter::once(first)
        .chain((1..len).map(|_| {
            char::from(ALPHANUMERIC_LOWER[rng.random_range(0..ALPHANUMERIC_LOWER.len())])
        }))
        .collect()
}

/// Random password for quick-signup, avoiding look-alike characters.
pub fn generate_password(len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .map(|_| char::from(PASSWORD_CHARS[rng.random_range(0..PASSWORD_CHARS.len())]))
        .collect()
}
