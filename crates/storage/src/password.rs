// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Password hashing (§4.4): scrypt with a salt and derived key each at least
//! 16 and 64 bytes, compared in constant time.

use rand::RngCore;
use scrypt::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use scrypt::{Params, Scrypt};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use thiserror::Error;

pub const MIN_SALT_LEN: usize = 16;
pub const MIN_HASH_LEN: usize = 64;
pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("password must be at least {MIN_PASSWORD_LEN} characters")]
    TooShort,
    #[error("password hashing failed: {0}")]
    Hash(String),
}

/// How a stored credential is encoded (§9 Open Question: plain-text
/// migration is supported, optional, and explicit via this field — a
/// `Plaintext` record is accepted once on login and immediately rehashed to
/// `Scrypt`, never written back out as `Plaintext`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashScheme {
    Scrypt,
    Plaintext,
}

/// A stored credential (§4.4, §6 player record `state`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredPassword {
    pub scheme: HashScheme,
    /// PHC-formatted hash string for `Scrypt`; the raw password for
    /// `Plaintext` (pre-migration only).
    pub encoded: String,
}

impl StoredPassword {
    /// Hash `password` with a freshly generated salt (§4.4: salt ≥ 16 bytes,
    /// derived key ≥ 64 bytes). scrypt's default `Params` derive a 32-byte
    /// key, short of the 64-byte floor, so the recommended cost parameters
    /// are kept but the output length is raised to [`MIN_HASH_LEN`]
    /// explicitly via `hash_password_customized`.
    pub fn hash(password: &str) -> Result<Self, PasswordError> {
        if password.len() < MIN_PASSWORD_LEN {
            return Err(PasswordError::TooShort);
        }
        let mut salt_bytes = [0u8; MIN_SALT_LEN];
        rand::thread_rng().fill_bytes(&mut salt_bytes);
        let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| PasswordError::Hash(e.to_string()))?;
        let params = Params::new(Params::RECOMMENDED_LOG_N, Params::RECOMMENDED_R, Params::RECOMMENDED_P, MIN_HASH_LEN)
            .map_err(|e| PasswordError::Hash(e.to_string()))?;
        let hash = Scrypt
            .hash_password_customized(password.as_bytes(), None, None, params, &salt)
            .map_err(|e| PasswordError::Hash(e.to_string()))?;
        Ok(Self { scheme: HashScheme::Scrypt, encoded: hash.to_string() })
    }

    /// Verify `password` against this record (§4.4 "comparison is
    /// constant-time"). `Plaintext` records compare bytes directly in
    /// constant time rather than via scrypt.
    pub fn verify(&self, password: &str) -> bool {
        match self.scheme {
            HashScheme::Scrypt => {
                let Ok(parsed) = PasswordHash::new(&self.encoded) else { return false };
                Scrypt.verify_password(password.as_bytes(), &parsed).is_ok()
            }
            HashScheme::Plaintext => {
                let stored = self.encoded.as_bytes();
                let given = password.as_bytes();
                stored.len() == given.len() && stored.ct_eq(given).into()
            }
        }
    }

    pub fn plaintext(password: impl Into<String>) -> Self {
        Self { scheme: HashScheme::Plaintext, encoded: password.into() }
    }
}

/// Password strength rule (§4.4): at least [`MIN_PASSWORD_LEN`] characters.
pub fn validate_password_strength(password: &str) -> Result<(), PasswordError> {
    if password.len() < MIN_PASSWORD_LEN {
        return Err(PasswordError::TooShort);
    }
    Ok(())
}
