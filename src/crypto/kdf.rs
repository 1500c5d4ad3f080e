//! Password-based key derivation using Argon2id.
//!
//! Parameters come from `.keycraft.toml` when a vault is created and are
//! stored in the vault header, so re-opening always uses the same cost.

use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::errors::{KeycraftError, Result};

/// Length of the salt in bytes.
pub const SALT_LEN: usize = 32;

/// Length of the derived key in bytes (AES-256).
pub const KEY_LEN: usize = 32;

/// Minimum safe memory cost in KiB (8 MB).
const MIN_MEMORY_KIB: u32 = 8_192;

/// Largest memory cost accepted, in KiB (4 GB).
const MAX_MEMORY_KIB: u32 = 4_194_304;

/// Upper bound for both iterations and parallelism lanes.
const MAX_PASSES: u32 = 64;

/// Argon2id cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Argon2Params {
    /// Memory cost in KiB (default: 65 536 = 64 MB).
    pub memory_kib: u32,
    /// Number of iterations (default: 3).
    pub iterations: u32,
    /// Parallelism lanes (default: 4).
    pub parallelism: u32,
}

impl Default for Argon2Params {
    fn default() -> Self {
        Self {
            memory_kib: 65_536,
            iterations: 3,
            parallelism: 4,
        }
    }
}

impl Argon2Params {
    /// Reject settings weak enough to make brute force cheap, or heavy
    /// enough that deriving the key would exhaust the machine.
    pub fn validate(&self) -> Result<()> {
        if self.memory_kib < MIN_MEMORY_KIB {
            return Err(KeycraftError::KeyDerivationFailed(format!(
                "Argon2 memory_kib must be at least {MIN_MEMORY_KIB} (got {})",
                self.memory_kib
            )));
        }
        if self.memory_kib > MAX_MEMORY_KIB {
            return Err(KeycraftError::KeyDerivationFailed(format!(
                "Argon2 memory_kib must be at most {MAX_MEMORY_KIB} (got {})",
                self.memory_kib
            )));
        }
        if !(1..=MAX_PASSES).contains(&self.iterations)
            || !(1..=MAX_PASSES).contains(&self.parallelism)
        {
            return Err(KeycraftError::KeyDerivationFailed(format!(
                "Argon2 iterations and parallelism must be between 1 and {MAX_PASSES}"
            )));
        }
        Ok(())
    }
}

/// Derive a 32-byte master key from a password and salt.
///
/// The same password + salt + params always produce the same key.
pub fn derive_master_key_with_params(
    password: &[u8],
    salt: &[u8],
    argon2_params: &Argon2Params,
) -> Result<[u8; KEY_LEN]> {
    argon2_params.validate()?;

    let params = Params::new(
        argon2_params.memory_kib,
        argon2_params.iterations,
        argon2_params.parallelism,
        Some(KEY_LEN),
    )
    .map_err(|e| KeycraftError::KeyDerivationFailed(format!("invalid Argon2 params: {e}")))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut key = [0u8; KEY_LEN];
    argon2
        .hash_password_into(password, salt, &mut key)
        .map_err(|e| KeycraftError::KeyDerivationFailed(format!("Argon2id hashing failed: {e}")))?;

    Ok(key)
}

/// Generate a cryptographically random salt.
pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    rand::rngs::OsRng.fill_bytes(&mut salt);
    salt
}
