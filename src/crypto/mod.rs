//! Cryptographic primitives for Keycraft.
//!
//! - AES-256-GCM encryption of secret values at rest (`encryption`)
//! - Argon2id master-key derivation from the vault password (`kdf`)
//! - HKDF sub-keys per entry and for file integrity (`keys`)

pub mod encryption;
pub mod kdf;
pub mod keys;

pub use encryption::{decrypt, encrypt};
pub use kdf::{derive_master_key_with_params, generate_salt, Argon2Params};
pub use keys::MasterKey;
