//! HKDF-SHA256 sub-keys derived from the master key.
//!
//! - one encryption key per entry, bound to the entry id
//! - one HMAC key for whole-file integrity

use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::{Zeroize, Zeroizing};

use super::kdf::KEY_LEN;
use crate::errors::{KeycraftError, Result};

/// A 32-byte master key that zeroes its memory when dropped.
#[derive(Zeroize)]
#[zeroize(drop)]
pub struct MasterKey {
    bytes: [u8; KEY_LEN],
}

impl MasterKey {
    /// Take ownership of raw key bytes. The caller's copy should be zeroized.
    pub fn new(bytes: [u8; KEY_LEN]) -> Self {
        Self { bytes }
    }

    /// Key used to encrypt the secret of entry `entry_id`.
    pub fn entry_key(&self, entry_id: &str) -> Result<Zeroizing<[u8; KEY_LEN]>> {
        let info = format!("keycraft-entry:{entry_id}");
        expand(&self.bytes, info.as_bytes())
    }

    /// Key used to authenticate the whole vault file.
    pub fn hmac_key(&self) -> Result<Zeroizing<[u8; KEY_LEN]>> {
        expand(&self.bytes, b"keycraft-file-hmac")
    }
}

// The master key already comes out of Argon2id, so extract is skipped.
fn expand(ikm: &[u8], info: &[u8]) -> Result<Zeroizing<[u8; KEY_LEN]>> {
    let hk = Hkdf::<Sha256>::new(None, ikm);
    let mut okm = Zeroizing::new([0u8; KEY_LEN]);
    hk.expand(info, &mut okm[..])
        .map_err(|e| KeycraftError::KeyDerivationFailed(format!("HKDF expand failed: {e}")))?;
    Ok(okm)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_keys_are_distinct_per_id() {
        let key = MasterKey::new([9u8; KEY_LEN]);
        let a = key.entry_key("a").unwrap();
        let b = key.entry_key("b").unwrap();
        assert_ne!(*a, *b);
        assert_eq!(*a, *key.entry_key("a").unwrap());
    }

    #[test]
    fn hmac_key_differs_from_entry_keys() {
        let key = MasterKey::new([9u8; KEY_LEN]);
        assert_ne!(*key.hmac_key().unwrap(), *key.entry_key("").unwrap());
    }
}
