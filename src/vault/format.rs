//! Binary vault file format and HMAC integrity verification.
//!
//! A `.kcv` file has this layout:
//!
//! ```text
//! [KCFT: 4 bytes][version: 1 byte][header_len: 4 bytes LE][header JSON][entries JSON][HMAC-SHA256: 32 bytes]
//! ```
//!
//! - **Magic** (`KCFT`): identifies the file as a Keycraft vault.
//! - **Version**: format version (currently `1`).
//! - **Header JSON**: serialized `VaultHeader` (salt and KDF cost).
//! - **Entries JSON**: serialized `Vec<StoredEntry>`, secrets encrypted.
//! - **HMAC-SHA256**: tag over header + entries bytes.
//!
//! Everything here works on byte buffers; file I/O lives in `log`.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::crypto::Argon2Params;
use crate::errors::LogError;

/// Magic bytes at the start of every vault file.
const MAGIC: &[u8; 4] = b"KCFT";

/// Current binary format version.
pub const CURRENT_VERSION: u8 = 1;

/// Size of the HMAC tag appended to the file.
const HMAC_LEN: usize = 32;

/// 4 (magic) + 1 (version) + 4 (header_len).
const PREFIX_LEN: usize = 9;

/// Metadata stored at the beginning of a vault file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultHeader {
    pub version: u8,

    /// Salt for Argon2id (base64 in JSON).
    #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
    pub salt: Vec<u8>,

    pub argon2_params: Argon2Params,

    /// When this vault file was first created.
    pub created_at: DateTime<Utc>,
}

/// On-disk form of a `CredentialEntry`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredEntry {
    pub id: String,
    pub name: String,
    pub vendor: String,

    /// nonce || AES-256-GCM ciphertext of the secret (base64 in JSON).
    #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
    pub encrypted_secret: Vec<u8>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_snippets: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Sections of a vault file after framing has been checked.
///
/// The raw section bytes are kept so the HMAC is verified over exactly
/// what was written, never over a re-serialization.
pub struct RawVault {
    pub header: VaultHeader,
    pub header_bytes: Vec<u8>,
    pub entries_bytes: Vec<u8>,
    pub stored_hmac: Vec<u8>,
}

impl RawVault {
    /// Verify the HMAC, then deserialize the entries section.
    pub fn verified_entries(&self, hmac_key: &[u8]) -> Result<Vec<StoredEntry>, LogError> {
        verify_hmac(hmac_key, &self.header_bytes, &self.entries_bytes, &self.stored_hmac)?;
        serde_json::from_slice(&self.entries_bytes)
            .map_err(|e| LogError::CorruptState(format!("entries JSON: {e}")))
    }
}

/// Serialize a full vault file into one buffer.
pub fn encode(
    header: &VaultHeader,
    entries: &[StoredEntry],
    hmac_key: &[u8],
) -> Result<Vec<u8>, LogError> {
    let header_bytes = serde_json::to_vec(header)
        .map_err(|e| LogError::IoFailure(format!("serialize header: {e}")))?;
    let entries_bytes = serde_json::to_vec(entries)
        .map_err(|e| LogError::IoFailure(format!("serialize entries: {e}")))?;

    let hmac_tag = compute_hmac(hmac_key, &header_bytes, &entries_bytes)?;

    let header_len = u32::try_from(header_bytes.len()).map_err(|_| {
        LogError::IoFailure(format!(
            "header length {} exceeds u32::MAX",
            header_bytes.len()
        ))
    })?;

    let mut buf =
        Vec::with_capacity(PREFIX_LEN + header_bytes.len() + entries_bytes.len() + HMAC_LEN);
    buf.extend_from_slice(MAGIC);
    buf.push(CURRENT_VERSION);
    buf.extend_from_slice(&header_len.to_le_bytes());
    buf.extend_from_slice(&header_bytes);
    buf.extend_from_slice(&entries_bytes);
    buf.extend_from_slice(&hmac_tag);
    Ok(buf)
}

/// Split a vault file into its sections and parse the header.
///
/// Anything that is not a well-framed version-1 Keycraft file is
/// `CorruptState`.  The entries are not trusted until `verified_entries`.
pub fn decode(data: &[u8]) -> Result<RawVault, LogError> {
    if data.len() < PREFIX_LEN + HMAC_LEN {
        return Err(corrupt("file too small to be a vault"));
    }
    if &data[0..4] != MAGIC {
        return Err(corrupt("missing KCFT magic bytes"));
    }

    let version = data[4];
    if version != CURRENT_VERSION {
        return Err(LogError::CorruptState(format!(
            "unsupported version {version}, expected {CURRENT_VERSION}"
        )));
    }

    let mut len_bytes = [0u8; 4];
    len_bytes.copy_from_slice(&data[5..PREFIX_LEN]);
    let header_len = usize::try_from(u32::from_le_bytes(len_bytes))
        .map_err(|_| corrupt("header length exceeds address space"))?;

    let header_end = PREFIX_LEN
        .checked_add(header_len)
        .filter(|end| end + HMAC_LEN <= data.len())
        .ok_or_else(|| corrupt("header length exceeds file size"))?;

    let header_bytes = data[PREFIX_LEN..header_end].to_vec();
    let entries_end = data.len() - HMAC_LEN;
    let entries_bytes = data[header_end..entries_end].to_vec();
    let stored_hmac = data[entries_end..].to_vec();

    let header: VaultHeader = serde_json::from_slice(&header_bytes)
        .map_err(|e| LogError::CorruptState(format!("header JSON: {e}")))?;
    if header.version != version {
        return Err(corrupt("header version does not match file prefix"));
    }

    Ok(RawVault {
        header,
        header_bytes,
        entries_bytes,
        stored_hmac,
    })
}

fn corrupt(msg: &str) -> LogError {
    LogError::CorruptState(msg.to_string())
}

/// HMAC-SHA256 over header + entries bytes.
pub fn compute_hmac(
    hmac_key: &[u8],
    header_bytes: &[u8],
    entries_bytes: &[u8],
) -> Result<Vec<u8>, LogError> {
    let mut mac = Hmac::<Sha256>::new_from_slice(hmac_key)
        .map_err(|e| LogError::IoFailure(format!("invalid HMAC key: {e}")))?;
    mac.update(header_bytes);
    mac.update(entries_bytes);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Constant-time HMAC check.
pub fn verify_hmac(
    hmac_key: &[u8],
    header_bytes: &[u8],
    entries_bytes: &[u8],
    expected_hmac: &[u8],
) -> Result<(), LogError> {
    let mut mac = Hmac::<Sha256>::new_from_slice(hmac_key)
        .map_err(|e| LogError::IoFailure(format!("invalid HMAC key: {e}")))?;
    mac.update(header_bytes);
    mac.update(entries_bytes);
    mac.verify_slice(expected_hmac).map_err(|_| {
        corrupt("HMAC verification failed — wrong password or tampered vault file")
    })
}

// ---------------------------------------------------------------------------
// Serde helpers for base64-encoded Vec<u8> fields
// ---------------------------------------------------------------------------

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

fn base64_encode<S>(data: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&BASE64.encode(data))
}

fn base64_decode<'de, D>(deserializer: D) -> std::result::Result<Vec<u8>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    BASE64.decode(&s).map_err(serde::de::Error::custom)
}
