use std::path::PathBuf;
use thiserror::Error;

/// Failures of the on-disk persistence log.
///
/// Surfaced to callers verbatim inside [`KeycraftError::Persistence`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LogError {
    /// The storage medium could not be read or written (includes timeouts).
    #[error("I/O failure: {0}")]
    IoFailure(String),

    /// The stored file is not a valid Keycraft vault, or has been tampered with.
    #[error("corrupt vault state: {0}")]
    CorruptState(String),
}

impl From<std::io::Error> for LogError {
    fn from(e: std::io::Error) -> Self {
        LogError::IoFailure(e.to_string())
    }
}

/// All errors that can occur in Keycraft.
#[derive(Debug, Error)]
pub enum KeycraftError {
    // --- Engine errors ---
    #[error("invalid value for field '{field}'")]
    Validation { field: &'static str },

    #[error("entry '{id}' not found")]
    NotFound { id: String },

    #[error("persistence error: {0}")]
    Persistence(#[from] LogError),

    #[error("credential store is not loaded yet")]
    Unavailable,

    // --- Crypto errors ---
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Decryption failed — wrong password or corrupted data")]
    DecryptionFailed,

    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    // --- Vault file errors ---
    #[error("Vault not found at {0}")]
    VaultNotFound(PathBuf),

    #[error("Vault already exists at {0}")]
    VaultAlreadyExists(PathBuf),

    // --- Config errors ---
    #[error("Config file error: {0}")]
    ConfigError(String),

    // --- IO errors ---
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // --- CLI errors ---
    #[error("Command failed: {0}")]
    CommandFailed(String),

    #[error("Clipboard error: {0}")]
    ClipboardError(String),

    #[error("Audit error: {0}")]
    AuditError(String),
}

impl KeycraftError {
    /// Shorthand used by the engine's field validation.
    pub fn invalid(field: &'static str) -> Self {
        KeycraftError::Validation { field }
    }

    pub fn not_found(id: impl Into<String>) -> Self {
        KeycraftError::NotFound { id: id.into() }
    }
}

/// Convenience type alias for Keycraft results.
pub type Result<T> = std::result::Result<T, KeycraftError>;
