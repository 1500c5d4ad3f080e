//! Vault module — the credential store and everything under it.
//!
//! - `CredentialEntry`, `MaskedView` and `EntryFields` (`entry`)
//! - display masking (`mask`) and id minting (`ids`)
//! - binary file format with HMAC integrity (`format`)
//! - atomic snapshot persistence (`log`)
//! - the `CredentialStore` engine (`store`)

pub mod entry;
pub mod format;
pub mod ids;
pub mod log;
pub mod mask;
pub mod store;

pub use entry::{CredentialEntry, EntryFields, MaskedView};
pub use log::{PersistenceLog, DEFAULT_IO_TIMEOUT};
pub use store::CredentialStore;
