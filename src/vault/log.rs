//! Durable snapshot storage with atomic replace.
//!
//! Every commit writes the complete set of entries to a fresh temp file in
//! the vault's directory, syncs it, and renames it over the committed file.
//! A crash at any point leaves either the old or the new snapshot visible,
//! never a mix.  Blocking I/O runs on a worker thread with a deadline so a
//! stalled disk turns into an `IoFailure` instead of a hang.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use chrono::Utc;
use zeroize::{Zeroize, Zeroizing};

use super::entry::CredentialEntry;
use super::format::{self, StoredEntry, VaultHeader, CURRENT_VERSION};
use crate::crypto::{self, derive_master_key_with_params, generate_salt, Argon2Params, MasterKey};
use crate::errors::{KeycraftError, LogError, Result};

/// Default deadline for a single load or commit.
pub const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(5);

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Handle to one vault file.
pub struct PersistenceLog {
    path: PathBuf,
    header: VaultHeader,
    master_key: MasterKey,
    io_timeout: Duration,
}

impl PersistenceLog {
    /// Create a new, empty vault file at `path`.
    pub fn create(
        path: &Path,
        password: &[u8],
        argon2_params: &Argon2Params,
        io_timeout: Duration,
    ) -> Result<Self> {
        if path.exists() {
            return Err(KeycraftError::VaultAlreadyExists(path.to_path_buf()));
        }
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let salt = generate_salt();
        let master_key = master_key(password, &salt, argon2_params)?;
        let header = VaultHeader {
            version: CURRENT_VERSION,
            salt: salt.to_vec(),
            argon2_params: *argon2_params,
            created_at: Utc::now(),
        };

        let log = Self {
            path: path.to_path_buf(),
            header,
            master_key,
            io_timeout,
        };
        log.commit(std::iter::empty())?;

        tracing::info!(path = %path.display(), "created vault");
        Ok(log)
    }

    /// Open an existing vault file and derive its key from `password`.
    ///
    /// Only the header is parsed here; a wrong password is detected by
    /// the HMAC check in `load`.  The header is not authenticated yet, so
    /// its KDF params are bounds-checked before any key is derived.
    pub fn open(path: &Path, password: &[u8], io_timeout: Duration) -> Result<Self> {
        if !path.exists() {
            return Err(KeycraftError::VaultNotFound(path.to_path_buf()));
        }
        let data = read_bounded(path, io_timeout)?;
        let raw = format::decode(&data)?;

        let params = raw.header.argon2_params;
        params
            .validate()
            .map_err(|e| LogError::CorruptState(format!("header KDF params: {e}")))?;
        let master_key = master_key(password, &raw.header.salt, &params)
            .map_err(|e| LogError::CorruptState(format!("header KDF input: {e}")))?;

        Ok(Self {
            path: path.to_path_buf(),
            header: raw.header,
            master_key,
            io_timeout,
        })
    }

    /// Read and verify the latest committed snapshot.
    pub fn load(&self) -> std::result::Result<Vec<CredentialEntry>, LogError> {
        let data = read_bounded(&self.path, self.io_timeout)?;
        let raw = format::decode(&data)?;
        if raw.header.salt != self.header.salt {
            return Err(LogError::CorruptState(
                "vault file was replaced by a different vault".into(),
            ));
        }

        let hmac_key = self.hmac_key()?;
        let stored = raw.verified_entries(hmac_key.as_slice())?;

        let entries = stored
            .into_iter()
            .map(|s| self.open_entry(s))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        tracing::debug!(count = entries.len(), "loaded snapshot");
        Ok(entries)
    }

    /// Atomically replace the committed snapshot with `entries`.
    pub fn commit<'a>(
        &self,
        entries: impl IntoIterator<Item = &'a CredentialEntry>,
    ) -> std::result::Result<(), LogError> {
        let mut stored = entries
            .into_iter()
            .map(|e| self.seal_entry(e))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        stored.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));

        let hmac_key = self.hmac_key()?;
        let bytes = format::encode(&self.header, &stored, hmac_key.as_slice())?;

        let tmp_path = self.temp_path();
        let tmp = run_bounded(self.io_timeout, "commit", move || {
            TempFile::write(tmp_path, &bytes)
        })?;
        // The rename stays on this thread, unbounded: a rename finishing
        // after a timeout would change the file after the caller rolled back.
        tmp.persist(&self.path)?;
        sync_dir(&self.path);

        tracing::debug!(count = stored.len(), "committed snapshot");
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn header(&self) -> &VaultHeader {
        &self.header
    }

    pub fn io_timeout(&self) -> Duration {
        self.io_timeout
    }

    fn hmac_key(&self) -> std::result::Result<Zeroizing<[u8; 32]>, LogError> {
        self.master_key
            .hmac_key()
            .map_err(|e| LogError::IoFailure(e.to_string()))
    }

    fn seal_entry(&self, entry: &CredentialEntry) -> std::result::Result<StoredEntry, LogError> {
        let key = self
            .master_key
            .entry_key(&entry.id)
            .map_err(|e| LogError::IoFailure(e.to_string()))?;
        let encrypted_secret = crypto::encrypt(
            key.as_slice(),
            entry.secret_value().as_bytes(),
            entry.id.as_bytes(),
        )
        .map_err(|e| LogError::IoFailure(e.to_string()))?;

        Ok(StoredEntry {
            id: entry.id.clone(),
            name: entry.name.clone(),
            vendor: entry.vendor.clone(),
            encrypted_secret,
            base_url: entry.base_url.clone(),
            doc_url: entry.doc_url.clone(),
            code_snippets: entry.code_snippets.clone(),
            tags: entry.tags.clone(),
            notes: entry.notes.clone(),
            created_at: entry.created_at,
            updated_at: entry.updated_at,
        })
    }

    fn open_entry(&self, stored: StoredEntry) -> std::result::Result<CredentialEntry, LogError> {
        let key = self
            .master_key
            .entry_key(&stored.id)
            .map_err(|e| LogError::IoFailure(e.to_string()))?;
        let plaintext = crypto::decrypt(key.as_slice(), &stored.encrypted_secret, stored.id.as_bytes())
            .map_err(|_| {
                LogError::CorruptState(format!("secret of entry '{}' cannot be decrypted", stored.id))
            })?;
        let secret = String::from_utf8(plaintext).map_err(|e| {
            let mut bad = e.into_bytes();
            bad.zeroize();
            LogError::CorruptState(format!("secret of entry '{}' is not UTF-8", stored.id))
        })?;

        if stored.updated_at < stored.created_at {
            return Err(LogError::CorruptState(format!(
                "entry '{}' was updated before it was created",
                stored.id
            )));
        }

        Ok(CredentialEntry::from_parts(
            stored.id,
            stored.name,
            stored.vendor,
            Zeroizing::new(secret),
            stored.base_url,
            stored.doc_url,
            stored.code_snippets,
            stored.tags,
            stored.notes,
            stored.created_at,
            stored.updated_at,
        ))
    }

    /// Unique per commit, in the same directory so rename stays atomic.
    fn temp_path(&self) -> PathBuf {
        let parent = self.path.parent().unwrap_or(Path::new("."));
        let n = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        parent.join(format!(
            ".{}.{}.{n}.tmp",
            self.path.file_name().unwrap_or_default().to_string_lossy(),
            std::process::id()
        ))
    }
}

fn master_key(password: &[u8], salt: &[u8], params: &Argon2Params) -> Result<MasterKey> {
    let mut bytes = derive_master_key_with_params(password, salt, params)?;
    let key = MasterKey::new(bytes);
    bytes.zeroize();
    Ok(key)
}

fn read_bounded(path: &Path, timeout: Duration) -> std::result::Result<Vec<u8>, LogError> {
    let path = path.to_path_buf();
    run_bounded(timeout, "load", move || fs::read(path))
}

/// Run blocking I/O on a worker thread, waiting at most `timeout`.
///
/// If the deadline passes, the worker's eventual result is dropped.
fn run_bounded<T, F>(timeout: Duration, what: &str, job: F) -> std::result::Result<T, LogError>
where
    T: Send + 'static,
    F: FnOnce() -> std::io::Result<T> + Send + 'static,
{
    let (tx, rx) = mpsc::sync_channel(1);
    thread::Builder::new()
        .name(format!("keycraft-{what}"))
        .spawn(move || {
            let _ = tx.send(job());
        })
        .map_err(|e| LogError::IoFailure(format!("{what}: cannot start I/O worker: {e}")))?;

    match rx.recv_timeout(timeout) {
        Ok(result) => result.map_err(|e| LogError::IoFailure(format!("{what}: {e}"))),
        Err(RecvTimeoutError::Timeout) => {
            tracing::warn!(operation = what, timeout_ms = timeout.as_millis() as u64, "vault I/O timed out");
            Err(LogError::IoFailure(format!(
                "{what} timed out after {} ms",
                timeout.as_millis()
            )))
        }
        Err(RecvTimeoutError::Disconnected) => {
            Err(LogError::IoFailure(format!("{what}: I/O worker exited")))
        }
    }
}

/// A synced temp file that is removed on drop unless persisted.
struct TempFile {
    path: PathBuf,
    armed: bool,
}

impl TempFile {
    fn write(path: PathBuf, bytes: &[u8]) -> std::io::Result<Self> {
        let mut options = OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options.open(&path)?;
        let tmp = Self { path, armed: true };
        file.write_all(bytes)?;
        file.sync_all()?;
        Ok(tmp)
    }

    fn persist(mut self, target: &Path) -> std::result::Result<(), LogError> {
        fs::rename(&self.path, target)?;
        self.armed = false;
        Ok(())
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        if self.armed {
            let _ = fs::remove_file(&self.path);
        }
    }
}

/// Make the rename itself durable. Best effort; not supported everywhere.
fn sync_dir(path: &Path) {
    #[cfg(unix)]
    {
        let parent = path.parent().unwrap_or(Path::new("."));
        let dir = if parent.as_os_str().is_empty() {
            Path::new(".")
        } else {
            parent
        };
        if let Ok(d) = fs::File::open(dir) {
            let _ = d.sync_all();
        }
    }
    #[cfg(not(unix))]
    let _ = path;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vault::entry::EntryFields;
    use tempfile::TempDir;

    fn fast() -> Argon2Params {
        Argon2Params {
            memory_kib: 8_192,
            iterations: 1,
            parallelism: 1,
        }
    }

    fn entry(id: &str, secret: &str) -> CredentialEntry {
        CredentialEntry::create(id.into(), EntryFields::new("Prod", "OpenAI", secret), Utc::now())
    }

    fn new_log(dir: &TempDir) -> PersistenceLog {
        PersistenceLog::create(&dir.path().join("keys.kcv"), b"pw", &fast(), DEFAULT_IO_TIMEOUT)
            .unwrap()
    }

    #[test]
    fn commit_then_load_round_trips() {
        let dir = TempDir::new().unwrap();
        let log = new_log(&dir);
        let snapshot = vec![entry("a", "sk-aaaaaaaaaaaa"), entry("b", "sk-bbbbbbbbbbbb")];
        log.commit(&snapshot).unwrap();

        assert_eq!(log.load().unwrap(), snapshot);
    }

    #[test]
    fn secrets_are_not_stored_in_plaintext() {
        let dir = TempDir::new().unwrap();
        let log = new_log(&dir);
        log.commit(&[entry("a", "sk-super-secret-value")]).unwrap();

        let bytes = fs::read(log.path()).unwrap();
        let needle = b"sk-super-secret-value";
        assert!(!bytes.windows(needle.len()).any(|w| w == needle));
    }

    #[test]
    fn reopen_with_wrong_password_is_corrupt_state() {
        let dir = TempDir::new().unwrap();
        let log = new_log(&dir);
        log.commit(&[entry("a", "sk-aaaaaaaaaaaa")]).unwrap();

        let other = PersistenceLog::open(log.path(), b"wrong", DEFAULT_IO_TIMEOUT).unwrap();
        assert!(matches!(other.load(), Err(LogError::CorruptState(_))));
    }

    #[test]
    fn commit_failure_leaves_committed_file_alone() {
        let dir = TempDir::new().unwrap();
        let log = new_log(&dir);
        log.commit(&[entry("a", "sk-aaaaaaaaaaaa")]).unwrap();
        let before = fs::read(log.path()).unwrap();

        // Hide the directory so the temp file cannot be created.
        let moved = dir.path().with_extension("moved");
        fs::rename(dir.path(), &moved).unwrap();
        let result = log.commit(&[entry("b", "sk-bbbbbbbbbbbb")]);
        fs::rename(&moved, dir.path()).unwrap();

        assert!(matches!(result, Err(LogError::IoFailure(_))));
        assert_eq!(fs::read(log.path()).unwrap(), before);
    }

    #[test]
    fn timed_out_commit_reports_io_failure_and_cleans_up() {
        let dir = TempDir::new().unwrap();
        let mut log = new_log(&dir);
        let before = fs::read(log.path()).unwrap();

        log.io_timeout = Duration::ZERO;
        let result = log.commit(&[entry("a", "sk-aaaaaaaaaaaa")]);
        assert!(matches!(result, Err(LogError::IoFailure(_))));

        // Give the abandoned worker time to finish and remove its temp file.
        thread::sleep(Duration::from_millis(500));
        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("keys.kcv")]);
        assert_eq!(fs::read(log.path()).unwrap(), before);
    }

    #[test]
    fn create_refuses_existing_file() {
        let dir = TempDir::new().unwrap();
        let log = new_log(&dir);
        let again = PersistenceLog::create(log.path(), b"pw", &fast(), DEFAULT_IO_TIMEOUT);
        assert!(matches!(again, Err(KeycraftError::VaultAlreadyExists(_))));
    }

    #[test]
    fn open_missing_vault_fails() {
        let dir = TempDir::new().unwrap();
        let result = PersistenceLog::open(&dir.path().join("nope.kcv"), b"pw", DEFAULT_IO_TIMEOUT);
        assert!(matches!(result, Err(KeycraftError::VaultNotFound(_))));
    }

    #[test]
    fn garbage_file_is_corrupt_state() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("keys.kcv");
        fs::write(&path, b"id,name,secret\n1,prod,sk-123\n").unwrap();
        let result = PersistenceLog::open(&path, b"pw", DEFAULT_IO_TIMEOUT);
        assert!(matches!(
            result,
            Err(KeycraftError::Persistence(LogError::CorruptState(_)))
        ));
    }

    /// Rewrite the header JSON of a vault file, keeping the framing valid.
    fn rewrite_header(path: &Path, from: &str, to: &str) {
        let bytes = fs::read(path).unwrap();
        let len = u32::from_le_bytes(bytes[5..9].try_into().unwrap()) as usize;
        let header = std::str::from_utf8(&bytes[9..9 + len]).unwrap();
        assert!(header.contains(from), "header lacks {from}: {header}");
        let header = header.replace(from, to);

        let mut out = bytes[..5].to_vec();
        out.extend_from_slice(&(header.len() as u32).to_le_bytes());
        out.extend_from_slice(header.as_bytes());
        out.extend_from_slice(&bytes[9 + len..]);
        fs::write(path, out).unwrap();
    }

    #[test]
    fn out_of_range_header_params_are_corrupt_state() {
        for bad in [
            r#""memory_kib":1024"#,
            r#""memory_kib":4294967295"#,
        ] {
            let dir = TempDir::new().unwrap();
            let log = new_log(&dir);
            rewrite_header(log.path(), r#""memory_kib":8192"#, bad);

            let result = PersistenceLog::open(log.path(), b"pw", DEFAULT_IO_TIMEOUT);
            assert!(
                matches!(result, Err(KeycraftError::Persistence(LogError::CorruptState(_)))),
                "{bad} was not rejected as corrupt"
            );
        }

        let dir = TempDir::new().unwrap();
        let log = new_log(&dir);
        rewrite_header(log.path(), r#""parallelism":1"#, r#""parallelism":4294967295"#);
        let result = PersistenceLog::open(log.path(), b"pw", DEFAULT_IO_TIMEOUT);
        assert!(matches!(
            result,
            Err(KeycraftError::Persistence(LogError::CorruptState(_)))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn committed_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let log = new_log(&dir);
        let mode = fs::metadata(log.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
