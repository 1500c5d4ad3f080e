use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::crypto::Argon2Params;
use crate::errors::{KeycraftError, Result};

/// Project-level configuration, loaded from `.keycraft.toml`.
///
/// Every field has a default so Keycraft works without a config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Directory (relative to the project root) holding the vault file.
    #[serde(default = "default_vault_dir")]
    pub vault_dir: String,

    /// File name of the vault inside `vault_dir`.
    #[serde(default = "default_vault_file")]
    pub vault_file: String,

    /// Argon2 memory cost in KiB (default: 64 MB). Used when creating a vault.
    #[serde(default = "default_argon2_memory_kib")]
    pub argon2_memory_kib: u32,

    /// Argon2 iteration count (default: 3).
    #[serde(default = "default_argon2_iterations")]
    pub argon2_iterations: u32,

    /// Argon2 parallelism degree (default: 4).
    #[serde(default = "default_argon2_parallelism")]
    pub argon2_parallelism: u32,

    /// Deadline for a single vault read or write, in milliseconds.
    #[serde(default = "default_io_timeout_ms")]
    pub io_timeout_ms: u64,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_vault_dir() -> String {
    ".keycraft".to_string()
}

fn default_vault_file() -> String {
    "keys.kcv".to_string()
}

fn default_argon2_memory_kib() -> u32 {
    65_536
}

fn default_argon2_iterations() -> u32 {
    3
}

fn default_argon2_parallelism() -> u32 {
    4
}

fn default_io_timeout_ms() -> u64 {
    5_000
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for Settings {
    fn default() -> Self {
        Self {
            vault_dir: default_vault_dir(),
            vault_file: default_vault_file(),
            argon2_memory_kib: default_argon2_memory_kib(),
            argon2_iterations: default_argon2_iterations(),
            argon2_parallelism: default_argon2_parallelism(),
            io_timeout_ms: default_io_timeout_ms(),
        }
    }
}

impl Settings {
    /// Name of the config file we look for in the project root.
    pub const FILE_NAME: &'static str = ".keycraft.toml";

    /// Load settings from `<project_dir>/.keycraft.toml`.
    ///
    /// A missing file yields defaults; an unparsable one is an error.
    pub fn load(project_dir: &Path) -> Result<Self> {
        let config_path = project_dir.join(Self::FILE_NAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)?;

        let settings: Settings = toml::from_str(&contents).map_err(|e| {
            KeycraftError::ConfigError(format!("Failed to parse {}: {e}", config_path.display()))
        })?;

        if settings.io_timeout_ms == 0 {
            return Err(KeycraftError::ConfigError(
                "io_timeout_ms must be greater than zero".into(),
            ));
        }

        tracing::debug!(path = %config_path.display(), "loaded settings");
        Ok(settings)
    }

    /// Full path of the vault file, e.g. `project_dir/.keycraft/keys.kcv`.
    pub fn vault_path(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(&self.vault_dir).join(&self.vault_file)
    }

    pub fn argon2_params(&self) -> Argon2Params {
        Argon2Params {
            memory_kib: self.argon2_memory_kib,
            iterations: self.argon2_iterations,
            parallelism: self.argon2_parallelism,
        }
    }

    pub fn io_timeout(&self) -> Duration {
        Duration::from_millis(self.io_timeout_ms)
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn defaults() {
        let s = Settings::default();
        assert_eq!(s.vault_dir, ".keycraft");
        assert_eq!(s.vault_file, "keys.kcv");
        assert_eq!(s.argon2_params(), Argon2Params::default());
        assert_eq!(s.io_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn load_returns_defaults_when_no_config_file() {
        let tmp = TempDir::new().unwrap();
        let settings = Settings::load(tmp.path()).unwrap();
        assert_eq!(settings.vault_file, "keys.kcv");
    }

    #[test]
    fn load_parses_toml_and_fills_gaps() {
        let tmp = TempDir::new().unwrap();
        let config = r#"
vault_dir = "secrets"
argon2_memory_kib = 131072
io_timeout_ms = 250
"#;
        fs::write(tmp.path().join(".keycraft.toml"), config).unwrap();

        let settings = Settings::load(tmp.path()).unwrap();
        assert_eq!(settings.vault_dir, "secrets");
        assert_eq!(settings.argon2_memory_kib, 131_072);
        assert_eq!(settings.argon2_iterations, 3);
        assert_eq!(settings.io_timeout(), Duration::from_millis(250));
        assert_eq!(
            settings.vault_path(Path::new("/home/user/proj")),
            PathBuf::from("/home/user/proj/secrets/keys.kcv")
        );
    }

    #[test]
    fn load_errors_on_invalid_toml() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(".keycraft.toml"), "not valid {{toml").unwrap();
        assert!(Settings::load(tmp.path()).is_err());
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(".keycraft.toml"), "io_timeout_ms = 0\n").unwrap();
        assert!(matches!(
            Settings::load(tmp.path()),
            Err(KeycraftError::ConfigError(_))
        ));
    }
}
