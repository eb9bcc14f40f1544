use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::crypto::EncryptionKey;
use crate::errors::{Result, VaultError};

/// Name of the environment variable holding the encryption key.
pub const KEY_ENV_VAR: &str = "DB_ENCRYPTION_KEY";

/// Project-level configuration, loaded from `.connvault.toml`.
///
/// Every field has a sensible default so connvault works out-of-the-box
/// without any config file at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Store document path, relative to the working directory.
    #[serde(default = "default_store_file")]
    pub store_file: String,

    /// Refuse to start with an ephemeral key when no key is supplied.
    #[serde(default)]
    pub require_external_key: bool,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_store_file() -> String {
    "connections.json".to_string()
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for Settings {
    fn default() -> Self {
        Self {
            store_file: default_store_file(),
            require_external_key: false,
        }
    }
}

impl Settings {
    /// Name of the config file we look for in the working directory.
    const FILE_NAME: &'static str = ".connvault.toml";

    /// Load settings from `<dir>/.connvault.toml`.
    ///
    /// If the file does not exist, sensible defaults are returned.
    /// If the file exists but cannot be parsed, an error is returned.
    pub fn load(dir: &Path) -> Result<Self> {
        let config_path = dir.join(Self::FILE_NAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)?;

        let settings: Settings = toml::from_str(&contents).map_err(|e| {
            VaultError::ConfigError(format!("Failed to parse {}: {e}", config_path.display()))
        })?;

        Ok(settings)
    }

    /// Full path of the store document under `dir`.
    pub fn store_path(&self, dir: &Path) -> PathBuf {
        dir.join(&self.store_file)
    }
}

/// Where the encryption key came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    /// Supplied by flag or environment; survives restarts.
    External,
    /// Generated at startup; lost when the process exits.
    Ephemeral,
}

/// Everything the store needs, resolved once at startup.
#[derive(Debug, Clone)]
pub struct VaultConfig {
    pub store_path: PathBuf,
    pub key: EncryptionKey,
    pub key_source: KeySource,
}

impl VaultConfig {
    /// Resolve the key and store path.
    ///
    /// `external_key` is the raw key string from a flag or
    /// `DB_ENCRYPTION_KEY`.  Without one, a random key is generated
    /// unless the settings forbid it.
    pub fn resolve(
        settings: &Settings,
        dir: &Path,
        store_override: Option<&Path>,
        external_key: Option<&str>,
    ) -> Result<Self> {
        let store_path = match store_override {
            Some(p) if p.is_absolute() => p.to_path_buf(),
            Some(p) => dir.join(p),
            None => settings.store_path(dir),
        };

        let (key, key_source) = match external_key.map(str::trim).filter(|k| !k.is_empty()) {
            Some(text) => (EncryptionKey::from_hex(text)?, KeySource::External),
            None if settings.require_external_key => {
                return Err(VaultError::ConfigError(format!(
                    "no encryption key supplied — set {KEY_ENV_VAR} (require_external_key is on)"
                )));
            }
            None => {
                warn!(
                    "{KEY_ENV_VAR} is not set; using a generated key that only lives as long as \
                     this process. Passwords saved now cannot be decrypted after a restart."
                );
                (EncryptionKey::generate(), KeySource::Ephemeral)
            }
        };

        Ok(Self {
            store_path,
            key,
            key_source,
        })
    }

    /// Convenience for tests and embedding: fixed key, explicit path.
    pub fn new(store_path: impl Into<PathBuf>, key: EncryptionKey) -> Self {
        Self {
            store_path: store_path.into(),
            key,
            key_source: KeySource::External,
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const HEX_KEY: &str = "8f0e1d2c3b4a59687766554433221100ffeeddccbbaa99887766554433221100";

    #[test]
    fn default_settings_are_sensible() {
        let s = Settings::default();
        assert_eq!(s.store_file, "connections.json");
        assert!(!s.require_external_key);
    }

    #[test]
    fn load_returns_defaults_when_no_config_file() {
        let tmp = TempDir::new().unwrap();
        let settings = Settings::load(tmp.path()).unwrap();
        assert_eq!(settings.store_file, "connections.json");
    }

    #[test]
    fn load_parses_toml_file() {
        let tmp = TempDir::new().unwrap();
        let config = r#"
store_file = "secrets/db.json"
require_external_key = true
"#;
        fs::write(tmp.path().join(".connvault.toml"), config).unwrap();

        let settings = Settings::load(tmp.path()).unwrap();
        assert_eq!(settings.store_file, "secrets/db.json");
        assert!(settings.require_external_key);
    }

    #[test]
    fn load_uses_defaults_for_missing_fields() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(".connvault.toml"), "require_external_key = true\n").unwrap();

        let settings = Settings::load(tmp.path()).unwrap();
        assert_eq!(settings.store_file, "connections.json");
    }

    #[test]
    fn load_errors_on_invalid_toml() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(".connvault.toml"), "not valid {{toml").unwrap();

        assert!(Settings::load(tmp.path()).is_err());
    }

    #[test]
    fn resolve_uses_external_key() {
        let dir = Path::new("/srv/app");
        let config = VaultConfig::resolve(&Settings::default(), dir, None, Some(HEX_KEY)).unwrap();

        assert_eq!(config.key_source, KeySource::External);
        assert_eq!(config.store_path, PathBuf::from("/srv/app/connections.json"));
        assert_eq!(config.key.to_hex().as_str(), HEX_KEY);
    }

    #[test]
    fn resolve_generates_ephemeral_key_when_missing() {
        let config =
            VaultConfig::resolve(&Settings::default(), Path::new("."), None, None).unwrap();
        assert_eq!(config.key_source, KeySource::Ephemeral);
    }

    #[test]
    fn resolve_treats_blank_key_as_missing() {
        let config =
            VaultConfig::resolve(&Settings::default(), Path::new("."), None, Some("  ")).unwrap();
        assert_eq!(config.key_source, KeySource::Ephemeral);
    }

    #[test]
    fn resolve_refuses_ephemeral_key_when_required() {
        let settings = Settings {
            require_external_key: true,
            ..Settings::default()
        };
        let err = VaultConfig::resolve(&settings, Path::new("."), None, None).unwrap_err();
        assert!(matches!(err, VaultError::ConfigError(_)));
    }

    #[test]
    fn resolve_rejects_malformed_key() {
        let err = VaultConfig::resolve(&Settings::default(), Path::new("."), None, Some("short"))
            .unwrap_err();
        assert!(matches!(err, VaultError::InvalidKey(_)));
    }

    #[test]
    fn store_override_is_relative_to_dir() {
        let config = VaultConfig::resolve(
            &Settings::default(),
            Path::new("/srv/app"),
            Some(Path::new("other.json")),
            Some(HEX_KEY),
        )
        .unwrap();
        assert_eq!(config.store_path, PathBuf::from("/srv/app/other.json"));
    }
}
