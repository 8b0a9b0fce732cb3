use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use credstore_core::KeyPolicy;

#[derive(Debug, Serialize, Deserialize)]
pub struct CredstoreConfig {
    pub identity: IdentitySection,
    pub store: StoreSection,
    pub vault: VaultSection,
    #[serde(default)]
    pub crypto: KeyPolicy,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IdentitySection {
    pub user: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StoreSection {
    pub global_path: String,
    /// Directory holding one property file per user identity
    pub user_dir: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VaultSection {
    pub backend: VaultBackend,
    pub keyfile_path: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VaultBackend {
    Keychain,
    Keyfile,
}

impl VaultBackend {
    pub fn as_str(self) -> &'static str {
        match self {
            VaultBackend::Keychain => "keychain",
            VaultBackend::Keyfile => "keyfile",
        }
    }
}

impl CredstoreConfig {
    pub fn new(
        identity: String,
        global_path: PathBuf,
        user_dir: PathBuf,
        backend: VaultBackend,
        keyfile_path: Option<PathBuf>,
        max_key_bits: u32,
    ) -> Self {
        Self {
            identity: IdentitySection { user: identity },
            store: StoreSection {
                global_path: global_path.to_string_lossy().to_string(),
                user_dir: user_dir.to_string_lossy().to_string(),
            },
            vault: VaultSection {
                backend,
                keyfile_path: keyfile_path.map(|path| path.to_string_lossy().to_string()),
            },
            crypto: KeyPolicy::restricted(max_key_bits),
        }
    }

    pub fn key_policy(&self) -> KeyPolicy {
        self.crypto
    }

    /// Property file of one user identity.
    pub fn user_props_path(&self, identity: &str) -> PathBuf {
        Path::new(&self.store.user_dir).join(format!("{}.json", identity))
    }
}

pub fn default_config_path() -> anyhow::Result<PathBuf> {
    Ok(xdg_config_dir()?.join("config.toml"))
}

pub fn default_global_path() -> anyhow::Result<PathBuf> {
    Ok(xdg_data_dir()?.join("global.json"))
}

pub fn default_user_dir() -> anyhow::Result<PathBuf> {
    Ok(xdg_data_dir()?.join("users"))
}

pub fn default_keyfile_path() -> anyhow::Result<PathBuf> {
    Ok(xdg_config_dir()?.join("vault.json"))
}

/// Installation identity when none is configured.
pub fn default_identity() -> String {
    ["USER", "USERNAME"]
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .find(|value| !value.trim().is_empty())
        .unwrap_or_else(|| "default".to_string())
}

pub fn read_config(path: &Path) -> anyhow::Result<CredstoreConfig> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read config {}: {}", path.display(), e))?;
    toml::from_str(&contents)
        .map_err(|e| anyhow::anyhow!("Failed to parse config {}: {}", path.display(), e))
}

pub fn write_config(path: &Path, config: &CredstoreConfig) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            anyhow::anyhow!(
                "Failed to create config directory {}: {}",
                parent.display(),
                e
            )
        })?;
    }
    let contents =
        toml::to_string_pretty(config).map_err(|e| anyhow::anyhow!("TOML error: {}", e))?;
    std::fs::write(path, contents)
        .map_err(|e| anyhow::anyhow!("Failed to write config {}: {}", path.display(), e))?;
    Ok(())
}

pub fn xdg_config_dir() -> anyhow::Result<PathBuf> {
    if let Ok(value) = std::env::var("XDG_CONFIG_HOME") {
        if !value.trim().is_empty() {
            return Ok(PathBuf::from(value).join("credstore"));
        }
    }
    Ok(home_dir()?.join(".config").join("credstore"))
}

pub fn xdg_data_dir() -> anyhow::Result<PathBuf> {
    if let Ok(value) = std::env::var("XDG_DATA_HOME") {
        if !value.trim().is_empty() {
            return Ok(PathBuf::from(value).join("credstore"));
        }
    }
    Ok(home_dir()?.join(".local").join("share").join("credstore"))
}

fn home_dir() -> anyhow::Result<PathBuf> {
    let home = std::env::var("HOME")
        .map_err(|_| anyhow::anyhow!("HOME is not set; cannot resolve default paths"))?;
    Ok(PathBuf::from(home))
}
