//! User configuration (`config.json`) and on-disk layout.
//!
//! Resolution order: environment (`BC4_*`, optionally from `.env`) over the
//! config file over built-in defaults.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::auth::OAuthConfig;
use crate::error::{Bc4Error, Result};
use crate::util::fs::atomic_write;

pub const CONFIG_FILE_NAME: &str = "config.json";
pub const AUTH_FILE_NAME: &str = "auth.json";

pub const ENV_CLIENT_ID: &str = "BC4_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "BC4_CLIENT_SECRET";
pub const ENV_ACCOUNT_ID: &str = "BC4_ACCOUNT_ID";
pub const ENV_PROJECT_ID: &str = "BC4_PROJECT_ID";

/// Contents of `config.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bc4Config {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub client_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub client_secret: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub default_account: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub default_project: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub accounts: BTreeMap<String, AccountConfig>,
    #[serde(default)]
    pub preferences: Preferences,
}

/// Per-account settings keyed by account id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountConfig {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub default_project: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub project_defaults: BTreeMap<String, ProjectDefaults>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectDefaults {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub default_todo_list: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub default_campfire: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub default_card_table: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub editor: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub pager: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub color: String,
}

impl Bc4Config {
    /// Settings used when no config file exists yet.
    pub fn first_run_defaults() -> Self {
        Self {
            preferences: Preferences {
                editor: std::env::var("EDITOR").unwrap_or_default(),
                pager: "less".to_string(),
                color: "auto".to_string(),
            },
            ..Self::default()
        }
    }

    /// Load from the resolved config directory, reading `.env` first.
    pub fn load() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::load_from_path(config_dir().join(CONFIG_FILE_NAME))
    }

    /// Load a config file, falling back to defaults when it does not exist.
    ///
    /// Environment overrides are applied in both cases.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let mut config = Self::read_file(path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// File contents only, without environment overrides. Use this when the
    /// result is going to be written back.
    pub fn read_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(raw) => serde_json::from_str(&raw).map_err(|err| {
                Bc4Error::Configuration(format!(
                    "failed to decode config {}: {err}",
                    path.display()
                ))
            }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Ok(Self::first_run_defaults())
            }
            Err(err) => Err(Bc4Error::Io(err)),
        }
    }

    pub fn save_to_path(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut serialized = serde_json::to_vec_pretty(self)?;
        serialized.push(b'\n');
        atomic_write(path.as_ref(), &serialized)?;
        tracing::debug!(path = %path.as_ref().display(), "config saved");
        Ok(())
    }

    /// Overlay non-empty `BC4_*` values from `lookup`.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.is_empty());
        if let Some(value) = non_empty(ENV_CLIENT_ID) {
            self.client_id = value;
        }
        if let Some(value) = non_empty(ENV_CLIENT_SECRET) {
            self.client_secret = value;
        }
        if let Some(value) = non_empty(ENV_ACCOUNT_ID) {
            self.default_account = value;
        }
        if let Some(value) = non_empty(ENV_PROJECT_ID) {
            self.default_project = value;
        }
    }

    /// OAuth client settings for the auth core.
    pub fn oauth_config(&self) -> Result<OAuthConfig> {
        if self.client_id.trim().is_empty() || self.client_secret.trim().is_empty() {
            return Err(Bc4Error::Configuration(format!(
                "OAuth client credentials are not configured; add client_id and client_secret \
                 to {} or set {ENV_CLIENT_ID} and {ENV_CLIENT_SECRET}",
                CONFIG_FILE_NAME
            )));
        }
        Ok(OAuthConfig::builder()
            .client_id(self.client_id.clone())
            .client_secret(self.client_secret.clone())
            .build())
    }

    /// Record `account_id` as the default account.
    ///
    /// Switching to a different account clears the default project, which
    /// belongs to the previous account.
    pub fn select_account(&mut self, account_id: &str, account_name: &str) {
        if self.default_account != account_id {
            self.default_project.clear();
        }
        self.default_account = account_id.to_string();
        let entry = self.accounts.entry(account_id.to_string()).or_default();
        if !account_name.is_empty() {
            entry.name = account_name.to_string();
        }
    }
}

/// Directory holding `config.json` and `auth.json`.
///
/// `~/.config/bc4` unless only the legacy macOS location exists.
pub fn config_dir() -> PathBuf {
    let home = directories::UserDirs::new()
        .map(|dirs| dirs.home_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."));
    resolve_config_dir(&home, cfg!(target_os = "macos"))
}

pub fn resolve_config_dir(home: &Path, macos: bool) -> PathBuf {
    let xdg = home.join(".config").join("bc4");
    if xdg.exists() {
        return xdg;
    }
    if macos {
        let legacy = home
            .join("Library")
            .join("Application Support")
            .join("bc4");
        if legacy.exists() {
            return legacy;
        }
    }
    xdg
}

pub fn auth_path(dir: &Path) -> PathBuf {
    dir.join(AUTH_FILE_NAME)
}

pub fn config_path(dir: &Path) -> PathBuf {
    dir.join(CONFIG_FILE_NAME)
}

/// True when neither `config.json` nor `auth.json` exists in `dir`.
pub fn is_first_run(dir: &Path) -> bool {
    !config_path(dir).exists() && !auth_path(dir).exists()
}
