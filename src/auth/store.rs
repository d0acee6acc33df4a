use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::error::AuthError;
use super::token::AccountToken;
use crate::util::fs::atomic_write;

/// Persisted set of linked accounts.
///
/// Serialized as `{ "default_account": "...", "accounts": { "<id>": {...} } }`.
/// Accounts are kept in a `BTreeMap` so the file is written with a stable key
/// order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialStore {
    #[serde(default)]
    default_account: String,
    #[serde(default)]
    accounts: BTreeMap<String, AccountToken>,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn accounts(&self) -> &BTreeMap<String, AccountToken> {
        &self.accounts
    }

    pub fn get(&self, account_id: &str) -> Option<&AccountToken> {
        self.accounts.get(account_id)
    }

    /// Insert or overwrite the entry for `account_id`.
    pub fn put(&mut self, account_id: impl Into<String>, token: AccountToken) {
        self.accounts.insert(account_id.into(), token);
    }

    /// Remove one account, clearing the default if it pointed there.
    pub fn remove(&mut self, account_id: &str) -> Option<AccountToken> {
        let removed = self.accounts.remove(account_id);
        if self.default_account == account_id {
            self.default_account.clear();
        }
        removed
    }

    pub fn remove_all(&mut self) {
        self.accounts.clear();
        self.default_account.clear();
    }

    pub fn set_default(&mut self, account_id: &str) -> Result<(), AuthError> {
        if !self.accounts.contains_key(account_id) {
            return Err(AuthError::AccountNotFound(account_id.to_string()));
        }
        self.default_account = account_id.to_string();
        Ok(())
    }

    /// The default account id, if one is set and still linked.
    pub fn get_default(&self) -> Option<&str> {
        if self.default_account.is_empty() || !self.accounts.contains_key(&self.default_account)
        {
            return None;
        }
        Some(self.default_account.as_str())
    }
}

/// Durable backing for a [`CredentialStore`].
pub trait TokenStore: Send + Sync {
    /// Returns an empty store when nothing has been persisted yet.
    fn load(&self) -> Result<CredentialStore, AuthError>;
    fn save(&self, store: &CredentialStore) -> Result<(), AuthError>;
}

/// JSON file-backed token store (`auth.json`).
///
/// # Example
/// ```no_run
/// use bc4::auth::{FileTokenStore, TokenStore};
///
/// let store = FileTokenStore::new("/tmp/bc4/auth.json");
/// let credentials = store.load()?;
/// store.save(&credentials)?;
/// # Ok::<(), bc4::auth::AuthError>(())
/// ```
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<CredentialStore, AuthError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(CredentialStore::new())
            }
            Err(err) => return Err(AuthError::storage("load", err)),
        };
        serde_json::from_str(&raw).map_err(|err| AuthError::StorageCorrupted {
            path: self.path.display().to_string(),
            message: err.to_string(),
        })
    }

    fn save(&self, store: &CredentialStore) -> Result<(), AuthError> {
        let serialized =
            serde_json::to_vec_pretty(store).map_err(|err| AuthError::storage("serialize", err))?;
        atomic_write(&self.path, &serialized).map_err(|err| AuthError::storage("save", err))?;
        tracing::debug!(
            path = %self.path.display(),
            accounts = store.len(),
            "credential store saved"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn account(id: &str, name: &str) -> AccountToken {
        AccountToken {
            account_id: id.to_string(),
            account_name: name.to_string(),
            access_token: format!("access-{id}"),
            refresh_token: format!("refresh-{id}"),
            token_type: "Bearer".to_string(),
            expires_in: 1_209_600,
            obtained_at: Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap(),
        }
    }

    fn temp_store() -> (TempDir, FileTokenStore) {
        let dir = TempDir::new().unwrap();
        let store = FileTokenStore::new(dir.path().join("bc4").join("auth.json"));
        (dir, store)
    }

    #[test]
    fn missing_file_loads_empty_store() {
        let (_dir, store) = temp_store();
        let loaded = store.load().unwrap();
        assert!(loaded.is_empty());
        assert_eq!(loaded.get_default(), None);
    }

    #[test]
    fn corrupt_file_is_reported_not_reset() {
        let (_dir, store) = temp_store();
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(store.path(), "{\"accounts\": {\"111\": ").unwrap();

        let err = store.load().unwrap_err();
        assert!(matches!(err, AuthError::StorageCorrupted { .. }));
        assert_eq!(
            fs::read_to_string(store.path()).unwrap(),
            "{\"accounts\": {\"111\": "
        );
    }

    #[test]
    fn save_then_load_is_byte_stable() {
        let (_dir, store) = temp_store();
        let mut credentials = CredentialStore::new();
        credentials.put("222", account("222", "Beta"));
        credentials.put("111", account("111", "Acme"));
        credentials.set_default("111").unwrap();
        store.save(&credentials).unwrap();
        let first = fs::read(store.path()).unwrap();

        let reloaded = store.load().unwrap();
        assert_eq!(reloaded, credentials);
        store.save(&reloaded).unwrap();
        let second = fs::read(store.path()).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn file_uses_documented_field_names() {
        let (_dir, store) = temp_store();
        let mut credentials = CredentialStore::new();
        credentials.put("111", account("111", "Acme"));
        credentials.set_default("111").unwrap();
        store.save(&credentials).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(json["default_account"], "111");
        let entry = &json["accounts"]["111"];
        assert_eq!(entry["account_id"], "111");
        assert_eq!(entry["account_name"], "Acme");
        assert_eq!(entry["access_token"], "access-111");
        assert_eq!(entry["refresh_token"], "refresh-111");
        assert_eq!(entry["token_type"], "Bearer");
        assert_eq!(entry["expires_in"], 1_209_600);
        assert_eq!(entry["obtained_at"], "2025-03-01T12:00:00Z");
    }

    #[test]
    fn set_default_rejects_unknown_account_without_mutation() {
        let mut credentials = CredentialStore::new();
        credentials.put("111", account("111", "Acme"));
        credentials.set_default("111").unwrap();

        let err = credentials.set_default("999").unwrap_err();
        assert!(matches!(err, AuthError::AccountNotFound(id) if id == "999"));
        assert_eq!(credentials.get_default(), Some("111"));
    }

    #[test]
    fn removing_default_account_clears_default() {
        let mut credentials = CredentialStore::new();
        credentials.put("111", account("111", "Acme"));
        credentials.put("222", account("222", "Beta"));
        credentials.set_default("222").unwrap();

        credentials.remove("222");
        assert_eq!(credentials.get_default(), None);
        assert!(credentials.get("111").is_some());

        credentials.set_default("111").unwrap();
        credentials.remove("333");
        assert_eq!(credentials.get_default(), Some("111"));
    }

    #[test]
    fn remove_all_empties_store() {
        let mut credentials = CredentialStore::new();
        credentials.put("111", account("111", "Acme"));
        credentials.set_default("111").unwrap();
        credentials.remove_all();
        assert!(credentials.is_empty());
        assert_eq!(credentials.get_default(), None);
    }

    #[test]
    fn dangling_default_from_disk_is_ignored() {
        let raw = r#"{"default_account": "999", "accounts": {}}"#;
        let credentials: CredentialStore = serde_json::from_str(raw).unwrap();
        assert_eq!(credentials.get_default(), None);
    }
}
