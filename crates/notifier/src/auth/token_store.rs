//! Durable storage for the credential pair

use anyhow::{Context, Result};
use log::{debug, warn};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::models::Credential;

/// Reads and writes the credential JSON file
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted credential
    ///
    /// A missing or unreadable file means "no credentials yet" and yields an
    /// empty credential.
    pub fn load(&self) -> Credential {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No saved tokens at {}", self.path.display());
                return Credential::empty();
            }
            Err(e) => {
                warn!("Failed to read tokens from {}: {}", self.path.display(), e);
                return Credential::empty();
            }
        };

        match serde_json::from_str(&content) {
            Ok(credential) => {
                debug!("Loaded tokens from {}", self.path.display());
                credential
            }
            Err(e) => {
                warn!("Ignoring corrupt token file {}: {}", self.path.display(), e);
                Credential::empty()
            }
        }
    }

    /// Persist the credential, replacing any previous file atomically
    pub fn save(&self, credential: &Credential) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            match fs::create_dir_all(parent) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {}
                Err(e) => {
                    return Err(e).with_context(|| {
                        format!("Failed to create token directory: {}", parent.display())
                    });
                }
            }
        }

        let content = serde_json::to_string_pretty(credential)?;
        let tmp_path = self.tmp_path();
        fs::write(&tmp_path, content)
            .with_context(|| format!("Failed to write token file: {}", tmp_path.display()))?;
        fs::rename(&tmp_path, &self.path)
            .with_context(|| format!("Failed to replace token file: {}", self.path.display()))?;

        debug!("Tokens stored to {}", self.path.display());
        Ok(())
    }

    /// Remove the persisted credential (logout)
    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e)
                .with_context(|| format!("Failed to remove token file: {}", self.path.display())),
        }
    }

    /// Sibling path the new content is written to before the rename
    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> TokenStore {
        TokenStore::new(dir.path().join("oauth").join("gmail-oauth.json"))
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let cred = store_in(&dir).load();
        assert_eq!(cred, Credential::empty());
        assert!(!cred.is_valid());
    }

    #[test]
    fn test_load_corrupt_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(store.path(), "{not json").unwrap();

        assert_eq!(store.load(), Credential::empty());
    }

    #[test]
    fn test_save_creates_directory_and_round_trips() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let cred = Credential::new("access", Some("refresh".to_string()))
            .with_expiry_date(1_700_000_000_000);

        store.save(&cred).unwrap();

        assert!(store.path().exists());
        assert!(!store.tmp_path().exists());
        // A fresh store simulates a restart
        let reloaded = TokenStore::new(store.path()).load();
        assert_eq!(reloaded, cred);
    }

    #[test]
    fn test_save_overwrites_previous() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.save(&Credential::new("old", None)).unwrap();
        store.save(&Credential::new("new", None)).unwrap();

        assert_eq!(store.load().access_token(), Some("new"));
    }

    #[test]
    fn test_save_surfaces_io_errors() {
        let dir = TempDir::new().unwrap();
        // The parent "directory" is a regular file
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "x").unwrap();
        let store = TokenStore::new(blocker.join("gmail-oauth.json"));

        assert!(store.save(&Credential::new("a", None)).is_err());
    }

    #[test]
    fn test_clear() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.save(&Credential::new("a", None)).unwrap();

        store.clear().unwrap();
        assert!(!store.path().exists());
        // Clearing twice is fine
        store.clear().unwrap();
    }
}
