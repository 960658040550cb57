//! "Remember me" store for the login form.
//!
//! The record is a convenience pre-fill, not a security feature. With
//! `store_password` on (the default) the password is kept in plaintext,
//! protected only by owner-only file permissions.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use shared::Role;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RememberedCredentials {
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub role: Role,
}

#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
    store_password: bool,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>, store_password: bool) -> Self {
        Self {
            path: path.into(),
            store_password,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the record as-is. `Ok(None)` when nothing is stored.
    pub fn read(&self) -> Result<Option<RememberedCredentials>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)?;
        let creds: RememberedCredentials = serde_json::from_str(&content)?;
        Ok(Some(creds))
    }

    /// Read the record for pre-filling; an unreadable record is deleted.
    pub fn load(&self) -> Option<RememberedCredentials> {
        match self.read() {
            Ok(creds) => creds,
            Err(e) => {
                tracing::debug!("Discarding unreadable remembered credentials: {}", e);
                if let Err(e) = self.clear() {
                    tracing::warn!("Failed to delete remembered credentials: {}", e);
                }
                None
            }
        }
    }

    /// Overwrite the record. The password is dropped unless the store keeps it.
    pub fn save(&self, email: &str, password: &str, role: Role) -> Result<()> {
        let record = RememberedCredentials {
            email: email.to_string(),
            password: self.store_password.then(|| password.to_string()),
            role,
        };

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&record)?;
        std::fs::write(&self.path, content)?;
        restrict_permissions(&self.path)?;

        tracing::debug!("Saved remembered credentials to {:?}", self.path);
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<()> {
    Ok(())
}
