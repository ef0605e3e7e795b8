use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const TOKEN_ENV: &str = "CIVIC_TOKEN";

/// Keeps the bearer token in `~/.civic/session`, readable by the owner only.
#[derive(Debug, Clone)]
pub struct SessionStore {
    file_path: PathBuf,
}

impl SessionStore {
    pub fn new() -> Result<Self> {
        let home_dir = dirs::home_dir().context("Failed to determine home directory")?;
        Ok(Self::at(home_dir.join(".civic").join("session")))
    }

    pub fn at(file_path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: file_path.into(),
        }
    }

    /// Loads the stored token.
    ///
    /// Returns `Ok(None)` when there is no file, or when its content cannot be
    /// a token (empty, wrong length, control characters).
    pub fn load(&self) -> Result<Option<String>> {
        if !self.file_path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.file_path).context("Failed to read session file")?;
        let token = content.trim();

        if token.is_empty() {
            log::warn!("Session file is empty, treating as no session");
            return Ok(None);
        }

        // JWTs from the identity provider run well past a UUID, but stay under 4k
        if token.len() < 8 || token.len() > 4096 {
            log::warn!("Session token has invalid length: {}, treating as corrupted", token.len());
            return Ok(None);
        }

        if token.chars().any(|c| c.is_control()) {
            log::warn!("Session file contains control characters, treating as corrupted");
            return Ok(None);
        }

        log::debug!("Loaded session token from {}", self.file_path.display());
        Ok(Some(token.to_string()))
    }

    /// Writes the token atomically (temp file + rename) with 0600 permissions.
    pub fn save(&self, token: &str) -> Result<()> {
        if let Some(parent) = self.file_path.parent() {
            fs::create_dir_all(parent).context("Failed to create .civic directory")?;
        }

        let temp_path = self.file_path.with_extension("tmp");
        let mut file =
            fs::File::create(&temp_path).context("Failed to create temporary session file")?;
        file.write_all(token.trim().as_bytes())
            .context("Failed to write session token")?;
        file.sync_all()
            .context("Failed to sync session file to disk")?;
        drop(file);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&temp_path, fs::Permissions::from_mode(0o600))
                .context("Failed to set session file permissions")?;
        }

        fs::rename(&temp_path, &self.file_path).context("Failed to rename temporary session file")?;

        log::info!("Saved session token to {}", self.file_path.display());
        Ok(())
    }

    /// Removes the stored token. Missing file is fine.
    pub fn delete(&self) -> Result<()> {
        if self.file_path.exists() {
            fs::remove_file(&self.file_path).context("Failed to delete session file")?;
            log::info!("Deleted session file at {}", self.file_path.display());
        }
        Ok(())
    }

    /// Token to authenticate with: explicit value first, then the environment,
    /// then whatever is stored on disk.
    pub fn resolve(&self, explicit: Option<String>) -> Result<Option<String>> {
        if let Some(token) = explicit.filter(|t| !t.trim().is_empty()) {
            return Ok(Some(token.trim().to_string()));
        }
        if let Ok(token) = std::env::var(TOKEN_ENV) {
            if !token.trim().is_empty() {
                return Ok(Some(token.trim().to_string()));
            }
        }
        self.load()
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }
}
