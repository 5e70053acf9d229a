//! Profile image storage on the local filesystem
//!
//! Files live flat under one directory and are served read-only at
//! [`PUBLIC_PREFIX`]. Names are generated here; caller-supplied names are
//! never used as paths.

use anyhow::Context;
use auth_identity::{IdentityError, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

/// 5 MiB
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

pub const PUBLIC_PREFIX: &str = "/uploads/profile-images";

pub const TOO_LARGE_MESSAGE: &str = "File too large. Maximum size is 5MB.";
pub const NOT_AN_IMAGE_MESSAGE: &str = "Only image files are allowed.";

#[derive(Debug, Clone)]
pub struct ImageStore {
    root: PathBuf,
}

impl ImageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File extension for an accepted image content type
    pub fn extension_for(content_type: &str) -> Option<&'static str> {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match essence.as_str() {
            "image/png" => Some("png"),
            "image/jpeg" | "image/jpg" => Some("jpg"),
            "image/gif" => Some("gif"),
            "image/webp" => Some("webp"),
            _ => None,
        }
    }

    pub fn public_path(filename: &str) -> String {
        format!("{PUBLIC_PREFIX}/{filename}")
    }

    /// Validate and write an upload, returning the generated file name
    pub async fn save(&self, bytes: &[u8], content_type: &str) -> Result<String> {
        let extension = Self::extension_for(content_type)
            .ok_or_else(|| IdentityError::InvalidImage(NOT_AN_IMAGE_MESSAGE.to_string()))?;
        if bytes.len() > MAX_IMAGE_BYTES {
            return Err(IdentityError::InvalidImage(TOO_LARGE_MESSAGE.to_string()));
        }
        if bytes.is_empty() {
            return Err(IdentityError::InvalidImage("No file uploaded".to_string()));
        }

        tokio::fs::create_dir_all(&self.root)
            .await
            .with_context(|| format!("creating {}", self.root.display()))?;

        let filename = format!("profile-{}.{extension}", Uuid::new_v4().simple());
        let path = self.root.join(&filename);
        tokio::fs::write(&path, bytes)
            .await
            .with_context(|| format!("writing {}", path.display()))?;

        debug!(file = %filename, size = bytes.len(), "Stored profile image");
        Ok(filename)
    }

    /// Remove a stored image; a missing file is not an error
    pub async fn remove(&self, filename: &str) -> Result<()> {
        let Some(path) = self.resolve(filename) else {
            warn!(file = %filename, "Refusing to remove image outside the upload directory");
            return Ok(());
        };

        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!(file = %filename, "Removed profile image");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(anyhow::Error::new(e)
                .context(format!("removing {}", path.display()))
                .into()),
        }
    }

    fn resolve(&self, filename: &str) -> Option<PathBuf> {
        let plain = !filename.is_empty()
            && !filename.contains(['/', '\\'])
            && filename != "."
            && filename != "..";
        plain.then(|| self.root.join(filename))
    }
}
