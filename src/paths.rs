use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Turn a user supplied caption or filename into a single safe path component.
///
/// The steps run in a fixed order: backslashes become slashes, slashes become
/// underscores, leading dots are stripped and surrounding whitespace trimmed.
/// The result is not idempotent and must not be "cleaned up" further.
pub fn escape_path(raw: &str) -> String {
    raw.replace('\\', "/")
        .replace('/', "_")
        .trim_start_matches('.')
        .trim()
        .to_string()
}

/// A file persisted to the temp directory while it waits to be uploaded.
///
/// Each pending file lives in its own freshly created subdirectory so two
/// uploads with the same sanitized name never collide. Dropping the value
/// removes both the file and its subdirectory.
#[derive(Debug)]
pub struct PendingUpload {
    dir: PathBuf,
    path: PathBuf,
    file_name: String,
}

impl PendingUpload {
    /// Reserve a unique location for `file_name` under `tmp_dir`.
    pub async fn create(tmp_dir: &Path, file_name: &str) -> Result<Self> {
        let dir = tmp_dir.join(uuid::Uuid::new_v4().to_string());
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create upload directory: {}", dir.display()))?;

        Ok(Self {
            path: dir.join(file_name),
            dir,
            file_name: file_name.to_string(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }
}

impl Drop for PendingUpload {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Failed to remove temp file {}: {}", self.path.display(), e);
            }
        }
        if let Err(e) = std::fs::remove_dir(&self.dir) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Failed to remove temp dir {}: {}", self.dir.display(), e);
            }
        }
    }
}
