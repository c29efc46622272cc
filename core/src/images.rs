use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use uuid::Uuid;

const DEFAULT_EXTENSION: &str = "jpg";

/// Food photos copied into the app's data directory under random names.
#[derive(Debug, Clone)]
pub struct ImageStore {
    dir: PathBuf,
}

impl ImageStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn target_path(&self, extension: &str) -> PathBuf {
        let extension = extension.trim_start_matches('.').to_lowercase();
        let extension = if extension.is_empty() {
            DEFAULT_EXTENSION.to_string()
        } else {
            extension
        };
        self.dir.join(format!("{}.{extension}", Uuid::new_v4()))
    }

    fn ensure_dir(&self) -> Result<()> {
        std::fs::create_dir_all(&self.dir).with_context(|| {
            format!("Failed to create image directory: {}", self.dir.display())
        })
    }

    /// Copy `source` into the store and return the stored path.
    pub fn import(&self, source: &Path) -> Result<PathBuf> {
        self.ensure_dir()?;
        let extension = source
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or(DEFAULT_EXTENSION);
        let target = self.target_path(extension);
        std::fs::copy(source, &target)
            .with_context(|| format!("Failed to copy image: {}", source.display()))?;
        tracing::debug!(from = %source.display(), to = %target.display(), "image stored");
        Ok(target)
    }

    pub fn save_bytes(&self, bytes: &[u8], extension: &str) -> Result<PathBuf> {
        self.ensure_dir()?;
        let target = self.target_path(extension);
        std::fs::write(&target, bytes)
            .with_context(|| format!("Failed to write image: {}", target.display()))?;
        Ok(target)
    }

    /// Best effort: paths outside the store are left alone, failures are logged.
    pub fn remove(&self, path: &Path) -> bool {
        if !path.starts_with(&self.dir) {
            tracing::warn!(path = %path.display(), "refusing to remove image outside the store");
            return false;
        }
        match std::fs::remove_file(path) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to remove image");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_copies_under_uuid_name() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("Photo.PNG");
        std::fs::write(&source, b"png-bytes").unwrap();

        let store = ImageStore::new(dir.path().join("images"));
        let stored = store.import(&source).unwrap();
        assert!(stored.starts_with(store.dir()));
        assert_eq!(stored.extension().unwrap(), "png");
        assert_ne!(stored.file_name().unwrap(), "Photo.PNG");
        assert_eq!(std::fs::read(&stored).unwrap(), b"png-bytes");
        // the original stays
        assert!(source.exists());
    }

    #[test]
    fn test_import_missing_source_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path().join("images"));
        assert!(store.import(&dir.path().join("nope.jpg")).is_err());
    }

    #[test]
    fn test_save_bytes_and_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path().join("images"));
        let stored = store.save_bytes(b"jpeg", "").unwrap();
        assert_eq!(stored.extension().unwrap(), "jpg");
        assert!(store.remove(&stored));
        assert!(!stored.exists());
        // already gone
        assert!(!store.remove(&stored));
    }

    #[test]
    fn test_remove_outside_store_refused() {
        let dir = tempfile::tempdir().unwrap();
        let outside = dir.path().join("keep.jpg");
        std::fs::write(&outside, b"x").unwrap();
        let store = ImageStore::new(dir.path().join("images"));
        assert!(!store.remove(&outside));
        assert!(outside.exists());
    }
}
