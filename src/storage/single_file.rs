//! # Single-File Storage
//!
//! Keeps the committed catalog image in one file. A checkpoint never
//! modifies the live file in place:
//!
//! ```text
//! 1. encode image
//! 2. write <path>.tmp, fsync
//! 3. rename <path>.tmp -> <path>
//! ```
//!
//! A crash at any step leaves either the old image or the new one. A stale
//! `.tmp` left behind by such a crash is ignored and overwritten by the next
//! checkpoint.
//!
//! In read-only mode the file must exist at initialize and checkpoints write
//! nothing.

use super::{CheckpointImage, StorageManager};
use crate::config::CHECKPOINT_TMP_SUFFIX;
use eyre::{bail, Result, WrapErr};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug)]
pub struct SingleFileStorage {
    path: PathBuf,
    read_only: bool,
}

impl SingleFileStorage {
    pub fn new(path: impl AsRef<Path>, read_only: bool) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            read_only,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(CHECKPOINT_TMP_SUFFIX);
        PathBuf::from(name)
    }

    fn write_image(&self, image: &CheckpointImage) -> Result<()> {
        let bytes = image.encode().wrap_err("failed to encode checkpoint image")?;
        let tmp = self.tmp_path();

        let mut file = File::create(&tmp)
            .wrap_err_with(|| format!("failed to create checkpoint file at {:?}", tmp))?;
        file.write_all(&bytes)
            .wrap_err_with(|| format!("failed to write checkpoint file at {:?}", tmp))?;
        file.sync_all()
            .wrap_err_with(|| format!("failed to sync checkpoint file at {:?}", tmp))?;
        drop(file);

        fs::rename(&tmp, &self.path).wrap_err_with(|| {
            format!(
                "failed to move checkpoint from {:?} to {:?}",
                tmp, self.path
            )
        })?;
        Ok(())
    }
}

impl StorageManager for SingleFileStorage {
    fn initialize(&self) -> Result<CheckpointImage> {
        if !self.path.exists() {
            if self.read_only {
                bail!(
                    "database file {:?} does not exist and cannot be created in read-only mode",
                    self.path
                );
            }
            if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent).wrap_err_with(|| {
                    format!("failed to create database directory at {:?}", parent)
                })?;
            }
            self.write_image(&CheckpointImage::default())
                .wrap_err_with(|| format!("failed to create database file at {:?}", self.path))?;
            info!(path = ?self.path, "created database file");
            return Ok(CheckpointImage::default());
        }

        let bytes = fs::read(&self.path)
            .wrap_err_with(|| format!("failed to read database file at {:?}", self.path))?;
        let image = CheckpointImage::decode(&bytes)
            .wrap_err_with(|| format!("database file {:?} is corrupt", self.path))?;
        debug!(path = ?self.path, tables = image.tables.len(), "loaded checkpoint image");
        Ok(image)
    }

    fn in_memory(&self) -> bool {
        false
    }

    fn create_checkpoint(&self, image: &CheckpointImage, force: bool) -> Result<()> {
        if self.read_only {
            debug!(path = ?self.path, "read-only storage, checkpoint skipped");
            return Ok(());
        }
        self.write_image(image)?;
        debug!(path = ?self.path, tables = image.tables.len(), force, "checkpoint written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnDef;
    use crate::storage::TableImage;
    use crate::types::{DataType, OwnedValue};

    fn image() -> CheckpointImage {
        CheckpointImage {
            tables: vec![TableImage {
                name: "a".into(),
                columns: vec![ColumnDef::new("i", DataType::Int4)],
                rows: vec![vec![OwnedValue::Int(1)]],
            }],
        }
    }

    #[test]
    fn initialize_creates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.keel");
        let storage = SingleFileStorage::new(&path, false);
        assert!(storage.initialize().unwrap().is_empty());
        assert!(path.exists());
    }

    #[test]
    fn read_only_initialize_requires_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let storage = SingleFileStorage::new(dir.path().join("missing.keel"), true);
        let err = storage.initialize().unwrap_err();
        assert!(format!("{:#}", err).contains("read-only"));
    }

    #[test]
    fn checkpoint_is_visible_to_next_initialize() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.keel");
        let storage = SingleFileStorage::new(&path, false);
        storage.initialize().unwrap();
        storage.create_checkpoint(&image(), false).unwrap();

        let reopened = SingleFileStorage::new(&path, true);
        assert_eq!(reopened.initialize().unwrap(), image());
        assert!(!storage.tmp_path().exists());
    }

    #[test]
    fn read_only_checkpoint_leaves_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.keel");
        SingleFileStorage::new(&path, false).initialize().unwrap();

        let storage = SingleFileStorage::new(&path, true);
        storage.create_checkpoint(&image(), true).unwrap();
        assert!(storage.initialize().unwrap().is_empty());
    }

    #[test]
    fn corrupt_file_fails_initialize() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.keel");
        fs::write(&path, b"definitely not a checkpoint image").unwrap();
        let err = SingleFileStorage::new(&path, false).initialize().unwrap_err();
        assert!(format!("{:#}", err).contains("corrupt"));
    }
}
