//! Atomic manifest file storage.
//!
//! Every write goes to a dot-prefixed temporary file in the target directory
//! and is then renamed over the target. The kubelet ignores dot-prefixed
//! files, and a rename within one directory is atomic, so a reader of the
//! target path sees either the previous content or the complete new content.

use crate::error::StaticPodError;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// Prefix of the temporary file used while writing `<name>`
pub const TEMP_FILE_PREFIX: &str = ".tmp-";

/// Permissions for manifest files (the kubelet only needs to read them)
pub const MANIFEST_FILE_MODE: u32 = 0o644;

/// Result of removing a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    /// The file existed and was deleted
    Removed,
    /// The file did not exist
    NotPresent,
}

/// Result of promoting the standby manifest into the active directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromoteOutcome {
    /// The active manifest was (re)written from standby
    Promoted,
    /// The active manifest already matched standby byte for byte
    AlreadyCurrent,
    /// There is no standby manifest yet; nothing was written
    StandbyMissing,
}

/// A fully written temporary file waiting to be renamed over its target.
///
/// Dropping a `StagedWrite` without committing leaves the target untouched;
/// the stale temporary is overwritten by the next write to the same target.
#[derive(Debug)]
#[must_use = "a staged write has no effect until it is committed"]
pub struct StagedWrite {
    temp_path: PathBuf,
    target_path: PathBuf,
}

impl StagedWrite {
    /// Path of the temporary file holding the new content
    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    /// Path the content will appear at once committed
    pub fn target_path(&self) -> &Path {
        &self.target_path
    }

    /// Atomically replace the target with the staged content
    pub async fn commit(self) -> Result<(), StaticPodError> {
        tokio::fs::rename(&self.temp_path, &self.target_path)
            .await
            .map_err(|e| StaticPodError::io(&self.target_path, e))?;
        debug!(path = %self.target_path.display(), "Committed file");
        Ok(())
    }
}

/// Reject anything that is not a single plain path component.
pub fn validate_file_name(name: &str) -> Result<(), StaticPodError> {
    let plain = !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains('/')
        && !name.contains('\\')
        && !name.contains('\0');
    if plain {
        Ok(())
    } else {
        Err(StaticPodError::InvalidFileName(name.to_string()))
    }
}

/// Write `contents` to a temporary file next to `dir/filename`, fsync it and
/// set `mode`, without touching the target.
pub async fn stage(
    dir: &Path,
    filename: &str,
    contents: &[u8],
    mode: u32,
) -> Result<StagedWrite, StaticPodError> {
    validate_file_name(filename)?;
    let temp_path = dir.join(format!("{TEMP_FILE_PREFIX}{filename}"));
    let target_path = dir.join(filename);

    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&temp_path)
        .await
        .map_err(|e| StaticPodError::io(&temp_path, e))?;
    file.write_all(contents)
        .await
        .map_err(|e| StaticPodError::io(&temp_path, e))?;
    file.sync_all()
        .await
        .map_err(|e| StaticPodError::io(&temp_path, e))?;
    drop(file);

    set_mode(&temp_path, mode).await?;

    Ok(StagedWrite {
        temp_path,
        target_path,
    })
}

#[cfg(unix)]
async fn set_mode(path: &Path, mode: u32) -> Result<(), StaticPodError> {
    use std::os::unix::fs::PermissionsExt;

    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
        .await
        .map_err(|e| StaticPodError::io(path, e))
}

#[cfg(not(unix))]
async fn set_mode(_path: &Path, _mode: u32) -> Result<(), StaticPodError> {
    Ok(())
}

/// Atomically write `dir/filename` with the given file mode.
pub async fn write_with_mode(
    dir: &Path,
    filename: &str,
    contents: &[u8],
    mode: u32,
) -> Result<(), StaticPodError> {
    stage(dir, filename, contents, mode).await?.commit().await
}

/// Atomically write the manifest `dir/filename`.
pub async fn write(dir: &Path, filename: &str, contents: &[u8]) -> Result<(), StaticPodError> {
    write_with_mode(dir, filename, contents, MANIFEST_FILE_MODE).await
}

/// Delete `dir/filename`. A file that is already gone is not an error.
pub async fn remove(dir: &Path, filename: &str) -> Result<RemoveOutcome, StaticPodError> {
    validate_file_name(filename)?;
    let path = dir.join(filename);
    match tokio::fs::remove_file(&path).await {
        Ok(()) => Ok(RemoveOutcome::Removed),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(RemoveOutcome::NotPresent),
        Err(e) => Err(StaticPodError::io(path, e)),
    }
}

/// Copy `standby_dir/filename` into `active_dir/filename` atomically.
///
/// A missing standby file is logged and skipped: there is nothing to install
/// yet, and a later pass will have one once a primary apiserver was seen.
pub async fn promote(
    standby_dir: &Path,
    active_dir: &Path,
    filename: &str,
) -> Result<PromoteOutcome, StaticPodError> {
    validate_file_name(filename)?;
    let standby_path = standby_dir.join(filename);
    let contents = match tokio::fs::read(&standby_path).await {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            warn!(path = %standby_path.display(), "No standby manifest to promote");
            return Ok(PromoteOutcome::StandbyMissing);
        }
        Err(e) => return Err(StaticPodError::io(standby_path, e)),
    };

    let active_path = active_dir.join(filename);
    match tokio::fs::read(&active_path).await {
        Ok(current) if current == contents => return Ok(PromoteOutcome::AlreadyCurrent),
        Ok(_) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(StaticPodError::io(active_path, e)),
    }

    write(active_dir, filename, &contents).await?;
    info!(
        from = %standby_path.display(),
        to = %active_path.display(),
        "Promoted standby manifest"
    );
    Ok(PromoteOutcome::Promoted)
}

/// The active/standby manifest pair for one static pod
#[derive(Debug, Clone)]
pub struct ManifestStore {
    active_dir: PathBuf,
    standby_dir: PathBuf,
    filename: String,
}

impl ManifestStore {
    /// Create a store for `filename` in the given directories
    pub fn new(
        active_dir: impl Into<PathBuf>,
        standby_dir: impl Into<PathBuf>,
        filename: impl Into<String>,
    ) -> Self {
        Self {
            active_dir: active_dir.into(),
            standby_dir: standby_dir.into(),
            filename: filename.into(),
        }
    }

    /// Directory watched by the kubelet
    pub fn active_dir(&self) -> &Path {
        &self.active_dir
    }

    /// Directory holding the last known-good manifest
    pub fn standby_dir(&self) -> &Path {
        &self.standby_dir
    }

    /// Manifest file name, identical in both directories
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Full path of the active manifest
    pub fn active_path(&self) -> PathBuf {
        self.active_dir.join(&self.filename)
    }

    /// Full path of the standby manifest
    pub fn standby_path(&self) -> PathBuf {
        self.standby_dir.join(&self.filename)
    }

    /// Atomically replace the standby manifest
    pub async fn write_standby(&self, contents: &[u8]) -> Result<(), StaticPodError> {
        write(&self.standby_dir, &self.filename, contents).await
    }

    /// Remove the active manifest so the kubelet stops the pod
    pub async fn remove_active(&self) -> Result<RemoveOutcome, StaticPodError> {
        remove(&self.active_dir, &self.filename).await
    }

    /// Install the standby manifest as the active one
    pub async fn promote_standby(&self) -> Result<PromoteOutcome, StaticPodError> {
        promote(&self.standby_dir, &self.active_dir, &self.filename).await
    }
}
