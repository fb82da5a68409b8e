//! Scratch-directory file management.
//!
//! Layout: {scratch_dir}/{sanitised name}
//!
//! Writes go to a staging file in the same directory and are renamed into
//! place, so an existing file with the same name survives a failed write.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::{Outcome, OrchestratorError};
use crate::file_slot::FileRecord;

const STAGING_PREFIX: &str = ".cipherdesk_staging_";

pub struct TempFiles {
    root: PathBuf,
}

impl TempFiles {
    pub fn new(root: PathBuf) -> Outcome<Self> {
        fs::create_dir_all(&root).map_err(|e| {
            OrchestratorError::Io(format!("create scratch dir {}: {e}", root.display()))
        })?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Err(e) = fs::set_permissions(&root, fs::Permissions::from_mode(0o700)) {
                warn!(path = %root.display(), error = %e, "could not restrict scratch dir permissions");
            }
        }
        let root = root.canonicalize().unwrap_or(root);
        cleanup_staging(&root);
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether `path` lives inside the scratch directory.
    pub fn owns(&self, path: &Path) -> bool {
        let resolved = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        resolved.starts_with(&self.root) && resolved != self.root
    }

    /// Materialises `bytes` as `{scratch}/{name}` and returns its record.
    pub async fn store(&self, name: &str, bytes: &[u8]) -> Outcome<FileRecord> {
        let file_name = sanitize_name(name);
        let target = self.root.join(&file_name);
        let staging = self
            .root
            .join(format!("{STAGING_PREFIX}{}", uuid::Uuid::new_v4()));

        if let Err(e) = tokio::fs::write(&staging, bytes).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(OrchestratorError::Io(format!(
                "write {}: {e}",
                target.display()
            )));
        }
        if let Err(e) = tokio::fs::rename(&staging, &target).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(OrchestratorError::Io(format!(
                "move into {}: {e}",
                target.display()
            )));
        }

        let record = stat_record(&target, file_name).await?;
        info!(path = %record.path.display(), size = record.size, "scratch file stored");
        Ok(record)
    }

    /// Unlinks a scratch file. Paths outside the scratch directory are refused.
    pub async fn delete(&self, path: &Path) -> Outcome<()> {
        if !self.owns(path) {
            return Err(OrchestratorError::Io(format!(
                "{} is outside the scratch directory",
                path.display()
            )));
        }
        match tokio::fs::remove_file(path).await {
            Ok(()) => {
                debug!(path = %path.display(), "scratch file deleted");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(OrchestratorError::Io(format!(
                "delete {}: {e}",
                path.display()
            ))),
        }
    }

    /// Best-effort [`delete`](Self::delete); failures are logged, never returned.
    pub async fn discard(&self, path: &Path) {
        if let Err(e) = self.delete(path).await {
            warn!(path = %path.display(), error = %e, "scratch cleanup failed");
        }
    }

    /// Removes the scratch directory itself once nothing is left in it.
    pub async fn remove_root_if_empty(&self) {
        match tokio::fs::remove_dir(&self.root).await {
            Ok(()) => info!(path = %self.root.display(), "scratch dir removed"),
            Err(e) => debug!(path = %self.root.display(), error = %e, "scratch dir kept"),
        }
    }
}

/// Removes staging files left behind by an interrupted write.
fn cleanup_staging(root: &Path) {
    let Ok(entries) = fs::read_dir(root) else {
        return;
    };
    for entry in entries.flatten() {
        if entry.file_name().to_string_lossy().starts_with(STAGING_PREFIX) {
            warn!(path = %entry.path().display(), "removing orphaned staging file");
            let _ = fs::remove_file(entry.path());
        }
    }
}

/// Stats `path` and builds a record whose size matches the file on disk.
/// Every call yields a new record identity.
pub async fn stat_record(path: &Path, name: String) -> Outcome<FileRecord> {
    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|e| OrchestratorError::Io(format!("stat {}: {e}", path.display())))?;
    if !metadata.is_file() {
        return Err(OrchestratorError::Io(format!(
            "{} is not a regular file",
            path.display()
        )));
    }
    Ok(FileRecord {
        id: uuid::Uuid::new_v4(),
        path: path.to_path_buf(),
        name,
        size: metadata.len(),
    })
}

/// Reduces a caller-supplied name to a bare file name. Directory components
/// (either separator) are dropped; unusable names get a generated one.
pub fn sanitize_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or("").trim();
    if base.is_empty() || base == "." || base == ".." || base.starts_with(STAGING_PREFIX) {
        format!("upload_{}", uuid::Uuid::new_v4())
    } else {
        base.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn names_are_reduced_to_the_last_component() {
        assert_eq!(sanitize_name("a.txt"), "a.txt");
        assert_eq!(sanitize_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_name(r"C:\Users\me\notes.txt"), "notes.txt");
        assert!(sanitize_name("").starts_with("upload_"));
        assert!(sanitize_name("dir/..").starts_with("upload_"));
        assert!(sanitize_name("  ").starts_with("upload_"));
    }

    #[tokio::test]
    async fn store_writes_and_stats() {
        let dir = tempdir().unwrap();
        let temp = TempFiles::new(dir.path().join("scratch")).unwrap();
        let record = temp.store("a.txt", b"hello").await.unwrap();
        assert_eq!(record.name, "a.txt");
        assert_eq!(record.size, 5);
        assert_eq!(std::fs::read(&record.path).unwrap(), b"hello");
        assert!(temp.owns(&record.path));

        let again = temp.store("a.txt", b"hello").await.unwrap();
        assert_eq!(again.path, record.path);
        assert_ne!(again.id, record.id);

        // no staging leftovers
        let entries: Vec<_> = std::fs::read_dir(temp.root()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn delete_is_scoped_to_scratch() {
        let dir = tempdir().unwrap();
        let temp = TempFiles::new(dir.path().join("scratch")).unwrap();
        let outside = dir.path().join("keep.txt");
        std::fs::write(&outside, b"mine").unwrap();

        let err = temp.delete(&outside).await.unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Io);
        assert!(outside.exists());

        temp.discard(&outside).await;
        assert!(outside.exists());

        let record = temp.store("b.bin", &[1, 2, 3]).await.unwrap();
        temp.delete(&record.path).await.unwrap();
        assert!(!record.path.exists());
        // already gone: still fine
        temp.delete(&record.path).await.unwrap();
    }

    #[test]
    fn orphaned_staging_files_are_swept_on_open() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("scratch");
        std::fs::create_dir_all(&root).unwrap();
        let orphan = root.join(format!("{STAGING_PREFIX}dead"));
        std::fs::write(&orphan, b"partial").unwrap();
        std::fs::write(root.join("keep.txt"), b"kept").unwrap();

        let temp = TempFiles::new(root).unwrap();
        assert!(!orphan.exists());
        assert!(temp.root().join("keep.txt").exists());
    }

    #[cfg(unix)]
    #[test]
    fn scratch_dir_is_private() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempdir().unwrap();
        let temp = TempFiles::new(dir.path().join("scratch")).unwrap();
        let mode = std::fs::metadata(temp.root()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o700);
    }

    #[tokio::test]
    async fn stat_record_requires_a_file() {
        let dir = tempdir().unwrap();
        let err = stat_record(dir.path(), "dir".into()).await.unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Io);
        let err = stat_record(&dir.path().join("missing"), "m".into())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Io);
    }
}
