use std::fs;
use std::path::Path;
use std::time::SystemTime;

use tracing::info;

use crate::error::{Error, Result};

/// File system calls used by the resolver and the all-star placement.
pub trait FileSystem: Send + Sync {
    /// Names of the immediate children of `dir`, in no particular order.
    fn list_children(&self, dir: &Path) -> Result<Vec<String>>;
    fn is_dir(&self, path: &Path) -> bool;
    fn exists(&self, path: &Path) -> bool;
    fn copy(&self, src: &Path, dst: &Path) -> Result<()>;
    fn rename(&self, src: &Path, dst: &Path) -> Result<()>;
    fn create_dir(&self, path: &Path) -> Result<()>;
    fn modified(&self, path: &Path) -> Result<SystemTime>;
}

/// The real file system.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdFs;

impl FileSystem for StdFs {
    fn list_children(&self, dir: &Path) -> Result<Vec<String>> {
        let entries = fs::read_dir(dir).map_err(|e| Error::io("read_dir", dir, e))?;
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| Error::io("read_dir", dir, e))?;
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        Ok(names)
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn copy(&self, src: &Path, dst: &Path) -> Result<()> {
        fs::copy(src, dst).map_err(|e| Error::io("copy", src, e))?;
        Ok(())
    }

    fn rename(&self, src: &Path, dst: &Path) -> Result<()> {
        fs::rename(src, dst).map_err(|e| Error::io("rename", src, e))
    }

    fn create_dir(&self, path: &Path) -> Result<()> {
        fs::create_dir(path).map_err(|e| Error::io("create_dir", path, e))
    }

    fn modified(&self, path: &Path) -> Result<SystemTime> {
        fs::metadata(path)
            .and_then(|m| m.modified())
            .map_err(|e| Error::io("metadata", path, e))
    }
}

/// Reads go to the wrapped file system, writes are only logged.
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunFs<F> {
    inner: F,
}

impl<F: FileSystem> DryRunFs<F> {
    pub fn new(inner: F) -> Self {
        Self { inner }
    }
}

impl<F: FileSystem> FileSystem for DryRunFs<F> {
    fn list_children(&self, dir: &Path) -> Result<Vec<String>> {
        self.inner.list_children(dir)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.inner.is_dir(path)
    }

    fn exists(&self, path: &Path) -> bool {
        self.inner.exists(path)
    }

    fn copy(&self, src: &Path, dst: &Path) -> Result<()> {
        info!("[dry run] copy {} -> {}", src.display(), dst.display());
        Ok(())
    }

    fn rename(&self, src: &Path, dst: &Path) -> Result<()> {
        info!("[dry run] rename {} -> {}", src.display(), dst.display());
        Ok(())
    }

    fn create_dir(&self, path: &Path) -> Result<()> {
        info!("[dry run] mkdir {}", path.display());
        Ok(())
    }

    fn modified(&self, path: &Path) -> Result<SystemTime> {
        self.inner.modified(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::tempdir;

    #[test]
    fn test_std_fs_roundtrip() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("a.jpg");
        File::create(&src).unwrap();

        let fs = StdFs;
        fs.create_dir(&dir.path().join("AllStars")).unwrap();
        fs.copy(&src, &dir.path().join("AllStars").join("a.jpg")).unwrap();

        let mut children = fs.list_children(dir.path()).unwrap();
        children.sort();
        assert_eq!(children, vec!["AllStars", "a.jpg"]);
        assert!(fs.is_dir(&dir.path().join("AllStars")));
        assert!(fs.exists(&dir.path().join("AllStars").join("a.jpg")));
        assert!(fs.modified(&src).is_ok());
    }

    #[test]
    fn test_std_fs_errors_carry_path() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("missing");
        let err = StdFs.list_children(&missing).unwrap_err();
        assert!(err.to_string().contains("missing"));
        assert!(StdFs.create_dir(dir.path()).is_err());
    }

    #[test]
    fn test_dry_run_does_not_write() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("a.jpg");
        File::create(&src).unwrap();

        let fs = DryRunFs::new(StdFs);
        fs.create_dir(&dir.path().join("AllStars")).unwrap();
        fs.rename(&src, &dir.path().join("b.jpg")).unwrap();

        assert!(!dir.path().join("AllStars").exists());
        assert!(src.exists());
        assert_eq!(fs.list_children(dir.path()).unwrap(), vec!["a.jpg"]);
    }
}
