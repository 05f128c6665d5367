//! In-memory capability fakes for unit tests.

use std::collections::{BTreeMap, HashMap};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::SystemTime;

use crate::error::{Error, MetadataError, Result};
use crate::fs::FileSystem;
use crate::metadata::{ImageMetadata, MetadataAccess};

#[derive(Debug, Clone)]
enum Node {
    Dir,
    File(SystemTime),
}

/// A file tree kept in memory. Parent directories are created implicitly by
/// `add_file` / `add_dir`, and the root always exists.
#[derive(Debug, Default)]
pub struct MemoryFs {
    nodes: Mutex<BTreeMap<PathBuf, Node>>,
    ops: Mutex<Vec<String>>,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let mut nodes = self.nodes.lock().unwrap();
        for dir in path.as_ref().ancestors() {
            nodes.insert(dir.to_path_buf(), Node::Dir);
        }
    }

    pub fn add_file(&self, path: impl AsRef<Path>, mtime: SystemTime) {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            self.add_dir(parent);
        }
        self.nodes
            .lock()
            .unwrap()
            .insert(path.to_path_buf(), Node::File(mtime));
    }

    /// Mutating calls in the order they happened, e.g. `copy /a -> /b/a`.
    pub fn ops(&self) -> Vec<String> {
        self.ops.lock().unwrap().clone()
    }

    fn record(&self, op: String) {
        self.ops.lock().unwrap().push(op);
    }

    fn node(&self, path: &Path) -> Option<Node> {
        if path.parent().is_none() {
            return Some(Node::Dir);
        }
        self.nodes.lock().unwrap().get(path).cloned()
    }

    fn not_found(op: &'static str, path: &Path) -> Error {
        Error::io(op, path, io::Error::from(io::ErrorKind::NotFound))
    }
}

impl FileSystem for MemoryFs {
    fn list_children(&self, dir: &Path) -> Result<Vec<String>> {
        if !self.is_dir(dir) {
            return Err(Self::not_found("read_dir", dir));
        }
        let nodes = self.nodes.lock().unwrap();
        Ok(nodes
            .keys()
            .filter(|p| p.parent() == Some(dir))
            .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .collect())
    }

    fn is_dir(&self, path: &Path) -> bool {
        matches!(self.node(path), Some(Node::Dir))
    }

    fn exists(&self, path: &Path) -> bool {
        self.node(path).is_some()
    }

    fn copy(&self, src: &Path, dst: &Path) -> Result<()> {
        let Some(Node::File(mtime)) = self.node(src) else {
            return Err(Self::not_found("copy", src));
        };
        if !dst.parent().is_some_and(|p| self.is_dir(p)) {
            return Err(Self::not_found("copy", dst));
        }
        self.nodes
            .lock()
            .unwrap()
            .insert(dst.to_path_buf(), Node::File(mtime));
        self.record(format!("copy {} -> {}", src.display(), dst.display()));
        Ok(())
    }

    fn rename(&self, src: &Path, dst: &Path) -> Result<()> {
        let mut nodes = self.nodes.lock().unwrap();
        let node = nodes.remove(src).ok_or_else(|| Self::not_found("rename", src))?;
        nodes.insert(dst.to_path_buf(), node);
        drop(nodes);
        self.record(format!("rename {} -> {}", src.display(), dst.display()));
        Ok(())
    }

    fn create_dir(&self, path: &Path) -> Result<()> {
        if self.exists(path) {
            return Err(Error::io("create_dir", path, io::Error::from(io::ErrorKind::AlreadyExists)));
        }
        if !path.parent().is_some_and(|p| self.is_dir(p)) {
            return Err(Self::not_found("create_dir", path));
        }
        self.nodes.lock().unwrap().insert(path.to_path_buf(), Node::Dir);
        self.record(format!("mkdir {}", path.display()));
        Ok(())
    }

    fn modified(&self, path: &Path) -> Result<SystemTime> {
        match self.node(path) {
            Some(Node::File(mtime)) => Ok(mtime),
            _ => Err(Self::not_found("metadata", path)),
        }
    }
}

/// Metadata keyed by path; unknown paths read as "no EXIF".
#[derive(Debug, Default)]
pub struct FakeMetadata {
    entries: Mutex<HashMap<PathBuf, ImageMetadata>>,
}

impl FakeMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, path: impl AsRef<Path>, md: ImageMetadata) {
        self.entries
            .lock()
            .unwrap()
            .insert(path.as_ref().to_path_buf(), md);
    }

    pub fn get(&self, path: impl AsRef<Path>) -> Option<ImageMetadata> {
        self.entries.lock().unwrap().get(path.as_ref()).cloned()
    }
}

impl MetadataAccess for FakeMetadata {
    fn read_metadata(&self, path: &Path) -> std::result::Result<ImageMetadata, MetadataError> {
        self.get(path)
            .ok_or_else(|| MetadataError::Exif(exif::Error::NotFound("JPEG")))
    }

    fn write_metadata(&self, path: &Path, metadata: &ImageMetadata) -> std::result::Result<(), MetadataError> {
        self.insert(path, metadata.clone());
        Ok(())
    }
}
