// src/fs/mock.rs

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow};

use super::FileSystem;

/// In-memory tree of files. Directories exist implicitly as ancestors of
/// files, or explicitly through [`MockFileSystem::add_dir`].
///
/// Clones share the same tree, so a test can keep one clone to mutate
/// "sysfs" while a provider reads through another.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    inner: Arc<Mutex<MockTree>>,
}

#[derive(Debug, Default)]
struct MockTree {
    files: BTreeMap<PathBuf, Vec<u8>>,
    dirs: BTreeSet<PathBuf>,
}

impl MockTree {
    fn has_dir(&self, path: &Path) -> bool {
        self.dirs.contains(path) || self.files.keys().any(|f| f.starts_with(path) && f != path)
    }
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let mut tree = self.inner.lock().unwrap();
        tree.files.insert(path.as_ref().to_path_buf(), content.into());
    }

    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let mut tree = self.inner.lock().unwrap();
        tree.dirs.insert(path.as_ref().to_path_buf());
    }

    /// Remove `path` and everything below it.
    pub fn remove_tree(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        let mut tree = self.inner.lock().unwrap();
        tree.files.retain(|f, _| !f.starts_with(path));
        tree.dirs.retain(|d| !d.starts_with(path));
    }
}

impl FileSystem for MockFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        let bytes = self.read(path)?;
        String::from_utf8(bytes).map_err(|e| anyhow!("Invalid UTF-8 in {:?}: {}", path, e))
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let tree = self.inner.lock().unwrap();
        match tree.files.get(path) {
            Some(content) => Ok(content.clone()),
            None if tree.has_dir(path) => Err(anyhow!("Is a directory: {:?}", path)),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.inner.lock().unwrap().has_dir(path)
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let tree = self.inner.lock().unwrap();
        if !tree.has_dir(path) {
            return Err(anyhow!("Not a directory or not found: {:?}", path));
        }

        // Immediate children only, whether they came from files or dirs.
        let children: BTreeSet<PathBuf> = tree
            .files
            .keys()
            .chain(tree.dirs.iter())
            .filter_map(|p| p.strip_prefix(path).ok())
            .filter_map(|rel| rel.components().next())
            .map(|first| path.join(first))
            .collect();

        Ok(children.into_iter().collect())
    }
}
