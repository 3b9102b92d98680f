//! In-memory file system for tests

use super::r#trait::{DirEntry, FileSystem, FileType};
use anyhow::{anyhow, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// FileSystem holding an in-memory tree, for unit tests
#[derive(Debug, Default)]
pub struct MockFileSystem {
    files: Mutex<BTreeMap<PathBuf, Vec<u8>>>,
    dirs: Mutex<BTreeSet<PathBuf>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file, creating implied parent directories
    pub fn add_file(&self, path: impl AsRef<Path>, contents: impl AsRef<[u8]>) {
        let path = path.as_ref().to_path_buf();
        self.record_parents(&path);
        self.files
            .lock()
            .unwrap()
            .insert(path, contents.as_ref().to_vec());
    }

    /// Add an empty directory
    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let path = path.as_ref().to_path_buf();
        self.record_parents(&path);
        self.dirs.lock().unwrap().insert(path);
    }

    fn record_parents(&self, path: &Path) {
        let mut dirs = self.dirs.lock().unwrap();
        let mut current = path.parent();
        while let Some(dir) = current {
            if dir.as_os_str().is_empty() {
                break;
            }
            dirs.insert(dir.to_path_buf());
            current = dir.parent();
        }
    }
}

impl FileSystem for MockFileSystem {
    fn exists(&self, path: &Path) -> bool {
        self.is_file(path) || self.is_dir(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.dirs.lock().unwrap().contains(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        self.files.lock().unwrap().contains_key(path)
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        let bytes = self.read(path)?;
        String::from_utf8(bytes).map_err(|e| anyhow!("{}: not utf-8: {}", path.display(), e))
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        self.files
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| anyhow!("no such file: {}", path.display()))
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<DirEntry>> {
        if !self.is_dir(path) {
            return Err(anyhow!("no such directory: {}", path.display()));
        }
        let mut entries: BTreeMap<String, DirEntry> = BTreeMap::new();
        let files = self.files.lock().unwrap();
        let dirs = self.dirs.lock().unwrap();

        for (candidate, file_type) in files
            .keys()
            .map(|p| (p.clone(), FileType::File))
            .chain(dirs.iter().map(|p| (p.clone(), FileType::Directory)))
        {
            if candidate.parent() == Some(path) {
                let name = candidate
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                entries.insert(
                    name.clone(),
                    DirEntry {
                        path: candidate,
                        name,
                        file_type,
                    },
                );
            }
        }
        Ok(entries.into_values().collect())
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        self.add_file(path, contents);
        Ok(())
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        self.add_dir(path);
        Ok(())
    }

    fn remove_dir_all(&self, path: &Path) -> Result<()> {
        if !self.is_dir(path) {
            return Err(anyhow!("no such directory: {}", path.display()));
        }
        self.files
            .lock()
            .unwrap()
            .retain(|p, _| !p.starts_with(path));
        self.dirs.lock().unwrap().retain(|p| !p.starts_with(path));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_file_creates_parents() {
        let fs = MockFileSystem::new();
        fs.add_file("repo/server/package.json", "{}");

        assert!(fs.is_dir(Path::new("repo")));
        assert!(fs.is_dir(Path::new("repo/server")));
        assert!(fs.is_file(Path::new("repo/server/package.json")));
    }

    #[test]
    fn test_read_dir_lists_children_only() {
        let fs = MockFileSystem::new();
        fs.add_file("repo/a.txt", "a");
        fs.add_file("repo/sub/b.txt", "b");

        let names: Vec<String> = fs
            .read_dir(Path::new("repo"))
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["a.txt", "sub"]);
    }

    #[test]
    fn test_remove_dir_all_removes_subtree() {
        let fs = MockFileSystem::new();
        fs.add_file("store/left-pad/package.json", "{}");
        fs.add_file("store/express/package.json", "{}");

        fs.remove_dir_all(Path::new("store/left-pad")).unwrap();
        assert!(!fs.exists(Path::new("store/left-pad/package.json")));
        assert!(fs.is_file(Path::new("store/express/package.json")));
    }

    #[test]
    fn test_read_missing_file_is_error() {
        let fs = MockFileSystem::new();
        assert!(fs.read_to_string(Path::new("nope.json")).is_err());
    }
}
