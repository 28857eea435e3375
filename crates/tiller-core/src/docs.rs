use crate::error::{Result, TillerError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// DocFile
// ---------------------------------------------------------------------------

/// The six planning documents a project maintains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocFile {
    Overview,
    Roadmap,
    Tasks,
    Log,
    Ideas,
    Archive,
}

impl DocFile {
    pub fn all() -> &'static [DocFile] {
        &[
            DocFile::Overview,
            DocFile::Roadmap,
            DocFile::Tasks,
            DocFile::Log,
            DocFile::Ideas,
            DocFile::Archive,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DocFile::Overview => "overview",
            DocFile::Roadmap => "roadmap",
            DocFile::Tasks => "tasks",
            DocFile::Log => "log",
            DocFile::Ideas => "ideas",
            DocFile::Archive => "archive",
        }
    }

    pub fn filename(self) -> &'static str {
        match self {
            DocFile::Overview => "overview.md",
            DocFile::Roadmap => "roadmap.md",
            DocFile::Tasks => "tasks.md",
            DocFile::Log => "log.md",
            DocFile::Ideas => "ideas.md",
            DocFile::Archive => "archive.md",
        }
    }
}

impl fmt::Display for DocFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DocFile {
    type Err = TillerError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "overview" => Ok(DocFile::Overview),
            "roadmap" => Ok(DocFile::Roadmap),
            "tasks" => Ok(DocFile::Tasks),
            "log" => Ok(DocFile::Log),
            "ideas" => Ok(DocFile::Ideas),
            "archive" => Ok(DocFile::Archive),
            _ => Err(TillerError::UnknownDocument(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// DocumentStore
// ---------------------------------------------------------------------------

/// Whole-file access to the planning documents. The engine never assumes a
/// document exists; a missing read target surfaces as `MissingDocument`.
pub trait DocumentStore {
    fn read(&self, file: DocFile) -> Result<String>;
    fn write(&mut self, file: DocFile, content: &str) -> Result<()>;

    fn exists(&self, file: DocFile) -> bool {
        self.read(file).is_ok()
    }
}

// ---------------------------------------------------------------------------
// FsStore
// ---------------------------------------------------------------------------

/// Directory-backed store. Writes are atomic (tempfile + rename).
#[derive(Debug, Clone)]
pub struct FsStore {
    dir: PathBuf,
}

impl FsStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, file: DocFile) -> PathBuf {
        self.dir.join(file.filename())
    }
}

impl DocumentStore for FsStore {
    fn read(&self, file: DocFile) -> Result<String> {
        let path = self.path(file);
        if !path.exists() {
            return Err(TillerError::MissingDocument(file));
        }
        Ok(std::fs::read_to_string(path)?)
    }

    fn write(&mut self, file: DocFile, content: &str) -> Result<()> {
        crate::io::atomic_write(&self.path(file), content.as_bytes())
    }
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// In-memory store for hosts that hold documents themselves, and for tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    files: HashMap<DocFile, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, file: DocFile, content: impl Into<String>) -> Self {
        self.files.insert(file, content.into());
        self
    }
}

impl DocumentStore for MemoryStore {
    fn read(&self, file: DocFile) -> Result<String> {
        self.files
            .get(&file)
            .cloned()
            .ok_or(TillerError::MissingDocument(file))
    }

    fn write(&mut self, file: DocFile, content: &str) -> Result<()> {
        self.files.insert(file, content.to_string());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn docfile_roundtrip() {
        use std::str::FromStr;
        for file in DocFile::all() {
            let parsed = DocFile::from_str(file.as_str()).unwrap();
            assert_eq!(*file, parsed);
        }
    }

    #[test]
    fn docfile_unknown() {
        use std::str::FromStr;
        assert!(matches!(
            DocFile::from_str("notebook"),
            Err(TillerError::UnknownDocument(_))
        ));
    }

    #[test]
    fn fs_store_missing_read() {
        let dir = TempDir::new().unwrap();
        let store = FsStore::new(dir.path());
        assert!(matches!(
            store.read(DocFile::Tasks),
            Err(TillerError::MissingDocument(DocFile::Tasks))
        ));
    }

    #[test]
    fn fs_store_write_read() {
        let dir = TempDir::new().unwrap();
        let mut store = FsStore::new(dir.path());
        store.write(DocFile::Log, "## 2026-01-05\n").unwrap();
        assert_eq!(store.read(DocFile::Log).unwrap(), "## 2026-01-05\n");
        assert!(store.exists(DocFile::Log));
        assert!(!store.exists(DocFile::Ideas));
    }

    #[test]
    fn memory_store_write_read() {
        let mut store = MemoryStore::new().with(DocFile::Tasks, "## Active\n");
        assert_eq!(store.read(DocFile::Tasks).unwrap(), "## Active\n");
        store.write(DocFile::Tasks, "## Active\n- [ ] T1\n").unwrap();
        assert_eq!(store.read(DocFile::Tasks).unwrap(), "## Active\n- [ ] T1\n");
    }
}
