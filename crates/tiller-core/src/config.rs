use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "tiller.yaml";

// ---------------------------------------------------------------------------
// ProjectConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Directory holding the six planning documents, relative to the
    /// project root.
    #[serde(default = "default_docs_dir")]
    pub docs_dir: String,

    /// Source-control repository identifier (e.g. "org/repo"). Absent means
    /// the commit-matching step is skipped, not an error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,

    /// How many commits the commit feed is asked for.
    #[serde(default = "default_commit_limit")]
    pub commit_limit: u32,
}

fn default_docs_dir() -> String {
    "planning".to_string()
}

fn default_commit_limit() -> u32 {
    30
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            docs_dir: default_docs_dir(),
            repo: None,
            commit_limit: default_commit_limit(),
        }
    }
}

impl ProjectConfig {
    /// Load `tiller.yaml` from the project root, falling back to defaults
    /// when the file is absent.
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(&path)?;
        let config: ProjectConfig = serde_yaml::from_str(&data)?;
        Ok(config)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&root.join(CONFIG_FILE), data.as_bytes())
    }

    pub fn docs_path(&self, root: &Path) -> PathBuf {
        root.join(&self.docs_dir)
    }

    pub fn has_repo(&self) -> bool {
        self.repo.as_deref().map(|r| !r.is_empty()).unwrap_or(false)
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
    fn defaults_when_absent() {
        let dir = TempDir::new().unwrap();
        let config = ProjectConfig::load(dir.path()).unwrap();
        assert_eq!(config.docs_dir, "planning");
        assert!(config.repo.is_none());
        assert!(!config.has_repo());
    }

    #[test]
    fn roundtrip() {
        let dir = TempDir::new().unwrap();
        let config = ProjectConfig {
            docs_dir: "docs/plan".to_string(),
            repo: Some("orchard9/tiller".to_string()),
            commit_limit: 50,
        };
        config.save(dir.path()).unwrap();

        let loaded = ProjectConfig::load(dir.path()).unwrap();
        assert_eq!(loaded.docs_dir, "docs/plan");
        assert_eq!(loaded.repo.as_deref(), Some("orchard9/tiller"));
        assert_eq!(loaded.commit_limit, 50);
        assert!(loaded.has_repo());
    }

    #[test]
    fn partial_yaml_fills_defaults() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "repo: org/proj\n").unwrap();
        let config = ProjectConfig::load(dir.path()).unwrap();
        assert_eq!(config.docs_dir, "planning");
        assert_eq!(config.commit_limit, 30);
        assert!(config.has_repo());
    }

    #[test]
    fn empty_repo_string_counts_as_absent() {
        let config = ProjectConfig {
            repo: Some(String::new()),
            ..Default::default()
        };
        assert!(!config.has_repo());
    }
}
