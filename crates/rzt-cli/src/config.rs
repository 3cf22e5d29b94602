use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_FILE: &str = "rzt.toml";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// JSON datastore holding the catalog.
    pub catalog_path: PathBuf,
    /// Directory of link image blobs. Images stay inline when unset.
    pub images_dir: Option<PathBuf>,
    /// Backup directory used by `publish`, `restore` and `backups`.
    pub backup_dir: Option<PathBuf>,
    pub auto_import: bool,
    /// Where the last-import timestamp is kept.
    pub state_path: PathBuf,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            catalog_path: PathBuf::from("rzt-catalog.json"),
            images_dir: None,
            backup_dir: None,
            auto_import: true,
            state_path: PathBuf::from("rzt-state.json"),
        }
    }
}

impl CliConfig {
    /// Load `explicit`, else `./rzt.toml` when it exists, else defaults.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !default.exists() {
                    return Ok(Self::default());
                }
                default
            }
        };
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn parse(text: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn require_backup_dir(&self) -> anyhow::Result<&Path> {
        self.backup_dir
            .as_deref()
            .context("no backup_dir configured")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = CliConfig::default();
        assert_eq!(c.catalog_path, PathBuf::from("rzt-catalog.json"));
        assert!(c.auto_import);
        assert!(c.backup_dir.is_none());
        assert!(c.require_backup_dir().is_err());
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let c = CliConfig::parse("backup_dir = \"/srv/backups\"\nauto_import = false\n").unwrap();
        assert_eq!(c.backup_dir, Some(PathBuf::from("/srv/backups")));
        assert!(!c.auto_import);
        assert_eq!(c.state_path, PathBuf::from("rzt-state.json"));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(CliConfig::load(Some(&dir.path().join("nope.toml"))).is_err());
    }

    #[test]
    fn explicit_file_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rzt.toml");
        std::fs::write(&path, "catalog_path = \"shop.json\"\n").unwrap();
        let c = CliConfig::load(Some(&path)).unwrap();
        assert_eq!(c.catalog_path, PathBuf::from("shop.json"));
    }
}
