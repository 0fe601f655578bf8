use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::CatalogError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub name: String,
    pub path: String,
}

/// Selectable tracks, read once at startup.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Catalog {
    pub entries: Vec<CatalogEntry>,
    #[serde(skip)]
    base_dir: PathBuf,
}

impl Catalog {
    pub fn new(entries: Vec<CatalogEntry>, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            entries,
            base_dir: base_dir.into(),
        }
    }

    pub fn from_json(json: &str, base_dir: impl Into<PathBuf>) -> Result<Self, CatalogError> {
        let entries: Vec<CatalogEntry> = serde_json::from_str(json)?;
        Ok(Self::new(entries, base_dir))
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let json = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Self::from_json(&json, base_dir)
    }

    pub fn get(&self, index: usize) -> Option<&CatalogEntry> {
        self.entries.get(index)
    }

    pub fn find_by_path(&self, path: &str) -> Option<&CatalogEntry> {
        self.entries.iter().find(|e| e.path == path)
    }

    /// URLs are returned untouched; relative file paths resolve against the catalog directory.
    pub fn resolve(&self, entry: &CatalogEntry) -> String {
        if is_remote(&entry.path) || Path::new(&entry.path).is_absolute() {
            return entry.path.clone();
        }
        self.base_dir.join(&entry.path).display().to_string()
    }
}

pub fn is_remote(path: &str) -> bool {
    path.starts_with("http://") || path.starts_with("https://")
}
