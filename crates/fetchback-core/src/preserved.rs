use crate::error::Error;
use crate::ledger::TIMESTAMP_FORMAT;
use crate::storage::Database;
use chrono::Local;
use std::collections::HashSet;
use std::env;
use std::path::{Component, Path, PathBuf};
use tracing::info;

/// Files the operator has opted out of ever being offered for deletion.
pub struct PreservedSet<'a> {
    db: &'a Database,
}

impl<'a> PreservedSet<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Returns false if the path was already preserved.
    pub fn add(&self, path: &Path) -> Result<bool, Error> {
        let normalized = normalize(path);
        let added_at = Local::now().format(TIMESTAMP_FORMAT).to_string();
        let added = self
            .db
            .add_preserved_file(&normalized.to_string_lossy(), &added_at)?;
        if added {
            info!("Preserved {}", normalized.display());
        }
        Ok(added)
    }

    pub fn contains(&self, path: &Path) -> Result<bool, Error> {
        Ok(self
            .db
            .preserved_file_exists(&normalize(path).to_string_lossy())?)
    }

    pub fn remove(&self, path: &Path) -> Result<bool, Error> {
        Ok(self
            .db
            .remove_preserved_file(&normalize(path).to_string_lossy())?)
    }

    pub fn paths(&self) -> Result<Vec<PathBuf>, Error> {
        Ok(self
            .db
            .all_preserved_files()?
            .into_iter()
            .map(|entry| PathBuf::from(entry.path))
            .collect())
    }

    pub fn path_set(&self) -> Result<HashSet<PathBuf>, Error> {
        Ok(self.paths()?.into_iter().collect())
    }
}

/// Absolute form of `path` with `.` and `..` resolved lexically.
pub fn normalize(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}
