use crate::error::Error;
use crate::fs::FileSystem;
use crate::preserved;
use glob::Pattern;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, error, warn};

/// A local file over the size threshold that is not preserved.
#[derive(Debug, Clone)]
pub struct FileCandidate {
    pub path: PathBuf,
    pub name: String,
    pub size: u64,
    pub modified: Option<SystemTime>,
    content_hash: Option<String>,
}

impl FileCandidate {
    pub fn new(path: PathBuf, name: String, size: u64, modified: Option<SystemTime>) -> Self {
        Self {
            path,
            name,
            size,
            modified,
            content_hash: None,
        }
    }

    /// The hash if it has been computed this run. An empty string means hashing failed.
    pub fn known_hash(&self) -> Option<&str> {
        self.content_hash.as_deref()
    }

    /// Compute the MD5 at most once per run. Failures are logged and cached as "".
    pub fn content_hash(&mut self, fs: &dyn FileSystem) -> &str {
        if self.content_hash.is_none() {
            let hash = match fs.md5(&self.path) {
                Ok(hash) => hash,
                Err(e) => {
                    warn!("Could not compute MD5 for {}: {}", self.name, e);
                    String::new()
                }
            };
            self.content_hash = Some(hash);
        }
        self.content_hash.as_deref().unwrap_or_default()
    }
}

/// List files directly inside `dir` larger than `threshold` bytes, skipping
/// ignored names and anything in the preserved set.
pub fn find_large_files(
    fs: &dyn FileSystem,
    dir: &Path,
    threshold: u64,
    ignore_globs: &[String],
    preserved_paths: &HashSet<PathBuf>,
) -> Result<Vec<FileCandidate>, Error> {
    if !fs.is_dir(dir) {
        return Err(Error::DownloadsDirMissing(dir.to_path_buf()));
    }

    let ignore_patterns: Vec<Pattern> = ignore_globs
        .iter()
        .filter_map(|glob| match Pattern::new(glob) {
            Ok(p) => Some(p),
            Err(e) => {
                error!("Invalid glob pattern '{}': {}", glob, e);
                None
            }
        })
        .collect();

    let mut candidates = Vec::new();
    for path in fs.list_files(dir)? {
        let name = fs.basename(&path);
        if ignore_patterns
            .iter()
            .any(|pattern| pattern.matches(&name) || pattern.matches_path(&path))
        {
            debug!("Ignoring {}", path.display());
            continue;
        }

        let size = match fs.size(&path) {
            Ok(size) => size,
            Err(e) => {
                warn!("Error getting size of {}: {}", path.display(), e);
                continue;
            }
        };
        if size <= threshold {
            continue;
        }
        if preserved_paths.contains(&preserved::normalize(&path)) {
            debug!("Skipping preserved file {}", path.display());
            continue;
        }

        let modified = fs.mtime(&path).ok();
        candidates.push(FileCandidate::new(path, name, size, modified));
    }

    Ok(candidates)
}
