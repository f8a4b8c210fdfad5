use crate::hasher;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use walkdir::WalkDir;

/// Filesystem primitives used by the scanner and the workflow.
///
/// Everything that touches the disk goes through this trait so a run can be
/// driven against a scratch directory or a recording double.
pub trait FileSystem {
    fn exists(&self, path: &Path) -> bool;
    fn is_dir(&self, path: &Path) -> bool;
    fn size(&self, path: &Path) -> io::Result<u64>;
    fn mtime(&self, path: &Path) -> io::Result<SystemTime>;
    fn delete(&self, path: &Path) -> io::Result<()>;
    /// Regular files directly inside `dir`, sorted by path. Symlinks are skipped.
    fn list_files(&self, dir: &Path) -> io::Result<Vec<PathBuf>>;
    fn write_text(&self, path: &Path, content: &str) -> io::Result<()>;
    fn read_text(&self, path: &Path) -> io::Result<String>;
    /// Hex MD5 of the file's contents.
    fn md5(&self, path: &Path) -> io::Result<String>;

    fn basename(&self, path: &Path) -> String {
        path.file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// File name without its last extension.
    fn stem(&self, path: &Path) -> String {
        path.file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFileSystem;

impl FileSystem for LocalFileSystem {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn size(&self, path: &Path) -> io::Result<u64> {
        Ok(fs::metadata(path)?.len())
    }

    fn mtime(&self, path: &Path) -> io::Result<SystemTime> {
        fs::metadata(path)?.modified()
    }

    fn delete(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }

    fn list_files(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
            let entry = entry.map_err(|err| {
                io::Error::new(
                    io::ErrorKind::Other,
                    format!("Error reading directory {}: {}", dir.display(), err),
                )
            })?;
            if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }
        Ok(files)
    }

    fn write_text(&self, path: &Path, content: &str) -> io::Result<()> {
        fs::write(path, content)
    }

    fn read_text(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(path)
    }

    fn md5(&self, path: &Path) -> io::Result<String> {
        hasher::md5_file(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_list_files_is_shallow_and_sorted() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("b.bin"), b"b").unwrap();
        fs::write(dir.path().join("a.bin"), b"a").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub").join("c.bin"), b"c").unwrap();

        let files = LocalFileSystem.list_files(dir.path()).unwrap();
        let names: Vec<String> = files.iter().map(|p| LocalFileSystem.basename(p)).collect();
        assert_eq!(names, vec!["a.bin", "b.bin"]);
    }

    #[test]
    fn test_stem_drops_last_extension() {
        let fs = LocalFileSystem;
        assert_eq!(fs.stem(Path::new("/d/archive.tar.gz")), "archive.tar");
        assert_eq!(fs.basename(Path::new("/d/archive.tar.gz")), "archive.tar.gz");
    }
}
