use std::io::{self, Write};
use std::path::Path;
use std::process::Command;
use tracing::debug;

const WHERE_FROMS_ATTR: &str = "com.apple.metadata:kMDItemWhereFroms";

/// Read `kMDItemWhereFroms`, a binary plist stored as an extended attribute.
pub fn where_froms(path: &Path) -> Vec<String> {
    match read_where_froms(path) {
        Ok(urls) => urls,
        Err(e) => {
            debug!("No where-from metadata for {}: {}", path.display(), e);
            Vec::new()
        }
    }
}

fn read_where_froms(path: &Path) -> io::Result<Vec<String>> {
    let output = Command::new("xattr")
        .arg("-px")
        .arg(WHERE_FROMS_ATTR)
        .arg(path)
        .output()?;
    if !output.status.success() {
        return Ok(Vec::new());
    }

    let hex_dump: String = String::from_utf8_lossy(&output.stdout)
        .split_whitespace()
        .collect();
    if hex_dump.is_empty() {
        return Ok(Vec::new());
    }
    let plist = hex::decode(&hex_dump).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    if plist.is_empty() {
        return Ok(Vec::new());
    }

    // plutil wants a file; the temp file is removed when `scratch` drops, on every path.
    let mut scratch = tempfile::Builder::new()
        .prefix("xattr")
        .suffix(".plist")
        .tempfile()?;
    scratch.write_all(&plist)?;
    scratch.flush()?;

    let converted = Command::new("plutil")
        .args(["-convert", "xml1", "-o", "-"])
        .arg(scratch.path())
        .output()?;
    if !converted.status.success() {
        return Ok(Vec::new());
    }

    Ok(super::extract_plist_urls(&String::from_utf8_lossy(&converted.stdout)))
}
