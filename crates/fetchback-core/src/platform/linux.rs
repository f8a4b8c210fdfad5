use std::io;
use std::path::Path;
use std::process::Command;
use tracing::debug;

// Set by Chromium and Firefox on Linux: the download URL, then the page it came from.
const ORIGIN_ATTRS: [&str; 2] = ["user.xdg.origin.url", "user.xdg.referrer.url"];

pub fn xdg_origin_urls(path: &Path) -> Vec<String> {
    let mut urls: Vec<String> = Vec::new();
    for attr in ORIGIN_ATTRS {
        match read_attr(path, attr) {
            Ok(Some(url)) if !urls.contains(&url) => urls.push(url),
            Ok(_) => {}
            Err(e) => {
                debug!("Could not read {} on {}: {}", attr, path.display(), e);
                break;
            }
        }
    }
    urls
}

fn read_attr(path: &Path, attr: &str) -> io::Result<Option<String>> {
    let output = Command::new("getfattr")
        .args(["--only-values", "--absolute-names", "-n", attr])
        .arg(path)
        .output()?;
    if !output.status.success() {
        return Ok(None);
    }
    let value = String::from_utf8_lossy(&output.stdout)
        .trim_end_matches('\0')
        .trim()
        .to_string();
    if value.starts_with("http://") || value.starts_with("https://") {
        Ok(Some(value))
    } else {
        Ok(None)
    }
}
