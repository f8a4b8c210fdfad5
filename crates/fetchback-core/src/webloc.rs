use crate::fs::FileSystem;
use std::io;
use std::path::{Path, PathBuf};

/// `<original>.webloc` beside the deleted file.
pub fn placeholder_path(original: &Path) -> PathBuf {
    let mut name = original.as_os_str().to_os_string();
    name.push(".webloc");
    PathBuf::from(name)
}

pub fn render(url: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
  <dict>
    <key>URL</key>
    <string>{}</string>
  </dict>
</plist>
"#,
        escape_xml(url)
    )
}

/// Leave a redirect placeholder pointing at `url` in place of `original`.
pub fn write_placeholder(fs: &dyn FileSystem, original: &Path, url: &str) -> io::Result<PathBuf> {
    let path = placeholder_path(original);
    fs.write_text(&path, &render(url))?;
    Ok(path)
}

fn escape_xml(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
