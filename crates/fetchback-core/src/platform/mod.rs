#[cfg(target_os = "macos")]
pub mod macos;

#[cfg(target_os = "linux")]
pub mod linux;

use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

/// Origin URLs the OS recorded for a downloaded file, in the order stored.
/// Missing attributes, missing tools and corrupt values all yield an empty list.
#[cfg(target_os = "macos")]
pub fn origin_urls(path: &Path) -> Vec<String> {
    macos::where_froms(path)
}

#[cfg(target_os = "linux")]
pub fn origin_urls(path: &Path) -> Vec<String> {
    linux::xdg_origin_urls(path)
}

#[cfg(not(any(target_os = "macos", target_os = "linux")))]
pub fn origin_urls(_path: &Path) -> Vec<String> {
    Vec::new()
}

/// Pull every `<string>http(s)://…</string>` out of an XML property list.
pub fn extract_plist_urls(xml: &str) -> Vec<String> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| {
        Regex::new(r"<string>(https?://[^<]+)</string>").expect("plist url pattern is valid")
    });

    let mut urls: Vec<String> = Vec::new();
    for captures in pattern.captures_iter(xml) {
        let url = unescape_xml(captures[1].trim());
        if !urls.contains(&url) {
            urls.push(url);
        }
    }
    urls
}

fn unescape_xml(value: &str) -> String {
    value
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
