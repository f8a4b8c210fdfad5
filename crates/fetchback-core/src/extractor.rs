use crate::fs::FileSystem;
use crate::platform;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Where a provenance URL was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlOrigin {
    MetadataAttribute,
    SidecarFile,
}

impl fmt::Display for UrlOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UrlOrigin::MetadataAttribute => write!(f, "metadata"),
            UrlOrigin::SidecarFile => write!(f, "sidecar"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvenanceUrl {
    pub url: String,
    pub origin: UrlOrigin,
}

/// Source of OS-recorded origin URLs for a file.
pub trait OriginAttributes {
    fn origin_urls(&self, path: &Path) -> Vec<String>;
}

/// Reads the platform's download-origin attribute.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlatformOrigins;

impl OriginAttributes for PlatformOrigins {
    fn origin_urls(&self, path: &Path) -> Vec<String> {
        platform::origin_urls(path)
    }
}

/// Never reports origin metadata; only sidecar files are consulted.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOrigins;

impl OriginAttributes for NoOrigins {
    fn origin_urls(&self, _path: &Path) -> Vec<String> {
        Vec::new()
    }
}

pub struct UrlExtractor<'a> {
    fs: &'a dyn FileSystem,
    origins: &'a dyn OriginAttributes,
}

impl<'a> UrlExtractor<'a> {
    pub fn new(fs: &'a dyn FileSystem, origins: &'a dyn OriginAttributes) -> Self {
        Self { fs, origins }
    }

    /// Distinct provenance URLs for `path` in discovery order.
    /// The sidecar shortcut is read only when the metadata attribute yields nothing.
    pub fn extract(&self, path: &Path) -> Vec<ProvenanceUrl> {
        let mut urls: Vec<ProvenanceUrl> = Vec::new();
        for url in self.origins.origin_urls(path) {
            push_distinct(&mut urls, url, UrlOrigin::MetadataAttribute);
        }

        if urls.is_empty() {
            if let Some(url) = self.sidecar_url(path) {
                push_distinct(&mut urls, url, UrlOrigin::SidecarFile);
            }
        }

        debug!("{} provenance URL(s) for {}", urls.len(), path.display());
        urls
    }

    fn sidecar_url(&self, path: &Path) -> Option<String> {
        let sidecar = sidecar_path(self.fs, path)?;
        if sidecar == path || !self.fs.exists(&sidecar) {
            return None;
        }
        match self.fs.read_text(&sidecar) {
            Ok(content) => parse_shortcut(&content),
            Err(e) => {
                debug!("Could not read sidecar {}: {}", sidecar.display(), e);
                None
            }
        }
    }
}

fn push_distinct(urls: &mut Vec<ProvenanceUrl>, url: String, origin: UrlOrigin) {
    let url = url.trim().to_string();
    if url.is_empty() || urls.iter().any(|existing| existing.url == url) {
        return;
    }
    urls.push(ProvenanceUrl { url, origin });
}

/// `<dir>/<stem>.url` beside the target.
pub fn sidecar_path(fs: &dyn FileSystem, path: &Path) -> Option<PathBuf> {
    let stem = fs.stem(path);
    if stem.is_empty() {
        return None;
    }
    Some(path.parent()?.join(format!("{}.url", stem)))
}

/// The value of the first `URL=` line of an internet shortcut.
pub fn parse_shortcut(content: &str) -> Option<String> {
    content
        .lines()
        .filter_map(|line| line.trim().strip_prefix("URL="))
        .map(str::trim)
        .find(|url| !url.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_shortcut() {
        let content = "[InternetShortcut]\r\nURL=https://example.com/file.zip\r\nIconIndex=0\r\n";
        assert_eq!(
            parse_shortcut(content),
            Some("https://example.com/file.zip".to_string())
        );
        assert_eq!(parse_shortcut("[InternetShortcut]\nURL=\n"), None);
        assert_eq!(parse_shortcut("nothing here"), None);
    }
}
