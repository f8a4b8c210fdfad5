use crate::error::Error;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, CONTENT_DISPOSITION, CONTENT_TYPE, ETAG, LAST_MODIFIED};
use reqwest::redirect::Policy;
use std::fmt;
use std::time::Duration;
use tracing::debug;

const FILE_MEDIA_PREFIXES: [&str; 4] = ["application/", "image/", "audio/", "video/"];
const DOCUMENT_SUBTYPES: [&str; 4] = ["html", "xml", "json", "xhtml+xml"];
const DOCUMENT_SUFFIXES: [&str; 2] = ["+xml", "+json"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum UrlType {
    /// The URL serves the download itself.
    File,
    /// The URL is a web page (or could not be classified further).
    Site,
}

impl UrlType {
    pub fn as_str(&self) -> &'static str {
        match self {
            UrlType::File => "file",
            UrlType::Site => "site",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "file" => Some(UrlType::File),
            "site" => Some(UrlType::Site),
            _ => None,
        }
    }
}

impl fmt::Display for UrlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a single HEAD check. Never re-probed within a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    pub accessible: bool,
    pub url_type: UrlType,
    pub status_code: Option<u16>,
    pub content_type: Option<String>,
    pub content_disposition: Option<String>,
    pub etag: Option<String>,
    pub last_modified: Option<String>,
    pub error: Option<String>,
}

impl ProbeResult {
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            accessible: false,
            url_type: UrlType::Site,
            status_code: None,
            content_type: None,
            content_disposition: None,
            etag: None,
            last_modified: None,
            error: Some(error.into()),
        }
    }

    /// Build a result from a response status and its headers, verbatim.
    pub fn from_response(
        status: u16,
        content_type: Option<String>,
        content_disposition: Option<String>,
        etag: Option<String>,
        last_modified: Option<String>,
    ) -> Self {
        let accessible = is_accessible(status);
        let url_type = if accessible {
            classify(content_type.as_deref(), content_disposition.as_deref())
        } else {
            UrlType::Site
        };
        Self {
            accessible,
            url_type,
            status_code: Some(status),
            content_type,
            content_disposition,
            etag,
            last_modified,
            error: (!accessible).then(|| format!("HTTP status {}", status)),
        }
    }
}

/// 2xx and 3xx count as reachable.
pub fn is_accessible(status: u16) -> bool {
    (200..400).contains(&status)
}

/// Decide whether a reachable URL serves a file or a page.
pub fn classify(content_type: Option<&str>, content_disposition: Option<&str>) -> UrlType {
    let attachment = content_disposition
        .map(|d| d.to_ascii_lowercase().contains("attachment"))
        .unwrap_or(false);
    if attachment {
        return UrlType::File;
    }

    let Some(content_type) = content_type else {
        return UrlType::Site;
    };
    let media_type = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    let binary = FILE_MEDIA_PREFIXES
        .iter()
        .any(|prefix| media_type.starts_with(prefix));
    let subtype = media_type.split_once('/').map(|(_, sub)| sub).unwrap_or_default();
    let document = DOCUMENT_SUBTYPES.iter().any(|doc| *doc == subtype)
        || DOCUMENT_SUFFIXES.iter().any(|suffix| subtype.ends_with(suffix));

    if binary && !document {
        UrlType::File
    } else {
        UrlType::Site
    }
}

/// Existence check for a provenance URL. Implementations capture every
/// failure inside the returned [`ProbeResult`].
pub trait UrlProbe: Sync {
    fn probe(&self, url: &str) -> ProbeResult;
}

#[derive(Debug, Clone, Copy)]
pub struct ProbeSettings {
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(10),
        }
    }
}

impl ProbeSettings {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            connect_timeout: timeout,
            read_timeout: timeout,
        }
    }
}

/// HEAD-only probe over HTTP(S). Redirects are reported, not followed.
pub struct HttpProbe {
    client: Client,
}

impl HttpProbe {
    pub fn new(settings: ProbeSettings) -> Result<Self, Error> {
        let client = Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.read_timeout)
            .redirect(Policy::none())
            .user_agent(concat!("fetchback/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

impl UrlProbe for HttpProbe {
    fn probe(&self, url: &str) -> ProbeResult {
        if url.trim().is_empty() {
            return ProbeResult::failed("empty URL");
        }

        match self.client.head(url).send() {
            Ok(response) => {
                let headers = response.headers();
                let result = ProbeResult::from_response(
                    response.status().as_u16(),
                    header_value(headers, CONTENT_TYPE),
                    header_value(headers, CONTENT_DISPOSITION),
                    header_value(headers, ETAG),
                    header_value(headers, LAST_MODIFIED),
                );
                debug!(
                    "HEAD {} -> {} ({}, etag: {:?})",
                    url,
                    response.status(),
                    result.url_type,
                    result.etag
                );
                result
            }
            Err(e) => {
                debug!("HEAD {} failed: {}", url, e);
                ProbeResult::failed(e.to_string())
            }
        }
    }
}

fn header_value(headers: &HeaderMap, name: reqwest::header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessible_status_range() {
        for status in [200, 204, 206, 301, 302, 304, 399] {
            assert!(is_accessible(status), "{} should be accessible", status);
        }
        for status in [100, 199, 400, 403, 404, 410, 500, 503] {
            assert!(!is_accessible(status), "{} should not be accessible", status);
        }
    }

    #[test]
    fn test_classify_attachment_wins() {
        assert_eq!(
            classify(Some("text/html"), Some("attachment; filename=\"x.zip\"")),
            UrlType::File
        );
        assert_eq!(
            classify(Some("text/plain"), Some("Attachment")),
            UrlType::File
        );
        assert_eq!(classify(None, Some("attachment")), UrlType::File);
    }

    #[test]
    fn test_classify_media_types() {
        assert_eq!(classify(Some("application/zip"), None), UrlType::File);
        assert_eq!(classify(Some("application/octet-stream"), None), UrlType::File);
        assert_eq!(classify(Some("video/mp4"), None), UrlType::File);
        assert_eq!(classify(Some("Image/PNG; q=1"), None), UrlType::File);
        assert_eq!(classify(Some("application/json"), None), UrlType::Site);
        assert_eq!(classify(Some("application/xhtml+xml"), None), UrlType::Site);
        assert_eq!(classify(Some("image/svg+xml"), None), UrlType::Site);
        assert_eq!(classify(Some("text/html; charset=utf-8"), None), UrlType::Site);
        assert_eq!(classify(Some("text/plain"), Some("inline")), UrlType::Site);
        assert_eq!(classify(None, None), UrlType::Site);
    }

    #[test]
    fn test_classify_office_documents_as_files() {
        for media_type in [
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        ] {
            assert_eq!(classify(Some(media_type), None), UrlType::File, "{}", media_type);
        }
        assert_eq!(classify(Some("application/xml"), None), UrlType::Site);
        assert_eq!(classify(Some("application/ld+json"), None), UrlType::Site);
        assert_eq!(classify(Some("application/atom+xml"), None), UrlType::Site);
    }

    #[test]
    fn test_from_response_inaccessible_is_site() {
        let result = ProbeResult::from_response(
            404,
            Some("application/zip".to_string()),
            None,
            Some("\"abc\"".to_string()),
            None,
        );
        assert!(!result.accessible);
        assert_eq!(result.url_type, UrlType::Site);
        assert_eq!(result.status_code, Some(404));
        assert!(result.error.is_some());
        assert_eq!(result.etag.as_deref(), Some("\"abc\""));
    }

    #[test]
    fn test_url_type_round_trip_names() {
        assert_eq!(UrlType::parse("file"), Some(UrlType::File));
        assert_eq!(UrlType::parse("site"), Some(UrlType::Site));
        assert_eq!(UrlType::parse("other"), None);
    }
}
