//! Confidence-tiered freshness checks between a local file and a remote URL.
//!
//! Only an MD5-shaped ETag equal to the local digest is treated as proof that
//! the remote copy is unchanged. Every other tier assumes the content differs.

use crate::probe::ProbeResult;
use chrono::{DateTime, Utc};
use std::time::SystemTime;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComparisonVerdict {
    EtagMd5Match { etag: String },
    EtagMd5Mismatch { etag: String, local_hash: String },
    EtagUnverifiable { etag: String },
    LastModifiedOnly { last_modified: String },
    NoValidator,
    ProbeError { error: Option<String> },
}

impl ComparisonVerdict {
    pub fn changed(&self) -> bool {
        !matches!(self, ComparisonVerdict::EtagMd5Match { .. })
    }

    pub fn method(&self) -> &'static str {
        match self {
            ComparisonVerdict::EtagMd5Match { .. } => "etag_md5_match",
            ComparisonVerdict::EtagMd5Mismatch { .. } => "etag_md5_mismatch",
            ComparisonVerdict::EtagUnverifiable { .. } => "etag_unverifiable",
            ComparisonVerdict::LastModifiedOnly { .. } => "last_modified_only",
            ComparisonVerdict::NoValidator => "no_validator",
            ComparisonVerdict::ProbeError { .. } => "probe_error",
        }
    }

    pub fn detail(&self) -> String {
        match self {
            ComparisonVerdict::EtagMd5Match { etag } => {
                format!("ETag {} matches the local MD5", etag)
            }
            ComparisonVerdict::EtagMd5Mismatch { etag, local_hash } if local_hash.is_empty() => {
                format!("ETag {} cannot be checked, local MD5 unavailable", etag)
            }
            ComparisonVerdict::EtagMd5Mismatch { etag, local_hash } => {
                format!("ETag {} differs from local MD5 {}", etag, local_hash)
            }
            ComparisonVerdict::EtagUnverifiable { etag } => {
                format!("ETag {} is not an MD5 digest", etag)
            }
            ComparisonVerdict::LastModifiedOnly { last_modified } => {
                format!("only Last-Modified available ({})", last_modified)
            }
            ComparisonVerdict::NoValidator => "no remote version info available".to_string(),
            ComparisonVerdict::ProbeError { error } => match error {
                Some(error) => format!("source unreachable: {}", error),
                None => "source unreachable".to_string(),
            },
        }
    }
}

/// Capability chosen when the workflow is built: compare or decline to.
pub trait FreshnessComparator: Sync {
    fn compare(&self, probe: &ProbeResult, local_hash: &str) -> ComparisonVerdict;
}

/// The validator policy: ETag tiers, then Last-Modified, then nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct ValidatorComparator;

impl FreshnessComparator for ValidatorComparator {
    fn compare(&self, probe: &ProbeResult, local_hash: &str) -> ComparisonVerdict {
        compare(probe, local_hash)
    }
}

/// For checkers that cannot compare: every URL is reported without validator info.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedComparator;

impl FreshnessComparator for UnsupportedComparator {
    fn compare(&self, probe: &ProbeResult, _local_hash: &str) -> ComparisonVerdict {
        if !probe.accessible {
            return ComparisonVerdict::ProbeError {
                error: probe.error.clone(),
            };
        }
        ComparisonVerdict::NoValidator
    }
}

pub fn compare(probe: &ProbeResult, local_hash: &str) -> ComparisonVerdict {
    if !probe.accessible {
        return ComparisonVerdict::ProbeError {
            error: probe.error.clone(),
        };
    }

    if let Some(etag) = probe.etag.as_deref() {
        let cleaned = clean_etag(etag);
        if is_md5_hex(cleaned) {
            return if cleaned.eq_ignore_ascii_case(local_hash.trim()) {
                ComparisonVerdict::EtagMd5Match {
                    etag: cleaned.to_string(),
                }
            } else {
                ComparisonVerdict::EtagMd5Mismatch {
                    etag: cleaned.to_string(),
                    local_hash: local_hash.to_string(),
                }
            };
        }
        return ComparisonVerdict::EtagUnverifiable {
            etag: etag.to_string(),
        };
    }

    if let Some(last_modified) = probe.last_modified.as_deref() {
        return ComparisonVerdict::LastModifiedOnly {
            last_modified: last_modified.to_string(),
        };
    }

    ComparisonVerdict::NoValidator
}

/// Strip surrounding quote characters. Weak validators keep their `W/` prefix.
pub fn clean_etag(etag: &str) -> &str {
    etag.trim().trim_matches('"')
}

pub fn is_md5_hex(value: &str) -> bool {
    value.len() == 32 && value.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Secondary heuristic for `LastModifiedOnly`: does the header name the same
/// second as the local mtime? `None` when the header does not parse.
pub fn last_modified_matches(header: &str, local_mtime: SystemTime) -> Option<bool> {
    let remote = DateTime::parse_from_rfc2822(header.trim()).ok()?;
    let local: DateTime<Utc> = local_mtime.into();
    Some(remote.timestamp() == local.timestamp())
}
