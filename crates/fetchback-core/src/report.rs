use crate::ledger::{DeletedFile, TIMESTAMP_FORMAT};
use crate::probe::UrlType;
use crate::size::format_size;
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};

/// `retrievable_downloads.<YYYYmmdd_HHMMSS>.md` inside `dir`.
pub fn report_path(dir: &Path, at: DateTime<Local>) -> PathBuf {
    dir.join(format!(
        "retrievable_downloads.{}.md",
        at.format("%Y%m%d_%H%M%S")
    ))
}

/// Markdown summary of one deletion batch.
pub fn render_report(deleted: &[DeletedFile], generated_at: DateTime<Local>) -> String {
    let mut lines: Vec<String> = Vec::new();
    lines.push(format!(
        "# Retrievable Downloads - {}",
        generated_at.format(TIMESTAMP_FORMAT)
    ));
    lines.push(String::new());
    lines.push(
        "The following files were deleted but can be retrieved from their original URLs:"
            .to_string(),
    );
    lines.push(String::new());

    for (index, file) in deleted.iter().enumerate() {
        lines.push(format!("## {}. {}", index + 1, file.name));
        lines.push(String::new());
        lines.push(format!("- **Size**: {}", format_size(file.size)));
        if file.urls.len() == 1 {
            let url = &file.urls[0];
            lines.push(format!(
                "- **URL**: {} ({}, {})",
                url.url,
                accessibility(url.accessible),
                type_label(url.url_type)
            ));
        } else {
            lines.push("- **URLs**:".to_string());
            for (url_index, url) in file.urls.iter().enumerate() {
                lines.push(format!(
                    "  {}. {} ({}, {})",
                    url_index + 1,
                    url.url,
                    accessibility(url.accessible),
                    type_label(url.url_type)
                ));
            }
        }
        if !file.content_hash.is_empty() {
            lines.push(format!("- **MD5**: {}", file.content_hash));
        }
        lines.push(format!(
            "- **Deleted**: {}",
            file.deleted_at.format(TIMESTAMP_FORMAT)
        ));
        lines.push(String::new());
    }

    let total: u64 = deleted.iter().map(|f| f.size).sum();
    lines.push("---".to_string());
    lines.push(format!("**Total space freed**: {}", format_size(total)));
    lines.push(format!("**Files deleted**: {}", deleted.len()));

    lines.join("\n")
}

fn accessibility(accessible: bool) -> &'static str {
    if accessible {
        "accessible"
    } else {
        "not accessible"
    }
}

pub fn type_label(url_type: UrlType) -> &'static str {
    match url_type {
        UrlType::File => "direct file",
        UrlType::Site => "site",
    }
}
