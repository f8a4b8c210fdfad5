use crate::assembler::RetrievableFile;
use crate::error::Error;
use crate::probe::UrlType;
use crate::storage::models::{DeletedFileRecord, DownloadUrlRecord, LedgerStats};
use crate::storage::Database;
use chrono::{DateTime, Duration, Local};
use tracing::{debug, info};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const RECENT_WINDOW_DAYS: i64 = 30;

/// A recovery URL as it is written to the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerUrl {
    pub url: String,
    pub accessible: bool,
    pub url_type: UrlType,
}

/// A file that was removed from disk in this run.
#[derive(Debug, Clone)]
pub struct DeletedFile {
    pub name: String,
    pub path: String,
    pub size: u64,
    /// MD5 taken before removal; empty if it could not be computed.
    pub content_hash: String,
    pub deleted_at: DateTime<Local>,
    pub urls: Vec<LedgerUrl>,
}

impl DeletedFile {
    pub fn from_retrievable(file: &RetrievableFile, content_hash: String, deleted_at: DateTime<Local>) -> Self {
        Self {
            name: file.candidate.name.clone(),
            path: file.candidate.path.to_string_lossy().into_owned(),
            size: file.candidate.size,
            content_hash,
            deleted_at,
            urls: file
                .urls
                .iter()
                .map(|checked| LedgerUrl {
                    url: checked.source.url.clone(),
                    accessible: checked.probe.accessible,
                    url_type: checked.probe.url_type,
                })
                .collect(),
        }
    }
}

/// Append-only record of deletions and how to get each file back.
pub struct Ledger<'a> {
    db: &'a Database,
}

impl<'a> Ledger<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Write a batch in one transaction: each parent row, then its URLs.
    /// Any integrity error rolls back the whole batch and is returned.
    pub fn record(&self, batch: &[DeletedFile]) -> Result<Vec<i64>, Error> {
        if batch.is_empty() {
            debug!("Nothing to record in the ledger");
            return Ok(Vec::new());
        }

        let tx = self.db.connection().unchecked_transaction()?;
        let mut ids = Vec::with_capacity(batch.len());
        for file in batch {
            let id = self.db.insert_deleted_file(
                &file.name,
                &file.path,
                file.size as i64,
                &file.content_hash,
                &file.deleted_at.format(TIMESTAMP_FORMAT).to_string(),
            )?;
            for url in &file.urls {
                self.db.insert_download_url(
                    id,
                    &url.url,
                    &file.content_hash,
                    url.accessible,
                    url.url_type,
                )?;
            }
            ids.push(id);
        }
        tx.commit()?;

        info!("Recorded {} deleted file(s) in the ledger", ids.len());
        Ok(ids)
    }

    pub fn statistics(&self) -> Result<LedgerStats, Error> {
        let cutoff = (Local::now() - Duration::days(RECENT_WINDOW_DAYS))
            .format(TIMESTAMP_FORMAT)
            .to_string();
        Ok(self.db.get_statistics(&cutoff)?)
    }

    pub fn find_by_hash(&self, md5: &str) -> Result<Vec<DeletedFileRecord>, Error> {
        Ok(self.db.find_files_by_md5(&md5.trim().to_ascii_lowercase())?)
    }

    pub fn urls_for(&self, deleted_file_id: i64) -> Result<Vec<DownloadUrlRecord>, Error> {
        Ok(self.db.find_file_urls(deleted_file_id)?)
    }

    pub fn recent(&self, limit: i64) -> Result<Vec<DeletedFileRecord>, Error> {
        Ok(self.db.list_deleted_files(limit)?)
    }

    /// Drop a ledger entry together with its URLs.
    pub fn forget(&self, deleted_file_id: i64) -> Result<bool, Error> {
        Ok(self.db.delete_deleted_file(deleted_file_id)?)
    }
}
