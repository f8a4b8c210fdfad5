use crate::probe::UrlType;

/// One deleted file (table `deleted_files`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletedFileRecord {
    pub id: i64,
    pub name: String,
    pub path: String,
    pub size: i64,
    /// Empty when the hash could not be computed before deletion.
    pub md5: String,
    pub deleted_at: String,
}

/// A recovery URL of a deleted file (table `download_urls`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadUrlRecord {
    pub id: i64,
    pub deleted_file_id: i64,
    pub url: String,
    pub md5: String,
    pub accessible: bool,
    pub url_type: UrlType,
}

/// A path the operator never wants offered for deletion again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreservedFile {
    pub id: i64,
    pub path: String,
    pub added_at: String,
}

/// URL counts for one `url_type`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlTypeStats {
    pub url_type: UrlType,
    pub total: i64,
    pub accessible: i64,
}

/// Aggregate view of the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerStats {
    pub total_files: i64,
    pub total_size_freed: i64,
    pub recent_files: i64,
    pub recent_size_freed: i64,
    pub urls_by_type: Vec<UrlTypeStats>,
}
