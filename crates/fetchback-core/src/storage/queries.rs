use super::models::*;
use super::sqlite::Database;
use crate::probe::UrlType;
use rusqlite::types::Type;
use rusqlite::{params, OptionalExtension, Result, Row};
use tracing::debug;

/// Unknown `url_type` values fail the row.
fn url_type_from_row(row: &Row<'_>, idx: usize) -> Result<UrlType> {
    let value: String = row.get(idx)?;
    UrlType::parse(&value).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            format!("unknown url_type '{}'", value).into(),
        )
    })
}

fn deleted_file_from_row(row: &Row<'_>) -> Result<DeletedFileRecord> {
    Ok(DeletedFileRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        path: row.get(2)?,
        size: row.get(3)?,
        md5: row.get(4)?,
        deleted_at: row.get(5)?,
    })
}

impl Database {
    // ── Deleted Files ────────────────────────────────────────────

    /// Insert a parent ledger row and return its id.
    pub fn insert_deleted_file(
        &self,
        name: &str,
        path: &str,
        size: i64,
        md5: &str,
        deleted_at: &str,
    ) -> Result<i64> {
        self.connection().execute(
            "INSERT INTO deleted_files (name, path, size, md5, deleted_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![name, path, size, md5, deleted_at],
        )?;
        let id = self.connection().last_insert_rowid();
        debug!("Recorded deleted file {} as {}", path, id);
        Ok(id)
    }

    /// Insert a recovery URL. A repeated (file, url) pair is a no-op and yields `None`;
    /// every other constraint failure is returned as an error.
    pub fn insert_download_url(
        &self,
        deleted_file_id: i64,
        url: &str,
        md5: &str,
        accessible: bool,
        url_type: UrlType,
    ) -> Result<Option<i64>> {
        let inserted = self.connection().execute(
            "INSERT INTO download_urls (deleted_file_id, url, md5, accessible, url_type) \
             VALUES (?1, ?2, ?3, ?4, ?5) \
             ON CONFLICT(deleted_file_id, url) DO NOTHING",
            params![deleted_file_id, url, md5, accessible, url_type.as_str()],
        )?;
        if inserted == 0 {
            debug!("URL {} already recorded for file {}", url, deleted_file_id);
            return Ok(None);
        }
        Ok(Some(self.connection().last_insert_rowid()))
    }

    /// Remove a ledger row; its URLs go with it.
    pub fn delete_deleted_file(&self, id: i64) -> Result<bool> {
        let removed = self
            .connection()
            .execute("DELETE FROM deleted_files WHERE id = ?1", params![id])?;
        Ok(removed > 0)
    }

    pub fn get_deleted_file(&self, id: i64) -> Result<Option<DeletedFileRecord>> {
        self.connection()
            .query_row(
                "SELECT id, name, path, size, md5, deleted_at FROM deleted_files WHERE id = ?1",
                params![id],
                deleted_file_from_row,
            )
            .optional()
    }

    pub fn find_files_by_md5(&self, md5: &str) -> Result<Vec<DeletedFileRecord>> {
        let mut stmt = self.connection().prepare(
            "SELECT id, name, path, size, md5, deleted_at FROM deleted_files \
             WHERE md5 = ?1 ORDER BY deleted_at DESC, id DESC",
        )?;
        let files = stmt
            .query_map(params![md5], deleted_file_from_row)?
            .collect::<Result<Vec<_>>>()?;
        Ok(files)
    }

    /// Most recent deletions first.
    pub fn list_deleted_files(&self, limit: i64) -> Result<Vec<DeletedFileRecord>> {
        let mut stmt = self.connection().prepare(
            "SELECT id, name, path, size, md5, deleted_at FROM deleted_files \
             ORDER BY deleted_at DESC, id DESC LIMIT ?1",
        )?;
        let files = stmt
            .query_map(params![limit], deleted_file_from_row)?
            .collect::<Result<Vec<_>>>()?;
        Ok(files)
    }

    pub fn find_file_urls(&self, deleted_file_id: i64) -> Result<Vec<DownloadUrlRecord>> {
        let mut stmt = self.connection().prepare(
            "SELECT id, deleted_file_id, url, md5, accessible, url_type FROM download_urls \
             WHERE deleted_file_id = ?1 ORDER BY url_type, accessible DESC, id",
        )?;
        let urls = stmt
            .query_map(params![deleted_file_id], |row| {
                Ok(DownloadUrlRecord {
                    id: row.get(0)?,
                    deleted_file_id: row.get(1)?,
                    url: row.get(2)?,
                    md5: row.get(3)?,
                    accessible: row.get(4)?,
                    url_type: url_type_from_row(row, 5)?,
                })
            })?
            .collect::<Result<Vec<_>>>()?;
        Ok(urls)
    }

    // ── Statistics ───────────────────────────────────────────────

    /// Totals overall and for deletions after `recent_cutoff`
    /// (same `%Y-%m-%d %H:%M:%S` format as `deleted_at`).
    pub fn get_statistics(&self, recent_cutoff: &str) -> Result<LedgerStats> {
        let (total_files, total_size_freed): (i64, i64) = self.connection().query_row(
            "SELECT COUNT(*), COALESCE(SUM(size), 0) FROM deleted_files",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        let (recent_files, recent_size_freed): (i64, i64) = self.connection().query_row(
            "SELECT COUNT(*), COALESCE(SUM(size), 0) FROM deleted_files WHERE deleted_at > ?1",
            params![recent_cutoff],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        let mut stmt = self.connection().prepare(
            "SELECT url_type, COUNT(*), \
                    COALESCE(SUM(CASE WHEN accessible = 1 THEN 1 ELSE 0 END), 0) \
             FROM download_urls GROUP BY url_type ORDER BY url_type",
        )?;
        let urls_by_type = stmt
            .query_map([], |row| {
                Ok(UrlTypeStats {
                    url_type: url_type_from_row(row, 0)?,
                    total: row.get(1)?,
                    accessible: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>>>()?;

        Ok(LedgerStats {
            total_files,
            total_size_freed,
            recent_files,
            recent_size_freed,
            urls_by_type,
        })
    }

    // ── Preserved Files ──────────────────────────────────────────

    /// Returns false when the path was already preserved.
    pub fn add_preserved_file(&self, path: &str, added_at: &str) -> Result<bool> {
        let inserted = self.connection().execute(
            "INSERT OR IGNORE INTO preserved_files (path, added_at) VALUES (?1, ?2)",
            params![path, added_at],
        )?;
        Ok(inserted > 0)
    }

    pub fn preserved_file_exists(&self, path: &str) -> Result<bool> {
        let found: Option<i64> = self
            .connection()
            .query_row(
                "SELECT 1 FROM preserved_files WHERE path = ?1",
                params![path],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    pub fn all_preserved_files(&self) -> Result<Vec<PreservedFile>> {
        let mut stmt = self
            .connection()
            .prepare("SELECT id, path, added_at FROM preserved_files ORDER BY path")?;
        let files = stmt
            .query_map([], |row| {
                Ok(PreservedFile {
                    id: row.get(0)?,
                    path: row.get(1)?,
                    added_at: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>>>()?;
        Ok(files)
    }

    pub fn remove_preserved_file(&self, path: &str) -> Result<bool> {
        let removed = self.connection().execute(
            "DELETE FROM preserved_files WHERE path = ?1",
            params![path],
        )?;
        Ok(removed > 0)
    }
}
