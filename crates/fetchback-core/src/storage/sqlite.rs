use rusqlite::{Connection, Result};
use std::path::Path;
use tracing::{debug, info};

const INDEXES: &str = "
    CREATE INDEX IF NOT EXISTS idx_deleted_files_md5 ON deleted_files(md5);
    CREATE INDEX IF NOT EXISTS idx_deleted_files_name ON deleted_files(name);
    CREATE INDEX IF NOT EXISTS idx_deleted_files_deleted_at ON deleted_files(deleted_at);
    CREATE INDEX IF NOT EXISTS idx_download_urls_deleted_file_id ON download_urls(deleted_file_id);
    CREATE INDEX IF NOT EXISTS idx_download_urls_url_type ON download_urls(url_type);
    CREATE INDEX IF NOT EXISTS idx_download_urls_accessible ON download_urls(accessible);
    CREATE INDEX IF NOT EXISTS idx_download_urls_md5 ON download_urls(md5);
    CREATE INDEX IF NOT EXISTS idx_download_urls_url ON download_urls(url);";

/// Handle to the ledger database. Opened once per run and borrowed by the
/// ledger, the preserved set and the workflow.
pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        let db = Database { conn };
        db.configure_pragmas(true)?;
        db.migrate_schema()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.configure_pragmas(false)?;
        db.migrate_schema()?;
        Ok(db)
    }

    /// Wrap an existing connection, e.g. one holding an older schema.
    pub fn from_connection(conn: Connection) -> Result<Self> {
        let db = Database { conn };
        db.configure_pragmas(false)?;
        db.migrate_schema()?;
        Ok(db)
    }

    fn configure_pragmas(&self, file_backed: bool) -> Result<()> {
        self.conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             PRAGMA temp_store = MEMORY;
             PRAGMA busy_timeout = 5000;",
        )?;
        if file_backed {
            self.conn.execute_batch(
                "PRAGMA journal_mode = WAL;
                 PRAGMA synchronous = NORMAL;
                 PRAGMA mmap_size = 268435456;",
            )?;
            debug!("SQLite pragmas configured (WAL mode, 256MB mmap)");
        } else {
            debug!("SQLite pragmas configured (in-memory)");
        }
        Ok(())
    }

    /// Create tables and indexes if missing. Safe to run on every start.
    pub fn migrate_schema(&self) -> Result<()> {
        self.conn.execute_batch(include_str!("schema.sql"))?;
        self.migrate_download_urls()?;
        self.conn.execute_batch(INDEXES)?;
        debug!("SQLite schema initialized");
        Ok(())
    }

    /// Older ledgers stored the hash only on the parent row. Rebuild
    /// `download_urls` with its own `md5` column, backfilled from the parent.
    fn migrate_download_urls(&self) -> Result<()> {
        let columns: Vec<String> = {
            let mut stmt = self.conn.prepare("PRAGMA table_info(download_urls)")?;
            let names = stmt
                .query_map([], |row| row.get::<_, String>(1))?
                .collect::<Result<Vec<_>>>()?;
            names
        };
        if columns.iter().any(|name| name == "md5") {
            return Ok(());
        }

        info!("Migrating download_urls table to add md5 column");
        let tx = self.conn.unchecked_transaction()?;
        tx.execute_batch(
            "CREATE TABLE download_urls_new (
                 id INTEGER PRIMARY KEY AUTOINCREMENT,
                 deleted_file_id INTEGER NOT NULL,
                 url TEXT NOT NULL,
                 md5 TEXT NOT NULL,
                 accessible BOOLEAN NOT NULL DEFAULT 0,
                 url_type TEXT NOT NULL DEFAULT 'file',
                 created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                 updated_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                 FOREIGN KEY(deleted_file_id) REFERENCES deleted_files(id) ON DELETE CASCADE,
                 UNIQUE(deleted_file_id, url)
             );",
        )?;

        // Timestamps survive when the old table had them; otherwise they default to now.
        let mut copied = vec!["id", "deleted_file_id", "url", "accessible", "url_type"];
        for stamp in ["created_at", "updated_at"] {
            if columns.iter().any(|name| name == stamp) {
                copied.push(stamp);
            }
        }
        let target = copied.join(", ");
        let source = copied
            .iter()
            .map(|name| format!("du.{}", name))
            .collect::<Vec<_>>()
            .join(", ");
        tx.execute_batch(&format!(
            "INSERT INTO download_urls_new ({target}, md5)
                 SELECT {source}, df.md5
                 FROM download_urls du
                 JOIN deleted_files df ON du.deleted_file_id = df.id;
             DROP TABLE download_urls;
             ALTER TABLE download_urls_new RENAME TO download_urls;",
        ))?;
        tx.commit()?;
        info!("download_urls migration completed");
        Ok(())
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}
