use chrono::{Duration, Local, TimeZone};
use fetchback_core::ledger::{DeletedFile, Ledger, LedgerUrl};
use fetchback_core::storage::Database;
use fetchback_core::{Error, UrlType};
use rusqlite::Connection;

const HASH: &str = "d41d8cd98f00b204e9800998ecf8427e";

fn count(db: &Database, table: &str) -> i64 {
    db.connection()
        .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))
        .unwrap()
}

fn deleted_file(name: &str, size: u64, urls: &[(&str, bool, UrlType)]) -> DeletedFile {
    DeletedFile {
        name: name.to_string(),
        path: format!("/home/u/Downloads/{}", name),
        size,
        content_hash: HASH.to_string(),
        deleted_at: Local::now(),
        urls: urls
            .iter()
            .map(|(url, accessible, url_type)| LedgerUrl {
                url: url.to_string(),
                accessible: *accessible,
                url_type: *url_type,
            })
            .collect(),
    }
}

#[test]
fn test_schema_setup_is_idempotent() {
    let db = Database::open_in_memory().unwrap();
    let id = db
        .insert_deleted_file("x.zip", "/d/x.zip", 10, HASH, "2024-01-01 00:00:00")
        .unwrap();
    db.insert_download_url(id, "https://h/x.zip", HASH, true, UrlType::File)
        .unwrap();

    let schema = |db: &Database| -> Vec<String> {
        let mut stmt = db
            .connection()
            .prepare("SELECT sql FROM sqlite_master WHERE sql IS NOT NULL ORDER BY name")
            .unwrap();
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .unwrap()
            .collect::<rusqlite::Result<Vec<_>>>()
            .unwrap();
        rows
    };
    let before = schema(&db);

    db.migrate_schema().unwrap();
    db.migrate_schema().unwrap();

    assert_eq!(schema(&db), before);
    assert_eq!(count(&db, "deleted_files"), 1);
    assert_eq!(count(&db, "download_urls"), 1);
}

#[test]
fn test_duplicate_url_is_a_noop() {
    let db = Database::open_in_memory().unwrap();
    let id = db
        .insert_deleted_file("x.zip", "/d/x.zip", 10, HASH, "2024-01-01 00:00:00")
        .unwrap();

    let first = db
        .insert_download_url(id, "https://h/x.zip", HASH, true, UrlType::File)
        .unwrap();
    let second = db
        .insert_download_url(id, "https://h/x.zip", HASH, true, UrlType::File)
        .unwrap();

    assert!(first.is_some());
    assert_eq!(second, None);
    assert_eq!(count(&db, "download_urls"), 1);
}

#[test]
fn test_empty_hash_is_stored_but_null_is_rejected() {
    let db = Database::open_in_memory().unwrap();
    let id = db
        .insert_deleted_file("x.zip", "/d/x.zip", 10, "", "2024-01-01 00:00:00")
        .unwrap();
    assert!(db
        .insert_download_url(id, "https://h/x.zip", "", false, UrlType::Site)
        .unwrap()
        .is_some());

    let result = db.connection().execute(
        "INSERT INTO download_urls (deleted_file_id, url, md5, accessible, url_type) \
         VALUES (?1, 'https://h/other', NULL, 0, 'site')",
        [id],
    );
    assert!(matches!(
        result,
        Err(rusqlite::Error::SqliteFailure(ref e, _))
            if e.code == rusqlite::ErrorCode::ConstraintViolation
    ));
}

#[test]
fn test_url_for_missing_parent_is_rejected() {
    let db = Database::open_in_memory().unwrap();
    let result = db.insert_download_url(999, "https://h/x.zip", HASH, true, UrlType::File);
    assert!(result.is_err());
    assert_eq!(count(&db, "download_urls"), 0);
}

#[test]
fn test_deleting_parent_cascades_to_urls() {
    let db = Database::open_in_memory().unwrap();
    let ledger = Ledger::new(&db);
    let ids = ledger
        .record(&[deleted_file(
            "x.zip",
            10,
            &[
                ("https://h/x.zip", true, UrlType::File),
                ("https://h/", true, UrlType::Site),
            ],
        )])
        .unwrap();
    assert_eq!(count(&db, "download_urls"), 2);

    assert!(ledger.forget(ids[0]).unwrap());
    assert_eq!(count(&db, "deleted_files"), 0);
    assert_eq!(count(&db, "download_urls"), 0);
    assert!(!ledger.forget(ids[0]).unwrap());
}

#[test]
fn test_old_schema_gets_md5_column_backfilled() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE deleted_files (
             id INTEGER PRIMARY KEY AUTOINCREMENT,
             name TEXT NOT NULL,
             path TEXT NOT NULL,
             size INTEGER NOT NULL,
             md5 TEXT NOT NULL,
             deleted_at DATETIME NOT NULL
         );
         CREATE TABLE download_urls (
             id INTEGER PRIMARY KEY AUTOINCREMENT,
             deleted_file_id INTEGER NOT NULL,
             url TEXT NOT NULL,
             accessible BOOLEAN NOT NULL DEFAULT 0,
             url_type TEXT NOT NULL DEFAULT 'file',
             FOREIGN KEY(deleted_file_id) REFERENCES deleted_files(id),
             UNIQUE(deleted_file_id, url)
         );
         INSERT INTO deleted_files (name, path, size, md5, deleted_at)
             VALUES ('old.iso', '/d/old.iso', 42, 'abc123', '2023-05-01 10:00:00');
         INSERT INTO download_urls (deleted_file_id, url, accessible, url_type)
             VALUES (1, 'https://h/old.iso', 1, 'file');",
    )
    .unwrap();

    let db = Database::from_connection(conn).unwrap();
    let urls = db.find_file_urls(1).unwrap();
    assert_eq!(urls.len(), 1);
    assert_eq!(urls[0].md5, "abc123");
    assert_eq!(urls[0].url, "https://h/old.iso");

    // The rebuilt table enforces the new constraints.
    assert_eq!(
        db.insert_download_url(1, "https://h/old.iso", "abc123", true, UrlType::File)
            .unwrap(),
        None
    );
    assert!(db.insert_download_url(7, "https://h/x", "abc123", true, UrlType::File).is_err());
}

#[test]
fn test_old_schema_keeps_url_timestamps() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE deleted_files (
             id INTEGER PRIMARY KEY AUTOINCREMENT,
             name TEXT NOT NULL,
             path TEXT NOT NULL,
             size INTEGER NOT NULL,
             md5 TEXT NOT NULL,
             deleted_at DATETIME NOT NULL
         );
         CREATE TABLE download_urls (
             id INTEGER PRIMARY KEY AUTOINCREMENT,
             deleted_file_id INTEGER NOT NULL,
             url TEXT NOT NULL,
             accessible BOOLEAN NOT NULL DEFAULT 0,
             url_type TEXT NOT NULL DEFAULT 'file',
             created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
             updated_at DATETIME DEFAULT CURRENT_TIMESTAMP,
             FOREIGN KEY(deleted_file_id) REFERENCES deleted_files(id),
             UNIQUE(deleted_file_id, url)
         );
         INSERT INTO deleted_files (name, path, size, md5, deleted_at)
             VALUES ('old.iso', '/d/old.iso', 42, 'abc123', '2023-05-01 10:00:00');
         INSERT INTO download_urls (deleted_file_id, url, accessible, url_type, created_at, updated_at)
             VALUES (1, 'https://h/old.iso', 1, 'file', '2023-05-01 10:00:00', '2023-06-02 11:30:00');",
    )
    .unwrap();

    let db = Database::from_connection(conn).unwrap();
    let (created, updated, md5): (String, String, String) = db
        .connection()
        .query_row(
            "SELECT created_at, updated_at, md5 FROM download_urls WHERE id = 1",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .unwrap();
    assert_eq!(created, "2023-05-01 10:00:00");
    assert_eq!(updated, "2023-06-02 11:30:00");
    assert_eq!(md5, "abc123");
}

#[test]
fn test_unknown_url_type_fails_the_read() {
    let db = Database::open_in_memory().unwrap();
    let id = db
        .insert_deleted_file("x.zip", "/d/x.zip", 10, HASH, "2024-01-01 00:00:00")
        .unwrap();
    db.connection()
        .execute(
            "INSERT INTO download_urls (deleted_file_id, url, md5, accessible, url_type) \
             VALUES (?1, 'https://h/x', ?2, 1, 'mirror')",
            rusqlite::params![id, HASH],
        )
        .unwrap();

    assert!(matches!(
        db.find_file_urls(id),
        Err(rusqlite::Error::FromSqlConversionFailure(5, _, _))
    ));
    assert!(db.get_statistics("2000-01-01 00:00:00").is_err());
}

#[test]
fn test_failed_batch_rolls_back() {
    let db = Database::open_in_memory().unwrap();
    let ledger = Ledger::new(&db);
    ledger
        .record(&[deleted_file("a.zip", 1, &[("https://h/a.zip", true, UrlType::File)])])
        .unwrap();

    // A trigger makes the second file's URL insert fail mid-batch.
    db.connection()
        .execute_batch(
            "CREATE TRIGGER reject_bad_url BEFORE INSERT ON download_urls
             WHEN NEW.url = 'https://h/bad'
             BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
        )
        .unwrap();

    let result = ledger.record(&[
        deleted_file("b.zip", 2, &[("https://h/b.zip", true, UrlType::File)]),
        deleted_file("c.zip", 3, &[("https://h/bad", true, UrlType::File)]),
    ]);
    assert!(matches!(result, Err(Error::Database(_))));
    assert_eq!(count(&db, "deleted_files"), 1);
    assert_eq!(count(&db, "download_urls"), 1);
}

#[test]
fn test_statistics_and_lookup() {
    let db = Database::open_in_memory().unwrap();
    let ledger = Ledger::new(&db);

    let mut old = deleted_file("old.iso", 1000, &[("https://h/old.iso", false, UrlType::File)]);
    old.deleted_at = Local::now() - Duration::days(90);
    let mut other = deleted_file("y.dmg", 500, &[("https://h/y", true, UrlType::Site)]);
    other.content_hash = "0123456789abcdef0123456789abcdef".to_string();

    ledger
        .record(&[
            old,
            deleted_file(
                "x.zip",
                200,
                &[
                    ("https://h/x.zip", true, UrlType::File),
                    ("https://h/x", true, UrlType::Site),
                ],
            ),
            other,
        ])
        .unwrap();

    let stats = ledger.statistics().unwrap();
    assert_eq!(stats.total_files, 3);
    assert_eq!(stats.total_size_freed, 1700);
    assert_eq!(stats.recent_files, 2);
    assert_eq!(stats.recent_size_freed, 700);

    let file_stats = stats.urls_by_type.iter().find(|s| s.url_type == UrlType::File).unwrap();
    assert_eq!((file_stats.total, file_stats.accessible), (2, 1));
    let site_stats = stats.urls_by_type.iter().find(|s| s.url_type == UrlType::Site).unwrap();
    assert_eq!((site_stats.total, site_stats.accessible), (2, 2));

    let matches = ledger.find_by_hash(&HASH.to_uppercase()).unwrap();
    let names: Vec<&str> = matches.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["x.zip", "old.iso"]);

    let urls = ledger.urls_for(matches[0].id).unwrap();
    assert_eq!(urls.len(), 2);
    assert!(urls.iter().all(|u| u.md5 == HASH));

    let recent = ledger.recent(2).unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].name, "y.dmg");
}

#[test]
fn test_empty_batch_records_nothing() {
    let db = Database::open_in_memory().unwrap();
    assert!(Ledger::new(&db).record(&[]).unwrap().is_empty());
    assert_eq!(count(&db, "deleted_files"), 0);
}

#[test]
fn test_deleted_at_format() {
    let db = Database::open_in_memory().unwrap();
    let mut file = deleted_file("x.zip", 1, &[]);
    file.deleted_at = Local.with_ymd_and_hms(2024, 2, 29, 23, 5, 1).unwrap();
    let ids = Ledger::new(&db).record(&[file]).unwrap();
    let stored = db.get_deleted_file(ids[0]).unwrap().unwrap();
    assert_eq!(stored.deleted_at, "2024-02-29 23:05:01");
}
