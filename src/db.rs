use std::fs;
use std::path::Path;

use anyhow::Context;
use rusqlite::{params, Connection};

use crate::error::Result;

pub fn connect(path: &Path) -> anyhow::Result<Connection> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| format!("Failed to create {:?}", dir))?;
    }
    let conn = Connection::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS stores (
            id         INTEGER PRIMARY KEY AUTOINCREMENT,
            url        TEXT NOT NULL,
            is_shopify BOOLEAN NOT NULL,
            analysis   TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        CREATE INDEX IF NOT EXISTS idx_stores_url ON stores(url);

        CREATE TABLE IF NOT EXISTS store_data (
            id         INTEGER PRIMARY KEY AUTOINCREMENT,
            store_id   INTEGER NOT NULL REFERENCES stores(id),
            data       TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        CREATE INDEX IF NOT EXISTS idx_store_data_store ON store_data(store_id);
        ",
    )?;
    Ok(())
}

// ── Writes ──

/// Insert a store row and return its generated id. Always inserts, never upserts.
pub fn write_store(conn: &Connection, url: &str, is_shopify: bool, analysis: &str) -> Result<i64> {
    conn.execute(
        "INSERT INTO stores (url, is_shopify, analysis) VALUES (?1, ?2, ?3)",
        params![url, is_shopify, analysis],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn write_scraped_data(conn: &Connection, store_id: i64, data: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO store_data (store_id, data) VALUES (?1, ?2)",
        params![store_id, data],
    )?;
    Ok(())
}

/// Write the store row and its scraped data atomically; a failed child insert
/// rolls the parent back so no orphan store is left behind.
pub fn save_store_with_data(
    conn: &Connection,
    url: &str,
    is_shopify: bool,
    analysis: &str,
    data: &str,
) -> Result<i64> {
    let tx = conn.unchecked_transaction()?;
    let store_id = write_store(&tx, url, is_shopify, analysis)?;
    write_scraped_data(&tx, store_id, data)?;
    tx.commit()?;
    Ok(store_id)
}

// ── Reporting ──

pub struct Stats {
    pub stores: i64,
    pub shopify: i64,
    pub scraped: i64,
    pub distinct_urls: i64,
}

pub fn get_stats(conn: &Connection) -> Result<Stats> {
    let stats = conn.query_row(
        "SELECT
            (SELECT COUNT(*) FROM stores),
            (SELECT COUNT(*) FROM stores WHERE is_shopify = 1),
            (SELECT COUNT(*) FROM store_data),
            (SELECT COUNT(DISTINCT url) FROM stores)",
        [],
        |row| {
            Ok(Stats {
                stores: row.get(0)?,
                shopify: row.get(1)?,
                scraped: row.get(2)?,
                distinct_urls: row.get(3)?,
            })
        },
    )?;
    Ok(stats)
}

pub struct OverviewRow {
    pub id: i64,
    pub url: String,
    pub is_shopify: bool,
    pub analysis: String,
    pub data: Option<String>,
    pub created_at: String,
}

/// Most recent stores first, joined with their scraped data when present.
pub fn fetch_overview(conn: &Connection, shopify_only: bool, limit: usize) -> Result<Vec<OverviewRow>> {
    let mut sql = String::from(
        "SELECT s.id, s.url, s.is_shopify, s.analysis, d.data, s.created_at
         FROM stores s
         LEFT JOIN store_data d ON d.store_id = s.id",
    );
    if shopify_only {
        sql.push_str(" WHERE s.is_shopify = 1");
    }
    sql.push_str(" ORDER BY s.id DESC LIMIT ?1");

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![limit as i64], |row| {
            Ok(OverviewRow {
                id: row.get(0)?,
                url: row.get(1)?,
                is_shopify: row.get(2)?,
                analysis: row.get(3)?,
                data: row.get(4)?,
                created_at: row.get(5)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[cfg(test)]
pub(crate) fn open_test_db() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch("PRAGMA foreign_keys=ON;").unwrap();
    init_schema(&conn).unwrap();
    conn
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn count(conn: &Connection, table: &str) -> i64 {
        conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| r.get(0))
            .unwrap()
    }

    #[test]
    fn write_store_returns_generated_ids() {
        let conn = open_test_db();
        let first = write_store(&conn, "https://a.test", true, "Fine.").unwrap();
        let second = write_store(&conn, "https://a.test", true, "Fine again.").unwrap();
        assert!(second > first);
        assert_eq!(count(&conn, "stores"), 2);

        let (url, is_shopify, analysis): (String, bool, String) = conn
            .query_row(
                "SELECT url, is_shopify, analysis FROM stores WHERE id = ?1",
                [first],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
            )
            .unwrap();
        assert_eq!(url, "https://a.test");
        assert!(is_shopify);
        assert_eq!(analysis, "Fine.");
    }

    #[test]
    fn scraped_data_references_parent() {
        let conn = open_test_db();
        let store_id = write_store(&conn, "https://a.test", true, "ok").unwrap();
        write_scraped_data(&conn, store_id, "Title: A\nDescription: B").unwrap();

        let (fk, data): (i64, String) = conn
            .query_row("SELECT store_id, data FROM store_data", [], |r| {
                Ok((r.get(0)?, r.get(1)?))
            })
            .unwrap();
        assert_eq!(fk, store_id);
        assert_eq!(data, "Title: A\nDescription: B");
    }

    #[test]
    fn scraped_data_without_parent_is_storage_error() {
        let conn = open_test_db();
        let result = write_scraped_data(&conn, 42, "orphan");
        assert!(matches!(result, Err(Error::Storage(_))));
        assert_eq!(count(&conn, "store_data"), 0);
    }

    #[test]
    fn separate_writes_can_leave_orphan_store() {
        let conn = open_test_db();
        conn.execute_batch("DROP TABLE store_data;").unwrap();

        write_store(&conn, "https://a.test", true, "ok").unwrap();
        assert!(write_scraped_data(&conn, 1, "data").is_err());
        assert_eq!(count(&conn, "stores"), 1);
    }

    #[test]
    fn atomic_save_rolls_back_parent_when_child_fails() {
        let conn = open_test_db();
        conn.execute_batch("DROP TABLE store_data;").unwrap();

        let result = save_store_with_data(&conn, "https://a.test", true, "ok", "data");
        assert!(matches!(result, Err(Error::Storage(_))));
        assert_eq!(count(&conn, "stores"), 0);
    }

    #[test]
    fn atomic_save_writes_both_rows() {
        let conn = open_test_db();
        let id = save_store_with_data(&conn, "https://a.test", true, "ok", "data").unwrap();
        assert_eq!(count(&conn, "stores"), 1);
        assert_eq!(count(&conn, "store_data"), 1);

        let rows = fetch_overview(&conn, false, 10).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, id);
        assert_eq!(rows[0].data.as_deref(), Some("data"));
    }

    #[test]
    fn stats_and_overview_filtering() {
        let conn = open_test_db();
        save_store_with_data(&conn, "https://a.test", true, "a", "A").unwrap();
        save_store_with_data(&conn, "https://a.test", true, "a2", "A2").unwrap();
        write_store(&conn, "https://b.test", false, "").unwrap();

        let stats = get_stats(&conn).unwrap();
        assert_eq!(stats.stores, 3);
        assert_eq!(stats.shopify, 2);
        assert_eq!(stats.scraped, 2);
        assert_eq!(stats.distinct_urls, 2);

        let all = fetch_overview(&conn, false, 10).unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].url, "https://b.test");
        assert!(all[0].data.is_none());

        let shopify = fetch_overview(&conn, true, 1).unwrap();
        assert_eq!(shopify.len(), 1);
        assert_eq!(shopify[0].analysis, "a2");
        assert!(shopify[0].is_shopify);
    }

    #[test]
    fn connect_creates_database_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("stores.sqlite");
        let conn = connect(&path).unwrap();
        init_schema(&conn).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn connect_reports_unusable_data_directory() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("data");
        fs::write(&blocker, b"not a directory").unwrap();

        let err = connect(&blocker.join("stores.sqlite")).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to create"));
        assert!(err.root_cause().downcast_ref::<std::io::Error>().is_some());
    }
}
