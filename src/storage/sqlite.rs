//! SQLite backend for the persistence gateway
//!
//! One connection per process; scrape tasks serialize through the shared mutex, and
//! each page is written inside a `BEGIN IMMEDIATE` transaction.

use crate::storage::schema::{initialize_schema, is_queryable};
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{format_time_span, CrawlJob, NewPage, PageRecord, PayloadKind};
use chrono::Utc;
use rusqlite::{params, params_from_iter, Connection, Row};
use std::path::Path;
use std::time::Duration;

const PAGE_COLUMNS: &str = "id, url, crawl_id, html5, title, description, keywords, \
     content_article, content_text, hot_url, size_bytes, model_crawl, duration_crawl";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens the database at `path`, creating the file and tables if needed
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
            PRAGMA busy_timeout = 5000;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Fresh database that lives as long as the value
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn page_from_row(row: &Row<'_>) -> rusqlite::Result<PageRecord> {
    Ok(PageRecord {
        id: row.get(0)?,
        url: row.get(1)?,
        crawl_id: row.get(2)?,
        html5: row.get(3)?,
        title: row.get(4)?,
        description: row.get(5)?,
        keywords: row.get(6)?,
        content_article: row.get(7)?,
        content_text: row.get(8)?,
        hot_url: row.get(9)?,
        size_bytes: row.get::<_, i64>(10)? as u64,
        model_crawl: row.get(11)?,
        duration_crawl: row.get(12)?,
    })
}

impl Storage for SqliteStorage {
    // ===== Transactions =====

    fn begin(&mut self) -> StorageResult<()> {
        self.conn.execute_batch("BEGIN IMMEDIATE")?;
        Ok(())
    }

    fn commit(&mut self) -> StorageResult<()> {
        self.conn.execute_batch("COMMIT")?;
        Ok(())
    }

    fn rollback(&mut self) -> StorageResult<()> {
        self.conn.execute_batch("ROLLBACK")?;
        Ok(())
    }

    // ===== Generic Lookups =====

    fn record_exists(&self, table: &str, column: &str, value: &str) -> StorageResult<bool> {
        if !is_queryable(table, column) {
            return Err(StorageError::UnknownColumn {
                table: table.to_string(),
                column: column.to_string(),
            });
        }

        let query = format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE {} = ?1)",
            table, column
        );
        let exists: bool = self
            .conn
            .query_row(&query, params![value], |row| row.get(0))?;
        Ok(exists)
    }

    // ===== Crawl Jobs =====

    fn insert_crawl_job(
        &mut self,
        start_urls: &[String],
        keyword: &str,
        total_page: u64,
        duration: Duration,
    ) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO crawling (start_urls, keyword, total_page, duration_crawl, started_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                start_urls.join(","),
                keyword,
                total_page as i64,
                format_time_span(duration),
                now
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn update_crawl_job(
        &mut self,
        crawl_id: i64,
        total_pages: u64,
        duration: Duration,
    ) -> StorageResult<()> {
        let updated = self.conn.execute(
            "UPDATE crawling SET total_page = ?1, duration_crawl = ?2 WHERE id = ?3",
            params![total_pages as i64, format_time_span(duration), crawl_id],
        )?;
        if updated == 0 {
            return Err(StorageError::CrawlNotFound(crawl_id));
        }
        Ok(())
    }

    fn get_crawl_job(&self, crawl_id: i64) -> StorageResult<CrawlJob> {
        let mut stmt = self.conn.prepare(
            "SELECT id, start_urls, keyword, total_page, duration_crawl, started_at
             FROM crawling WHERE id = ?1",
        )?;

        let job = stmt
            .query_row(params![crawl_id], |row| {
                Ok(CrawlJob {
                    id: row.get(0)?,
                    start_urls: row.get(1)?,
                    keyword: row.get(2)?,
                    total_page: row.get::<_, i64>(3)? as u64,
                    duration_crawl: row.get(4)?,
                    started_at: row.get(5)?,
                })
            })
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StorageError::CrawlNotFound(crawl_id),
                other => StorageError::Sqlite(other),
            })?;

        Ok(job)
    }

    // ===== Pages =====

    fn insert_page(&mut self, page: &NewPage) -> StorageResult<Option<i64>> {
        let duration = Duration::try_from_secs_f64(page.duration_crawl.max(0.0))
            .map_err(|_| StorageError::InvalidDuration(page.duration_crawl))?;

        // The UNIQUE constraint on url is what makes concurrent inserts of one URL safe
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO page_information
             (url, crawl_id, html5, title, description, keywords, content_article,
              content_text, hot_url, size_bytes, model_crawl, duration_crawl)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                page.url,
                page.crawl_id,
                page.html5,
                page.title,
                page.description,
                page.keywords,
                page.content_article,
                page.content_text,
                page.hot_url,
                page.size_bytes as i64,
                page.model_crawl,
                format_time_span(duration),
            ],
        )?;

        if inserted == 0 {
            return Ok(None);
        }
        Ok(Some(self.conn.last_insert_rowid()))
    }

    fn update_page_duration(&mut self, page_id: i64, duration: Duration) -> StorageResult<()> {
        self.conn.execute(
            "UPDATE page_information SET duration_crawl = ?1 WHERE id = ?2",
            params![format_time_span(duration), page_id],
        )?;
        Ok(())
    }

    fn set_hot_url(&mut self, page_id: i64, hot: bool) -> StorageResult<()> {
        self.conn.execute(
            "UPDATE page_information SET hot_url = ?1 WHERE id = ?2",
            params![hot, page_id],
        )?;
        Ok(())
    }

    fn list_visited_urls(&self) -> StorageResult<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT url FROM page_information")?;
        let urls = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(urls)
    }

    fn list_pages(
        &self,
        start: Option<u64>,
        length: Option<u64>,
    ) -> StorageResult<Vec<PageRecord>> {
        let pages = match (start, length) {
            (Some(start), Some(length)) => {
                let mut stmt = self.conn.prepare(&format!(
                    "SELECT {} FROM page_information ORDER BY id LIMIT ?1 OFFSET ?2",
                    PAGE_COLUMNS
                ))?;
                let rows = stmt.query_map(params![length as i64, start as i64], page_from_row)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
            _ => {
                let mut stmt = self.conn.prepare(&format!(
                    "SELECT {} FROM page_information ORDER BY id",
                    PAGE_COLUMNS
                ))?;
                let rows = stmt.query_map([], page_from_row)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
        };
        Ok(pages)
    }

    fn get_pages_by_ids(&self, ids: &[i64]) -> StorageResult<Vec<PageRecord>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM page_information WHERE id IN ({}) ORDER BY id",
            PAGE_COLUMNS, placeholders
        ))?;
        let pages = stmt
            .query_map(params_from_iter(ids.iter()), page_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(pages)
    }

    fn count_pages_for_crawl(&self, crawl_id: i64) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM page_information WHERE crawl_id = ?1",
            params![crawl_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    // ===== Links, Tags, Payloads =====

    fn insert_link(&mut self, page_id: i64, url: &str) -> StorageResult<()> {
        self.conn.execute(
            "INSERT INTO page_linking (page_id, outgoing_link) VALUES (?1, ?2)",
            params![page_id, url],
        )?;
        Ok(())
    }

    fn insert_tag(&mut self, page_id: i64, tag: &str) -> StorageResult<()> {
        self.conn.execute(
            "INSERT INTO page_tags (page_id, tag) VALUES (?1, ?2)",
            params![page_id, tag],
        )?;
        Ok(())
    }

    fn insert_payload(
        &mut self,
        page_id: i64,
        kind: PayloadKind,
        payload: &str,
    ) -> StorageResult<()> {
        let query = format!(
            "INSERT INTO {} (page_id, {}) VALUES (?1, ?2)",
            kind.table(),
            kind.column()
        );
        self.conn.execute(&query, params![page_id, payload])?;
        Ok(())
    }

    fn list_links(&self, page_id: i64) -> StorageResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT outgoing_link FROM page_linking WHERE page_id = ?1 ORDER BY id")?;
        let links = stmt
            .query_map(params![page_id], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(links)
    }

    fn list_tags(&self, page_id: i64) -> StorageResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT tag FROM page_tags WHERE page_id = ?1 ORDER BY id")?;
        let tags = stmt
            .query_map(params![page_id], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(tags)
    }

    fn list_payloads(&self, page_id: i64, kind: PayloadKind) -> StorageResult<Vec<String>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM {} WHERE page_id = ?1 ORDER BY id",
            kind.column(),
            kind.table()
        ))?;
        let payloads = stmt
            .query_map(params![page_id], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(payloads)
    }
}
