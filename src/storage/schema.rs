//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the crawl database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- One row per crawl run
CREATE TABLE IF NOT EXISTS crawling (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    start_urls TEXT NOT NULL,
    keyword TEXT NOT NULL,
    total_page INTEGER NOT NULL DEFAULT 0,
    duration_crawl TEXT NOT NULL DEFAULT '00:00:00.000',
    started_at TEXT NOT NULL
);

-- Every successfully fetched and parsed page; url is unique across runs
CREATE TABLE IF NOT EXISTS page_information (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL UNIQUE,
    crawl_id INTEGER NOT NULL REFERENCES crawling(id),
    html5 INTEGER NOT NULL,
    title TEXT NOT NULL,
    description TEXT NOT NULL,
    keywords TEXT NOT NULL,
    content_article TEXT,
    content_text TEXT NOT NULL,
    hot_url INTEGER NOT NULL DEFAULT 0,
    size_bytes INTEGER NOT NULL,
    model_crawl TEXT NOT NULL,
    duration_crawl TEXT NOT NULL DEFAULT '00:00:00.000'
);

CREATE INDEX IF NOT EXISTS idx_page_information_crawl ON page_information(crawl_id);

-- Full outgoing link graph, including links never admitted to the frontier
CREATE TABLE IF NOT EXISTS page_linking (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    page_id INTEGER NOT NULL REFERENCES page_information(id),
    outgoing_link TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_page_linking_page ON page_linking(page_id);

CREATE TABLE IF NOT EXISTS page_tags (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    page_id INTEGER NOT NULL REFERENCES page_information(id),
    tag TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_page_tags_page ON page_tags(page_id);

-- Auxiliary extractions, populated only when enabled in the crawl profile
CREATE TABLE IF NOT EXISTS page_forms (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    page_id INTEGER NOT NULL REFERENCES page_information(id),
    form TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS page_images (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    page_id INTEGER NOT NULL REFERENCES page_information(id),
    image TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS page_list (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    page_id INTEGER NOT NULL REFERENCES page_information(id),
    list TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS page_scripts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    page_id INTEGER NOT NULL REFERENCES page_information(id),
    script TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS page_styles (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    page_id INTEGER NOT NULL REFERENCES page_information(id),
    style TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS page_tables (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    page_id INTEGER NOT NULL REFERENCES page_information(id),
    table_str TEXT NOT NULL
);
"#;

/// Columns that `record_exists` may be asked about, per table
pub const QUERYABLE_COLUMNS: &[(&str, &[&str])] = &[
    ("crawling", &["id", "start_urls", "keyword"]),
    ("page_information", &["id", "url", "crawl_id", "title"]),
    ("page_linking", &["page_id", "outgoing_link"]),
    ("page_tags", &["page_id", "tag"]),
];

/// Returns true if `table.column` is part of the queryable schema
pub fn is_queryable(table: &str, column: &str) -> bool {
    QUERYABLE_COLUMNS
        .iter()
        .any(|(t, cols)| *t == table && cols.contains(&column))
}

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
