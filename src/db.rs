use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::Connection;

use crate::crawl::CrawledPage;
use crate::parser::ProcessedPost;

pub const DEFAULT_DB_PATH: &str = "data/posts.sqlite";

pub fn connect(path: &Path) -> Result<Connection> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    let conn = Connection::open(path)
        .with_context(|| format!("Failed to open database {}", path.display()))?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS posts (
            slug        TEXT PRIMARY KEY,
            url         TEXT NOT NULL,
            title       TEXT,
            markdown    TEXT NOT NULL,
            imported_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS documents (
            slug             TEXT PRIMARY KEY REFERENCES posts(slug),
            body             TEXT,
            block_count      INTEGER NOT NULL DEFAULT 0,
            preview          TEXT,
            has_full_content BOOLEAN NOT NULL,
            processed_at     TEXT NOT NULL DEFAULT (datetime('now'))
        );
        CREATE INDEX IF NOT EXISTS idx_documents_full ON documents(has_full_content);
        ",
    )?;
    Ok(())
}

// ── Import ──

pub fn insert_posts(conn: &Connection, pages: &[CrawledPage]) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let mut count = 0;
    {
        let mut stmt = tx.prepare(
            "INSERT OR IGNORE INTO posts (slug, url, title, markdown) VALUES (?1, ?2, ?3, ?4)",
        )?;
        for p in pages {
            count += stmt.execute(rusqlite::params![p.slug, p.url, p.title, p.markdown])?;
        }
    }
    tx.commit()?;
    Ok(count)
}

// ── Processing ──

pub struct StoredPost {
    pub slug: String,
    pub url: String,
    pub title: Option<String>,
    pub markdown: String,
}

pub fn fetch_unprocessed(conn: &Connection, limit: Option<usize>) -> Result<Vec<StoredPost>> {
    let sql = format!(
        "SELECT p.slug, p.url, p.title, p.markdown
         FROM posts p
         LEFT JOIN documents d ON d.slug = p.slug
         WHERE d.slug IS NULL
         ORDER BY p.slug{}",
        match limit {
            Some(n) => format!(" LIMIT {}", n),
            None => String::new(),
        }
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], |row| {
            Ok(StoredPost {
                slug: row.get(0)?,
                url: row.get(1)?,
                title: row.get(2)?,
                markdown: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn save_documents(conn: &Connection, posts: &[ProcessedPost]) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    {
        let mut stmt = tx.prepare(
            "INSERT OR REPLACE INTO documents (slug, body, block_count, preview, has_full_content)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;
        for p in posts {
            let body = p
                .document
                .as_ref()
                .map(serde_json::to_string)
                .transpose()
                .with_context(|| format!("Failed to serialize document {}", p.slug))?;
            stmt.execute(rusqlite::params![
                p.slug,
                body,
                p.block_count() as i64,
                p.preview,
                p.has_full_content(),
            ])?;
        }
    }
    tx.commit()?;
    Ok(())
}

// ── Export ──

pub struct DocumentRow {
    pub slug: String,
    pub url: String,
    pub title: Option<String>,
    pub body: Option<String>,
    pub block_count: usize,
    pub preview: Option<String>,
    pub has_full_content: bool,
}

pub fn fetch_documents(conn: &Connection) -> Result<Vec<DocumentRow>> {
    let mut stmt = conn.prepare(
        "SELECT d.slug, p.url, p.title, d.body, d.block_count, d.preview, d.has_full_content
         FROM documents d
         JOIN posts p ON p.slug = d.slug
         ORDER BY d.slug",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(DocumentRow {
                slug: row.get(0)?,
                url: row.get(1)?,
                title: row.get(2)?,
                body: row.get(3)?,
                block_count: row.get(4)?,
                preview: row.get(5)?,
                has_full_content: row.get(6)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ── Stats ──

pub struct Stats {
    pub imported: usize,
    pub processed: usize,
    pub unprocessed: usize,
    pub full_content: usize,
    pub excerpt_only: usize,
    pub blocks: usize,
}

pub fn get_stats(conn: &Connection) -> Result<Stats> {
    let imported: usize = conn.query_row("SELECT COUNT(*) FROM posts", [], |r| r.get(0))?;
    let processed: usize = conn.query_row("SELECT COUNT(*) FROM documents", [], |r| r.get(0))?;
    let full_content: usize = conn.query_row(
        "SELECT COUNT(*) FROM documents WHERE has_full_content = 1",
        [],
        |r| r.get(0),
    )?;
    let blocks: usize = conn.query_row(
        "SELECT COALESCE(SUM(block_count), 0) FROM documents",
        [],
        |r| r.get(0),
    )?;
    Ok(Stats {
        imported,
        processed,
        unprocessed: imported.saturating_sub(processed),
        full_content,
        excerpt_only: processed - full_content,
        blocks,
    })
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::process_post;

    fn memory_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        conn
    }

    fn page(slug: &str, markdown: &str) -> CrawledPage {
        CrawledPage {
            slug: slug.to_string(),
            url: format!("https://adapty.io/blog/{}/", slug),
            title: Some("How to Price Your Subscription App".to_string()),
            markdown: markdown.to_string(),
        }
    }

    #[test]
    fn insert_is_idempotent() {
        let conn = memory_db();
        let pages = vec![page("a", "x"), page("b", "y")];
        assert_eq!(insert_posts(&conn, &pages).unwrap(), 2);
        assert_eq!(insert_posts(&conn, &pages).unwrap(), 0);
    }

    #[test]
    fn missing_title_stays_absent() {
        let conn = memory_db();
        let untitled = CrawledPage {
            title: None,
            ..page("untitled", "nav\nbody")
        };
        insert_posts(&conn, &[untitled]).unwrap();
        let pending = fetch_unprocessed(&conn, None).unwrap();
        assert_eq!(pending[0].title, None);
    }

    #[test]
    fn process_and_fetch_round_trip() {
        let conn = memory_db();
        let raw = std::fs::read_to_string("tests/fixtures/scraped-post.md").unwrap();
        insert_posts(&conn, &[page("full", &raw), page("short", "1 min read\nteaser")]).unwrap();

        let pending = fetch_unprocessed(&conn, None).unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(fetch_unprocessed(&conn, Some(1)).unwrap().len(), 1);

        let processed: Vec<_> = pending.iter().map(process_post).collect();
        save_documents(&conn, &processed).unwrap();
        assert!(fetch_unprocessed(&conn, None).unwrap().is_empty());

        let docs = fetch_documents(&conn).unwrap();
        assert_eq!(docs.len(), 2);
        let full = docs.iter().find(|d| d.slug == "full").unwrap();
        assert!(full.has_full_content);
        assert_eq!(full.block_count, 10);
        let body: serde_json::Value = serde_json::from_str(full.body.as_deref().unwrap()).unwrap();
        assert_eq!(body.as_array().unwrap().len(), 10);

        let short = docs.iter().find(|d| d.slug == "short").unwrap();
        assert!(!short.has_full_content);
        assert!(short.body.is_none());

        let s = get_stats(&conn).unwrap();
        assert_eq!(s.imported, 2);
        assert_eq!(s.processed, 2);
        assert_eq!(s.unprocessed, 0);
        assert_eq!(s.full_content, 1);
        assert_eq!(s.excerpt_only, 1);
        assert_eq!(s.blocks, 10);
    }
}
