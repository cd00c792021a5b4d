use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::db::DocumentRow;

/// Content-store import file: every full post plus the excerpt-only slugs.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Export {
    pub processed_at: DateTime<Utc>,
    pub total_posts: usize,
    pub with_full_content: usize,
    pub with_excerpt_only: usize,
    pub excerpt_only_slugs: Vec<String>,
    pub posts: Vec<ExportPost>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportPost {
    pub slug: String,
    pub title: Option<String>,
    pub url: String,
    pub body: Value,
    pub body_preview: Option<String>,
    pub block_count: usize,
    pub has_full_content: bool,
}

pub fn build_export(rows: Vec<DocumentRow>, processed_at: DateTime<Utc>) -> Result<Export> {
    let mut posts = Vec::new();
    let mut excerpt_only_slugs = Vec::new();

    for row in rows {
        let body = match (row.has_full_content, row.body) {
            (true, Some(body)) => body,
            _ => {
                excerpt_only_slugs.push(row.slug);
                continue;
            }
        };
        let body: Value = serde_json::from_str(&body)
            .with_context(|| format!("Stored body of {} is not valid JSON", row.slug))?;
        posts.push(ExportPost {
            slug: row.slug,
            title: row.title,
            url: row.url,
            body,
            body_preview: row.preview,
            block_count: row.block_count,
            has_full_content: true,
        });
    }

    Ok(Export {
        processed_at,
        total_posts: posts.len(),
        with_full_content: posts.len(),
        with_excerpt_only: excerpt_only_slugs.len(),
        excerpt_only_slugs,
        posts,
    })
}

pub fn write_export(path: &Path, export: &Export) -> Result<()> {
    let json = serde_json::to_string_pretty(export)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn row(slug: &str, body: Option<&str>) -> DocumentRow {
        DocumentRow {
            slug: slug.to_string(),
            url: format!("https://adapty.io/blog/{}/", slug),
            title: Some(slug.to_uppercase()),
            body: body.map(str::to_string),
            block_count: if body.is_some() { 1 } else { 0 },
            preview: body.map(|_| "preview...".to_string()),
            has_full_content: body.is_some(),
        }
    }

    #[test]
    fn splits_full_and_excerpt_posts() {
        let body = r#"[{"_key":"k0000001","kind":"paragraph","children":[]}]"#;
        let rows = vec![row("a", Some(body)), row("b", None)];
        let export = build_export(rows, Utc::now()).unwrap();
        assert_eq!(export.total_posts, 1);
        assert_eq!(export.with_excerpt_only, 1);
        assert_eq!(export.excerpt_only_slugs, vec!["b".to_string()]);
        assert_eq!(export.posts[0].body[0]["kind"], "paragraph");

        let json = serde_json::to_value(&export).unwrap();
        assert!(json["processedAt"].is_string());
        assert_eq!(json["posts"][0]["blockCount"], 1);
        assert_eq!(json["posts"][0]["bodyPreview"], "preview...");
    }

    #[test]
    fn corrupt_body_is_an_error() {
        assert!(build_export(vec![row("a", Some("{oops"))], Utc::now()).is_err());
    }
}
