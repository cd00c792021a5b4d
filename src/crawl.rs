use std::collections::HashMap;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

static BLOG_SLUG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/blog/([^/]+)/?$").unwrap());

/// One blog page from a crawl result.
#[derive(Debug, Clone, PartialEq)]
pub struct CrawledPage {
    pub slug: String,
    pub url: String,
    pub title: Option<String>,
    pub markdown: String,
}

#[derive(Debug, Deserialize)]
struct CrawlResult {
    status: Option<String>,
    total: Option<u64>,
    #[serde(default)]
    data: Vec<CrawlEntry>,
}

#[derive(Debug, Deserialize)]
struct CrawlEntry {
    markdown: Option<String>,
    #[serde(default)]
    metadata: CrawlMetadata,
}

#[derive(Debug, Default, Deserialize)]
struct CrawlMetadata {
    url: Option<String>,
    #[serde(rename = "sourceURL")]
    source_url: Option<String>,
    title: Option<String>,
}

/// Parse a crawl dump into blog pages, one per slug (the last page seen wins).
///
/// Accepts the crawl result object itself, or the tool-output wrapping
/// `[{"type": "text", "text": "<crawl result json>"}]`. Any other array has
/// no pages.
pub fn parse_crawl(raw: &str) -> Result<Vec<CrawledPage>> {
    let value: Value = serde_json::from_str(raw).context("Crawl file is not valid JSON")?;
    let value = match value {
        Value::Array(items) => {
            match items.first().and_then(|item| item.get("text")).and_then(Value::as_str) {
                Some(inner) => serde_json::from_str(inner)
                    .context("Wrapped crawl payload is not valid JSON")?,
                None => {
                    warn!("Crawl array has no text payload");
                    return Ok(Vec::new());
                }
            }
        }
        other => other,
    };
    let result: CrawlResult =
        serde_json::from_value(value).context("Unexpected crawl result shape")?;

    info!(
        "Crawl status: {}, pages: {}",
        result.status.as_deref().unwrap_or("unknown"),
        result.total.unwrap_or(result.data.len() as u64)
    );

    let mut pages: Vec<CrawledPage> = Vec::new();
    let mut by_slug: HashMap<String, usize> = HashMap::new();

    for entry in result.data {
        let Some(url) = entry
            .metadata
            .url
            .filter(|u| !u.is_empty())
            .or(entry.metadata.source_url)
        else {
            continue;
        };
        let Some(slug) = extract_slug(&url) else {
            debug!("Skipping non-blog page {}", url);
            continue;
        };
        let Some(markdown) = entry.markdown.filter(|m| !m.is_empty()) else {
            debug!("Skipping {} without markdown", slug);
            continue;
        };

        let page = CrawledPage {
            slug: slug.clone(),
            url,
            title: entry.metadata.title,
            markdown,
        };
        match by_slug.get(&slug) {
            Some(&i) => pages[i] = page,
            None => {
                by_slug.insert(slug, pages.len());
                pages.push(page);
            }
        }
    }

    info!("Matched {} blog pages", pages.len());
    Ok(pages)
}

/// Blog slug of a post URL, ignoring any query string.
pub fn extract_slug(url: &str) -> Option<String> {
    let path = url.split('?').next().unwrap_or(url);
    BLOG_SLUG_RE
        .captures(path)
        .map(|caps| caps[1].to_string())
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn slug_from_url() {
        assert_eq!(
            extract_slug("https://adapty.io/blog/paywall-ab-testing/").as_deref(),
            Some("paywall-ab-testing")
        );
        assert_eq!(
            extract_slug("https://adapty.io/blog/trial-length?utm_source=x").as_deref(),
            Some("trial-length")
        );
        assert_eq!(extract_slug("https://adapty.io/blog/"), None);
        assert_eq!(extract_slug("https://adapty.io/pricing/"), None);
        assert_eq!(extract_slug("https://adapty.io/blog/a/b"), None);
    }

    fn crawl() -> Value {
        json!({
            "status": "completed",
            "total": 4,
            "data": [
                {
                    "markdown": "first version",
                    "metadata": { "url": "https://adapty.io/blog/pricing/", "title": "Pricing" }
                },
                {
                    "markdown": "# Docs",
                    "metadata": { "sourceURL": "https://adapty.io/docs/" }
                },
                {
                    "metadata": { "url": "https://adapty.io/blog/empty/" }
                },
                {
                    "markdown": "second version",
                    "metadata": { "sourceURL": "https://adapty.io/blog/pricing?ref=1" }
                }
            ]
        })
    }

    #[test]
    fn plain_crawl_result() {
        let pages = parse_crawl(&crawl().to_string()).unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].slug, "pricing");
        assert_eq!(pages[0].markdown, "second version");
        assert_eq!(pages[0].title, None);
    }

    #[test]
    fn wrapped_crawl_result() {
        let wrapped = json!([{ "type": "text", "text": crawl().to_string() }]);
        let pages = parse_crawl(&wrapped.to_string()).unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].url, "https://adapty.io/blog/pricing?ref=1");
    }

    #[test]
    fn invalid_input_is_an_error() {
        assert!(parse_crawl("not json").is_err());
        assert!(parse_crawl(r#"[{"type": "text", "text": "{oops"}]"#).is_err());
        assert!(parse_crawl(r#"{"data": 3}"#).is_err());
    }

    #[test]
    fn empty_url_falls_back_to_source_url() {
        let raw = json!({
            "data": [{
                "markdown": "body",
                "metadata": { "url": "", "sourceURL": "https://adapty.io/blog/trials/", "title": "Trials" }
            }]
        });
        let pages = parse_crawl(&raw.to_string()).unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].slug, "trials");
        assert_eq!(pages[0].title.as_deref(), Some("Trials"));
    }

    #[test]
    fn array_without_text_has_no_pages() {
        assert!(parse_crawl("[]").unwrap().is_empty());
        assert!(parse_crawl(r#"[{"type": "image"}]"#).unwrap().is_empty());
    }

    #[test]
    fn missing_data_is_empty() {
        assert!(parse_crawl(r#"{"status": "scraping"}"#).unwrap().is_empty());
    }
}
