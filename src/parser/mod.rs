pub mod blocks;
pub mod boundary;
pub mod inline;

use crate::db::StoredPost;
use blocks::Document;

/// Bodies at or under this many characters are treated as excerpts.
pub const MIN_BODY_CHARS: usize = 200;
pub const PREVIEW_CHARS: usize = 200;

pub struct ProcessedPost {
    pub slug: String,
    pub title: Option<String>,
    pub url: String,
    pub document: Option<Document>,
    pub preview: Option<String>,
}

impl ProcessedPost {
    pub fn has_full_content(&self) -> bool {
        self.document.is_some()
    }

    pub fn block_count(&self) -> usize {
        self.document.as_ref().map_or(0, Document::len)
    }
}

/// Two-step pipeline: scraped text → article body → block document.
pub fn process_post(post: &StoredPost) -> ProcessedPost {
    let body = boundary::extract_body(&post.markdown, post.title.as_deref());
    let full = body.chars().count() > MIN_BODY_CHARS;

    ProcessedPost {
        slug: post.slug.clone(),
        title: post.title.clone(),
        url: post.url.clone(),
        document: full.then(|| blocks::convert(&body)),
        preview: full.then(|| preview(&body)),
    }
}

/// Full pipeline on a single text, without the excerpt cut-off.
pub fn convert_text(raw: &str, title: Option<&str>, extract: bool) -> Document {
    if extract {
        blocks::convert(&boundary::extract_body(raw, title))
    } else {
        blocks::convert(raw)
    }
}

fn preview(body: &str) -> String {
    let head: String = body.chars().take(PREVIEW_CHARS).collect();
    format!("{}...", head)
}

// ── Tests ──
