const BYLINE_MARKERS: &[&str] = &["min read", "minute read"];

const FOOTER_MARKERS: &[&str] = &[
    "related posts",
    "continue reading",
    "recommended for you",
    "share this",
    "subscribe to",
    "try adapty",
    "get started",
    "© adapty",
    "privacy policy",
    "terms of service",
    "book a demo",
];

const NAV_WORDS: &[&str] = &["blog", "home", "pricing"];
const SHARE_MARKERS: &[&str] = &["share on", "tweet this"];

/// Title prefix length used as the header anchor.
const TITLE_ANCHOR_CHARS: usize = 30;

/// Return the article body of scraped text: the lines between a byline (or
/// title) anchor and the last footer marker, minus stray nav and share lines.
/// Empty when nothing is left between the anchors. With `title` absent only
/// the byline anchors the start.
pub fn extract_body(raw: &str, title: Option<&str>) -> String {
    if raw.is_empty() {
        return String::new();
    }

    let lines: Vec<&str> = raw.split('\n').collect();
    let start = body_start(&lines, title);
    let end = body_end(&lines, start);

    lines[start..end]
        .iter()
        .filter(|line| !is_chrome_line(line))
        .copied()
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Index just past the byline, or past the last title match before it.
fn body_start(lines: &[&str], title: Option<&str>) -> usize {
    let anchor: Option<String> =
        title.map(|t| t.to_lowercase().chars().take(TITLE_ANCHOR_CHARS).collect());
    let mut start = 0;

    for (i, line) in lines.iter().enumerate() {
        let lower = line.to_lowercase();
        if BYLINE_MARKERS.iter().any(|m| lower.contains(m)) {
            return i + 1;
        }
        if anchor.as_deref().is_some_and(|a| lower.contains(a)) {
            start = i + 1;
        }
    }
    start
}

/// Index of the footer marker nearest the end, never before `start`.
fn body_end(lines: &[&str], start: usize) -> usize {
    (start..lines.len())
        .rev()
        .find(|&i| {
            let lower = lines[i].to_lowercase();
            FOOTER_MARKERS.iter().any(|m| lower.contains(m))
        })
        .unwrap_or(lines.len())
}

// Leftover nav links ("[Blog](...)") and social share buttons.
fn is_chrome_line(line: &str) -> bool {
    let lower = line.trim().to_lowercase();
    (lower.starts_with('[') && NAV_WORDS.iter().any(|w| lower.contains(w)))
        || SHARE_MARKERS.iter().any(|m| lower.contains(m))
}

// ── Tests ──
