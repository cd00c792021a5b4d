use std::ops::Range;

use super::blocks::{KeyGen, Mark, Span};

/// A delimited run found at some position of the text.
struct Run {
    start: usize,
    end: usize,
    inner: Range<usize>,
    mark: Option<Mark>,
}

/// Split inline text into spans: `**bold**`, `*italic*`, `` `code` `` and
/// `[label](url)` links (label only). Everything else is plain text.
pub fn tokenize(text: &str, keys: &mut KeyGen) -> Vec<Span> {
    if !text.contains(['*', '`', '[']) {
        return vec![Span::plain(keys, text)];
    }

    let bytes = text.as_bytes();
    let mut spans = Vec::new();
    let mut last = 0;
    let mut pos = 0;

    while pos < bytes.len() {
        let Some(run) = run_at(bytes, pos) else {
            pos += 1;
            continue;
        };
        if run.start > last {
            spans.push(Span::plain(keys, &text[last..run.start]));
        }
        spans.push(Span::new(keys, &text[run.inner], run.mark));
        last = run.end;
        pos = run.end;
    }

    if last < text.len() {
        spans.push(Span::plain(keys, &text[last..]));
    }

    if spans.is_empty() {
        spans.push(Span::plain(keys, text));
    }
    spans
}

/// Try each run kind at `pos`, first hit wins: bold, italic, code, link.
/// All delimiters are ASCII, so every returned offset is a char boundary.
fn run_at(bytes: &[u8], pos: usize) -> Option<Run> {
    match bytes[pos] {
        b'*' => bold_at(bytes, pos).or_else(|| italic_at(bytes, pos)),
        b'`' => {
            let close = find_byte(bytes, pos + 1, b'`')?;
            (close > pos + 1).then(|| Run {
                start: pos,
                end: close + 1,
                inner: pos + 1..close,
                mark: Some(Mark::Code),
            })
        }
        b'[' => link_at(bytes, pos),
        _ => None,
    }
}

// `**` then at least one non-`*` byte, then `**`.
fn bold_at(bytes: &[u8], pos: usize) -> Option<Run> {
    if bytes.get(pos + 1) != Some(&b'*') {
        return None;
    }
    let close = find_byte(bytes, pos + 2, b'*')?;
    if close == pos + 2 || bytes.get(close + 1) != Some(&b'*') {
        return None;
    }
    Some(Run {
        start: pos,
        end: close + 2,
        inner: pos + 2..close,
        mark: Some(Mark::Strong),
    })
}

fn italic_at(bytes: &[u8], pos: usize) -> Option<Run> {
    let close = find_byte(bytes, pos + 1, b'*')?;
    (close > pos + 1).then(|| Run {
        start: pos,
        end: close + 1,
        inner: pos + 1..close,
        mark: Some(Mark::Emphasis),
    })
}

// `[label](target)`, both parts non-empty. The target is dropped.
fn link_at(bytes: &[u8], pos: usize) -> Option<Run> {
    let close = find_byte(bytes, pos + 1, b']')?;
    if close == pos + 1 || bytes.get(close + 1) != Some(&b'(') {
        return None;
    }
    let paren = find_byte(bytes, close + 2, b')')?;
    (paren > close + 2).then(|| Run {
        start: pos,
        end: paren + 1,
        inner: pos + 1..close,
        mark: None,
    })
}

fn find_byte(bytes: &[u8], from: usize, needle: u8) -> Option<usize> {
    bytes
        .get(from..)?
        .iter()
        .position(|&b| b == needle)
        .map(|i| i + from)
}

// ── Tests ──
