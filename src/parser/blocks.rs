use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use super::inline::tokenize;

static HEADING_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(#{1,4}) (.*)$").unwrap());
static BULLET_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[-*]\s").unwrap());
static NUMBERED_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9]+\.\s").unwrap());

const FENCE: &str = "```";

// ── Data model ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Mark {
    Strong,
    Emphasis,
    Code,
}

/// Inline run of uniformly formatted text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Span {
    #[serde(rename = "_key")]
    pub key: String,
    pub text: String,
    pub marks: Vec<Mark>,
}

impl Span {
    pub fn new(keys: &mut KeyGen, text: &str, mark: Option<Mark>) -> Self {
        Span {
            key: keys.next_key(),
            text: text.to_string(),
            marks: mark.into_iter().collect(),
        }
    }

    pub fn plain(keys: &mut KeyGen, text: &str) -> Self {
        Self::new(keys, text, None)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ListType {
    Bullet,
    Number,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum BlockKind {
    Heading {
        level: u8,
        children: Vec<Span>,
    },
    Paragraph {
        children: Vec<Span>,
    },
    ListItem {
        #[serde(rename = "listType")]
        list_type: ListType,
        children: Vec<Span>,
    },
    Blockquote {
        children: Vec<Span>,
    },
    /// Verbatim fenced code. The fence's language tag is not kept.
    CodeBlock {
        code: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Block {
    #[serde(rename = "_key")]
    pub key: String,
    #[serde(flatten)]
    pub kind: BlockKind,
}

impl Block {
    /// Inline children; always empty for code blocks.
    pub fn children(&self) -> &[Span] {
        match &self.kind {
            BlockKind::Heading { children, .. }
            | BlockKind::Paragraph { children }
            | BlockKind::ListItem { children, .. }
            | BlockKind::Blockquote { children } => children,
            BlockKind::CodeBlock { .. } => &[],
        }
    }

    /// Visible text: span texts concatenated, or the code itself.
    pub fn text(&self) -> String {
        match &self.kind {
            BlockKind::CodeBlock { code } => code.clone(),
            _ => self.children().iter().map(|s| s.text.as_str()).collect(),
        }
    }
}

/// Ordered blocks of one converted post.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Document {
    blocks: Vec<Block>,
}

impl Document {
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Block> {
        self.blocks.iter()
    }
}

impl<'a> IntoIterator for &'a Document {
    type Item = &'a Block;
    type IntoIter = std::slice::Iter<'a, Block>;

    fn into_iter(self) -> Self::IntoIter {
        self.blocks.iter()
    }
}

/// Per-document key source. Keys are never reused within one generator.
#[derive(Debug, Default)]
pub struct KeyGen {
    next: u64,
}

impl KeyGen {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_key(&mut self) -> String {
        let key = format!("k{:07x}", self.next);
        self.next += 1;
        key
    }
}

// ── Conversion ──

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Normal,
    InCodeBlock,
}

/// Line-fed markdown converter. Feed every line, then `finish`.
#[derive(Debug)]
pub struct Converter<'a> {
    state: State,
    paragraph: Vec<&'a str>,
    code: Vec<&'a str>,
    code_language: Option<String>,
    keys: KeyGen,
    blocks: Vec<Block>,
}

impl Default for Converter<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> Converter<'a> {
    pub fn new() -> Self {
        Converter {
            state: State::Normal,
            paragraph: Vec::new(),
            code: Vec::new(),
            code_language: None,
            keys: KeyGen::new(),
            blocks: Vec::new(),
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Tag after the opening fence of the code block being read, if any.
    pub fn code_language(&self) -> Option<&str> {
        self.code_language.as_deref()
    }

    pub fn pending_paragraph(&self) -> &[&'a str] {
        &self.paragraph
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn feed(&mut self, line: &'a str) {
        if let Some(tag) = line.strip_prefix(FENCE) {
            match self.state {
                State::Normal => {
                    self.flush_paragraph();
                    let tag = tag.trim();
                    self.code_language = (!tag.is_empty()).then(|| tag.to_string());
                    self.state = State::InCodeBlock;
                }
                State::InCodeBlock => {
                    let code = std::mem::take(&mut self.code).join("\n");
                    self.push(BlockKind::CodeBlock { code });
                    self.code_language = None;
                    self.state = State::Normal;
                }
            }
            return;
        }

        if self.state == State::InCodeBlock {
            self.code.push(line);
            return;
        }

        // ── Blank line ──
        if line.trim().is_empty() {
            self.flush_paragraph();
            return;
        }

        // ── Heading: # .. #### ──
        if let Some(caps) = HEADING_RE.captures(line) {
            self.flush_paragraph();
            let span = Span::plain(&mut self.keys, caps[2].trim());
            self.push(BlockKind::Heading {
                level: caps[1].len() as u8,
                children: vec![span],
            });
            return;
        }

        // ── List items ──
        for (re, list_type) in [
            (&*BULLET_RE, ListType::Bullet),
            (&*NUMBERED_RE, ListType::Number),
        ] {
            if let Some(m) = re.find(line) {
                self.flush_paragraph();
                let children = tokenize(line[m.end()..].trim(), &mut self.keys);
                self.push(BlockKind::ListItem { list_type, children });
                return;
            }
        }

        // ── Blockquote ──
        if let Some(rest) = line.strip_prefix("> ") {
            self.flush_paragraph();
            let children = tokenize(rest.trim(), &mut self.keys);
            self.push(BlockKind::Blockquote { children });
            return;
        }

        // Images are not extracted.
        if line.contains("![") {
            return;
        }

        self.paragraph.push(line);
    }

    /// End of input. An unterminated code fence drops its content.
    pub fn finish(mut self) -> Document {
        self.flush_paragraph();
        Document {
            blocks: self.blocks,
        }
    }

    fn flush_paragraph(&mut self) {
        if self.paragraph.is_empty() {
            return;
        }
        let joined = std::mem::take(&mut self.paragraph).join("\n");
        let text = joined.trim();
        if !text.is_empty() {
            let children = tokenize(text, &mut self.keys);
            self.push(BlockKind::Paragraph { children });
        }
    }

    fn push(&mut self, kind: BlockKind) {
        let key = self.keys.next_key();
        self.blocks.push(Block { key, kind });
    }
}

/// Convert cleaned markdown into an ordered block document.
pub fn convert(markdown: &str) -> Document {
    markdown
        .split('\n')
        .fold(Converter::new(), |mut conv, line| {
            conv.feed(line);
            conv
        })
        .finish()
}

// ── Tests ──
