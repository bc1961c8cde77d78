//! Rendered document tree.

use serde::Serialize;

use crate::highlight::Token;

/// Structured output of one render pass.
///
/// Two renders of the same text compare equal, which is what lets the view
/// keep its scroll position when nothing changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RenderedContent {
    blocks: Vec<Block>,
    outline: Vec<HeadingRef>,
}

impl RenderedContent {
    pub(crate) fn new(blocks: Vec<Block>, outline: Vec<HeadingRef>) -> Self {
        Self { blocks, outline }
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Headings in document order.
    pub fn outline(&self) -> &[HeadingRef] {
        &self.outline
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Every code block, including ones nested in lists and quotes.
    pub fn code_blocks(&self) -> Vec<&CodeBlock> {
        let mut out = Vec::new();
        collect_code_blocks(&self.blocks, &mut out);
        out
    }

    /// Visible text with markup removed, one block per line.
    pub fn plain_text(&self) -> String {
        let mut lines = Vec::new();
        collect_plain_text(&self.blocks, &mut lines);
        lines.join("\n")
    }
}

fn collect_code_blocks<'a>(blocks: &'a [Block], out: &mut Vec<&'a CodeBlock>) {
    for block in blocks {
        match block {
            Block::CodeBlock(code) => out.push(code),
            Block::List(list) => {
                for item in &list.items {
                    collect_code_blocks(&item.blocks, out);
                }
            }
            Block::BlockQuote { blocks } => collect_code_blocks(blocks, out),
            _ => {}
        }
    }
}

fn collect_plain_text(blocks: &[Block], lines: &mut Vec<String>) {
    for block in blocks {
        match block {
            Block::Heading { content, .. } | Block::Paragraph { content } => {
                lines.push(inline_text(content));
            }
            Block::CodeBlock(code) => {
                lines.extend(
                    code.lines
                        .iter()
                        .map(|line| line.iter().map(|t| t.text.as_str()).collect::<String>()),
                );
            }
            Block::List(list) => {
                for item in &list.items {
                    collect_plain_text(&item.blocks, lines);
                }
            }
            Block::Table(table) => {
                for row in std::iter::once(&table.header).chain(&table.rows) {
                    let cells: Vec<String> = row.iter().map(|cell| inline_text(cell)).collect();
                    lines.push(cells.join("\t"));
                }
            }
            Block::BlockQuote { blocks } => collect_plain_text(blocks, lines),
            Block::ThematicBreak => {}
        }
    }
}

/// Flatten inline content to its visible text.
pub fn inline_text(content: &[Inline]) -> String {
    let mut out = String::new();
    push_inline_text(content, &mut out);
    out
}

fn push_inline_text(content: &[Inline], out: &mut String) {
    for inline in content {
        match inline {
            Inline::Text(text) | Inline::Code(text) => out.push_str(text),
            Inline::Emphasis(children)
            | Inline::Strong(children)
            | Inline::Strikethrough(children)
            | Inline::Link {
                content: children, ..
            } => push_inline_text(children, out),
            Inline::Image { alt, .. } => out.push_str(alt),
            Inline::SoftBreak => out.push(' '),
            Inline::LineBreak => out.push('\n'),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Heading {
        level: u8,
        anchor: String,
        content: Vec<Inline>,
    },
    Paragraph {
        content: Vec<Inline>,
    },
    CodeBlock(CodeBlock),
    List(List),
    Table(Table),
    BlockQuote {
        blocks: Vec<Block>,
    },
    ThematicBreak,
}

/// A fenced or indented code block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodeBlock {
    /// First word of the fence info string, if any.
    pub language: Option<String>,
    pub lines: Vec<Vec<Token>>,
    /// False when the language was missing or unsupported.
    pub highlighted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct List {
    /// Starting number for ordered lists; `None` for bullets.
    pub ordered_start: Option<usize>,
    pub tight: bool,
    pub items: Vec<ListItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListItem {
    /// `Some(checked)` for task list items.
    pub task: Option<bool>,
    pub blocks: Vec<Block>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Alignment {
    None,
    Left,
    Center,
    Right,
}

impl Alignment {
    pub const fn css(self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Left => Some("left"),
            Self::Center => Some("center"),
            Self::Right => Some("right"),
        }
    }
}

/// A table; each cell is a run of inline content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Table {
    pub alignments: Vec<Alignment>,
    pub header: Vec<Vec<Inline>>,
    pub rows: Vec<Vec<Vec<Inline>>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "content", rename_all = "snake_case")]
pub enum Inline {
    Text(String),
    Emphasis(Vec<Inline>),
    Strong(Vec<Inline>),
    Strikethrough(Vec<Inline>),
    Code(String),
    /// URL is kept verbatim, never fetched.
    Link {
        url: String,
        title: String,
        content: Vec<Inline>,
    },
    Image {
        url: String,
        title: String,
        alt: String,
    },
    SoftBreak,
    LineBreak,
}

/// An outline entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeadingRef {
    pub level: u8,
    pub text: String,
    /// Unique within the document.
    pub anchor: String,
}

/// Lowercase ASCII alphanumerics separated by single dashes.
pub(crate) fn normalize_anchor(s: &str) -> String {
    let mut out = String::new();
    let mut last_dash = false;
    for ch in s.chars() {
        let lower = ch.to_ascii_lowercase();
        if lower.is_ascii_alphanumeric() {
            out.push(lower);
            last_dash = false;
        } else if !last_dash {
            out.push('-');
            last_dash = true;
        }
    }
    let trimmed = out.trim_matches('-');
    if trimmed.is_empty() {
        "section".to_string()
    } else {
        trimmed.to_string()
    }
}
