//! Markdown parsing with comrak.

use std::collections::HashMap;
use std::sync::Arc;

use comrak::nodes::{AstNode, ListType, NodeValue, TableAlignment};
use comrak::{Arena, Options, parse_document};

use super::types::{
    Alignment, Block, CodeBlock, HeadingRef, Inline, List, ListItem, RenderedContent, Table,
    inline_text, normalize_anchor,
};
use crate::highlight::{HighlightError, Highlighter, SyntectHighlighter, plain_lines};

/// Deepest block or inline nesting kept in the tree. Anything below it is
/// flattened into a plain-text paragraph so the tree walk stays shallow.
pub const MAX_NESTING: usize = 64;

/// Converts markdown text into a [`RenderedContent`] tree.
///
/// Rendering never fails: malformed markdown follows CommonMark's recovery
/// rules and unknown code languages fall back to plain text.
///
/// # Example
///
/// ```
/// use mdflex::document::MarkdownRenderer;
///
/// let content = MarkdownRenderer::default().render("# Hello\n\nWorld");
/// assert_eq!(content.outline()[0].anchor, "hello");
/// ```
#[derive(Debug, Clone)]
pub struct MarkdownRenderer {
    highlighter: Arc<dyn Highlighter>,
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new(Arc::new(SyntectHighlighter))
    }
}

impl MarkdownRenderer {
    pub fn new(highlighter: Arc<dyn Highlighter>) -> Self {
        Self { highlighter }
    }

    pub fn render(&self, text: &str) -> RenderedContent {
        let _scope = crate::perf::scope("document.render");
        let arena = Arena::new();
        let options = create_options();
        let root = parse_document(&arena, text, &options);

        let mut ctx = RenderContext {
            highlighter: self.highlighter.as_ref(),
            outline: Vec::new(),
            anchors: HashMap::new(),
            depth: 0,
        };
        let blocks = ctx.blocks(root);
        RenderedContent::new(blocks, ctx.outline)
    }
}

fn create_options() -> Options {
    let mut options = Options::default();
    options.extension.strikethrough = true;
    options.extension.table = true;
    options.extension.autolink = true;
    options.extension.tasklist = true;
    options
}

struct RenderContext<'h> {
    highlighter: &'h dyn Highlighter,
    outline: Vec<HeadingRef>,
    anchors: HashMap<String, usize>,
    depth: usize,
}

impl RenderContext<'_> {
    fn blocks<'a>(&mut self, parent: &'a AstNode<'a>) -> Vec<Block> {
        if self.depth >= MAX_NESTING {
            return flattened_paragraph(parent).into_iter().collect();
        }
        self.depth += 1;
        let mut out = Vec::new();
        for child in parent.children() {
            self.block(child, &mut out);
        }
        self.depth -= 1;
        out
    }

    fn block<'a>(&mut self, node: &'a AstNode<'a>, out: &mut Vec<Block>) {
        let value = node.data.borrow().value.clone();
        match value {
            NodeValue::Heading(heading) => {
                let content = inlines(node, 0);
                let text = inline_text(&content);
                let anchor = self.unique_anchor(&text);
                self.outline.push(HeadingRef {
                    level: heading.level,
                    text,
                    anchor: anchor.clone(),
                });
                out.push(Block::Heading {
                    level: heading.level,
                    anchor,
                    content,
                });
            }
            NodeValue::Paragraph => out.push(Block::Paragraph {
                content: inlines(node, 0),
            }),
            NodeValue::CodeBlock(code_block) => {
                let language = code_block
                    .info
                    .split_whitespace()
                    .next()
                    .map(str::to_string);
                out.push(Block::CodeBlock(
                    self.code_block(language, &code_block.literal),
                ));
            }
            NodeValue::List(list) => {
                let items = node
                    .children()
                    .map(|child| {
                        let task = match &child.data.borrow().value {
                            NodeValue::TaskItem(symbol) => Some(symbol.is_some()),
                            _ => None,
                        };
                        ListItem {
                            task,
                            blocks: self.blocks(child),
                        }
                    })
                    .collect();
                out.push(Block::List(List {
                    ordered_start: match list.list_type {
                        ListType::Ordered => Some(list.start),
                        ListType::Bullet => None,
                    },
                    tight: list.tight,
                    items,
                }));
            }
            NodeValue::Table(table) => {
                out.push(Block::Table(table_block(node, &table.alignments)));
            }
            NodeValue::BlockQuote => out.push(Block::BlockQuote {
                blocks: self.blocks(node),
            }),
            NodeValue::ThematicBreak => out.push(Block::ThematicBreak),
            NodeValue::HtmlBlock(html) => {
                let literal = html.literal.trim_end_matches('\n');
                if !literal.is_empty() {
                    out.push(Block::Paragraph {
                        content: vec![Inline::Text(literal.to_string())],
                    });
                }
            }
            _ => out.extend(self.blocks(node)),
        }
    }

    fn code_block(&self, language: Option<String>, literal: &str) -> CodeBlock {
        let Some(tag) = language.as_deref() else {
            return CodeBlock {
                language,
                lines: plain_lines(literal),
                highlighted: false,
            };
        };
        match self.highlighter.highlight(tag, literal) {
            Ok(lines) => CodeBlock {
                language,
                lines,
                highlighted: true,
            },
            Err(err) => {
                match &err {
                    HighlightError::UnsupportedLanguage(_) => {
                        tracing::debug!(language = tag, "unsupported code block language");
                    }
                    HighlightError::Tokenize { .. } => {
                        tracing::warn!(error = %err, "code block highlighting failed");
                    }
                }
                CodeBlock {
                    language,
                    lines: plain_lines(literal),
                    highlighted: false,
                }
            }
        }
    }

    fn unique_anchor(&mut self, text: &str) -> String {
        let base = normalize_anchor(text);
        let seen = self.anchors.entry(base.clone()).or_insert(0);
        let anchor = if *seen == 0 {
            base
        } else {
            format!("{base}-{seen}")
        };
        *seen += 1;
        anchor
    }
}

fn table_block<'a>(node: &'a AstNode<'a>, alignments: &[TableAlignment]) -> Table {
    let alignments = alignments
        .iter()
        .map(|alignment| match alignment {
            TableAlignment::None => Alignment::None,
            TableAlignment::Left => Alignment::Left,
            TableAlignment::Center => Alignment::Center,
            TableAlignment::Right => Alignment::Right,
        })
        .collect();

    let mut header = Vec::new();
    let mut rows = Vec::new();
    for row_node in node.children() {
        let is_header_row = match row_node.data.borrow().value {
            NodeValue::TableRow(is_header) => is_header,
            _ => continue,
        };
        let cells: Vec<Vec<Inline>> = row_node
            .children()
            .filter(|cell| matches!(cell.data.borrow().value, NodeValue::TableCell))
            .map(|cell| inlines(cell, 0))
            .collect();
        if is_header_row {
            header = cells;
        } else {
            rows.push(cells);
        }
    }

    Table {
        alignments,
        header,
        rows,
    }
}

fn inlines<'a>(node: &'a AstNode<'a>, depth: usize) -> Vec<Inline> {
    let mut out = Vec::new();
    if depth >= MAX_NESTING {
        push_text(&mut out, &flattened_text(node));
        return out;
    }
    for child in node.children() {
        push_inline(child, depth, &mut out);
    }
    out
}

fn push_inline<'a>(node: &'a AstNode<'a>, depth: usize, out: &mut Vec<Inline>) {
    let nested = |node| inlines(node, depth + 1);
    let value = node.data.borrow().value.clone();
    match value {
        NodeValue::Text(text) => push_text(out, &text),
        NodeValue::HtmlInline(html) => push_text(out, &html),
        NodeValue::Code(code) => out.push(Inline::Code(code.literal)),
        NodeValue::Emph => out.push(Inline::Emphasis(nested(node))),
        NodeValue::Strong => out.push(Inline::Strong(nested(node))),
        NodeValue::Strikethrough => out.push(Inline::Strikethrough(nested(node))),
        NodeValue::Link(link) => out.push(Inline::Link {
            url: link.url,
            title: link.title,
            content: nested(node),
        }),
        NodeValue::Image(image) => out.push(Inline::Image {
            url: image.url,
            title: image.title,
            alt: inline_text(&nested(node)),
        }),
        NodeValue::SoftBreak => out.push(Inline::SoftBreak),
        NodeValue::LineBreak => out.push(Inline::LineBreak),
        _ => {
            for inline in nested(node) {
                match inline {
                    Inline::Text(text) => push_text(out, &text),
                    other => out.push(other),
                }
            }
        }
    }
}

/// Text of everything below `node`, one line per block, gathered with
/// comrak's iterative traversal.
fn flattened_text<'a>(node: &'a AstNode<'a>) -> String {
    let mut text = String::new();
    let break_line = |text: &mut String| {
        if !text.is_empty() && !text.ends_with('\n') {
            text.push('\n');
        }
    };
    for descendant in node.descendants().skip(1) {
        match &descendant.data.borrow().value {
            NodeValue::Text(literal) | NodeValue::HtmlInline(literal) => text.push_str(literal),
            NodeValue::Code(code) => text.push_str(&code.literal),
            NodeValue::CodeBlock(code) => {
                break_line(&mut text);
                text.push_str(code.literal.trim_end_matches('\n'));
            }
            NodeValue::HtmlBlock(html) => {
                break_line(&mut text);
                text.push_str(html.literal.trim_end_matches('\n'));
            }
            NodeValue::SoftBreak | NodeValue::LineBreak => text.push(' '),
            NodeValue::Paragraph | NodeValue::Heading(_) | NodeValue::TableRow(_) => {
                break_line(&mut text);
            }
            _ => {}
        }
    }
    text
}

fn flattened_paragraph<'a>(node: &'a AstNode<'a>) -> Option<Block> {
    let text = flattened_text(node);
    let text = text.trim_end_matches('\n');
    (!text.is_empty()).then(|| Block::Paragraph {
        content: vec![Inline::Text(text.to_string())],
    })
}

/// comrak splits text at delimiter characters; merge the pieces back.
fn push_text(out: &mut Vec<Inline>, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(Inline::Text(last)) = out.last_mut() {
        last.push_str(text);
    } else {
        out.push(Inline::Text(text.to_string()));
    }
}
