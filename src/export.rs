//! Standalone HTML export.
//!
//! The document carries its own stylesheet, has no scripts and links no
//! external resources. Link and image URLs are written exactly as authored,
//! except `javascript:` and `vbscript:` URLs, which are left out.

use std::fmt::Write;

use crate::document::{Block, CodeBlock, Inline, List, RenderedContent, Table};
use crate::highlight::TokenClass;
use crate::theme::Presentation;

/// URL schemes that run code when followed.
const SCRIPT_SCHEMES: [&str; 2] = ["javascript", "vbscript"];

/// Title used when the document has never been saved.
pub const UNTITLED: &str = "Untitled";

/// Render `content` as a complete HTML document.
///
/// Output depends only on the arguments, so exporting twice yields
/// byte-identical files.
pub fn export_html(content: &RenderedContent, presentation: Presentation, title: &str) -> String {
    let _scope = crate::perf::scope("export.html");
    let mut out = String::new();
    out.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    out.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    let _ = writeln!(out, "<title>{}</title>", escape_text(title));
    out.push_str("<style>\n");
    out.push_str(&stylesheet(presentation));
    out.push_str("</style>\n</head>\n<body>\n<article class=\"markdown-body\">\n");
    write_blocks(&mut out, content.blocks());
    out.push_str("</article>\n</body>\n</html>\n");
    out
}

/// Inline stylesheet for a theme and zoom level.
pub fn stylesheet(presentation: Presentation) -> String {
    let p = presentation.palette();
    let font_px = 16.0 * presentation.zoom.factor();
    let mut css = String::new();
    let _ = writeln!(
        css,
        "body {{ margin: 0; background: {}; color: {}; }}",
        p.background, p.text
    );
    let _ = writeln!(
        css,
        ".markdown-body {{ max-width: 860px; margin: 0 auto; padding: 32px; \
         font-family: -apple-system, BlinkMacSystemFont, \"Segoe UI\", Helvetica, Arial, sans-serif; \
         font-size: {font_px:.1}px; line-height: 1.6; }}"
    );
    let _ = writeln!(
        css,
        "h1, h2, h3, h4, h5, h6 {{ color: {}; margin: 1.2em 0 0.6em; }}",
        p.heading
    );
    let _ = writeln!(
        css,
        "h1, h2 {{ border-bottom: 1px solid {}; padding-bottom: 0.3em; }}",
        p.border
    );
    let _ = writeln!(css, "a {{ color: {}; }}", p.link);
    let _ = writeln!(
        css,
        "code {{ background: {}; padding: 0.2em 0.4em; border-radius: 3px; \
         font-family: \"SF Mono\", Consolas, \"Liberation Mono\", monospace; font-size: 0.9em; }}",
        p.code_background
    );
    let _ = writeln!(
        css,
        "pre {{ background: {}; border: 1px solid {}; padding: 16px; overflow: auto; border-radius: 6px; }}",
        p.pre_background, p.border
    );
    css.push_str("pre code { background: none; padding: 0; }\n");
    let _ = writeln!(
        css,
        "blockquote {{ margin: 0; padding: 0.5em 1em; background: {}; border-left: 4px solid {}; color: {}; }}",
        p.quote_background, p.border, p.muted
    );
    let _ = writeln!(
        css,
        "table {{ border-collapse: collapse; }} th, td {{ border: 1px solid {}; padding: 6px 13px; }}",
        p.border
    );
    let _ = writeln!(css, "hr {{ border: 0; border-top: 1px solid {}; }}", p.border);
    css.push_str("img { max-width: 100%; }\n");
    css.push_str("li.task { list-style: none; }\n");
    for class in TokenClass::ALL {
        let color = match class {
            TokenClass::Plain => continue,
            TokenClass::Keyword => p.syntax.keyword,
            TokenClass::String => p.syntax.string,
            TokenClass::Number => p.syntax.number,
            TokenClass::Constant => p.syntax.constant,
            TokenClass::Comment => p.syntax.comment,
            TokenClass::Function => p.syntax.function,
            TokenClass::Type => p.syntax.type_name,
            TokenClass::Variable => p.syntax.variable,
            TokenClass::Operator => p.syntax.operator,
            TokenClass::Punctuation => p.syntax.punctuation,
        };
        let _ = writeln!(css, ".{} {{ color: {color}; }}", class.style_tag());
    }
    css
}

fn write_blocks(out: &mut String, blocks: &[Block]) {
    for block in blocks {
        write_block(out, block);
    }
}

fn write_block(out: &mut String, block: &Block) {
    match block {
        Block::Heading {
            level,
            anchor,
            content,
        } => {
            let _ = write!(out, "<h{level} id=\"{}\">", escape_attr(anchor));
            write_inlines(out, content);
            let _ = writeln!(out, "</h{level}>");
        }
        Block::Paragraph { content } => {
            out.push_str("<p>");
            write_inlines(out, content);
            out.push_str("</p>\n");
        }
        Block::CodeBlock(code) => write_code_block(out, code),
        Block::List(list) => write_list(out, list),
        Block::Table(table) => write_table(out, table),
        Block::BlockQuote { blocks } => {
            out.push_str("<blockquote>\n");
            write_blocks(out, blocks);
            out.push_str("</blockquote>\n");
        }
        Block::ThematicBreak => out.push_str("<hr>\n"),
    }
}

fn write_code_block(out: &mut String, code: &CodeBlock) {
    out.push_str("<pre><code");
    if let Some(language) = &code.language {
        let _ = write!(out, " class=\"language-{}\"", escape_attr(language));
    }
    out.push('>');
    for line in &code.lines {
        for token in line {
            if token.class == TokenClass::Plain {
                out.push_str(&escape_text(&token.text));
            } else {
                let _ = write!(
                    out,
                    "<span class=\"{}\">{}</span>",
                    token.class.style_tag(),
                    escape_text(&token.text)
                );
            }
        }
        out.push('\n');
    }
    out.push_str("</code></pre>\n");
}

fn write_list(out: &mut String, list: &List) {
    let tag = match list.ordered_start {
        Some(1) => {
            out.push_str("<ol>\n");
            "ol"
        }
        Some(start) => {
            let _ = writeln!(out, "<ol start=\"{start}\">");
            "ol"
        }
        None => {
            out.push_str("<ul>\n");
            "ul"
        }
    };
    for item in &list.items {
        match item.task {
            Some(checked) => {
                out.push_str("<li class=\"task\"><input type=\"checkbox\" disabled");
                if checked {
                    out.push_str(" checked");
                }
                out.push_str("> ");
            }
            None => out.push_str("<li>"),
        }
        if list.tight {
            write_tight_item(out, &item.blocks);
        } else {
            out.push('\n');
            write_blocks(out, &item.blocks);
        }
        out.push_str("</li>\n");
    }
    let _ = writeln!(out, "</{tag}>");
}

/// Tight list items render their paragraphs without `<p>` wrappers.
fn write_tight_item(out: &mut String, blocks: &[Block]) {
    for (index, block) in blocks.iter().enumerate() {
        match block {
            Block::Paragraph { content } => {
                write_inlines(out, content);
                if index + 1 < blocks.len() {
                    out.push('\n');
                }
            }
            other => write_block(out, other),
        }
    }
}

fn write_table(out: &mut String, table: &Table) {
    out.push_str("<table>\n<thead>\n<tr>\n");
    for (column, cell) in table.header.iter().enumerate() {
        write_cell(out, "th", table, column, cell);
    }
    out.push_str("</tr>\n</thead>\n");
    if !table.rows.is_empty() {
        out.push_str("<tbody>\n");
        for row in &table.rows {
            out.push_str("<tr>\n");
            for (column, cell) in row.iter().enumerate() {
                write_cell(out, "td", table, column, cell);
            }
            out.push_str("</tr>\n");
        }
        out.push_str("</tbody>\n");
    }
    out.push_str("</table>\n");
}

fn write_cell(out: &mut String, tag: &str, table: &Table, column: usize, cell: &[Inline]) {
    match table.alignments.get(column).and_then(|a| a.css()) {
        Some(align) => {
            let _ = write!(out, "<{tag} style=\"text-align: {align}\">");
        }
        None => {
            let _ = write!(out, "<{tag}>");
        }
    }
    write_inlines(out, cell);
    let _ = writeln!(out, "</{tag}>");
}

fn write_inlines(out: &mut String, inlines: &[Inline]) {
    for inline in inlines {
        match inline {
            Inline::Text(text) => out.push_str(&escape_text(text)),
            Inline::Emphasis(children) => wrap(out, "em", children),
            Inline::Strong(children) => wrap(out, "strong", children),
            Inline::Strikethrough(children) => wrap(out, "del", children),
            Inline::Code(code) => {
                let _ = write!(out, "<code>{}</code>", escape_text(code));
            }
            Inline::Link {
                url,
                title,
                content,
            } => {
                out.push_str("<a");
                if !is_script_url(url) {
                    let _ = write!(out, " href=\"{}\"", escape_attr(url));
                }
                if !title.is_empty() {
                    let _ = write!(out, " title=\"{}\"", escape_attr(title));
                }
                out.push('>');
                write_inlines(out, content);
                out.push_str("</a>");
            }
            Inline::Image { url, title, alt } => {
                out.push_str("<img");
                if !is_script_url(url) {
                    let _ = write!(out, " src=\"{}\"", escape_attr(url));
                }
                let _ = write!(out, " alt=\"{}\"", escape_attr(alt));
                if !title.is_empty() {
                    let _ = write!(out, " title=\"{}\"", escape_attr(title));
                }
                out.push('>');
            }
            Inline::SoftBreak => out.push('\n'),
            Inline::LineBreak => out.push_str("<br>\n"),
        }
    }
}

fn wrap(out: &mut String, tag: &str, children: &[Inline]) {
    let _ = write!(out, "<{tag}>");
    write_inlines(out, children);
    let _ = write!(out, "</{tag}>");
}

fn escape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Browsers ignore whitespace and control characters inside a scheme, so
/// `java\tscript:` counts too.
fn is_script_url(url: &str) -> bool {
    let Some((scheme, _)) = url.split_once(':') else {
        return false;
    };
    let scheme: String = scheme
        .chars()
        .filter(|c| !c.is_ascii_whitespace() && !c.is_ascii_control())
        .collect();
    SCRIPT_SCHEMES
        .iter()
        .any(|script| scheme.eq_ignore_ascii_case(script))
}

fn escape_attr(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}
