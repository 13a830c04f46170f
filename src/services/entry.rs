//! Daily entry rendering.
//!
//! Converts the block editor's saved document into the Markdown file that
//! gets committed as `entries/YYYY-MM-DD.md`. Inline formatting arrives as a
//! small HTML subset (bold, italic, inline code, links, marker highlights).
//! It is parsed with `scraper` and rewritten into Markdown; unknown tags are
//! unwrapped to their text.

use scraper::{ElementRef, Html, Node};
use serde::Deserialize;
use serde_json::Value;

pub const ENTRIES_DIR: &str = "entries";

#[derive(Debug, thiserror::Error)]
pub enum EntryError {
    #[error("entry has no content")]
    Empty,
}

/// Saved editor document.
#[derive(Debug, Clone, Deserialize)]
pub struct EditorDocument {
    #[serde(default)]
    pub time: Option<i64>,
    #[serde(default)]
    pub blocks: Vec<Block>,
    #[serde(default)]
    pub version: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Block {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Value,
}

/// `YYYY-MM-DD` for a calendar date.
#[must_use]
pub fn format_date(date: time::Date) -> String {
    format!("{:04}-{:02}-{:02}", date.year(), u8::from(date.month()), date.day())
}

#[must_use]
pub fn entry_path(date: &str) -> String {
    format!("{ENTRIES_DIR}/{date}.md")
}

#[must_use]
pub fn commit_message(date: &str) -> String {
    format!("Daily entry {date}")
}

/// Render the document as a Markdown entry for `date`.
///
/// # Errors
///
/// Returns [`EntryError::Empty`] when no block produces any text.
pub fn render_entry(date: &str, doc: &EditorDocument) -> Result<String, EntryError> {
    let sections: Vec<String> = doc
        .blocks
        .iter()
        .filter_map(render_block)
        .filter(|s| !s.trim().is_empty())
        .collect();
    if sections.is_empty() {
        return Err(EntryError::Empty);
    }

    let mut out = format!("# {}\n\n", commit_message(date));
    out.push_str(&sections.join("\n\n"));
    out.push('\n');
    Ok(out)
}

fn text_field<'a>(data: &'a Value, key: &str) -> &'a str {
    data.get(key).and_then(Value::as_str).unwrap_or_default()
}

fn render_block(block: &Block) -> Option<String> {
    let data = &block.data;
    match block.kind.as_str() {
        "paragraph" => Some(inline_markdown(text_field(data, "text"))),
        "header" => {
            let level = data
                .get("level")
                .and_then(Value::as_u64)
                .unwrap_or(2)
                .clamp(1, 6);
            let hashes = "#".repeat(usize::try_from(level).unwrap_or(2));
            let text = inline_markdown_single_line(text_field(data, "text"));
            (!text.is_empty()).then(|| format!("{hashes} {text}"))
        }
        "list" => {
            let ordered = data.get("style").and_then(Value::as_str) == Some("ordered");
            let items = data.get("items").and_then(Value::as_array)?;
            let mut lines = Vec::new();
            render_list(items, ordered, 0, &mut lines);
            Some(lines.join("\n"))
        }
        "quote" => {
            let text = inline_markdown(text_field(data, "text"));
            let caption = inline_markdown(text_field(data, "caption"));
            let mut lines: Vec<String> = text.lines().map(|l| format!("> {l}")).collect();
            if !caption.is_empty() {
                lines.push(">".into());
                lines.push(format!("> {caption}"));
            }
            Some(lines.join("\n"))
        }
        "code" => {
            let code = text_field(data, "code");
            let fence = "`".repeat(longest_run(code, '`').max(2) + 1);
            Some(format!("{fence}\n{}\n{fence}", code.trim_end_matches('\n')))
        }
        other => {
            let text = data.get("text").and_then(Value::as_str);
            if text.is_none() {
                tracing::debug!(block = other, "skipping unsupported editor block");
            }
            text.map(inline_markdown)
        }
    }
}

/// Length of the longest run of `c` in `text`.
fn longest_run(text: &str, c: char) -> usize {
    text.split(|ch| ch != c).map(str::len).max().unwrap_or(0)
}

/// List items are either plain strings or `{content, items}` nodes.
fn render_list(items: &[Value], ordered: bool, depth: usize, lines: &mut Vec<String>) {
    let indent = "   ".repeat(depth);
    for (i, item) in items.iter().enumerate() {
        let (content, children) = match item {
            Value::String(s) => (s.as_str(), None),
            Value::Object(_) => (
                text_field(item, "content"),
                item.get("items").and_then(Value::as_array),
            ),
            _ => continue,
        };
        let marker = if ordered { format!("{}.", i + 1) } else { "-".to_owned() };
        lines.push(format!("{indent}{marker} {}", inline_markdown(content)));
        if let Some(children) = children {
            render_list(children, ordered, depth + 1, lines);
        }
    }
}

// =============================================================================
// INLINE HTML
// =============================================================================

const LINE_BREAK: &str = "  \n";

/// Rewrite the editor's inline HTML into Markdown.
#[must_use]
pub fn inline_markdown(html: &str) -> String {
    render_inline(html, LINE_BREAK)
}

/// Inline Markdown for a single-line context such as a heading.
#[must_use]
pub fn inline_markdown_single_line(html: &str) -> String {
    render_inline(html, " ")
}

fn render_inline(html: &str, line_break: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let mut out = String::with_capacity(html.len());
    push_inline(fragment.root_element(), line_break, &mut out);
    out.trim().to_owned()
}

fn push_inline(node: ElementRef<'_>, line_break: &str, out: &mut String) {
    for child in node.children() {
        match child.value() {
            Node::Text(text) => out.push_str(&text.replace('\u{a0}', " ")),
            Node::Element(elem) => {
                let Some(element) = ElementRef::wrap(child) else {
                    continue;
                };
                match elem.name() {
                    "b" | "strong" => push_wrapped(element, "**", "**", line_break, out),
                    "i" | "em" => push_wrapped(element, "_", "_", line_break, out),
                    "code" => push_wrapped(element, "`", "`", line_break, out),
                    "mark" => push_wrapped(element, "<mark>", "</mark>", line_break, out),
                    "br" => out.push_str(line_break),
                    "a" => {
                        out.push('[');
                        push_inline(element, line_break, out);
                        match elem.attr("href").map(str::trim).filter(|h| !h.is_empty()) {
                            Some(href) => {
                                out.push_str("](");
                                out.push_str(href);
                                out.push(')');
                            }
                            None => out.push(']'),
                        }
                    }
                    _ => push_inline(element, line_break, out),
                }
            }
            _ => {}
        }
    }
}

fn push_wrapped(element: ElementRef<'_>, open: &str, close: &str, line_break: &str, out: &mut String) {
    out.push_str(open);
    push_inline(element, line_break, out);
    out.push_str(close);
}

#[cfg(test)]
#[path = "entry_test.rs"]
mod tests;
