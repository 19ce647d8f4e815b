//! Document tree to the plain-text alternate email part.

use tracing::warn;

use crate::domain::document::{DocumentNode, MarkKind, NodeKind};

use super::{MAX_RENDER_DEPTH, RenderError};

const RENDER_FALLBACK: &str = "There was an error rendering this newsletter content.";

/// Whether a list item belongs to a bullet or an ordered list.
///
/// The editor model does not distinguish item kinds (`listItem` is the same
/// node type under both list parents), so the kind is threaded down from the
/// parent list node instead of being inferred from item attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListKind {
    Bullet,
    Ordered,
}

/// Render a document to the plain-text equivalent of the HTML email body:
/// the title underlined with `=`, blocks separated by blank lines, `* ` and
/// `1.`-indexed list prefixes, `text (href)` links, `> `-prefixed quotes and
/// pipe-separated table rows.
pub fn generate_plain_text_email(content: &DocumentNode, title: &str, sender_name: &str) -> String {
    let body = match render_blocks(content.children(), 0, 0) {
        Ok(blocks) => blocks.join("\n\n"),
        Err(err) => {
            warn!(target = "lettera::email", error = %err, "plain-text rendering failed, using fallback body");
            RENDER_FALLBACK.to_string()
        }
    };

    let underline = "=".repeat(title.chars().count().max(1));
    let raw = format!("{title}\n{underline}\n\n{body}\n\n--\nSent by {sender_name}");

    collapse_blank_lines(&raw)
}

/// Collapse runs of blank lines to a single blank line and trim the ends.
fn collapse_blank_lines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut newlines = 0usize;
    for ch in text.chars() {
        if ch == '\n' {
            newlines += 1;
            if newlines <= 2 {
                out.push('\n');
            }
        } else {
            newlines = 0;
            out.push(ch);
        }
    }
    out.trim().to_string()
}

fn render_blocks(
    nodes: &[DocumentNode],
    depth: usize,
    indent: usize,
) -> Result<Vec<String>, RenderError> {
    if depth > MAX_RENDER_DEPTH {
        return Err(RenderError::TooDeep);
    }

    let mut blocks = Vec::new();
    for node in nodes {
        match node.kind {
            NodeKind::Heading | NodeKind::Paragraph => {
                blocks.push(render_inline(node.children(), depth + 1)?);
            }
            NodeKind::Text | NodeKind::HardBreak => {
                blocks.push(render_inline(std::slice::from_ref(node), depth + 1)?);
            }
            NodeKind::BulletList => {
                blocks.push(render_list(node.children(), ListKind::Bullet, depth + 1, indent)?);
            }
            NodeKind::OrderedList => {
                blocks.push(render_list(node.children(), ListKind::Ordered, depth + 1, indent)?);
            }
            // A stray item without a list parent defaults to a bullet.
            NodeKind::ListItem => {
                blocks.push(render_list(
                    std::slice::from_ref(node),
                    ListKind::Bullet,
                    depth + 1,
                    indent,
                )?);
            }
            NodeKind::Image => blocks.push(image_placeholder(node)),
            NodeKind::Blockquote => {
                let inner = render_blocks(node.children(), depth + 1, indent)?.join("\n");
                let quoted = inner
                    .lines()
                    .map(|line| format!("> {line}"))
                    .collect::<Vec<_>>()
                    .join("\n");
                blocks.push(quoted);
            }
            NodeKind::HorizontalRule => blocks.push("---".to_string()),
            NodeKind::Table => {
                let mut rows = Vec::new();
                for row in node.children() {
                    let cells = row
                        .children()
                        .iter()
                        .map(|cell| render_inline(cell.children(), depth + 2))
                        .collect::<Result<Vec<_>, _>>()?;
                    rows.push(cells.join(" | "));
                }
                blocks.push(rows.join("\n"));
            }
            NodeKind::TableRow | NodeKind::TableCell | NodeKind::Doc | NodeKind::Unknown => {
                blocks.extend(render_blocks(node.children(), depth + 1, indent)?);
            }
        }
    }

    blocks.retain(|block| !block.trim().is_empty());
    Ok(blocks)
}

/// Render list items, one line per item, numbering restarting per list.
/// Nested lists continue on their own lines one indent level deeper.
fn render_list(
    items: &[DocumentNode],
    kind: ListKind,
    depth: usize,
    indent: usize,
) -> Result<String, RenderError> {
    if depth > MAX_RENDER_DEPTH {
        return Err(RenderError::TooDeep);
    }

    let pad = "  ".repeat(indent);
    let mut lines = Vec::new();
    let mut position = 0usize;

    for item in items {
        if item.kind != NodeKind::ListItem {
            // Tolerate non-item children by rendering them as nested blocks.
            lines.extend(render_blocks(std::slice::from_ref(item), depth + 1, indent)?);
            continue;
        }

        position += 1;
        let prefix = match kind {
            ListKind::Bullet => "* ".to_string(),
            ListKind::Ordered => format!("{position}. "),
        };

        let mut inline_parts = Vec::new();
        let mut nested = Vec::new();
        for child in item.children() {
            match child.kind {
                NodeKind::BulletList => {
                    nested.push(render_list(child.children(), ListKind::Bullet, depth + 1, indent + 1)?);
                }
                NodeKind::OrderedList => {
                    nested.push(render_list(child.children(), ListKind::Ordered, depth + 1, indent + 1)?);
                }
                NodeKind::Paragraph | NodeKind::Heading => {
                    inline_parts.push(render_inline(child.children(), depth + 1)?);
                }
                _ => {
                    inline_parts.push(render_inline(std::slice::from_ref(child), depth + 1)?);
                }
            }
        }

        let head = inline_parts
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        lines.push(format!("{pad}{prefix}{head}"));
        lines.extend(nested);
    }

    Ok(lines.join("\n"))
}

fn render_inline(nodes: &[DocumentNode], depth: usize) -> Result<String, RenderError> {
    if depth > MAX_RENDER_DEPTH {
        return Err(RenderError::TooDeep);
    }

    let mut out = String::new();
    for node in nodes {
        match node.kind {
            NodeKind::Text => {
                let mut text = node.text.clone().unwrap_or_default();
                for mark in node.marks() {
                    if mark.kind == MarkKind::Link {
                        if let Some(href) = mark.attr_str("href") {
                            text = format!("{text} ({href})");
                        }
                    }
                }
                out.push_str(&text);
            }
            NodeKind::HardBreak => out.push('\n'),
            NodeKind::Image => out.push_str(&image_placeholder(node)),
            _ => out.push_str(&render_inline(node.children(), depth + 1)?),
        }
    }

    Ok(out)
}

fn image_placeholder(node: &DocumentNode) -> String {
    let alt = node.attr_str("alt").filter(|alt| !alt.is_empty());
    format!("[{}]", alt.unwrap_or("Image"))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn doc(value: serde_json::Value) -> DocumentNode {
        serde_json::from_value(value).expect("valid document")
    }

    #[test]
    fn title_is_underlined_with_equals() {
        let text = generate_plain_text_email(&DocumentNode::empty_doc(), "Hello", "Ada");
        assert!(text.starts_with("Hello\n====="));
        assert!(text.ends_with("--\nSent by Ada"));
    }

    #[test]
    fn empty_doc_has_no_body_beyond_the_scaffold() {
        let text = generate_plain_text_email(&DocumentNode::empty_doc(), "Hello", "Ada");
        assert_eq!(text, "Hello\n=====\n\n--\nSent by Ada");
    }

    #[test]
    fn bullet_and_ordered_prefixes_follow_list_kind() {
        let tree = doc(json!({
            "type": "doc",
            "content": [
                {"type": "bulletList", "content": [
                    {"type": "listItem", "content": [
                        {"type": "paragraph", "content": [{"type": "text", "text": "alpha"}]}
                    ]},
                    {"type": "listItem", "content": [
                        {"type": "paragraph", "content": [{"type": "text", "text": "beta"}]}
                    ]}
                ]},
                {"type": "orderedList", "content": [
                    {"type": "listItem", "content": [
                        {"type": "paragraph", "content": [{"type": "text", "text": "first"}]}
                    ]},
                    {"type": "listItem", "content": [
                        {"type": "paragraph", "content": [{"type": "text", "text": "second"}]}
                    ]}
                ]}
            ]
        }));
        let text = generate_plain_text_email(&tree, "t", "s");
        assert!(text.contains("* alpha\n* beta"));
        assert!(text.contains("1. first\n2. second"));
    }

    #[test]
    fn ordered_numbering_restarts_per_list() {
        let tree = doc(json!({
            "type": "doc",
            "content": [
                {"type": "orderedList", "content": [
                    {"type": "listItem", "content": [{"type": "paragraph", "content": [{"type": "text", "text": "a"}]}]}
                ]},
                {"type": "orderedList", "content": [
                    {"type": "listItem", "content": [{"type": "paragraph", "content": [{"type": "text", "text": "b"}]}]}
                ]}
            ]
        }));
        let text = generate_plain_text_email(&tree, "t", "s");
        assert!(text.contains("1. a"));
        assert!(text.contains("1. b"));
        assert!(!text.contains("2. b"));
    }

    #[test]
    fn nested_lists_indent_one_level_deeper() {
        let tree = doc(json!({
            "type": "doc",
            "content": [{"type": "bulletList", "content": [
                {"type": "listItem", "content": [
                    {"type": "paragraph", "content": [{"type": "text", "text": "outer"}]},
                    {"type": "orderedList", "content": [
                        {"type": "listItem", "content": [
                            {"type": "paragraph", "content": [{"type": "text", "text": "inner"}]}
                        ]}
                    ]}
                ]}
            ]}]
        }));
        let text = generate_plain_text_email(&tree, "t", "s");
        assert!(text.contains("* outer\n  1. inner"));
    }

    #[test]
    fn links_render_text_with_href_in_parentheses() {
        let tree = doc(json!({
            "type": "doc",
            "content": [{"type": "paragraph", "content": [
                {"type": "text", "text": "docs", "marks": [
                    {"type": "link", "attrs": {"href": "https://example.com"}}
                ]}
            ]}]
        }));
        let text = generate_plain_text_email(&tree, "t", "s");
        assert!(text.contains("docs (https://example.com)"));
    }

    #[test]
    fn image_without_alt_renders_generic_placeholder() {
        let tree = doc(json!({
            "type": "doc",
            "content": [
                {"type": "image"},
                {"type": "image", "attrs": {"alt": "A chart"}}
            ]
        }));
        let text = generate_plain_text_email(&tree, "t", "s");
        assert!(text.contains("[Image]"));
        assert!(text.contains("[A chart]"));
    }

    #[test]
    fn blockquote_lines_are_prefixed() {
        let tree = doc(json!({
            "type": "doc",
            "content": [{"type": "blockquote", "content": [
                {"type": "paragraph", "content": [{"type": "text", "text": "one"}]},
                {"type": "paragraph", "content": [{"type": "text", "text": "two"}]}
            ]}]
        }));
        let text = generate_plain_text_email(&tree, "t", "s");
        assert!(text.contains("> one\n> two"));
    }

    #[test]
    fn tables_flatten_to_pipe_separated_rows() {
        let tree = doc(json!({
            "type": "doc",
            "content": [{"type": "table", "content": [
                {"type": "tableRow", "content": [
                    {"type": "tableCell", "content": [{"type": "paragraph", "content": [{"type": "text", "text": "a"}]}]},
                    {"type": "tableCell", "content": [{"type": "paragraph", "content": [{"type": "text", "text": "b"}]}]}
                ]},
                {"type": "tableRow", "content": [
                    {"type": "tableCell", "content": [{"type": "paragraph", "content": [{"type": "text", "text": "c"}]}]},
                    {"type": "tableCell", "content": [{"type": "paragraph", "content": [{"type": "text", "text": "d"}]}]}
                ]}
            ]}]
        }));
        let text = generate_plain_text_email(&tree, "t", "s");
        assert!(text.contains("a | b\nc | d"));
    }

    #[test]
    fn output_never_contains_emitted_markup() {
        let tree = doc(json!({
            "type": "doc",
            "content": [
                {"type": "heading", "attrs": {"level": 2}, "content": [{"type": "text", "text": "Head", "marks": [{"type": "bold"}]}]},
                {"type": "paragraph", "content": [{"type": "text", "text": "Body", "marks": [{"type": "italic"}]}]},
                {"type": "horizontalRule"}
            ]
        }));
        let text = generate_plain_text_email(&tree, "t", "s");
        assert!(!text.contains('<'));
    }

    #[test]
    fn consecutive_blank_lines_collapse() {
        let tree = doc(json!({
            "type": "doc",
            "content": [
                {"type": "paragraph", "content": []},
                {"type": "paragraph", "content": []},
                {"type": "paragraph", "content": [{"type": "text", "text": "end"}]}
            ]
        }));
        let text = generate_plain_text_email(&tree, "t", "s");
        assert!(!text.contains("\n\n\n"));
        assert!(text.contains("end"));
    }

    #[test]
    fn pathological_nesting_falls_back_instead_of_overflowing() {
        let mut node = json!({"type": "paragraph", "content": [{"type": "text", "text": "deep"}]});
        for _ in 0..(MAX_RENDER_DEPTH + 8) {
            node = json!({"type": "blockquote", "content": [node]});
        }
        let tree = doc(json!({"type": "doc", "content": [node]}));
        let text = generate_plain_text_email(&tree, "t", "s");
        assert!(text.contains(RENDER_FALLBACK));
        assert!(!text.contains("deep"));
    }
}
