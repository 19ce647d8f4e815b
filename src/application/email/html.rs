//! Document tree to email-safe HTML.

use std::fmt::Write as _;

use tracing::warn;

use crate::domain::document::{DocumentNode, MarkKind, NodeKind};

use super::template::render_email_shell;
use super::{MAX_RENDER_DEPTH, RenderError};

const RENDER_FALLBACK: &str = "<p>There was an error rendering this newsletter content.</p>";

/// Render a document to a complete, self-contained HTML email body.
///
/// Rendering is total: malformed nodes degrade to empty output and an
/// internal failure is replaced by [`RENDER_FALLBACK`] rather than
/// propagated.
pub fn generate_email_html(content: &DocumentNode, title: &str, sender_name: &str) -> String {
    let body = match render_nodes(content.children(), 0) {
        Ok(html) => html,
        Err(err) => {
            warn!(target = "lettera::email", error = %err, "html rendering failed, using fallback body");
            RENDER_FALLBACK.to_string()
        }
    };

    let inner = format!(
        r#"    <div style="padding-bottom: 20px; border-bottom: 1px solid #eaeaea; text-align: center;">
      <h1>{title}</h1>
    </div>
    <div style="padding: 20px 0;">
      {body}
    </div>
    <div style="padding-top: 20px; border-top: 1px solid #eaeaea; font-size: 14px; color: #666; text-align: center;">
      <p>Sent by {sender_name}</p>
    </div>"#
    );

    render_email_shell(title, &inner)
}

fn render_nodes(nodes: &[DocumentNode], depth: usize) -> Result<String, RenderError> {
    if depth > MAX_RENDER_DEPTH {
        return Err(RenderError::TooDeep);
    }

    let mut out = String::new();
    for node in nodes {
        match node.kind {
            NodeKind::Heading => {
                let level = node.attr_u64("level").unwrap_or(1).clamp(1, 6);
                let children = render_nodes(node.children(), depth + 1)?;
                let _ = write!(out, "<h{level}>{children}</h{level}>");
            }
            NodeKind::Paragraph => {
                let children = render_nodes(node.children(), depth + 1)?;
                let _ = write!(out, "<p>{children}</p>");
            }
            NodeKind::Text => out.push_str(&render_text(node)),
            NodeKind::BulletList => {
                let children = render_nodes(node.children(), depth + 1)?;
                let _ = write!(out, "<ul>{children}</ul>");
            }
            NodeKind::OrderedList => {
                let children = render_nodes(node.children(), depth + 1)?;
                let _ = write!(out, "<ol>{children}</ol>");
            }
            NodeKind::ListItem => {
                // Items carry their own paragraph wrappers in the editor
                // model; those markers are stripped inside <li>.
                let children = render_nodes(node.children(), depth + 1)?
                    .replace("<p>", "")
                    .replace("</p>", "");
                let _ = write!(out, "<li>{children}</li>");
            }
            NodeKind::Image => {
                let src = node.attr_str("src").unwrap_or_default();
                let alt = node.attr_str("alt").unwrap_or_default();
                match node.attr_str("title") {
                    Some(title) if !title.is_empty() => {
                        let _ = write!(out, r#"<img src="{src}" alt="{alt}" title="{title}">"#);
                    }
                    _ => {
                        let _ = write!(out, r#"<img src="{src}" alt="{alt}">"#);
                    }
                }
            }
            NodeKind::Blockquote => {
                let children = render_nodes(node.children(), depth + 1)?;
                let _ = write!(out, "<blockquote>{children}</blockquote>");
            }
            NodeKind::HorizontalRule => out.push_str("<hr>"),
            NodeKind::HardBreak => out.push_str("<br>"),
            NodeKind::Table => {
                let children = render_nodes(node.children(), depth + 1)?;
                let _ = write!(
                    out,
                    r#"<table border="1" cellpadding="5" cellspacing="0" style="border-collapse: collapse;">{children}</table>"#
                );
            }
            NodeKind::TableRow => {
                let children = render_nodes(node.children(), depth + 1)?;
                let _ = write!(out, "<tr>{children}</tr>");
            }
            NodeKind::TableCell => {
                let tag = if node.attr_bool("header").unwrap_or(false) {
                    "th"
                } else {
                    "td"
                };
                let children = render_nodes(node.children(), depth + 1)?;
                let _ = write!(out, "<{tag}>{children}</{tag}>");
            }
            // Forward-compatible default: recurse into whatever children an
            // unrecognised (or nested doc) node carries, emit nothing else.
            NodeKind::Doc | NodeKind::Unknown => {
                if !node.children().is_empty() {
                    out.push_str(&render_nodes(node.children(), depth + 1)?);
                }
            }
        }
    }

    Ok(out)
}

/// Apply marks in array order, each wrapping the accumulated markup, so the
/// first mark in the array ends up innermost and the last outermost.
fn render_text(node: &DocumentNode) -> String {
    let mut text = node.text.clone().unwrap_or_default();

    for mark in node.marks() {
        text = match mark.kind {
            MarkKind::Bold => format!("<strong>{text}</strong>"),
            MarkKind::Italic => format!("<em>{text}</em>"),
            MarkKind::Underline => format!("<u>{text}</u>"),
            MarkKind::Strike => format!("<s>{text}</s>"),
            MarkKind::Code => format!("<code>{text}</code>"),
            MarkKind::Link => {
                let href = mark.attr_str("href").unwrap_or_default();
                match mark.attr_str("target") {
                    Some(target) if !target.is_empty() => {
                        format!(r#"<a href="{href}" target="{target}">{text}</a>"#)
                    }
                    _ => format!(r#"<a href="{href}">{text}</a>"#),
                }
            }
            MarkKind::Unknown => text,
        };
    }

    text
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn doc(value: serde_json::Value) -> DocumentNode {
        serde_json::from_value(value).expect("valid document")
    }

    #[test]
    fn empty_doc_still_produces_a_complete_document_with_title() {
        let html = generate_email_html(&DocumentNode::empty_doc(), "Issue #1", "Ada");
        assert!(html.contains("<!DOCTYPE html>"));
        assert!(html.contains("<html"));
        assert!(html.contains("</body>"));
        assert!(html.contains("<h1>Issue #1</h1>"));
        assert!(html.contains("Sent by Ada"));
    }

    #[test]
    fn bold_then_italic_nests_italic_outermost() {
        let tree = doc(json!({
            "type": "doc",
            "content": [{"type": "paragraph", "content": [
                {"type": "text", "text": "x", "marks": [{"type": "bold"}, {"type": "italic"}]}
            ]}]
        }));
        let html = generate_email_html(&tree, "t", "s");
        assert!(html.contains("<em><strong>x</strong></em>"));
    }

    #[test]
    fn heading_level_comes_from_attrs_with_default_one() {
        let tree = doc(json!({
            "type": "doc",
            "content": [
                {"type": "heading", "attrs": {"level": 3}, "content": [{"type": "text", "text": "a"}]},
                {"type": "heading", "content": [{"type": "text", "text": "b"}]}
            ]
        }));
        let html = generate_email_html(&tree, "t", "s");
        assert!(html.contains("<h3>a</h3>"));
        assert!(html.contains("<h1>b</h1>"));
    }

    #[test]
    fn list_items_strip_inner_paragraph_markers() {
        let tree = doc(json!({
            "type": "doc",
            "content": [{"type": "bulletList", "content": [
                {"type": "listItem", "content": [
                    {"type": "paragraph", "content": [{"type": "text", "text": "one"}]}
                ]},
                {"type": "listItem", "content": [
                    {"type": "paragraph", "content": [{"type": "text", "text": "two"}]}
                ]}
            ]}]
        }));
        let html = generate_email_html(&tree, "t", "s");
        assert!(html.contains("<ul><li>one</li><li>two</li></ul>"));
    }

    #[test]
    fn image_with_missing_attrs_renders_empty_strings() {
        let tree = doc(json!({
            "type": "doc",
            "content": [{"type": "image"}]
        }));
        let html = generate_email_html(&tree, "t", "s");
        assert!(html.contains(r#"<img src="" alt="">"#));
    }

    #[test]
    fn link_mark_renders_href_and_optional_target() {
        let tree = doc(json!({
            "type": "doc",
            "content": [{"type": "paragraph", "content": [
                {"type": "text", "text": "here", "marks": [
                    {"type": "link", "attrs": {"href": "https://example.com", "target": "_blank"}}
                ]}
            ]}]
        }));
        let html = generate_email_html(&tree, "t", "s");
        assert!(html.contains(r#"<a href="https://example.com" target="_blank">here</a>"#));
    }

    #[test]
    fn table_cells_honour_header_attr() {
        let tree = doc(json!({
            "type": "doc",
            "content": [{"type": "table", "content": [
                {"type": "tableRow", "content": [
                    {"type": "tableCell", "attrs": {"header": true}, "content": [{"type": "text", "text": "h"}]},
                    {"type": "tableCell", "content": [{"type": "text", "text": "d"}]}
                ]}
            ]}]
        }));
        let html = generate_email_html(&tree, "t", "s");
        assert!(html.contains("<th>h</th>"));
        assert!(html.contains("<td>d</td>"));
    }

    #[test]
    fn unknown_nodes_recurse_into_children() {
        let tree = doc(json!({
            "type": "doc",
            "content": [{"type": "callout", "content": [
                {"type": "paragraph", "content": [{"type": "text", "text": "inside"}]}
            ]}]
        }));
        let html = generate_email_html(&tree, "t", "s");
        assert!(html.contains("<p>inside</p>"));
    }

    #[test]
    fn pathological_nesting_falls_back_instead_of_overflowing() {
        let mut node = json!({"type": "paragraph", "content": [{"type": "text", "text": "deep"}]});
        for _ in 0..(MAX_RENDER_DEPTH + 8) {
            node = json!({"type": "blockquote", "content": [node]});
        }
        let tree = doc(json!({"type": "doc", "content": [node]}));
        let html = generate_email_html(&tree, "t", "s");
        assert!(html.contains(RENDER_FALLBACK));
        assert!(!html.contains("deep"));
    }

    #[test]
    fn hard_break_and_rule_render_void_tags() {
        let tree = doc(json!({
            "type": "doc",
            "content": [
                {"type": "paragraph", "content": [
                    {"type": "text", "text": "a"},
                    {"type": "hardBreak"},
                    {"type": "text", "text": "b"}
                ]},
                {"type": "horizontalRule"}
            ]
        }));
        let html = generate_email_html(&tree, "t", "s");
        assert!(html.contains("a<br>b"));
        assert!(html.contains("<hr>"));
    }
}
