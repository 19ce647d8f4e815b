//! End-to-end rendering: editor JSON in, both email parts out, with
//! per-subscriber unsubscribe footers applied last.

use lettera::application::email::{
    UNSUBSCRIBE_SLOT, add_unsubscribe_link, generate_email_html, generate_plain_text_email,
};
use lettera::application::issues::render_issue;
use lettera::domain::document::DocumentNode;
use lettera::domain::entities::IssueRecord;
use lettera::domain::types::IssueStatus;
use time::OffsetDateTime;
use uuid::Uuid;

fn sample_document() -> DocumentNode {
    serde_json::from_value(serde_json::json!({
        "type": "doc",
        "content": [
            { "type": "heading", "attrs": { "level": 2 }, "content": [
                { "type": "text", "text": "This week" }
            ]},
            { "type": "paragraph", "content": [
                { "type": "text", "text": "Hello " },
                { "type": "text", "text": "world", "marks": [
                    { "type": "bold" }, { "type": "italic" }
                ]},
                { "type": "text", "text": "." }
            ]},
            { "type": "bulletList", "content": [
                { "type": "listItem", "content": [
                    { "type": "paragraph", "content": [
                        { "type": "text", "text": "first" }
                    ]}
                ]},
                { "type": "listItem", "content": [
                    { "type": "paragraph", "content": [
                        { "type": "text", "text": "second" }
                    ]}
                ]}
            ]},
            { "type": "paragraph", "content": [
                { "type": "text", "text": "Read more", "marks": [
                    { "type": "link", "attrs": { "href": "https://example.com/post" } }
                ]}
            ]}
        ]
    }))
    .expect("sample document deserializes")
}

#[test]
fn html_part_renders_full_email_document() {
    let html = generate_email_html(&sample_document(), "Weekly Digest", "Ada");

    assert!(html.starts_with("<!DOCTYPE html>"));
    assert!(html.contains("<h2>This week</h2>"));
    // First mark in the array binds tightest.
    assert!(html.contains("<em><strong>world</strong></em>"));
    assert!(html.contains("<li>first</li>"));
    assert!(html.contains("<a href=\"https://example.com/post\""));
    assert!(html.contains("Sent by Ada"));
    assert!(html.contains(UNSUBSCRIBE_SLOT));
}

#[test]
fn text_part_renders_readable_scaffold() {
    let text = generate_plain_text_email(&sample_document(), "Weekly Digest", "Ada");

    assert!(text.starts_with("Weekly Digest\n=============\n\n"));
    assert!(text.contains("Hello world."));
    assert!(text.contains("* first\n* second"));
    assert!(text.contains("Read more (https://example.com/post)"));
    assert!(text.ends_with("--\nSent by Ada"));
    assert!(!text.contains('<'));
}

#[test]
fn unsubscribe_links_are_per_subscriber() {
    let html = generate_email_html(&sample_document(), "Weekly Digest", "Ada");
    let text = generate_plain_text_email(&sample_document(), "Weekly Digest", "Ada");

    let html_a = add_unsubscribe_link(&html, "sub-a", "https://news.example.com/", false);
    let html_b = add_unsubscribe_link(&html, "sub-b", "https://news.example.com/", false);
    let text_a = add_unsubscribe_link(&text, "sub-a", "https://news.example.com/", true);

    assert!(html_a.contains("https://news.example.com/unsubscribe?id=sub-a"));
    assert!(html_b.contains("https://news.example.com/unsubscribe?id=sub-b"));
    assert!(!html_a.contains("sub-b"));
    // The slot is consumed by injection.
    assert!(!html_a.contains(UNSUBSCRIBE_SLOT));
    assert!(text_a.ends_with("To unsubscribe, visit: https://news.example.com/unsubscribe?id=sub-a"));
}

#[test]
fn render_issue_produces_both_parts_with_subject_as_title() {
    let now = OffsetDateTime::now_utc();
    let issue = IssueRecord {
        id: Uuid::new_v4(),
        newsletter_id: Uuid::new_v4(),
        subject: "Issue #42".to_string(),
        body: sample_document(),
        status: IssueStatus::Draft,
        sent_at: None,
        recipient_count: 0,
        created_at: now,
        updated_at: now,
    };

    let rendered = render_issue(&issue, "Ada");

    assert_eq!(rendered.subject, "Issue #42");
    assert!(rendered.html.contains("<h1>Issue #42</h1>"));
    assert!(rendered.text.starts_with("Issue #42\n"));
}

#[test]
fn malformed_content_falls_back_instead_of_erroring() {
    // A single node nested beyond the depth guard.
    let mut node = serde_json::json!({ "type": "paragraph", "content": [] });
    for _ in 0..200 {
        node = serde_json::json!({ "type": "paragraph", "content": [node] });
    }
    let document: DocumentNode = serde_json::from_value(serde_json::json!({
        "type": "doc",
        "content": [node]
    }))
    .expect("deep document deserializes");

    let html = generate_email_html(&document, "Weekly Digest", "Ada");
    let text = generate_plain_text_email(&document, "Weekly Digest", "Ada");

    assert!(html.contains("There was an error rendering this newsletter content."));
    assert!(text.contains("There was an error rendering this newsletter content."));
}
