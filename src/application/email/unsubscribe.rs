//! Per-subscriber unsubscribe link injection.

use super::template::UNSUBSCRIBE_SLOT;

/// Append a per-subscriber unsubscribe link to a rendered email body.
///
/// Plain text gets a trailing separator and the URL as the final line. HTML
/// gets a styled footer block at the shell's named insertion marker; bodies
/// without the marker (external templates) fall back to insertion before the
/// last `</body>`, and bodies without even that get the block appended, so
/// the link is always present and strictly before the closing body tag
/// whenever one exists.
pub fn add_unsubscribe_link(
    email_content: &str,
    subscriber_id: &str,
    base_url: &str,
    is_plain_text: bool,
) -> String {
    let unsubscribe_url = format!(
        "{}/unsubscribe?id={subscriber_id}",
        base_url.trim_end_matches('/')
    );

    if is_plain_text {
        return format!("{email_content}\n\n---\nTo unsubscribe, visit: {unsubscribe_url}");
    }

    let block = format!(
        r#"<div style="padding-top: 12px; margin-top: 20px; border-top: 1px solid #eaeaea; font-size: 12px; color: #888; text-align: center;">
      <p><a href="{unsubscribe_url}" style="color: #888;">Unsubscribe</a> from future emails.</p>
    </div>"#
    );

    if email_content.contains(UNSUBSCRIBE_SLOT) {
        return email_content.replacen(UNSUBSCRIBE_SLOT, &block, 1);
    }

    match email_content.rfind("</body>") {
        Some(index) => {
            let mut out = String::with_capacity(email_content.len() + block.len() + 1);
            out.push_str(&email_content[..index]);
            out.push_str(&block);
            out.push('\n');
            out.push_str(&email_content[index..]);
            out
        }
        None => format!("{email_content}\n{block}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::email::render_email_shell;

    #[test]
    fn html_link_lands_at_the_named_slot_before_closing_body() {
        let html = render_email_shell("p", "<p>hi</p>");
        let out = add_unsubscribe_link(&html, "42", "https://x.test", false);

        let link = out
            .find("https://x.test/unsubscribe?id=42")
            .expect("link present");
        let body_close = out.rfind("</body>").expect("body close present");
        assert!(link < body_close);
        assert!(!out.contains(UNSUBSCRIBE_SLOT));
    }

    #[test]
    fn html_without_marker_falls_back_to_body_close() {
        let html = "<html><body><p>hi</p></body></html>";
        let out = add_unsubscribe_link(html, "42", "https://x.test", false);

        let link = out
            .find("https://x.test/unsubscribe?id=42")
            .expect("link present");
        assert!(link < out.rfind("</body>").expect("body close present"));
    }

    #[test]
    fn html_without_body_close_still_carries_the_link() {
        let out = add_unsubscribe_link("<p>hi</p>", "42", "https://x.test", false);
        assert!(out.contains("https://x.test/unsubscribe?id=42"));
    }

    #[test]
    fn plain_text_link_is_the_final_line() {
        let out = add_unsubscribe_link("Body text", "42", "https://x.test", true);
        let last = out.lines().last().expect("non-empty output");
        assert_eq!(last, "To unsubscribe, visit: https://x.test/unsubscribe?id=42");
    }

    #[test]
    fn trailing_slash_on_base_url_does_not_double_up() {
        let out = add_unsubscribe_link("x", "7", "https://x.test/", true);
        assert!(out.contains("https://x.test/unsubscribe?id=7"));
        assert!(!out.contains("//unsubscribe"));
    }
}
