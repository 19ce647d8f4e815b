//! Responsive email document shell.
//!
//! Most email clients strip `<style>` blocks and ignore external CSS, so the
//! structural styles are inlined and the head block only carries the
//! small-screen media query overrides clients that honour `<style>` will use.

/// Named insertion point for the unsubscribe footer. The injector replaces
/// this marker, so injection never depends on the exact tag sequence of the
/// shell markup.
pub const UNSUBSCRIBE_SLOT: &str = "<!-- lettera:unsubscribe -->";

const ORGANIZATION_ADDRESS: &str = "Lettera, 1234 Street Rd, Suite 1000, San Francisco, CA 94107";

/// Wrap already-rendered inner HTML in the complete email document shell:
/// doctype, responsive head styles, hidden preview text, a centered
/// fixed-width container and a footer carrying the organization address, the
/// "Powered by" credit and the unsubscribe insertion marker.
pub fn render_email_shell(preview_text: &str, inner_html: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>{preview_text}</title>
  <style>
    body {{
      margin: 0;
      padding: 0;
      font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, 'Helvetica Neue', Arial, sans-serif;
      font-size: 16px;
      line-height: 1.5;
      color: #333;
      background-color: #f9f9f9;
    }}
    .container {{
      max-width: 600px;
      margin: 0 auto;
      padding: 20px;
      background-color: #ffffff;
    }}
    h1, h2, h3, h4, h5, h6 {{
      margin-top: 0;
      color: #222;
      font-weight: 600;
    }}
    p {{
      margin-bottom: 1em;
    }}
    img {{
      max-width: 100%;
      height: auto;
    }}
    a {{
      color: #0070f3;
      text-decoration: underline;
    }}
    ul, ol {{
      padding-left: 24px;
    }}
    @media only screen and (max-width: 480px) {{
      .container {{
        padding: 12px;
      }}
      h1 {{
        font-size: 22px;
      }}
      body, p {{
        font-size: 14px;
      }}
    }}
  </style>
</head>
<body>
  <span style="color: transparent; display: none; height: 0; max-height: 0; max-width: 0; opacity: 0; overflow: hidden; visibility: hidden; width: 0;">{preview_text}</span>
  <div class="container">
{inner_html}
    <div style="clear: both; margin-top: 10px; padding-top: 20px; border-top: 1px solid #eaeaea; font-size: 12px; color: #999; text-align: center;">
      <p>{ORGANIZATION_ADDRESS}</p>
      <p>Powered by Lettera</p>
    </div>
    {UNSUBSCRIBE_SLOT}
  </div>
</body>
</html>"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shell_is_a_complete_document() {
        let html = render_email_shell("Weekly digest", "<p>hi</p>");
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<html lang=\"en\">"));
        assert!(html.contains("</html>"));
        assert!(html.contains("<p>hi</p>"));
    }

    #[test]
    fn shell_carries_preview_text_and_footer() {
        let html = render_email_shell("Weekly digest", "");
        assert!(html.contains("Weekly digest"));
        assert!(html.contains(ORGANIZATION_ADDRESS));
        assert!(html.contains("Powered by Lettera"));
    }

    #[test]
    fn unsubscribe_slot_sits_before_closing_body() {
        let html = render_email_shell("p", "");
        let slot = html.find(UNSUBSCRIBE_SLOT).expect("slot present");
        let body = html.rfind("</body>").expect("body close present");
        assert!(slot < body);
    }
}
