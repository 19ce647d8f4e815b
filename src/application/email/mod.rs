//! Email rendering pipeline: document tree to HTML and plain-text bodies.
//!
//! Everything in this module is a pure, synchronous transform. The functions
//! never fail outward: malformed trees degrade to empty output and an
//! internal rendering failure (only possible through the recursion depth
//! guard) is replaced by a fixed fallback paragraph.

mod html;
mod template;
mod text;
mod unsubscribe;

pub use html::generate_email_html;
pub use template::{UNSUBSCRIBE_SLOT, render_email_shell};
pub use text::generate_plain_text_email;
pub use unsubscribe::add_unsubscribe_link;

use thiserror::Error;

/// Maximum nesting depth a document may reach before rendering bails out to
/// the fallback. Editors produce trees a handful of levels deep; anything
/// past this bound is a malformed or adversarial payload.
pub(crate) const MAX_RENDER_DEPTH: usize = 64;

#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum RenderError {
    #[error("document nesting exceeds {MAX_RENDER_DEPTH} levels")]
    TooDeep,
}
