//! Email address normalization.
//!
//! Deliberately shallow validation: the single source of truth for address
//! validity is the receiving mail server, so this only rejects shapes that
//! can never be delivered and canonicalizes case for duplicate detection.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EmailAddressError {
    #[error("email address is empty")]
    Empty,
    #[error("email address `{input}` is malformed")]
    Malformed { input: String },
}

/// Trim, lowercase and shape-check an address.
pub fn normalize_email(input: &str) -> Result<String, EmailAddressError> {
    let trimmed = input.trim().to_lowercase();
    if trimmed.is_empty() {
        return Err(EmailAddressError::Empty);
    }

    let mut parts = trimmed.splitn(2, '@');
    let local = parts.next().unwrap_or_default();
    let domain = parts.next().unwrap_or_default();
    if local.is_empty()
        || domain.is_empty()
        || !domain.contains('.')
        || domain.contains('@')
        || trimmed.contains(char::is_whitespace)
    {
        return Err(EmailAddressError::Malformed {
            input: input.trim().to_string(),
        });
    }

    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_and_canonicalizes_ordinary_addresses() {
        assert_eq!(
            normalize_email("  Reader@Example.COM "),
            Ok("reader@example.com".to_string())
        );
    }

    #[test]
    fn rejects_undeliverable_shapes() {
        assert_eq!(normalize_email("   "), Err(EmailAddressError::Empty));
        for bad in ["plain", "a@b", "@example.com", "a@@example.com", "a b@example.com"] {
            assert!(normalize_email(bad).is_err(), "accepted `{bad}`");
        }
    }
}
