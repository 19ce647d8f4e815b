//! Shared cursor pagination helpers.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum PaginationError {
    #[error("invalid cursor: {0}")]
    InvalidCursor(String),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct SubscriberCursorPayload {
    created_at: OffsetDateTime,
    id: Uuid,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct IssueCursorPayload {
    primary_time: OffsetDateTime,
    id: Uuid,
}

/// Cursor for paginating subscribers ordered by signup recency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriberCursor {
    created_at: OffsetDateTime,
    id: Uuid,
}

impl SubscriberCursor {
    pub fn new(created_at: OffsetDateTime, id: Uuid) -> Self {
        Self { created_at, id }
    }

    pub fn created_at(&self) -> OffsetDateTime {
        self.created_at
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn encode(&self) -> String {
        let payload = SubscriberCursorPayload {
            created_at: self.created_at,
            id: self.id,
        };
        let serialized = serde_json::to_vec(&payload)
            .expect("serializing subscriber cursor payload should succeed");
        URL_SAFE_NO_PAD.encode(serialized)
    }

    pub fn decode(cursor: &str) -> Result<Self, PaginationError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(cursor)
            .map_err(|err| PaginationError::InvalidCursor(err.to_string()))?;
        let payload: SubscriberCursorPayload = serde_json::from_slice(&bytes)
            .map_err(|err| PaginationError::InvalidCursor(err.to_string()))?;
        Ok(Self {
            created_at: payload.created_at,
            id: payload.id,
        })
    }
}

/// Cursor for paginating issues by their primary time ordering
/// (`sent_at` for sent issues, `updated_at` otherwise).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IssueCursor {
    primary_time: OffsetDateTime,
    id: Uuid,
}

impl IssueCursor {
    pub fn new(primary_time: OffsetDateTime, id: Uuid) -> Self {
        Self { primary_time, id }
    }

    pub fn primary_time(&self) -> OffsetDateTime {
        self.primary_time
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn encode(&self) -> String {
        let payload = IssueCursorPayload {
            primary_time: self.primary_time,
            id: self.id,
        };
        let serialized =
            serde_json::to_vec(&payload).expect("serializing issue cursor payload should succeed");
        URL_SAFE_NO_PAD.encode(serialized)
    }

    pub fn decode(cursor: &str) -> Result<Self, PaginationError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(cursor)
            .map_err(|err| PaginationError::InvalidCursor(err.to_string()))?;
        let payload: IssueCursorPayload = serde_json::from_slice(&bytes)
            .map_err(|err| PaginationError::InvalidCursor(err.to_string()))?;
        Ok(Self {
            primary_time: payload.primary_time,
            id: payload.id,
        })
    }
}

/// Cursor-aware pagination request.
#[derive(Debug, Clone, Copy)]
pub struct PageRequest<C> {
    pub limit: u32,
    pub cursor: Option<C>,
}

impl<C> PageRequest<C> {
    pub fn new(limit: u32, cursor: Option<C>) -> Self {
        Self { limit, cursor }
    }
}

/// Cursor-aware page result.
#[derive(Debug, Clone, Serialize)]
pub struct CursorPage<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<String>,
}

impl<T> CursorPage<T> {
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            next_cursor: None,
        }
    }

    pub fn new(items: Vec<T>, next_cursor: Option<String>) -> Self {
        Self { items, next_cursor }
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    #[test]
    fn subscriber_cursor_round_trips() {
        let cursor = SubscriberCursor::new(datetime!(2026-01-15 10:30 UTC), Uuid::new_v4());
        let decoded = SubscriberCursor::decode(&cursor.encode()).expect("decodes");
        assert_eq!(decoded, cursor);
    }

    #[test]
    fn garbage_cursor_is_rejected() {
        assert!(matches!(
            SubscriberCursor::decode("not a cursor"),
            Err(PaginationError::InvalidCursor(_))
        ));
        assert!(matches!(
            IssueCursor::decode("bm90IGpzb24"),
            Err(PaginationError::InvalidCursor(_))
        ));
    }
}
