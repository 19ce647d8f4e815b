//! Domain entities mirrored from persistent storage.

use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::{
    document::DocumentNode,
    types::{IssueStatus, SubscriberStatus},
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewsletterRecord {
    pub id: Uuid,
    pub title: String,
    pub sender_name: String,
    pub sender_email: String,
    /// Public base URL used when building unsubscribe links for this publication.
    pub base_url: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubscriberRecord {
    pub id: Uuid,
    pub newsletter_id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub status: SubscriberStatus,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IssueRecord {
    pub id: Uuid,
    pub newsletter_id: Uuid,
    pub subject: String,
    pub body: DocumentNode,
    pub status: IssueStatus,
    pub sent_at: Option<OffsetDateTime>,
    pub recipient_count: i32,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}
