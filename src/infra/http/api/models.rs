//! Request and query payloads accepted by the admin API.

use serde::Deserialize;
use uuid::Uuid;

use crate::application::assistant::ChatMessage;
use crate::domain::document::DocumentNode;
use crate::domain::types::{IssueStatus, SubscriberStatus};

#[derive(Debug, Deserialize)]
pub struct NewsletterCreateRequest {
    pub title: String,
    pub sender_name: String,
    pub sender_email: String,
    pub base_url: String,
}

#[derive(Debug, Deserialize)]
pub struct NewsletterUpdateRequest {
    pub title: String,
    pub sender_name: String,
    pub sender_email: String,
    pub base_url: String,
}

#[derive(Debug, Deserialize)]
pub struct SubscriberListQuery {
    pub newsletter_id: Option<Uuid>,
    pub status: Option<SubscriberStatus>,
    pub search: Option<String>,
    pub limit: Option<u32>,
    pub cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SubscriberCreateRequest {
    pub newsletter_id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub status: Option<SubscriberStatus>,
}

#[derive(Debug, Deserialize)]
pub struct SubscriberUpdateRequest {
    pub email: Option<String>,
    pub name: Option<String>,
    pub status: Option<SubscriberStatus>,
}

#[derive(Debug, Deserialize)]
pub struct IssueListQuery {
    pub newsletter_id: Option<Uuid>,
    pub status: Option<IssueStatus>,
    pub limit: Option<u32>,
    pub cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct IssueCreateRequest {
    pub newsletter_id: Uuid,
    pub subject: String,
    pub body: DocumentNode,
}

#[derive(Debug, Deserialize)]
pub struct IssueUpdateRequest {
    pub subject: String,
    pub body: DocumentNode,
}

#[derive(Debug, Deserialize)]
pub struct AssistantChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
}
