//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::pagination::{
    CursorPage, IssueCursor, PageRequest, PaginationError, SubscriberCursor,
};
use crate::domain::document::DocumentNode;
use crate::domain::entities::{IssueRecord, NewsletterRecord, SubscriberRecord};
use crate::domain::types::{IssueStatus, SubscriberStatus};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("database timeout")]
    Timeout,
    #[error(transparent)]
    Pagination(#[from] PaginationError),
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct CreateNewsletterParams {
    pub title: String,
    pub sender_name: String,
    pub sender_email: String,
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct UpdateNewsletterParams {
    pub id: Uuid,
    pub title: String,
    pub sender_name: String,
    pub sender_email: String,
    pub base_url: String,
}

#[async_trait]
pub trait NewslettersRepo: Send + Sync {
    async fn list_newsletters(&self) -> Result<Vec<NewsletterRecord>, RepoError>;
    async fn find_newsletter(&self, id: Uuid) -> Result<Option<NewsletterRecord>, RepoError>;
    async fn create_newsletter(
        &self,
        params: CreateNewsletterParams,
    ) -> Result<NewsletterRecord, RepoError>;
    async fn update_newsletter(
        &self,
        params: UpdateNewsletterParams,
    ) -> Result<NewsletterRecord, RepoError>;
    async fn delete_newsletter(&self, id: Uuid) -> Result<(), RepoError>;
}

#[derive(Debug, Clone, Default)]
pub struct SubscriberQueryFilter {
    pub newsletter_id: Option<Uuid>,
    pub status: Option<SubscriberStatus>,
    pub search: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreateSubscriberParams {
    pub newsletter_id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub status: SubscriberStatus,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateSubscriberParams {
    pub email: Option<String>,
    pub name: Option<String>,
    pub status: Option<SubscriberStatus>,
}

#[async_trait]
pub trait SubscribersRepo: Send + Sync {
    async fn list_subscribers(
        &self,
        filter: &SubscriberQueryFilter,
        page: PageRequest<SubscriberCursor>,
    ) -> Result<CursorPage<SubscriberRecord>, RepoError>;
    async fn count_subscribers(&self, filter: &SubscriberQueryFilter) -> Result<u64, RepoError>;
    async fn find_subscriber(&self, id: Uuid) -> Result<Option<SubscriberRecord>, RepoError>;
    async fn find_subscriber_by_email(
        &self,
        newsletter_id: Uuid,
        email: &str,
    ) -> Result<Option<SubscriberRecord>, RepoError>;
    /// All `active` subscribers of a newsletter, for delivery fan-out.
    async fn list_active_subscribers(
        &self,
        newsletter_id: Uuid,
    ) -> Result<Vec<SubscriberRecord>, RepoError>;
    async fn create_subscriber(
        &self,
        params: CreateSubscriberParams,
    ) -> Result<SubscriberRecord, RepoError>;
    async fn update_subscriber(
        &self,
        id: Uuid,
        params: UpdateSubscriberParams,
    ) -> Result<SubscriberRecord, RepoError>;
    async fn set_subscriber_status(
        &self,
        id: Uuid,
        status: SubscriberStatus,
    ) -> Result<SubscriberRecord, RepoError>;
    async fn delete_subscriber(&self, id: Uuid) -> Result<(), RepoError>;
}

#[derive(Debug, Clone, Default)]
pub struct IssueQueryFilter {
    pub newsletter_id: Option<Uuid>,
    pub status: Option<IssueStatus>,
}

#[derive(Debug, Clone)]
pub struct CreateIssueParams {
    pub newsletter_id: Uuid,
    pub subject: String,
    pub body: DocumentNode,
}

#[derive(Debug, Clone)]
pub struct UpdateIssueParams {
    pub id: Uuid,
    pub subject: String,
    pub body: DocumentNode,
}

#[async_trait]
pub trait IssuesRepo: Send + Sync {
    async fn list_issues(
        &self,
        filter: &IssueQueryFilter,
        page: PageRequest<IssueCursor>,
    ) -> Result<CursorPage<IssueRecord>, RepoError>;
    async fn find_issue(&self, id: Uuid) -> Result<Option<IssueRecord>, RepoError>;
    async fn create_issue(&self, params: CreateIssueParams) -> Result<IssueRecord, RepoError>;
    async fn update_issue(&self, params: UpdateIssueParams) -> Result<IssueRecord, RepoError>;
    /// Atomically flip a `draft` issue to `sent` and return the claimed
    /// record. `None` means the issue does not exist or was already claimed,
    /// so at most one caller ever wins the claim.
    async fn claim_issue(&self, id: Uuid) -> Result<Option<IssueRecord>, RepoError>;
    async fn mark_issue_sent(
        &self,
        id: Uuid,
        sent_at: OffsetDateTime,
        recipient_count: i32,
    ) -> Result<IssueRecord, RepoError>;
    async fn delete_issue(&self, id: Uuid) -> Result<(), RepoError>;
}
