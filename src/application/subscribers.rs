use std::sync::Arc;

use metrics::counter;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::application::pagination::{CursorPage, PageRequest, SubscriberCursor};
use crate::application::repos::{
    CreateSubscriberParams, NewslettersRepo, RepoError, SubscriberQueryFilter, SubscribersRepo,
    UpdateSubscriberParams,
};
use crate::domain::email_address::normalize_email;
use crate::domain::entities::SubscriberRecord;
use crate::domain::types::SubscriberStatus;

#[derive(Debug, Error)]
pub enum SubscriberError {
    #[error("{0}")]
    ConstraintViolation(&'static str),
    #[error("subscriber already exists for this newsletter")]
    Duplicate,
    #[error("subscriber not found")]
    NotFound,
    #[error("newsletter not found")]
    NewsletterNotFound,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone)]
pub struct CreateSubscriberCommand {
    pub newsletter_id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub status: SubscriberStatus,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateSubscriberCommand {
    pub email: Option<String>,
    pub name: Option<String>,
    pub status: Option<SubscriberStatus>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubscriberStatusCounts {
    pub total: u64,
    pub active: u64,
    pub unsubscribed: u64,
    pub pending: u64,
}

#[derive(Clone)]
pub struct SubscriberService {
    subscribers: Arc<dyn SubscribersRepo>,
    newsletters: Arc<dyn NewslettersRepo>,
}

impl SubscriberService {
    pub fn new(
        subscribers: Arc<dyn SubscribersRepo>,
        newsletters: Arc<dyn NewslettersRepo>,
    ) -> Self {
        Self {
            subscribers,
            newsletters,
        }
    }

    pub async fn list(
        &self,
        filter: &SubscriberQueryFilter,
        page: PageRequest<SubscriberCursor>,
    ) -> Result<CursorPage<SubscriberRecord>, SubscriberError> {
        self.subscribers
            .list_subscribers(filter, page)
            .await
            .map_err(SubscriberError::from)
    }

    pub async fn status_counts(
        &self,
        filter: &SubscriberQueryFilter,
    ) -> Result<SubscriberStatusCounts, SubscriberError> {
        let count_with = |status: Option<SubscriberStatus>| {
            let mut scoped = filter.clone();
            scoped.status = status;
            scoped
        };

        let total = self.subscribers.count_subscribers(&count_with(None)).await?;
        let active = self
            .subscribers
            .count_subscribers(&count_with(Some(SubscriberStatus::Active)))
            .await?;
        let unsubscribed = self
            .subscribers
            .count_subscribers(&count_with(Some(SubscriberStatus::Unsubscribed)))
            .await?;
        let pending = self
            .subscribers
            .count_subscribers(&count_with(Some(SubscriberStatus::Pending)))
            .await?;

        Ok(SubscriberStatusCounts {
            total,
            active,
            unsubscribed,
            pending,
        })
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<SubscriberRecord>, SubscriberError> {
        self.subscribers
            .find_subscriber(id)
            .await
            .map_err(SubscriberError::from)
    }

    /// Create a subscriber, rejecting duplicates within the same newsletter.
    pub async fn subscribe(
        &self,
        command: CreateSubscriberCommand,
    ) -> Result<SubscriberRecord, SubscriberError> {
        let CreateSubscriberCommand {
            newsletter_id,
            email,
            name,
            status,
        } = command;

        let email = normalize_email(&email)
            .map_err(|_| SubscriberError::ConstraintViolation("invalid email address"))?;
        let name = name.and_then(|value| {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        });

        if self
            .newsletters
            .find_newsletter(newsletter_id)
            .await?
            .is_none()
        {
            return Err(SubscriberError::NewsletterNotFound);
        }

        if self
            .subscribers
            .find_subscriber_by_email(newsletter_id, &email)
            .await?
            .is_some()
        {
            return Err(SubscriberError::Duplicate);
        }

        let record = match self
            .subscribers
            .create_subscriber(CreateSubscriberParams {
                newsletter_id,
                email,
                name,
                status,
            })
            .await
        {
            Ok(record) => record,
            // Concurrent signup can still race past the pre-check; the unique
            // index is authoritative.
            Err(RepoError::Duplicate { .. }) => return Err(SubscriberError::Duplicate),
            Err(err) => return Err(SubscriberError::Repo(err)),
        };

        counter!("lettera_subscribe_total").increment(1);
        Ok(record)
    }

    pub async fn update(
        &self,
        id: Uuid,
        command: UpdateSubscriberCommand,
    ) -> Result<SubscriberRecord, SubscriberError> {
        let email = match command.email {
            Some(email) => Some(
                normalize_email(&email)
                    .map_err(|_| SubscriberError::ConstraintViolation("invalid email address"))?,
            ),
            None => None,
        };

        match self
            .subscribers
            .update_subscriber(
                id,
                UpdateSubscriberParams {
                    email,
                    name: command.name,
                    status: command.status,
                },
            )
            .await
        {
            Ok(record) => Ok(record),
            Err(RepoError::NotFound) => Err(SubscriberError::NotFound),
            Err(RepoError::Duplicate { .. }) => Err(SubscriberError::Duplicate),
            Err(err) => Err(SubscriberError::Repo(err)),
        }
    }

    /// Flip a subscriber to `unsubscribed`. Idempotent: repeated calls keep
    /// the terminal status.
    pub async fn unsubscribe(&self, id: Uuid) -> Result<SubscriberRecord, SubscriberError> {
        match self
            .subscribers
            .set_subscriber_status(id, SubscriberStatus::Unsubscribed)
            .await
        {
            Ok(record) => {
                counter!("lettera_unsubscribe_total").increment(1);
                Ok(record)
            }
            Err(RepoError::NotFound) => Err(SubscriberError::NotFound),
            Err(err) => Err(SubscriberError::Repo(err)),
        }
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), SubscriberError> {
        self.subscribers
            .delete_subscriber(id)
            .await
            .map_err(SubscriberError::from)
    }
}
