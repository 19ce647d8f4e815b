use std::sync::Arc;

use thiserror::Error;
use url::Url;
use uuid::Uuid;

use crate::application::repos::{
    CreateNewsletterParams, NewslettersRepo, RepoError, UpdateNewsletterParams,
};
use crate::domain::email_address::normalize_email;
use crate::domain::entities::NewsletterRecord;

#[derive(Debug, Error)]
pub enum NewsletterError {
    #[error("{0}")]
    ConstraintViolation(&'static str),
    #[error("newsletter not found")]
    NotFound,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone)]
pub struct CreateNewsletterCommand {
    pub title: String,
    pub sender_name: String,
    pub sender_email: String,
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct UpdateNewsletterCommand {
    pub id: Uuid,
    pub title: String,
    pub sender_name: String,
    pub sender_email: String,
    pub base_url: String,
}

#[derive(Clone)]
pub struct NewsletterService {
    repo: Arc<dyn NewslettersRepo>,
}

impl NewsletterService {
    pub fn new(repo: Arc<dyn NewslettersRepo>) -> Self {
        Self { repo }
    }

    pub async fn list(&self) -> Result<Vec<NewsletterRecord>, NewsletterError> {
        self.repo
            .list_newsletters()
            .await
            .map_err(NewsletterError::from)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<NewsletterRecord>, NewsletterError> {
        self.repo
            .find_newsletter(id)
            .await
            .map_err(NewsletterError::from)
    }

    pub async fn get(&self, id: Uuid) -> Result<NewsletterRecord, NewsletterError> {
        self.find_by_id(id)
            .await?
            .ok_or(NewsletterError::NotFound)
    }

    pub async fn create(
        &self,
        command: CreateNewsletterCommand,
    ) -> Result<NewsletterRecord, NewsletterError> {
        let CreateNewsletterCommand {
            title,
            sender_name,
            sender_email,
            base_url,
        } = command;

        let title = non_empty(title, "title is required")?;
        let sender_name = non_empty(sender_name, "sender name is required")?;
        let sender_email = validate_email(sender_email)?;
        let base_url = validate_base_url(base_url)?;

        self.repo
            .create_newsletter(CreateNewsletterParams {
                title,
                sender_name,
                sender_email,
                base_url,
            })
            .await
            .map_err(NewsletterError::from)
    }

    pub async fn update(
        &self,
        command: UpdateNewsletterCommand,
    ) -> Result<NewsletterRecord, NewsletterError> {
        let UpdateNewsletterCommand {
            id,
            title,
            sender_name,
            sender_email,
            base_url,
        } = command;

        let title = non_empty(title, "title is required")?;
        let sender_name = non_empty(sender_name, "sender name is required")?;
        let sender_email = validate_email(sender_email)?;
        let base_url = validate_base_url(base_url)?;

        match self
            .repo
            .update_newsletter(UpdateNewsletterParams {
                id,
                title,
                sender_name,
                sender_email,
                base_url,
            })
            .await
        {
            Ok(record) => Ok(record),
            Err(RepoError::NotFound) => Err(NewsletterError::NotFound),
            Err(err) => Err(NewsletterError::Repo(err)),
        }
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), NewsletterError> {
        self.repo
            .delete_newsletter(id)
            .await
            .map_err(NewsletterError::from)
    }
}

fn non_empty(value: String, message: &'static str) -> Result<String, NewsletterError> {
    let trimmed = value.trim().to_string();
    if trimmed.is_empty() {
        return Err(NewsletterError::ConstraintViolation(message));
    }
    Ok(trimmed)
}

fn validate_email(value: String) -> Result<String, NewsletterError> {
    normalize_email(&value)
        .map_err(|_| NewsletterError::ConstraintViolation("invalid sender email address"))
}

fn validate_base_url(value: String) -> Result<String, NewsletterError> {
    let trimmed = value.trim().trim_end_matches('/').to_string();
    let parsed = Url::parse(&trimmed)
        .map_err(|_| NewsletterError::ConstraintViolation("base url must be a valid URL"))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(NewsletterError::ConstraintViolation(
            "base url must use http or https",
        ));
    }
    Ok(trimmed)
}
