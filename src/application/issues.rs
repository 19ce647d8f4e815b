use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::application::email::{generate_email_html, generate_plain_text_email};
use crate::application::pagination::{CursorPage, IssueCursor, PageRequest};
use crate::application::repos::{
    CreateIssueParams, IssueQueryFilter, IssuesRepo, NewslettersRepo, RepoError, UpdateIssueParams,
};
use crate::domain::document::{DocumentNode, NodeKind};
use crate::domain::entities::IssueRecord;
use crate::domain::types::IssueStatus;

#[derive(Debug, Error)]
pub enum IssueError {
    #[error("{0}")]
    ConstraintViolation(&'static str),
    #[error("issue not found")]
    NotFound,
    #[error("newsletter not found")]
    NewsletterNotFound,
    #[error("issue has already been sent")]
    AlreadySent,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone)]
pub struct CreateIssueCommand {
    pub newsletter_id: Uuid,
    pub subject: String,
    pub body: DocumentNode,
}

#[derive(Debug, Clone)]
pub struct UpdateIssueCommand {
    pub id: Uuid,
    pub subject: String,
    pub body: DocumentNode,
}

/// Both rendered email parts for an issue, as handed to the mailer.
#[derive(Debug, Clone, Serialize)]
pub struct RenderedIssue {
    pub subject: String,
    pub html: String,
    pub text: String,
}

#[derive(Clone)]
pub struct IssueService {
    issues: Arc<dyn IssuesRepo>,
    newsletters: Arc<dyn NewslettersRepo>,
}

impl IssueService {
    pub fn new(issues: Arc<dyn IssuesRepo>, newsletters: Arc<dyn NewslettersRepo>) -> Self {
        Self {
            issues,
            newsletters,
        }
    }

    pub async fn list(
        &self,
        filter: &IssueQueryFilter,
        page: PageRequest<IssueCursor>,
    ) -> Result<CursorPage<IssueRecord>, IssueError> {
        self.issues
            .list_issues(filter, page)
            .await
            .map_err(IssueError::from)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<IssueRecord>, IssueError> {
        self.issues.find_issue(id).await.map_err(IssueError::from)
    }

    pub async fn get(&self, id: Uuid) -> Result<IssueRecord, IssueError> {
        self.find_by_id(id).await?.ok_or(IssueError::NotFound)
    }

    pub async fn create(&self, command: CreateIssueCommand) -> Result<IssueRecord, IssueError> {
        let CreateIssueCommand {
            newsletter_id,
            subject,
            body,
        } = command;

        let subject = validate_subject(subject)?;
        validate_body(&body)?;

        if self
            .newsletters
            .find_newsletter(newsletter_id)
            .await?
            .is_none()
        {
            return Err(IssueError::NewsletterNotFound);
        }

        self.issues
            .create_issue(CreateIssueParams {
                newsletter_id,
                subject,
                body,
            })
            .await
            .map_err(IssueError::from)
    }

    pub async fn update(&self, command: UpdateIssueCommand) -> Result<IssueRecord, IssueError> {
        let UpdateIssueCommand { id, subject, body } = command;

        let subject = validate_subject(subject)?;
        validate_body(&body)?;

        let existing = self.get(id).await?;
        if existing.status == IssueStatus::Sent {
            return Err(IssueError::AlreadySent);
        }

        match self
            .issues
            .update_issue(UpdateIssueParams { id, subject, body })
            .await
        {
            Ok(record) => Ok(record),
            Err(RepoError::NotFound) => Err(IssueError::NotFound),
            Err(err) => Err(IssueError::Repo(err)),
        }
    }

    /// Render both email parts for an issue without dispatching anything.
    pub async fn preview(&self, id: Uuid) -> Result<RenderedIssue, IssueError> {
        let issue = self.get(id).await?;
        let newsletter = self
            .newsletters
            .find_newsletter(issue.newsletter_id)
            .await?
            .ok_or(IssueError::NewsletterNotFound)?;

        Ok(render_issue(&issue, &newsletter.sender_name))
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), IssueError> {
        self.issues.delete_issue(id).await.map_err(IssueError::from)
    }
}

/// Pure rendering step shared by preview and delivery.
pub fn render_issue(issue: &IssueRecord, sender_name: &str) -> RenderedIssue {
    RenderedIssue {
        subject: issue.subject.clone(),
        html: generate_email_html(&issue.body, &issue.subject, sender_name),
        text: generate_plain_text_email(&issue.body, &issue.subject, sender_name),
    }
}

fn validate_subject(subject: String) -> Result<String, IssueError> {
    let trimmed = subject.trim().to_string();
    if trimmed.is_empty() {
        return Err(IssueError::ConstraintViolation("subject is required"));
    }
    Ok(trimmed)
}

fn validate_body(body: &DocumentNode) -> Result<(), IssueError> {
    if body.kind != NodeKind::Doc {
        return Err(IssueError::ConstraintViolation(
            "issue body must be a document root",
        ));
    }
    Ok(())
}
