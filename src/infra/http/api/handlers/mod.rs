//! Admin API handlers.

mod assistant;
mod issues;
mod newsletters;
mod subscribers;

pub use assistant::{assistant_chat, list_models};
pub use issues::{
    create_issue, delete_issue, get_issue, list_issues, preview_issue, send_issue, update_issue,
};
pub use newsletters::{
    create_newsletter, delete_newsletter, get_newsletter, list_newsletters, update_newsletter,
};
pub use subscribers::{
    create_subscriber, delete_subscriber, get_subscriber, list_subscribers, subscriber_counts,
    update_subscriber,
};

use axum::http::StatusCode;

use crate::application::assistant::AssistantError;
use crate::application::delivery::DeliveryError;
use crate::application::issues::IssueError;
use crate::application::newsletters::NewsletterError;
use crate::application::repos::RepoError;
use crate::application::subscribers::SubscriberError;

use super::error::{ApiError, codes};

pub(super) fn repo_to_api(err: RepoError) -> ApiError {
    match err {
        RepoError::Duplicate { constraint } => {
            ApiError::conflict("Duplicate record", Some(constraint))
        }
        RepoError::Pagination(p) => ApiError::new(
            StatusCode::BAD_REQUEST,
            codes::INVALID_CURSOR,
            "Invalid cursor",
            Some(p.to_string()),
        ),
        RepoError::NotFound => ApiError::not_found("resource not found"),
        RepoError::InvalidInput { message } => ApiError::new(
            StatusCode::BAD_REQUEST,
            codes::INVALID_INPUT,
            "Invalid input",
            Some(message),
        ),
        RepoError::Timeout => ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            codes::DB_TIMEOUT,
            "Database timeout",
            None,
        ),
        RepoError::Persistence(message) => ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            codes::REPO,
            "Persistence error",
            Some(message),
        ),
    }
}

pub(super) fn newsletter_to_api(err: NewsletterError) -> ApiError {
    match err {
        NewsletterError::ConstraintViolation(message) => {
            ApiError::bad_request("Invalid newsletter", Some(message.to_string()))
        }
        NewsletterError::NotFound => ApiError::not_found("newsletter not found"),
        NewsletterError::Repo(repo) => repo_to_api(repo),
    }
}

pub(super) fn subscriber_to_api(err: SubscriberError) -> ApiError {
    match err {
        SubscriberError::ConstraintViolation(message) => {
            ApiError::bad_request("Invalid subscriber", Some(message.to_string()))
        }
        SubscriberError::Duplicate => {
            ApiError::conflict("Subscriber already exists for this newsletter", None)
        }
        SubscriberError::NotFound => ApiError::not_found("subscriber not found"),
        SubscriberError::NewsletterNotFound => ApiError::not_found("newsletter not found"),
        SubscriberError::Repo(repo) => repo_to_api(repo),
    }
}

pub(super) fn issue_to_api(err: IssueError) -> ApiError {
    match err {
        IssueError::ConstraintViolation(message) => {
            ApiError::bad_request("Invalid issue", Some(message.to_string()))
        }
        IssueError::NotFound => ApiError::not_found("issue not found"),
        IssueError::NewsletterNotFound => ApiError::not_found("newsletter not found"),
        IssueError::AlreadySent => ApiError::new(
            StatusCode::CONFLICT,
            codes::ALREADY_SENT,
            "Issue has already been sent",
            None,
        ),
        IssueError::Repo(repo) => repo_to_api(repo),
    }
}

pub(super) fn delivery_to_api(err: DeliveryError) -> ApiError {
    match err {
        DeliveryError::IssueNotFound => ApiError::not_found("issue not found"),
        DeliveryError::NewsletterNotFound => ApiError::not_found("newsletter not found"),
        DeliveryError::AlreadySent => ApiError::new(
            StatusCode::CONFLICT,
            codes::ALREADY_SENT,
            "Issue has already been sent",
            None,
        ),
        DeliveryError::MailerUnconfigured => ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            codes::MAILER_UNCONFIGURED,
            "No mailer is configured",
            None,
        ),
        DeliveryError::Repo(repo) => repo_to_api(repo),
    }
}

pub(super) fn assistant_to_api(err: AssistantError) -> ApiError {
    match err {
        AssistantError::UnknownModel(model) => {
            ApiError::bad_request("Unknown model", Some(model))
        }
        AssistantError::EmptyMessages => {
            ApiError::bad_request("Messages must not be empty", None)
        }
        AssistantError::MissingApiKey(provider) => ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            codes::ASSISTANT,
            "Provider is not configured",
            Some(provider.to_string()),
        ),
        AssistantError::Upstream { status, message } => ApiError::new(
            StatusCode::BAD_GATEWAY,
            codes::UPSTREAM,
            "Provider request was rejected",
            Some(format!("status {status}: {message}")),
        ),
        AssistantError::Transport(message) => ApiError::new(
            StatusCode::BAD_GATEWAY,
            codes::UPSTREAM,
            "Provider request failed",
            Some(message),
        ),
        AssistantError::MalformedResponse => ApiError::new(
            StatusCode::BAD_GATEWAY,
            codes::UPSTREAM,
            "Provider response had an unexpected shape",
            None,
        ),
    }
}
