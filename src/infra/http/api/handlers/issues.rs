use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use uuid::Uuid;

use crate::application::issues::{CreateIssueCommand, UpdateIssueCommand};
use crate::application::pagination::{IssueCursor, PageRequest};
use crate::application::repos::IssueQueryFilter;

use super::{delivery_to_api, issue_to_api};
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::models::{IssueCreateRequest, IssueListQuery, IssueUpdateRequest};
use crate::infra::http::api::state::ApiState;

const DEFAULT_PAGE_SIZE: u32 = 20;

pub async fn list_issues(
    State(state): State<ApiState>,
    Query(query): Query<IssueListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, 100);

    let cursor = query
        .cursor
        .as_deref()
        .map(IssueCursor::decode)
        .transpose()
        .map_err(|err| ApiError::bad_request("invalid cursor", Some(err.to_string())))?;

    let filter = IssueQueryFilter {
        newsletter_id: query.newsletter_id,
        status: query.status,
    };

    let page = state
        .issues
        .list(&filter, PageRequest::new(limit, cursor))
        .await
        .map_err(issue_to_api)?;

    Ok(Json(page))
}

pub async fn get_issue(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let issue = state.issues.find_by_id(id).await.map_err(issue_to_api)?;

    match issue {
        Some(issue) => Ok(Json(issue)),
        None => Err(ApiError::not_found("issue not found")),
    }
}

pub async fn create_issue(
    State(state): State<ApiState>,
    Json(payload): Json<IssueCreateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let command = CreateIssueCommand {
        newsletter_id: payload.newsletter_id,
        subject: payload.subject,
        body: payload.body,
    };

    let issue = state.issues.create(command).await.map_err(issue_to_api)?;

    Ok((StatusCode::CREATED, Json(issue)))
}

pub async fn update_issue(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<IssueUpdateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let command = UpdateIssueCommand {
        id,
        subject: payload.subject,
        body: payload.body,
    };

    let issue = state.issues.update(command).await.map_err(issue_to_api)?;

    Ok(Json(issue))
}

/// Render both email parts without touching delivery state.
pub async fn preview_issue(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let rendered = state.issues.preview(id).await.map_err(issue_to_api)?;
    Ok(Json(rendered))
}

pub async fn send_issue(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let report = state
        .delivery
        .send_issue(id)
        .await
        .map_err(delivery_to_api)?;

    Ok(Json(report))
}

pub async fn delete_issue(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.issues.delete(id).await.map_err(issue_to_api)?;

    Ok(StatusCode::NO_CONTENT)
}
