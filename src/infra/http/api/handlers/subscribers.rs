use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use uuid::Uuid;

use crate::application::pagination::{PageRequest, SubscriberCursor};
use crate::application::repos::SubscriberQueryFilter;
use crate::application::subscribers::{CreateSubscriberCommand, UpdateSubscriberCommand};
use crate::domain::types::SubscriberStatus;

use super::subscriber_to_api;
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::models::{
    SubscriberCreateRequest, SubscriberListQuery, SubscriberUpdateRequest,
};
use crate::infra::http::api::state::ApiState;

const DEFAULT_PAGE_SIZE: u32 = 50;

pub async fn list_subscribers(
    State(state): State<ApiState>,
    Query(query): Query<SubscriberListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, 100);

    let cursor = query
        .cursor
        .as_deref()
        .map(SubscriberCursor::decode)
        .transpose()
        .map_err(|err| ApiError::bad_request("invalid cursor", Some(err.to_string())))?;

    let filter = SubscriberQueryFilter {
        newsletter_id: query.newsletter_id,
        status: query.status,
        search: query.search,
    };

    let page = state
        .subscribers
        .list(&filter, PageRequest::new(limit, cursor))
        .await
        .map_err(subscriber_to_api)?;

    Ok(Json(page))
}

pub async fn subscriber_counts(
    State(state): State<ApiState>,
    Query(query): Query<SubscriberListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = SubscriberQueryFilter {
        newsletter_id: query.newsletter_id,
        status: None,
        search: query.search,
    };

    let counts = state
        .subscribers
        .status_counts(&filter)
        .await
        .map_err(subscriber_to_api)?;

    Ok(Json(counts))
}

pub async fn get_subscriber(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let subscriber = state
        .subscribers
        .find_by_id(id)
        .await
        .map_err(subscriber_to_api)?;

    match subscriber {
        Some(subscriber) => Ok(Json(subscriber)),
        None => Err(ApiError::not_found("subscriber not found")),
    }
}

pub async fn create_subscriber(
    State(state): State<ApiState>,
    Json(payload): Json<SubscriberCreateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let command = CreateSubscriberCommand {
        newsletter_id: payload.newsletter_id,
        email: payload.email,
        name: payload.name,
        status: payload.status.unwrap_or(SubscriberStatus::Active),
    };

    let subscriber = state
        .subscribers
        .subscribe(command)
        .await
        .map_err(subscriber_to_api)?;

    Ok((StatusCode::CREATED, Json(subscriber)))
}

pub async fn update_subscriber(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SubscriberUpdateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let command = UpdateSubscriberCommand {
        email: payload.email,
        name: payload.name,
        status: payload.status,
    };

    let subscriber = state
        .subscribers
        .update(id, command)
        .await
        .map_err(subscriber_to_api)?;

    Ok(Json(subscriber))
}

pub async fn delete_subscriber(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .subscribers
        .delete(id)
        .await
        .map_err(subscriber_to_api)?;

    Ok(StatusCode::NO_CONTENT)
}
