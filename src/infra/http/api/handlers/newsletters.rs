use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use uuid::Uuid;

use crate::application::newsletters::{CreateNewsletterCommand, UpdateNewsletterCommand};

use super::newsletter_to_api;
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::models::{NewsletterCreateRequest, NewsletterUpdateRequest};
use crate::infra::http::api::state::ApiState;

pub async fn list_newsletters(
    State(state): State<ApiState>,
) -> Result<impl IntoResponse, ApiError> {
    let newsletters = state.newsletters.list().await.map_err(newsletter_to_api)?;
    Ok(Json(newsletters))
}

pub async fn get_newsletter(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let newsletter = state
        .newsletters
        .find_by_id(id)
        .await
        .map_err(newsletter_to_api)?;

    match newsletter {
        Some(newsletter) => Ok(Json(newsletter)),
        None => Err(ApiError::not_found("newsletter not found")),
    }
}

pub async fn create_newsletter(
    State(state): State<ApiState>,
    Json(payload): Json<NewsletterCreateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let command = CreateNewsletterCommand {
        title: payload.title,
        sender_name: payload.sender_name,
        sender_email: payload.sender_email,
        base_url: payload.base_url,
    };

    let newsletter = state
        .newsletters
        .create(command)
        .await
        .map_err(newsletter_to_api)?;

    Ok((StatusCode::CREATED, Json(newsletter)))
}

pub async fn update_newsletter(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<NewsletterUpdateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let command = UpdateNewsletterCommand {
        id,
        title: payload.title,
        sender_name: payload.sender_name,
        sender_email: payload.sender_email,
        base_url: payload.base_url,
    };

    let newsletter = state
        .newsletters
        .update(command)
        .await
        .map_err(newsletter_to_api)?;

    Ok(Json(newsletter))
}

pub async fn delete_newsletter(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .newsletters
        .delete(id)
        .await
        .map_err(newsletter_to_api)?;

    Ok(StatusCode::NO_CONTENT)
}
