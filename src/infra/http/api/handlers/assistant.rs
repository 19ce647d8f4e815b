use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;
use serde::Serialize;

use super::assistant_to_api;
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::models::AssistantChatRequest;
use crate::infra::http::api::state::ApiState;

#[derive(Debug, Serialize)]
struct AssistantChatResponse {
    content: String,
}

pub async fn list_models(State(state): State<ApiState>) -> impl IntoResponse {
    Json(state.assistant.models())
}

pub async fn assistant_chat(
    State(state): State<ApiState>,
    Json(payload): Json<AssistantChatRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let content = state
        .assistant
        .complete(&payload.model, &payload.messages)
        .await
        .map_err(assistant_to_api)?;

    Ok(Json(AssistantChatResponse { content }))
}
