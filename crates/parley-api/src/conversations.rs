use axum::{Extension, Json, extract::State, response::IntoResponse};

use parley_types::api::CreateConversationRequest;
use parley_types::models::UserId;

use crate::error::ApiError;
use crate::{AppState, run_blocking};

/// Get or create the caller's conversation with `participant_id`.
pub async fn create_conversation(
    State(state): State<AppState>,
    Extension(caller): Extension<UserId>,
    Json(req): Json<CreateConversationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let detail = run_blocking(&state, move |m| {
        m.conversations.get_or_create(caller, req.participant_id)
    })
    .await?;

    Ok(Json(detail))
}

pub async fn list_conversations(
    State(state): State<AppState>,
    Extension(caller): Extension<UserId>,
) -> Result<impl IntoResponse, ApiError> {
    let views = run_blocking(&state, move |m| m.conversations.list_for_user(caller)).await?;

    Ok(Json(views))
}
