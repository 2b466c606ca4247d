use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};

use parley_types::api::{
    MarkReadRequest, MarkReadResponse, MessageQuery, SendMessageRequest,
    UnreadCountResponse, UnreadQuery,
};
use parley_types::models::{ConversationId, UserId};

use crate::error::ApiError;
use crate::{AppState, run_blocking};

pub async fn send_message(
    State(state): State<AppState>,
    Path(conversation_id): Path<ConversationId>,
    Extension(caller): Extension<UserId>,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let message = run_blocking(&state, move |m| {
        m.messages.append(conversation_id, caller, &req.body)
    })
    .await?;

    Ok((StatusCode::CREATED, Json(message)))
}

pub async fn get_messages(
    State(state): State<AppState>,
    Path(conversation_id): Path<ConversationId>,
    Query(query): Query<MessageQuery>,
    Extension(caller): Extension<UserId>,
) -> Result<impl IntoResponse, ApiError> {
    let page = run_blocking(&state, move |m| {
        m.messages
            .list_by_conversation(conversation_id, query.page, query.page_size, caller)
    })
    .await?;

    Ok(Json(page))
}

pub async fn mark_read(
    State(state): State<AppState>,
    Extension(caller): Extension<UserId>,
    Json(req): Json<MarkReadRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let ids = req.message_ids.into_vec();
    let updated = run_blocking(&state, move |m| m.messages.mark_read(&ids, caller)).await?;

    Ok(Json(MarkReadResponse { updated }))
}

pub async fn unread_count(
    State(state): State<AppState>,
    Query(query): Query<UnreadQuery>,
    Extension(caller): Extension<UserId>,
) -> Result<impl IntoResponse, ApiError> {
    let count = run_blocking(&state, move |m| {
        m.messages.unread_count(caller, query.conversation_id)
    })
    .await?;

    Ok(Json(UnreadCountResponse { count }))
}
