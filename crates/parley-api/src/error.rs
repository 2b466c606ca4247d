use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use parley_messaging::MessagingError;
use parley_types::api::ErrorResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Messaging(#[from] MessagingError),

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub fn status_for(err: &MessagingError) -> StatusCode {
    match err {
        MessagingError::InvalidPair(_) | MessagingError::InvalidBody(_) => StatusCode::BAD_REQUEST,
        MessagingError::UnknownParticipant(_) | MessagingError::ConversationNotFound(_) => {
            StatusCode::NOT_FOUND
        }
        MessagingError::NotAParticipant { .. } | MessagingError::Forbidden { .. } => {
            StatusCode::FORBIDDEN
        }
        MessagingError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ApiError::Messaging(MessagingError::Storage(e)) => {
                error!("Storage failure: {:#}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse {
                        error: "internal".into(),
                        message: "internal error".into(),
                    },
                )
            }
            ApiError::Messaging(err) => (
                status_for(err),
                ErrorResponse {
                    error: err.code().into(),
                    message: err.to_string(),
                },
            ),
            ApiError::Task(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse {
                    error: "internal".into(),
                    message: "internal error".into(),
                },
            ),
        };

        (status, Json(body)).into_response()
    }
}
