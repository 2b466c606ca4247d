pub mod conversations;
pub mod dispatcher;
pub mod error;
pub mod messages;
pub mod middleware;

use std::sync::Arc;

use axum::{Router, routing::{get, post}};
use tracing::error;

use parley_messaging::{Messaging, MessagingResult};

use crate::error::ApiError;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub messaging: Messaging,
    pub jwt_secret: String,
}

/// All messaging routes, behind bearer-token verification.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/conversations",
            get(conversations::list_conversations).post(conversations::create_conversation),
        )
        .route(
            "/conversations/{conversation_id}/messages",
            get(messages::get_messages).post(messages::send_message),
        )
        .route("/messages/read", post(messages::mark_read))
        .route("/messages/unread", get(messages::unread_count))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ))
        .with_state(state)
}

/// Run a messaging call off the async runtime; storage access blocks.
pub(crate) async fn run_blocking<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Messaging) -> MessagingResult<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    let result = tokio::task::spawn_blocking(move || f(&state.messaging))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Task(e)
        })?;
    Ok(result?)
}
