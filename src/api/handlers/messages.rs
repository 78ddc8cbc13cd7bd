use axum::{extract::State, Json};
use std::sync::Arc;

use crate::models::{Message, MessageResponse};

use super::super::state::AppState;

/// Messaging channel endpoint; failures are reported in the reply body
pub async fn handle_message(
    State(state): State<Arc<AppState>>,
    Json(message): Json<Message>,
) -> Json<MessageResponse> {
    Json(state.router.dispatch(message).await)
}
