use axum::{extract::State, Json};
use std::sync::Arc;

use crate::models::{Message, MessageResponse};

use super::super::state::AppState;

/// Keyboard command: capture the current selection as a prompt
pub async fn save_selection(State(state): State<Arc<AppState>>) -> Json<MessageResponse> {
    tracing::info!("Command: save selection");
    Json(state.router.dispatch(Message::SaveSelection).await)
}

/// Keyboard command: open the prompt selector on the focused input
pub async fn open_selector(State(state): State<Arc<AppState>>) -> Json<MessageResponse> {
    tracing::info!("Command: open selector");
    Json(state.router.dispatch(Message::ShowFloatingUi).await)
}
