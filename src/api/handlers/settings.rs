use axum::{extract::State, Json};
use std::sync::Arc;

use crate::error::Result;
use crate::models::{Settings, SettingsPatch};

use super::super::state::AppState;

pub async fn get_settings(State(state): State<Arc<AppState>>) -> Result<Json<Settings>> {
    Ok(Json(state.store.get_settings()?))
}

pub async fn update_settings(
    State(state): State<Arc<AppState>>,
    Json(patch): Json<SettingsPatch>,
) -> Result<Json<Settings>> {
    Ok(Json(state.store.update_settings(patch)?))
}
