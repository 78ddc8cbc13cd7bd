use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::models::{PromptDraft, PromptListQuery, PromptPatch, PromptRecord, RecentQuery};

use super::super::state::AppState;

/// List prompts with optional filters
pub async fn list_prompts(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PromptListQuery>,
) -> Result<Json<Vec<PromptRecord>>> {
    let prompts = state.store.get_all_prompts().map_err(|e| {
        tracing::error!("Failed to list prompts: {}", e);
        AppError::from(e)
    })?;

    let prompts = prompts
        .into_iter()
        .filter(|p| !query.pinned || p.is_pinned)
        .filter(|p| query.category.as_ref().map_or(true, |c| &p.category == c))
        .filter(|p| query.search.as_deref().map_or(true, |term| p.matches(term)))
        .collect();

    Ok(Json(prompts))
}

/// Most recently used prompts first
pub async fn recent_prompts(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RecentQuery>,
) -> Result<Json<Vec<PromptRecord>>> {
    Ok(Json(state.store.recent_prompts(query.limit)?))
}

pub async fn create_prompt(
    State(state): State<Arc<AppState>>,
    Json(draft): Json<PromptDraft>,
) -> Result<(StatusCode, Json<PromptRecord>)> {
    if draft.content.trim().is_empty() {
        return Err(AppError::ValidationError("Prompt content is empty".into()));
    }
    let prompt = state.store.save_prompt(draft).map_err(|e| {
        tracing::error!("Failed to save prompt: {}", e);
        AppError::from(e)
    })?;
    Ok((StatusCode::CREATED, Json(prompt)))
}

pub async fn update_prompt(
    State(state): State<Arc<AppState>>,
    Path(prompt_id): Path<String>,
    Json(patch): Json<PromptPatch>,
) -> Result<Json<PromptRecord>> {
    Ok(Json(state.store.update_prompt(&prompt_id, patch)?))
}

pub async fn delete_prompt(
    State(state): State<Arc<AppState>>,
    Path(prompt_id): Path<String>,
) -> Result<StatusCode> {
    state.store.delete_prompt(&prompt_id)?;
    tracing::info!("Deleted prompt {}", prompt_id);
    Ok(StatusCode::NO_CONTENT)
}

pub async fn toggle_pin(
    State(state): State<Arc<AppState>>,
    Path(prompt_id): Path<String>,
) -> Result<Json<PromptRecord>> {
    Ok(Json(state.store.toggle_pin(&prompt_id)?))
}
