use axum::{extract::State, Json};
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::models::{GenericResponse, OpenPageRequest};

use super::super::state::AppState;

/// Open a URL in the managed page, launching Chrome if needed
pub async fn open_page(
    State(state): State<Arc<AppState>>,
    Json(request): Json<OpenPageRequest>,
) -> Result<Json<GenericResponse>> {
    let host = state
        .browser_host
        .as_ref()
        .ok_or_else(|| AppError::ValidationError("Browser control is not enabled".into()))?;

    let browser = host.browser();
    let result = if browser.is_running().await {
        browser.navigate(&request.url).await
    } else {
        browser.launch(&request.url, request.headless).await
    };
    result.map_err(|e| {
        tracing::error!("Failed to open {}: {}", request.url, e);
        AppError::BrowserError(e.to_string())
    })?;
    host.reset().await;

    Ok(Json(GenericResponse {
        status: "opened".to_string(),
    }))
}
