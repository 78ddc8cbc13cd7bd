use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, patch, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers::{browser, commands, health, messages, prompts, settings};
use super::state::AppState;
use super::websocket::ws_handler;

/// Extension pages and local tooling only
fn is_allowed_origin(origin: &HeaderValue) -> bool {
    let Ok(origin) = origin.to_str() else {
        return false;
    };
    origin.starts_with("chrome-extension://")
        || origin.starts_with("moz-extension://")
        || origin.starts_with("http://localhost")
        || origin.starts_with("http://127.0.0.1")
}

pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(|origin, _| is_allowed_origin(origin)))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Messaging channel
        .route("/message", post(messages::handle_message))
        // Prompt library
        .route(
            "/prompts",
            get(prompts::list_prompts).post(prompts::create_prompt),
        )
        .route("/prompts/recent", get(prompts::recent_prompts))
        .route(
            "/prompts/:prompt_id",
            patch(prompts::update_prompt).delete(prompts::delete_prompt),
        )
        .route("/prompts/:prompt_id/pin", post(prompts::toggle_pin))
        // Settings
        .route(
            "/settings",
            get(settings::get_settings).patch(settings::update_settings),
        )
        // Keyboard commands
        .route("/commands/save-selection", post(commands::save_selection))
        .route("/commands/open-selector", post(commands::open_selector))
        // Managed browser page
        .route("/browser/open", post(browser::open_page))
        // WebSocket
        .route("/ws/:client_id", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
