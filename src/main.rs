use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use promptpal_sidecar::api::{routes::create_router, state::AppState};
use promptpal_sidecar::browser::{BrowserManager, CdpPageHost};
use promptpal_sidecar::config::Config;
use promptpal_sidecar::dom::SystemClipboard;
use promptpal_sidecar::storage::PromptRepository;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Config::from_env();

    let store = Arc::new(
        PromptRepository::open(&config.db_path()).context("Failed to open prompt library")?,
    );

    let browser = Arc::new(BrowserManager::new());
    if let Some(url) = &config.start_url {
        // On failure the browser stays closed until /browser/open
        if let Err(e) = browser.launch(url, config.headless).await {
            tracing::error!("Failed to launch browser on {}: {}", url, e);
        }
    }
    let host = Arc::new(CdpPageHost::new(
        browser,
        Arc::new(SystemClipboard),
        config.engine_config(),
        config.bridge_settle,
    ));

    // Create application state
    let state = Arc::new(AppState::with_browser(store, host));

    // Build router
    let app = create_router(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("Invalid HOST/PORT")?;
    tracing::info!("PromptPal sidecar starting on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
