use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::broadcast;

use crate::browser::CdpPageHost;
use crate::messaging::MessageRouter;
use crate::models::FeedbackEvent;
use crate::page::PageHost;
use crate::storage::PromptStore;

/// Connected WebSocket client info
#[derive(Debug)]
pub struct ConnectedClient {
    pub connected_at: Instant,
}

/// Shared application state
pub struct AppState {
    pub store: Arc<dyn PromptStore>,

    pub router: MessageRouter,

    /// Present when the sidecar drives its own Chromium page
    pub browser_host: Option<Arc<CdpPageHost>>,

    /// Connected WebSocket clients: client_id -> client info
    pub connected_clients: DashMap<String, ConnectedClient>,

    /// Total connection count (for metrics)
    connection_count: AtomicUsize,

    /// Broadcast channel for feedback events
    pub ws_broadcast: broadcast::Sender<FeedbackEvent>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn PromptStore>,
        host: Arc<dyn PageHost>,
        browser_host: Option<Arc<CdpPageHost>>,
    ) -> Self {
        let (tx, _) = broadcast::channel(1024);
        let router = MessageRouter::new(Arc::clone(&store), host, tx.clone());

        Self {
            store,
            router,
            browser_host,
            connected_clients: DashMap::new(),
            connection_count: AtomicUsize::new(0),
            ws_broadcast: tx,
        }
    }

    /// State driving the managed Chromium page
    pub fn with_browser(store: Arc<dyn PromptStore>, host: Arc<CdpPageHost>) -> Self {
        Self::new(store, Arc::clone(&host) as Arc<dyn PageHost>, Some(host))
    }

    pub fn broadcast(&self, event: FeedbackEvent) {
        // Ignore send errors (no receivers)
        let _ = self.ws_broadcast.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FeedbackEvent> {
        self.ws_broadcast.subscribe()
    }

    /// Register a WebSocket client connection
    pub fn client_connected(&self, client_id: &str) {
        self.connected_clients.insert(
            client_id.to_string(),
            ConnectedClient {
                connected_at: Instant::now(),
            },
        );
        let count = self.connection_count.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::debug!(
            "Client {} connected (total: {}, active: {})",
            client_id,
            count,
            self.connected_clients.len()
        );
    }

    /// Unregister a WebSocket client connection
    pub fn client_disconnected(&self, client_id: &str) {
        if let Some((_, client)) = self.connected_clients.remove(client_id) {
            tracing::debug!(
                "Client {} disconnected after {:?} (active: {})",
                client_id,
                client.connected_at.elapsed(),
                self.connected_clients.len()
            );
        }
    }

    /// Get the number of active WebSocket connections
    pub fn active_connection_count(&self) -> usize {
        self.connected_clients.len()
    }
}
