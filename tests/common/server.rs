//! Test server lifecycle management
//!
//! Each test gets an isolated lists server with its own database, talking to
//! its own stub account service.

use super::constants::*;
use axum::{
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use recency_lists_server::server::{make_app, RequestsLoggingLevel, ServerConfig};
use recency_lists_server::{HttpIdentityResolver, ListManager, SqliteListStore};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

/// Stub of the account service's token resolution endpoint
async fn whoami(headers: HeaderMap) -> Response {
    let token = headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .unwrap_or_default();
    match token {
        TEST_TOKEN => Json(json!({ "id": TEST_OWNER })).into_response(),
        OTHER_TOKEN => Json(json!({ "id": OTHER_OWNER })).into_response(),
        BROKEN_TOKEN => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        _ => StatusCode::UNAUTHORIZED.into_response(),
    }
}

async fn serve_until_shutdown(
    listener: TcpListener,
    app: Router,
    shutdown_rx: oneshot::Receiver<()>,
) {
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            shutdown_rx.await.ok();
        })
        .await
        .expect("Server failed");
}

/// Test server instance with isolated database and account service
///
/// When dropped, both servers gracefully shut down and temp resources are cleaned up.
pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    /// The lists database, for opening a second handle from tests
    pub db_path: PathBuf,

    // Private fields - keep resources alive until drop
    _temp_db_dir: TempDir,
    _shutdown_txs: Vec<oneshot::Sender<()>>,
}

impl TestServer {
    /// Spawns a lists server and a stub account service on random ports
    pub async fn spawn() -> Self {
        Self::spawn_with(true).await
    }

    /// Spawns a lists server whose account service is not listening
    pub async fn spawn_without_account_service() -> Self {
        Self::spawn_with(false).await
    }

    async fn spawn_with(account_service_up: bool) -> Self {
        let mut shutdown_txs = vec![];

        let accounts_listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let accounts_port = accounts_listener
            .local_addr()
            .expect("Failed to get local address")
            .port();
        let auth_url = format!("http://127.0.0.1:{}/v1/whoami", accounts_port);

        if account_service_up {
            let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
            let accounts_app = Router::new().route("/v1/whoami", get(whoami));
            tokio::spawn(serve_until_shutdown(accounts_listener, accounts_app, shutdown_rx));
            shutdown_txs.push(shutdown_tx);
        } else {
            drop(accounts_listener);
        }

        let temp_db_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_db_dir.path().join("lists.db");
        let collections = SqliteListStore::open_collections(&db_path, Duration::from_secs(2))
            .expect("Failed to open lists database");

        let identity_resolver =
            HttpIdentityResolver::new(&auth_url, Duration::from_secs(AUTH_TIMEOUT_SECS))
                .expect("Failed to build identity resolver");

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();
        let base_url = format!("http://127.0.0.1:{}", port);

        let config = ServerConfig {
            port,
            requests_logging_level: RequestsLoggingLevel::None,
            store_timeout: Duration::from_secs(2),
        };
        let app = make_app(
            config,
            ListManager::new(collections),
            Arc::new(identity_resolver),
        );

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        tokio::spawn(serve_until_shutdown(listener, app, shutdown_rx));
        shutdown_txs.push(shutdown_tx);

        let server = Self {
            base_url,
            db_path,
            _temp_db_dir: temp_db_dir,
            _shutdown_txs: shutdown_txs,
        };

        server.wait_for_ready().await;

        server
    }

    /// Opens a second manager on the server's database
    #[allow(dead_code)]
    pub fn open_list_manager(&self) -> ListManager {
        let collections = SqliteListStore::open_collections(&self.db_path, Duration::from_secs(2))
            .expect("Failed to open lists database");
        ListManager::new(collections)
    }

    /// Waits for the server to become ready by polling the home endpoint
    async fn wait_for_ready(&self) {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("Failed to build reqwest client");

        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(SERVER_READY_TIMEOUT_MS);

        loop {
            if start.elapsed() > timeout {
                panic!(
                    "Server did not become ready within {}ms",
                    SERVER_READY_TIMEOUT_MS
                );
            }

            match client.get(format!("{}/", self.base_url)).send().await {
                Ok(response) if response.status().is_success() => return,
                _ => {
                    tokio::time::sleep(Duration::from_millis(SERVER_READY_POLL_INTERVAL_MS)).await;
                }
            }
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        for tx in self._shutdown_txs.drain(..) {
            let _ = tx.send(());
        }
    }
}
