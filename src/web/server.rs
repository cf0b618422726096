//! Web server for datashare.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::file::FileLifecycleManager;
use crate::{Result, ShareError};

use super::handlers::AppState;
use super::middleware::JwtState;
use super::router::{create_health_router, create_router};

/// Web server for the API.
pub struct WebServer {
    /// Server address.
    addr: SocketAddr,
    /// Application state.
    app_state: Arc<AppState>,
    /// JWT state.
    jwt_state: Arc<JwtState>,
    /// Allowed CORS origins.
    cors_origins: Vec<String>,
}

impl WebServer {
    /// Create a new web server.
    pub fn new(config: &ServerConfig, jwt_secret: &str, files: FileLifecycleManager) -> Result<Self> {
        let addr = format!("{}:{}", config.host, config.port)
            .parse()
            .map_err(|e| {
                ShareError::Config(format!(
                    "invalid server address {}:{}: {e}",
                    config.host, config.port
                ))
            })?;

        Ok(Self {
            addr,
            app_state: Arc::new(AppState::new(files)),
            jwt_state: Arc::new(JwtState::new(jwt_secret)),
            cors_origins: config.cors_origins.clone(),
        })
    }

    /// Get the server address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    fn router(&self) -> axum::Router {
        create_router(
            self.app_state.clone(),
            self.jwt_state.clone(),
            &self.cors_origins,
        )
        .merge(create_health_router())
    }

    /// Run the web server until Ctrl-C.
    pub async fn run(self) -> std::result::Result<(), std::io::Error> {
        let listener = TcpListener::bind(self.addr).await?;
        self.serve(listener, shutdown_signal()).await
    }

    /// Serve on `listener` until `shutdown` resolves, then drain open requests.
    async fn serve<F>(self, listener: TcpListener, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let local_addr = listener.local_addr()?;
        tracing::info!("Web server listening on http://{}", local_addr);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("Web server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        // Without a signal handler, keep serving.
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SharingPolicy;
    use crate::db::Database;
    use crate::file::FileStorage;
    use tempfile::TempDir;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    async fn create_test_server(temp: &TempDir) -> WebServer {
        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            cors_origins: vec![],
        };
        let policy = SharingPolicy::default();
        let db = Database::open_in_memory().await.unwrap();
        let storage = FileStorage::new(temp.path(), &policy).unwrap();
        let files = FileLifecycleManager::new(db, storage, policy);
        WebServer::new(&config, "test-secret", files).unwrap()
    }

    #[tokio::test]
    async fn test_web_server_new() {
        let temp = TempDir::new().unwrap();
        let server = create_test_server(&temp).await;
        assert_eq!(server.addr().ip().to_string(), "127.0.0.1");
    }

    #[tokio::test]
    async fn test_invalid_address() {
        let temp = TempDir::new().unwrap();
        let policy = SharingPolicy::default();
        let db = Database::open_in_memory().await.unwrap();
        let storage = FileStorage::new(temp.path(), &policy).unwrap();
        let config = ServerConfig {
            host: "not an address".to_string(),
            ..ServerConfig::default()
        };
        let result = WebServer::new(
            &config,
            "secret",
            FileLifecycleManager::new(db, storage, policy),
        );
        assert!(matches!(result, Err(ShareError::Config(_))));
    }

    #[tokio::test]
    async fn test_serve_until_shutdown() {
        let temp = TempDir::new().unwrap();
        let server = create_test_server(&temp).await;
        let listener = TcpListener::bind(server.addr()).await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (stop, stopped) = tokio::sync::oneshot::channel::<()>();
        let handle = tokio::spawn(server.serve(listener, async {
            let _ = stopped.await;
        }));

        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.ends_with("OK"));

        stop.send(()).unwrap();
        handle.await.unwrap().unwrap();
        assert!(tokio::net::TcpStream::connect(addr).await.is_err());
    }
}
