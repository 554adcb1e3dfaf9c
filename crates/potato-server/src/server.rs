use potato_custody::OwnershipService;
use potato_store::{ChainStore, JsonFileChainStore};
use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::handler::{AppState, DynOwnershipService};
use crate::router::build_router;

/// Potato custody HTTP server.
pub struct PotatoServer {
    config: ServerConfig,
    state: AppState,
}

impl PotatoServer {
    /// Build a server backed by the JSON file and resolver named in `config`.
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        let store: Box<dyn ChainStore> = Box::new(JsonFileChainStore::new(&config.data_path));
        let resolver = config.resolver.build()?;
        let service = OwnershipService::new(store, resolver);
        Ok(Self::with_service(config, service))
    }

    /// Build a server around an existing service (tests, embedding).
    pub fn with_service(config: ServerConfig, service: DynOwnershipService) -> Self {
        Self {
            config,
            state: AppState::new(service),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(self.state.clone())
    }

    /// Serve requests until Ctrl-C.
    pub async fn serve(self) -> ServerResult<()> {
        let app = self.router();
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        tracing::info!(
            addr = %self.config.bind_addr,
            data = %self.config.data_path.display(),
            "potato server listening"
        );
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
