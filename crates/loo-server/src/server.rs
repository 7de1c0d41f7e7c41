use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{info, warn};

use loo_store::{DurableLooStore, InMemoryLooStore, LooStore};

use crate::auth::{AuthProvider, StaticTokenAuth};
use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::facade::QueryFacade;
use crate::handler::AppState;
use crate::router::build_router;

/// Store handle opened at start-up and closed on shutdown.
pub enum StoreHandle {
    Memory(Arc<InMemoryLooStore>),
    Durable(Arc<DurableLooStore>),
}

impl StoreHandle {
    /// Durable when `data_dir` is set, in-memory otherwise.
    pub fn open(config: &ServerConfig) -> ServerResult<Self> {
        match &config.data_dir {
            Some(dir) => Ok(Self::Durable(Arc::new(DurableLooStore::open(
                dir,
                config.wal_config(),
            )?))),
            None => Ok(Self::Memory(Arc::new(InMemoryLooStore::new()))),
        }
    }

    pub fn shared(&self) -> Arc<dyn LooStore> {
        match self {
            Self::Memory(store) => Arc::clone(store) as Arc<dyn LooStore>,
            Self::Durable(store) => Arc::clone(store) as Arc<dyn LooStore>,
        }
    }

    /// Sync and release the store. The log is synced even when a detached
    /// task still holds a handle; only the final close is skipped then.
    pub fn close(self) -> ServerResult<()> {
        match self {
            Self::Memory(_) => Ok(()),
            Self::Durable(store) => {
                store.sync()?;
                match Arc::try_unwrap(store) {
                    Ok(store) => Ok(store.close()?),
                    Err(store) => {
                        warn!(
                            handles = Arc::strong_count(&store),
                            "store still shared at shutdown; synced without closing"
                        );
                        Ok(())
                    }
                }
            }
        }
    }
}

/// Toilet Map HTTP server.
pub struct LooServer {
    config: ServerConfig,
}

impl LooServer {
    pub fn new(config: ServerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Build the router over `store` (useful for testing).
    pub fn router(&self, store: Arc<dyn LooStore>) -> axum::Router {
        let auth: Arc<dyn AuthProvider> = Arc::new(StaticTokenAuth::new(
            &self.config.tokens,
            self.config.allow_anonymous,
        ));
        self.router_with_auth(store, auth)
    }

    pub fn router_with_auth(
        &self,
        store: Arc<dyn LooStore>,
        auth: Arc<dyn AuthProvider>,
    ) -> axum::Router {
        build_router(AppState {
            facade: Arc::new(QueryFacade::new(store, &self.config)),
            auth,
            read_only: self.config.read_only,
        })
    }

    /// Open the store, serve until Ctrl-C, then close the store.
    pub async fn serve(self) -> ServerResult<()> {
        self.config.validate()?;
        let store = StoreHandle::open(&self.config)?;
        let app = self.router(store.shared());

        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        info!(
            addr = %self.config.bind_addr,
            durable = self.config.data_dir.is_some(),
            read_only = self.config.read_only,
            "toilet map server listening"
        );

        let served = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| ServerError::Internal(e.to_string()));

        store.close()?;
        info!("toilet map server stopped");
        served
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
