//! Process supervisor: owns the registry lifecycle, the listener, and
//! coordinated shutdown.

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use livepolicy_core::error::{LivePolicyError, Result};

use crate::app_state::AppState;
use crate::config::ServerConfig;
use crate::engine::EngineLauncher;
use crate::router;

pub struct Server {
    state: AppState,
}

impl Server {
    pub fn new(cfg: ServerConfig) -> Self {
        Self {
            state: AppState::new(cfg),
        }
    }

    pub fn with_launcher(cfg: ServerConfig, launcher: Arc<dyn EngineLauncher>) -> Self {
        Self {
            state: AppState::with_launcher(cfg, launcher),
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Register every tenant from the config. The first failure stops the
    /// engines started so far and aborts.
    pub async fn bootstrap(&self) -> Result<()> {
        let registry = self.state.registry();

        for (tenant_ref, t) in &self.state.cfg().opas {
            if let Err(e) = registry.add(tenant_ref, &t.system_id, &t.token, &t.endpoint).await {
                error!(tenant = %tenant_ref, error = %e, "startup tenant registration failed");
                registry.shutdown(self.state.cfg().shutdown_timeout()).await;
                return Err(LivePolicyError::Internal(format!(
                    "tenant {tenant_ref}: {e}"
                )));
            }
        }

        info!(tenants = self.state.cfg().opas.len(), "startup tenants registered");
        Ok(())
    }

    /// Bind the configured address and serve until `shutdown` is cancelled.
    pub async fn run(&self, shutdown: CancellationToken) -> Result<()> {
        let addr = self.state.cfg().listen_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| LivePolicyError::Internal(format!("bind {addr} failed: {e}")))?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener.
    ///
    /// `shutdown_timeout` is a single deadline taken when `shutdown` fires:
    /// connection drain and engine stop both have to finish before it.
    pub async fn serve(&self, listener: TcpListener, shutdown: CancellationToken) -> Result<()> {
        let local = listener
            .local_addr()
            .map_err(|e| LivePolicyError::Internal(format!("listener address: {e}")))?;
        info!(addr = %local, "livepolicy server listening");

        let app = router::build_router(self.state.clone());
        let graceful = shutdown.clone();
        let mut server = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { graceful.cancelled().await })
                .await
        });

        let timeout = self.state.cfg().shutdown_timeout();
        let finished = tokio::select! {
            r = &mut server => Some(r),
            _ = shutdown.cancelled() => None,
        };
        let deadline = Instant::now() + timeout;

        let served = match finished {
            Some(r) => r,
            None => {
                info!(?timeout, "shutdown requested; draining connections");
                match tokio::time::timeout_at(deadline, &mut server).await {
                    Ok(r) => r,
                    Err(_) => {
                        warn!(?timeout, "connections did not drain in time; closing listener");
                        server.abort();
                        Ok(Ok(()))
                    }
                }
            }
        };

        self.state
            .registry()
            .shutdown(deadline.saturating_duration_since(Instant::now()))
            .await;
        info!("livepolicy server stopped");

        match served {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(LivePolicyError::Internal(format!("server failed: {e}"))),
            Err(e) => Err(LivePolicyError::Internal(format!("server task failed: {e}"))),
        }
    }
}
