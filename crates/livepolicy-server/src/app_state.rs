//! Shared application state.
//!
//! The registry is constructed once here and handed to every consumer by
//! `Arc`; nothing reaches it through globals, so tests can run many
//! independent instances side by side.

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::decision::DecisionRouter;
use crate::engine::{EngineLauncher, HttpEngineLauncher, PollSettings};
use crate::obs::ServerMetrics;
use crate::registry::TenantRegistry;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
    registry: Arc<TenantRegistry>,
    decisions: Arc<DecisionRouter>,
    metrics: Arc<ServerMetrics>,
}

struct AppStateInner {
    cfg: ServerConfig,
}

impl AppState {
    /// Build state backed by the HTTP polling engine.
    pub fn new(cfg: ServerConfig) -> Self {
        Self::with_launcher(cfg, Arc::new(HttpEngineLauncher::new()))
    }

    pub fn with_launcher(cfg: ServerConfig, launcher: Arc<dyn EngineLauncher>) -> Self {
        let metrics = Arc::new(ServerMetrics::default());
        let registry = Arc::new(
            TenantRegistry::new(launcher, PollSettings::from(&cfg.engine), Arc::clone(&metrics))
                .with_stop_timeout(cfg.shutdown_timeout()),
        );
        let decisions = Arc::new(DecisionRouter::new(Arc::clone(&registry), Arc::clone(&metrics)));

        Self {
            inner: Arc::new(AppStateInner { cfg }),
            registry,
            decisions,
            metrics,
        }
    }

    pub fn cfg(&self) -> &ServerConfig {
        &self.inner.cfg
    }

    pub fn registry(&self) -> Arc<TenantRegistry> {
        Arc::clone(&self.registry)
    }

    pub fn decisions(&self) -> Arc<DecisionRouter> {
        Arc::clone(&self.decisions)
    }

    pub fn metrics(&self) -> Arc<ServerMetrics> {
        Arc::clone(&self.metrics)
    }
}
