//! Tenant registry: the authoritative map from tenant reference to engine.
//!
//! A single `tokio::sync::RwLock` guards the map. `add`/`delete`/`shutdown`
//! take it exclusively and keep it across the engine start/stop call, so every
//! mutation is serialized behind the slowest one. `get`/`list`/`tenant` take
//! it shared and never do I/O.
//!
//! Ordering: once `add(r)` returns `Ok`, every later `get(r)` sees a handle;
//! once `delete(r)` returns, every later `get(r)` sees `None` until the next
//! successful `add(r)`.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use livepolicy_core::error::{LivePolicyError, Result};
use livepolicy_core::tenant::{validate_tenant_ref, TenantConfig};

use crate::engine::{EngineHandle, EngineLauncher, EngineStatus, PollSettings, PollingConfig};
use crate::obs::ServerMetrics;

const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(2);

struct TenantEntry {
    config: TenantConfig,
    handle: Arc<dyn EngineHandle>,
}

/// Read-only view of one registered tenant.
#[derive(Debug, Clone, Serialize)]
pub struct TenantInfo {
    #[serde(rename = "ref")]
    pub tenant_ref: String,
    pub config: TenantConfig,
    pub engine: EngineStatus,
}

pub struct TenantRegistry {
    launcher: Arc<dyn EngineLauncher>,
    settings: PollSettings,
    stop_timeout: Duration,
    metrics: Arc<ServerMetrics>,
    tenants: RwLock<BTreeMap<String, TenantEntry>>,
}

impl TenantRegistry {
    pub fn new(
        launcher: Arc<dyn EngineLauncher>,
        settings: PollSettings,
        metrics: Arc<ServerMetrics>,
    ) -> Self {
        Self {
            launcher,
            settings,
            stop_timeout: DEFAULT_STOP_TIMEOUT,
            metrics,
            tenants: RwLock::new(BTreeMap::new()),
        }
    }

    /// Deadline handed to `EngineHandle::stop` on delete and replace.
    pub fn with_stop_timeout(mut self, stop_timeout: Duration) -> Self {
        self.stop_timeout = stop_timeout;
        self
    }

    /// Register a tenant and start its engine.
    ///
    /// Returns `Config` for an invalid reference, system id or endpoint and
    /// `Start` when the engine cannot be started; in both cases the map is
    /// left untouched. Re-adding an existing reference starts the new engine
    /// first, then swaps it in and stops the old one.
    pub async fn add(
        &self,
        tenant_ref: &str,
        system_id: &str,
        token: &str,
        endpoint: &str,
    ) -> Result<()> {
        let config = validate_tenant_ref(tenant_ref)
            .and_then(|_| TenantConfig::new(system_id, token, endpoint))
            .map_err(|e| {
                self.metrics.tenant_ops.inc(&[("op", "add"), ("result", "config_error")]);
                e
            })?;
        let polling = PollingConfig::new(&config, self.settings);

        let mut tenants = self.tenants.write().await;

        let handle = match self.launcher.start(tenant_ref, polling).await {
            Ok(h) => h,
            Err(e) => {
                self.metrics.tenant_ops.inc(&[("op", "add"), ("result", "start_error")]);
                warn!(tenant = %tenant_ref, system_id = %system_id, error = %e, "engine start failed");
                return Err(match e {
                    LivePolicyError::Start(_) => e,
                    other => LivePolicyError::Start(other.to_string()),
                });
            }
        };

        info!(
            tenant = %tenant_ref,
            system_id = %config.system_id(),
            endpoint = %config.endpoint(),
            "tenant added"
        );

        let previous = tenants.insert(tenant_ref.to_string(), TenantEntry { config, handle });
        self.metrics.tenants_active.set(&[], tenants.len() as i64);
        self.metrics.tenant_ops.inc(&[("op", "add"), ("result", "ok")]);

        if let Some(old) = previous {
            info!(tenant = %tenant_ref, "replacing existing engine");
            self.stop_engine(tenant_ref, old.handle, self.stop_timeout).await;
        }

        Ok(())
    }

    /// Look up a tenant's engine. Absence is a normal outcome.
    pub async fn get(&self, tenant_ref: &str) -> Option<Arc<dyn EngineHandle>> {
        self.tenants
            .read()
            .await
            .get(tenant_ref)
            .map(|e| Arc::clone(&e.handle))
    }

    /// Remove a tenant and stop its engine. No-op when absent.
    ///
    /// Blocks until the engine acknowledges the stop or the stop timeout
    /// passes. Stop failures are logged and counted, never returned; the
    /// entry is removed regardless.
    pub async fn delete(&self, tenant_ref: &str) {
        let mut tenants = self.tenants.write().await;

        let Some(entry) = tenants.remove(tenant_ref) else {
            debug!(tenant = %tenant_ref, "delete of unknown tenant ignored");
            self.metrics.tenant_ops.inc(&[("op", "delete"), ("result", "noop")]);
            return;
        };
        self.metrics.tenants_active.set(&[], tenants.len() as i64);

        self.stop_engine(tenant_ref, entry.handle, self.stop_timeout).await;
        self.metrics.tenant_ops.inc(&[("op", "delete"), ("result", "ok")]);
        info!(tenant = %tenant_ref, "tenant deleted");
    }

    /// Snapshot of registered references, in ascending order.
    pub async fn list(&self) -> Vec<String> {
        self.tenants.read().await.keys().cloned().collect()
    }

    pub async fn tenant(&self, tenant_ref: &str) -> Option<TenantInfo> {
        self.tenants.read().await.get(tenant_ref).map(|e| TenantInfo {
            tenant_ref: tenant_ref.to_string(),
            config: e.config.clone(),
            engine: e.handle.status(),
        })
    }

    pub async fn len(&self) -> usize {
        self.tenants.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drain the registry and stop every engine concurrently within
    /// `deadline`. Engines still running at the deadline are abandoned.
    pub async fn shutdown(&self, deadline: Duration) {
        let drained = {
            let mut tenants = self.tenants.write().await;
            let drained = std::mem::take(&mut *tenants);
            self.metrics.tenants_active.set(&[], 0);
            drained
        };

        if drained.is_empty() {
            return;
        }
        let count = drained.len();
        info!(tenants = count, ?deadline, "stopping all engines");

        let stops = drained
            .into_iter()
            .map(|(tenant_ref, entry)| async move {
                self.stop_engine(&tenant_ref, entry.handle, deadline).await;
            });

        if tokio::time::timeout(deadline, join_all(stops)).await.is_err() {
            warn!(tenants = count, ?deadline, "engine shutdown deadline elapsed; abandoning remaining engines");
        }
    }

    /// Bounded by `deadline` even when the engine ignores it; an engine
    /// still running afterwards is abandoned and counted as a stop failure.
    async fn stop_engine(&self, tenant_ref: &str, handle: Arc<dyn EngineHandle>, deadline: Duration) {
        let res = match tokio::time::timeout(deadline, handle.stop(deadline)).await {
            Ok(res) => res,
            Err(_) => Err(LivePolicyError::Stop(format!(
                "engine did not stop within {deadline:?}"
            ))),
        };
        if let Err(e) = res {
            self.metrics.engine_stop_failures.inc(&[]);
            warn!(tenant = %tenant_ref, error = %e, "engine stop failed");
        }
    }
}
