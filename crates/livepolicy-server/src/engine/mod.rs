//! Engine handle contract.
//!
//! An engine is one running policy-evaluation instance: it owns a background
//! task that keeps its rule bundle fresh and answers decisions against
//! whatever bundle is currently active. The registry only talks to engines
//! through these traits, so tests can plug in fakes.

pub mod http;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use livepolicy_core::error::Result;
use livepolicy_core::tenant::TenantConfig;

use crate::config::EngineSection;

pub use http::HttpEngineLauncher;

/// Starts engines from a polling configuration.
#[async_trait]
pub trait EngineLauncher: Send + Sync {
    /// Start an engine. Returns once the engine is initialized; the first
    /// bundle fetch may still be in flight.
    async fn start(&self, tenant_ref: &str, cfg: PollingConfig) -> Result<Arc<dyn EngineHandle>>;
}

/// A live engine instance.
#[async_trait]
pub trait EngineHandle: Send + Sync {
    /// Evaluate the active bundle at `path`. Safe to call while a refresh is
    /// in flight.
    fn decide(&self, path: &str, input: &Value) -> Result<Value>;

    /// Cancel the background task and wait for it, bounded by `deadline`.
    async fn stop(&self, deadline: Duration) -> Result<()>;

    fn status(&self) -> EngineStatus;
}

/// Polling knobs shared by every tenant's engine.
#[derive(Debug, Clone, Copy)]
pub struct PollSettings {
    pub min_delay: Duration,
    pub max_delay: Duration,
    pub request_timeout: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            min_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(1),
            request_timeout: Duration::from_secs(5),
        }
    }
}

impl From<&EngineSection> for PollSettings {
    fn from(s: &EngineSection) -> Self {
        Self {
            min_delay: Duration::from_millis(s.poll_min_delay_ms),
            max_delay: Duration::from_millis(s.poll_max_delay_ms),
            request_timeout: Duration::from_millis(s.request_timeout_ms),
        }
    }
}

/// Everything an engine needs to poll one tenant's bundle.
#[derive(Debug, Clone)]
pub struct PollingConfig {
    pub service_url: String,
    pub resource: String,
    pub token: String,
    pub min_delay: Duration,
    pub max_delay: Duration,
    pub request_timeout: Duration,
}

impl PollingConfig {
    pub fn new(tenant: &TenantConfig, settings: PollSettings) -> Self {
        Self {
            service_url: tenant.endpoint().to_string(),
            resource: tenant.resource(),
            token: tenant.token().to_string(),
            min_delay: settings.min_delay,
            max_delay: settings.max_delay,
            request_timeout: settings.request_timeout,
        }
    }

    /// Full URL of the bundle resource.
    pub fn bundle_url(&self) -> String {
        format!("{}{}", self.service_url.trim_end_matches('/'), self.resource)
    }

    /// Delay before the next poll. Failures back off exponentially up to
    /// `max_delay`.
    pub fn next_delay(&self, consecutive_failures: u32) -> Duration {
        let factor = 1u32.checked_shl(consecutive_failures.min(16)).unwrap_or(u32::MAX);
        self.min_delay
            .saturating_mul(factor)
            .clamp(self.min_delay, self.max_delay.max(self.min_delay))
    }
}

/// Snapshot of an engine's bundle state.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct EngineStatus {
    /// Whether any bundle has been activated yet.
    pub activated: bool,
    pub revision: Option<String>,
    pub etag: Option<String>,
    pub successful_polls: u64,
    pub failed_polls: u64,
    pub last_error: Option<String>,
}
