use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

use livepolicy_core::error::{LivePolicyError, Result};
use livepolicy_core::tenant::{validate_tenant_ref, TenantConfig};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    #[serde(default = "default_address")]
    pub address: String,

    pub port: u16,

    #[serde(default = "default_shutdown_timeout_ms")]
    pub shutdown_timeout_ms: u64,

    #[serde(default)]
    pub engine: EngineSection,

    /// Tenants registered at startup, keyed by tenant reference.
    #[serde(default)]
    pub opas: BTreeMap<String, TenantSection>,
}

impl ServerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(LivePolicyError::BadRequest("port must be between 1 and 65535".into()));
        }
        if self.address.trim().is_empty() {
            return Err(LivePolicyError::BadRequest("address must not be empty".into()));
        }
        if self.shutdown_timeout_ms == 0 {
            return Err(LivePolicyError::BadRequest("shutdown_timeout_ms must be positive".into()));
        }

        self.engine.validate()?;

        for (tenant_ref, t) in &self.opas {
            validate_tenant_ref(tenant_ref)
                .and_then(|_| t.tenant_config())
                .map_err(|e| LivePolicyError::BadRequest(format!("opas.{tenant_ref}: {e}")))?;
        }

        Ok(())
    }

    /// `address:port` as handed to the listener.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineSection {
    #[serde(default = "default_poll_delay_ms")]
    pub poll_min_delay_ms: u64,

    #[serde(default = "default_poll_delay_ms")]
    pub poll_max_delay_ms: u64,

    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            poll_min_delay_ms: default_poll_delay_ms(),
            poll_max_delay_ms: default_poll_delay_ms(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl EngineSection {
    pub fn validate(&self) -> Result<()> {
        if self.poll_min_delay_ms == 0 {
            return Err(LivePolicyError::BadRequest(
                "engine.poll_min_delay_ms must be positive".into(),
            ));
        }
        if self.poll_max_delay_ms < self.poll_min_delay_ms {
            return Err(LivePolicyError::BadRequest(
                "engine.poll_max_delay_ms must not be less than poll_min_delay_ms".into(),
            ));
        }
        if self.request_timeout_ms == 0 {
            return Err(LivePolicyError::BadRequest(
                "engine.request_timeout_ms must be positive".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TenantSection {
    pub endpoint: String,
    #[serde(default)]
    pub token: String,
    pub system_id: String,
}

impl TenantSection {
    pub fn tenant_config(&self) -> Result<TenantConfig> {
        TenantConfig::new(&self.system_id, &self.token, &self.endpoint)
    }
}

fn default_address() -> String {
    "127.0.0.1".into()
}
fn default_shutdown_timeout_ms() -> u64 {
    2000
}
fn default_poll_delay_ms() -> u64 {
    1000
}
fn default_request_timeout_ms() -> u64 {
    5000
}
