//! Tenant references and per-tenant engine configuration.
//!
//! Both the tenant reference and the system id end up inside URLs (admin
//! routes and the bundle resource path), so they are restricted to RFC 3986
//! unreserved characters.

use std::fmt;

use serde::Serialize;
use url::Url;

use crate::error::{LivePolicyError, Result};

const MAX_SEGMENT_LEN: usize = 128;

/// Validate a caller-chosen tenant reference.
pub fn validate_tenant_ref(tenant_ref: &str) -> Result<()> {
    validate_segment("ref", tenant_ref)
}

fn validate_segment(field: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(LivePolicyError::Config(format!("{field} must be provided")));
    }
    if value.len() > MAX_SEGMENT_LEN {
        return Err(LivePolicyError::Config(format!(
            "{field} must be at most {MAX_SEGMENT_LEN} bytes"
        )));
    }
    if value == "." || value == ".." {
        return Err(LivePolicyError::Config(format!("{field} must not be a dot segment")));
    }
    if let Some(c) = value.chars().find(|c| !is_unreserved(*c)) {
        return Err(LivePolicyError::Config(format!(
            "{field} contains invalid character {c:?} (allowed: A-Z a-z 0-9 . _ ~ -)"
        )));
    }
    Ok(())
}

fn is_unreserved(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | '~')
}

/// Normalize a bundle service endpoint.
///
/// `http://` is prepended when no scheme is given; the result must be an
/// absolute URL with a host.
pub fn normalize_endpoint(endpoint: &str) -> Result<String> {
    let endpoint = endpoint.trim();
    if endpoint.is_empty() {
        return Err(LivePolicyError::Config("endpoint must be provided".into()));
    }

    let normalized = if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        endpoint.to_string()
    } else {
        format!("http://{endpoint}")
    };

    let parsed = Url::parse(&normalized)
        .map_err(|e| LivePolicyError::Config(format!("endpoint {normalized:?} is not a valid URL: {e}")))?;
    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(LivePolicyError::Config(format!("endpoint {normalized:?} has no host")));
    }

    Ok(normalized)
}

/// Immutable configuration for one tenant's engine.
///
/// Changing any field means deleting and re-adding the tenant.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct TenantConfig {
    system_id: String,
    #[serde(skip_serializing)]
    token: String,
    endpoint: String,
}

impl TenantConfig {
    pub fn new(system_id: &str, token: &str, endpoint: &str) -> Result<Self> {
        let endpoint = normalize_endpoint(endpoint)?;
        validate_segment("system_id", system_id)?;
        Ok(Self {
            system_id: system_id.to_string(),
            token: token.to_string(),
            endpoint,
        })
    }

    pub fn system_id(&self) -> &str {
        &self.system_id
    }

    /// Bearer credential presented to the bundle service.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Normalized service base URL.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Bundle resource path requested from the service.
    pub fn resource(&self) -> String {
        format!("/bundles/systems/{}", self.system_id)
    }
}

impl fmt::Debug for TenantConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TenantConfig")
            .field("system_id", &self.system_id)
            .field("token", &"<redacted>")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}
