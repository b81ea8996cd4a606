//! Decision router: tenant reference + path + input -> decision.
//!
//! Resolves the engine through the registry and forwards the request.
//! Failures come back as three distinct kinds: `NotFound` (unknown tenant),
//! `Eval` (engine could not evaluate) and `Shape` (result was not what the
//! caller asked for). None of them are retried here.

use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tracing::debug;

use livepolicy_core::error::{LivePolicyError, Result};

use crate::obs::ServerMetrics;
use crate::registry::TenantRegistry;

pub struct DecisionRouter {
    registry: Arc<TenantRegistry>,
    metrics: Arc<ServerMetrics>,
}

impl DecisionRouter {
    pub fn new(registry: Arc<TenantRegistry>, metrics: Arc<ServerMetrics>) -> Self {
        Self { registry, metrics }
    }

    /// Evaluate `path` for `tenant_ref` and return the raw result.
    pub async fn decide(&self, tenant_ref: &str, path: &str, input: &Value) -> Result<Value> {
        let started = Instant::now();
        let res = self.evaluate(tenant_ref, path, input).await;
        self.record(outcome(&res, |_| "value"), started);
        res
    }

    /// Evaluate `path` and require a boolean result.
    pub async fn decide_bool(&self, tenant_ref: &str, path: &str, input: &Value) -> Result<bool> {
        let started = Instant::now();
        let res = self.evaluate(tenant_ref, path, input).await.and_then(|v| {
            v.as_bool().ok_or_else(|| {
                LivePolicyError::Shape(format!("expected boolean at {path}, got {}", kind(&v)))
            })
        });
        self.record(outcome(&res, |b| if *b { "allow" } else { "deny" }), started);
        res
    }

    async fn evaluate(&self, tenant_ref: &str, path: &str, input: &Value) -> Result<Value> {
        let handle = self
            .registry
            .get(tenant_ref)
            .await
            .ok_or_else(|| LivePolicyError::NotFound(format!("tenant {tenant_ref}")))?;

        // The registry lock is already released; the engine handles
        // concurrent readers on its own.
        handle.decide(path, input).map_err(|e| match e {
            LivePolicyError::Eval(_) => e,
            other => LivePolicyError::Eval(other.to_string()),
        })
    }

    fn record(&self, outcome: &'static str, started: Instant) {
        debug!(outcome, elapsed_us = started.elapsed().as_micros() as u64, "decision evaluated");
        self.metrics.decisions.inc(&[("outcome", outcome)]);
        self.metrics.decision_latency.observe(&[], started.elapsed());
    }
}

fn outcome<T>(res: &Result<T>, ok: impl FnOnce(&T) -> &'static str) -> &'static str {
    match res {
        Ok(v) => ok(v),
        Err(LivePolicyError::NotFound(_)) => "not_found",
        Err(LivePolicyError::Shape(_)) => "shape_error",
        Err(_) => "eval_error",
    }
}

fn kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
