//! HTTP polling engine.
//!
//! One tokio task per engine fetches `GET {endpoint}/bundles/systems/{id}`
//! with a bearer token and `If-None-Match`, then swaps the parsed bundle in
//! whole. Readers clone the current `Arc<Bundle>` so they see either the old
//! or the new rule set, never a mix.

use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{header, StatusCode, Url};
use serde_json::Value;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use livepolicy_core::bundle::Bundle;
use livepolicy_core::error::{LivePolicyError, Result};

use super::{EngineHandle, EngineLauncher, EngineStatus, PollingConfig};

/// Launches [`HttpEngine`]s on the ambient tokio runtime.
#[derive(Debug, Default, Clone)]
pub struct HttpEngineLauncher;

impl HttpEngineLauncher {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EngineLauncher for HttpEngineLauncher {
    async fn start(&self, tenant_ref: &str, cfg: PollingConfig) -> Result<Arc<dyn EngineHandle>> {
        let url = Url::parse(&cfg.bundle_url())
            .map_err(|e| LivePolicyError::Start(format!("bundle url {}: {e}", cfg.bundle_url())))?;

        let client = reqwest::Client::builder()
            .timeout(cfg.request_timeout)
            .build()
            .map_err(|e| LivePolicyError::Start(format!("http client: {e}")))?;

        let state = Arc::new(EngineState::default());
        let cancel = CancellationToken::new();

        let poller = Poller {
            tenant: tenant_ref.to_string(),
            client,
            url,
            cfg,
            etag: None,
            state: Arc::clone(&state),
            cancel: cancel.clone(),
        };

        debug!(tenant = %tenant_ref, url = %poller.url, "spawning bundle poller");
        let task = tokio::spawn(poller.run());

        Ok(Arc::new(HttpEngine {
            state,
            cancel,
            task: Mutex::new(Some(task)),
        }))
    }
}

/// Rule state shared between the poller and decision callers.
#[derive(Default)]
struct EngineState {
    bundle: RwLock<Option<Arc<Bundle>>>,
    status: Mutex<EngineStatus>,
}

impl EngineState {
    fn current(&self) -> Result<Option<Arc<Bundle>>> {
        let g = self.bundle.read().unwrap_or_else(PoisonError::into_inner);
        Ok(g.clone())
    }

    /// Returns true when the revision changed.
    fn activate(&self, bundle: Bundle, etag: Option<String>) -> bool {
        let revision = bundle.revision.clone();
        let mut g = self.bundle.write().unwrap_or_else(PoisonError::into_inner);
        *g = Some(Arc::new(bundle));
        drop(g);

        self.update_status(|s| {
            let changed = !s.activated || s.revision != revision;
            s.activated = true;
            s.revision = revision;
            s.etag = etag;
            s.successful_polls += 1;
            s.last_error = None;
            changed
        })
        .unwrap_or(false)
    }

    fn record_unchanged(&self) {
        self.update_status(|s| {
            s.successful_polls += 1;
            s.last_error = None;
        });
    }

    fn record_failure(&self, err: &LivePolicyError) {
        self.update_status(|s| {
            s.failed_polls += 1;
            s.last_error = Some(err.to_string());
        });
    }

    fn update_status<T>(&self, f: impl FnOnce(&mut EngineStatus) -> T) -> Option<T> {
        // Poisoned status is not worth crashing the poller over.
        self.status.lock().ok().map(|mut g| f(&mut *g))
    }

    fn status(&self) -> EngineStatus {
        self.status.lock().map(|g| g.clone()).unwrap_or_default()
    }
}

struct Poller {
    tenant: String,
    client: reqwest::Client,
    url: Url,
    cfg: PollingConfig,
    etag: Option<String>,
    state: Arc<EngineState>,
    cancel: CancellationToken,
}

impl Poller {
    async fn run(mut self) {
        let cancel = self.cancel.clone();
        let mut failures: u32 = 0;

        loop {
            let polled = tokio::select! {
                _ = cancel.cancelled() => break,
                r = self.poll_once() => r,
            };

            match polled {
                Ok(()) => failures = 0,
                Err(e) => {
                    failures = failures.saturating_add(1);
                    warn!(tenant = %self.tenant, url = %self.url, failures, error = %e, "bundle poll failed");
                    self.state.record_failure(&e);
                }
            }

            let delay = self.cfg.next_delay(failures);
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        debug!(tenant = %self.tenant, "bundle poller stopped");
    }

    async fn poll_once(&mut self) -> Result<()> {
        let mut req = self.client.get(self.url.clone());
        if !self.cfg.token.is_empty() {
            req = req.bearer_auth(&self.cfg.token);
        }
        if let Some(etag) = &self.etag {
            req = req.header(header::IF_NONE_MATCH, etag.as_str());
        }

        let resp = req
            .send()
            .await
            .map_err(|e| LivePolicyError::Internal(format!("bundle request: {e}")))?;

        match resp.status() {
            StatusCode::NOT_MODIFIED => {
                self.state.record_unchanged();
                return Ok(());
            }
            s if s.is_success() => {}
            s => {
                return Err(LivePolicyError::Internal(format!("bundle service returned {s}")));
            }
        }

        let etag = resp
            .headers()
            .get(header::ETAG)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body: Bytes = resp
            .bytes()
            .await
            .map_err(|e| LivePolicyError::Internal(format!("bundle body: {e}")))?;

        let bundle = Bundle::from_slice(&body)?;
        let revision = bundle.revision.clone();

        if self.state.activate(bundle, etag.clone()) {
            info!(tenant = %self.tenant, revision = ?revision, "bundle activated");
        } else {
            debug!(tenant = %self.tenant, revision = ?revision, "bundle refreshed");
        }
        self.etag = etag;

        Ok(())
    }
}

/// Handle to a running HTTP polling engine.
pub struct HttpEngine {
    state: Arc<EngineState>,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl HttpEngine {
    fn take_task(&self) -> Option<JoinHandle<()>> {
        match self.task.lock() {
            Ok(mut g) => g.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        }
    }
}

#[async_trait]
impl EngineHandle for HttpEngine {
    fn decide(&self, path: &str, input: &Value) -> Result<Value> {
        let bundle = self
            .state
            .current()?
            .ok_or_else(|| LivePolicyError::Eval("no bundle activated".into()))?;
        bundle.evaluate(path, input)
    }

    async fn stop(&self, deadline: Duration) -> Result<()> {
        self.cancel.cancel();

        let Some(task) = self.take_task() else {
            return Ok(());
        };

        match tokio::time::timeout(deadline, task).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(LivePolicyError::Stop(format!("poller task failed: {e}"))),
            Err(_) => Err(LivePolicyError::Stop(format!(
                "poller did not stop within {deadline:?}"
            ))),
        }
    }

    fn status(&self) -> EngineStatus {
        self.state.status()
    }
}

impl Drop for HttpEngine {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bundle(revision: &str) -> Bundle {
        let doc = format!(r#"{{"revision":"{revision}","rules":{{"policy/allow":{{"default":true}}}}}}"#);
        Bundle::from_slice(doc.as_bytes()).expect("bundle")
    }

    #[test]
    fn activation_survives_a_poisoned_bundle_lock() {
        let state = Arc::new(EngineState::default());
        let poisoner = Arc::clone(&state);
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.bundle.write().expect("lock");
            panic!("poison the bundle lock");
        })
        .join();
        assert!(state.bundle.is_poisoned());

        assert!(state.activate(bundle("r1"), Some("r1".into())));

        let current = state.current().expect("current").expect("activated bundle");
        assert_eq!(current.revision.as_deref(), Some("r1"));
        let status = state.status();
        assert!(status.activated);
        assert_eq!(status.revision.as_deref(), Some("r1"));
        assert_eq!(status.successful_polls, 1);
    }
}
