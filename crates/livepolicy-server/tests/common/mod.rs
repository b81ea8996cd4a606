#![allow(dead_code)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use livepolicy_core::error::{LivePolicyError, Result};
use livepolicy_server::app_state::AppState;
use livepolicy_server::config::{self, ServerConfig};
use livepolicy_server::engine::{EngineHandle, EngineLauncher, EngineStatus, PollingConfig};

/// What a fake engine answers.
#[derive(Debug, Clone)]
pub enum FakeDecision {
    AllowNames(Vec<String>),
    Value(Value),
    Fail(String),
}

impl Default for FakeDecision {
    fn default() -> Self {
        FakeDecision::AllowNames(vec!["alice".into(), "bob".into()])
    }
}

/// In-memory launcher; every engine gets a sequential id exposed as its
/// status revision (`engine-N`).
#[derive(Default)]
pub struct FakeLauncher {
    pub fail_start: AtomicBool,
    pub fail_stop: AtomicBool,
    /// Engines started while set ignore the stop deadline and never finish.
    pub hang_stop: AtomicBool,
    pub started: AtomicUsize,
    pub stopped: Arc<AtomicUsize>,
    pub decision: Mutex<FakeDecision>,
    pub configs: Mutex<Vec<(String, PollingConfig)>>,
}

impl FakeLauncher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_decision(&self, d: FakeDecision) {
        *self.decision.lock().unwrap() = d;
    }

    pub fn last_config(&self) -> Option<(String, PollingConfig)> {
        self.configs.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl EngineLauncher for FakeLauncher {
    async fn start(&self, tenant_ref: &str, cfg: PollingConfig) -> Result<Arc<dyn EngineHandle>> {
        if self.fail_start.load(Ordering::SeqCst) {
            return Err(LivePolicyError::Start("bundle service unreachable".into()));
        }
        let id = self.started.fetch_add(1, Ordering::SeqCst) + 1;
        self.configs.lock().unwrap().push((tenant_ref.to_string(), cfg));

        Ok(Arc::new(FakeEngine {
            id,
            decision: self.decision.lock().unwrap().clone(),
            fail_stop: self.fail_stop.load(Ordering::SeqCst),
            hang_stop: self.hang_stop.load(Ordering::SeqCst),
            stopped: AtomicBool::new(false),
            stop_counter: Arc::clone(&self.stopped),
        }))
    }
}

pub struct FakeEngine {
    id: usize,
    decision: FakeDecision,
    fail_stop: bool,
    hang_stop: bool,
    stopped: AtomicBool,
    stop_counter: Arc<AtomicUsize>,
}

#[async_trait]
impl EngineHandle for FakeEngine {
    fn decide(&self, _path: &str, input: &Value) -> Result<Value> {
        match &self.decision {
            FakeDecision::AllowNames(names) => {
                let name = input.get("name").and_then(Value::as_str).unwrap_or_default();
                Ok(Value::Bool(names.iter().any(|n| n == name)))
            }
            FakeDecision::Value(v) => Ok(v.clone()),
            FakeDecision::Fail(msg) => Err(LivePolicyError::Eval(msg.clone())),
        }
    }

    async fn stop(&self, _deadline: Duration) -> Result<()> {
        if !self.stopped.swap(true, Ordering::SeqCst) {
            self.stop_counter.fetch_add(1, Ordering::SeqCst);
        }
        if self.hang_stop {
            std::future::pending::<()>().await;
        }
        if self.fail_stop {
            return Err(LivePolicyError::Stop("engine wedged".into()));
        }
        Ok(())
    }

    fn status(&self) -> EngineStatus {
        EngineStatus {
            activated: true,
            revision: Some(format!("engine-{}", self.id)),
            ..EngineStatus::default()
        }
    }
}

pub fn test_config() -> ServerConfig {
    config::load_from_str("port: 8080\nshutdown_timeout_ms: 500\n").expect("test config")
}

pub fn fake_state() -> (AppState, Arc<FakeLauncher>) {
    let launcher = FakeLauncher::new();
    let state = AppState::with_launcher(test_config(), launcher.clone());
    (state, launcher)
}

/// Poll `check` until it returns true or `within` elapses.
pub async fn eventually<F, Fut>(within: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + within;
    loop {
        if check().await {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
}
