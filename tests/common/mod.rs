//! Shared mock providers for integration testing.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use provider_kit::provider::{Closeable, Initializable};
use provider_kit::{BoxError, Context, Provider, RequestResponse};

/// Request/response provider with scripted failures.
pub struct ScriptedProvider {
    name: String,
    calls: AtomicU32,
    fail_first: AtomicU32,
    always_fail: AtomicBool,
    available: AtomicBool,
    closed: AtomicBool,
    fail_init: bool,
}

impl ScriptedProvider {
    pub fn new(name: &str) -> Arc<Self> {
        Self::build(name, 0, false)
    }

    /// Fails the first `n` calls, then succeeds.
    pub fn failing_first(name: &str, n: u32) -> Arc<Self> {
        Self::build(name, n, false)
    }

    pub fn failing_init(name: &str) -> Arc<Self> {
        Self::build(name, 0, true)
    }

    fn build(name: &str, fail_first: u32, fail_init: bool) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            calls: AtomicU32::new(0),
            fail_first: AtomicU32::new(fail_first),
            always_fail: AtomicBool::new(false),
            available: AtomicBool::new(true),
            closed: AtomicBool::new(false),
            fail_init,
        })
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_available(&self, up: bool) {
        self.available.store(up, Ordering::SeqCst);
    }

    pub fn set_always_fail(&self, fail: bool) {
        self.always_fail.store(fail, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn is_available(&self, _ctx: &Context) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    fn as_initializable(&self) -> Option<&dyn Initializable> {
        Some(self)
    }

    fn as_closeable(&self) -> Option<&dyn Closeable> {
        Some(self)
    }
}

#[async_trait]
impl Initializable for ScriptedProvider {
    async fn init(&self, _ctx: &Context) -> Result<(), BoxError> {
        if self.fail_init {
            return Err(format!("{} refused to start", self.name).into());
        }
        Ok(())
    }
}

#[async_trait]
impl Closeable for ScriptedProvider {
    async fn close(&self, _ctx: &Context) -> Result<(), BoxError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl RequestResponse<String, String> for ScriptedProvider {
    async fn execute(&self, _ctx: &Context, input: String) -> Result<String, BoxError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.always_fail.load(Ordering::SeqCst) || n <= self.fail_first.load(Ordering::SeqCst) {
            return Err(format!("{} failed call {n}", self.name).into());
        }
        Ok(format!("{}:{input}", self.name))
    }
}

pub type Shared = Arc<dyn RequestResponse<String, String>>;

pub fn shared(provider: &Arc<ScriptedProvider>) -> Shared {
    provider.clone()
}
