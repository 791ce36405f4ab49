//! Scripted delivery client shared by the worker and orchestrator tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::delivery::{DeliveryClient, Outcome};

type Script = Box<dyn Fn(&str, usize) -> Outcome + Send + Sync>;

#[derive(Debug, Clone)]
pub struct Call {
    pub credential: String,
    pub target: String,
    pub message: String,
    pub at: Instant,
}

/// Answers each send from a script keyed on (credential, call index) and
/// records every call it sees.
pub struct ScriptedClient {
    script: Script,
    calls: Mutex<Vec<Call>>,
    cancel_after: Option<(usize, CancellationToken)>,
    latency: Duration,
    identity: Option<String>,
    identify_latency: Duration,
    identify_calls: AtomicUsize,
}

impl ScriptedClient {
    pub fn new(script: impl Fn(&str, usize) -> Outcome + Send + Sync + 'static) -> Self {
        Self {
            script: Box::new(script),
            calls: Mutex::new(Vec::new()),
            cancel_after: None,
            latency: Duration::ZERO,
            identity: None,
            identify_latency: Duration::ZERO,
            identify_calls: AtomicUsize::new(0),
        }
    }

    pub fn always(outcome: Outcome) -> Self {
        Self::new(move |_, _| outcome.clone())
    }

    /// Cancel `token` once `calls` sends have completed.
    pub fn cancel_after(mut self, calls: usize, token: CancellationToken) -> Self {
        self.cancel_after = Some((calls, token));
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_identity(mut self, label: &str) -> Self {
        self.identity = Some(label.to_string());
        self
    }

    pub fn with_identity_latency(mut self, latency: Duration) -> Self {
        self.identify_latency = latency;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn credentials(&self) -> Vec<String> {
        self.calls.lock().iter().map(|c| c.credential.clone()).collect()
    }

    pub fn messages(&self) -> Vec<String> {
        self.calls.lock().iter().map(|c| c.message.clone()).collect()
    }

    pub fn targets(&self) -> Vec<String> {
        self.calls.lock().iter().map(|c| c.target.clone()).collect()
    }

    pub fn instants_for(&self, credential: &str) -> Vec<Instant> {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.credential == credential)
            .map(|c| c.at)
            .collect()
    }

    pub fn identify_calls(&self) -> usize {
        self.identify_calls.load(Ordering::SeqCst)
    }
}

impl DeliveryClient for ScriptedClient {
    async fn send(&self, credential: &str, target: &str, message: &str) -> Outcome {
        let at = Instant::now();
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let count = {
            let mut calls = self.calls.lock();
            calls.push(Call {
                credential: credential.to_string(),
                target: target.to_string(),
                message: message.to_string(),
                at,
            });
            calls.len()
        };

        let outcome = (self.script)(credential, count - 1);
        if let Some((limit, token)) = &self.cancel_after
            && count >= *limit
        {
            token.cancel();
        }
        outcome
    }

    async fn identify(&self, _credential: &str) -> Option<String> {
        self.identify_calls.fetch_add(1, Ordering::SeqCst);
        if !self.identify_latency.is_zero() {
            tokio::time::sleep(self.identify_latency).await;
        }
        self.identity.clone()
    }
}
