use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::RwLock;
use tokio::time::{Instant, sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::delivery::{DeliveryClient, Outcome};
use crate::export::{JobReport, LogSink};
use crate::job::{
    CredentialPool, DelayTrigger, DeliveryAttempt, JobId, JobPolicy, JobState, Phase, ResourceSet,
    credential_ref,
};

/// Drives one job: pick a credential, wait out its cooldown, send, record,
/// pace, repeat. Exits only on cancellation or when every credential has
/// been invalidated.
pub struct WorkerLoop<C: DeliveryClient> {
    id: JobId,
    resources: ResourceSet,
    policy: JobPolicy,
    client: Arc<C>,
    state: Arc<RwLock<JobState>>,
    cancel: CancellationToken,
    sink: Option<Arc<dyn LogSink>>,
    pool: CredentialPool,
    /// Rotation sequence for messages and targets; independent of the credential cursor.
    sequence: u64,
    identities: HashMap<usize, Option<String>>,
    exported: Vec<DeliveryAttempt>,
}

impl<C: DeliveryClient> WorkerLoop<C> {
    pub fn new(
        resources: ResourceSet,
        policy: JobPolicy,
        client: Arc<C>,
        state: Arc<RwLock<JobState>>,
        cancel: CancellationToken,
    ) -> Self {
        let id = state.read().id.clone();
        let pool = CredentialPool::new(resources.credentials().len());
        Self {
            id,
            resources,
            policy,
            client,
            state,
            cancel,
            sink: None,
            pool,
            sequence: 0,
            identities: HashMap::new(),
            exported: Vec::new(),
        }
    }

    pub fn with_sink(mut self, sink: Option<Arc<dyn LogSink>>) -> Self {
        self.sink = sink;
        self
    }

    /// Run until a terminal phase is reached and return it.
    pub async fn run(mut self) -> Phase {
        info!(
            job_id = %self.id,
            credentials = self.resources.credentials().len(),
            messages = self.resources.messages().len(),
            targets = self.resources.targets().len(),
            "job started"
        );

        let phase = self.drive().await;
        self.finish(phase).await;
        phase
    }

    async fn drive(&mut self) -> Phase {
        if self.policy.delay.delay_before_first {
            self.pause(self.policy.delay.next_delay()).await;
        }

        loop {
            if self.cancel.is_cancelled() {
                return Phase::Stopped;
            }

            let Some(index) = self.pool.current() else {
                return Phase::Exhausted;
            };

            if let Some(remaining) = self
                .pool
                .health(index)
                .cooldown_remaining(Instant::now(), self.policy.cooldown)
            {
                self.pause(remaining.min(self.policy.poll_interval)).await;
                continue;
            }

            let identity = self.identity_for(index).await;
            if self.cancel.is_cancelled() {
                return Phase::Stopped;
            }

            let wait = self.attempt(index, identity).await;
            self.pause(wait).await;
        }
    }

    /// Perform one send with the credential at `index` and return how long to
    /// wait before the next iteration.
    async fn attempt(&mut self, index: usize, identity: Option<String>) -> Duration {
        let sequence = self.sequence;
        let credential = self.resources.credentials()[index].clone();
        let target = self.resources.target_at(sequence).to_string();
        let rendered = self.resources.render(
            self.resources.message_at(sequence),
            &self.policy.disallowed_fragments,
        );

        let outcome = match timeout(
            self.policy.request_timeout,
            self.client.send(&credential, &target, &rendered),
        )
        .await
        {
            Ok(outcome) => outcome,
            Err(_) => Outcome::Transient("request timed out".into()),
        };
        self.pool.mark_used(index, Instant::now());

        let credential_ref = credential_ref(index, &credential);
        let wait = match &outcome {
            Outcome::Success => {
                debug!(job_id = %self.id, sequence, credential = %credential_ref, "delivered");
                self.sequence += 1;
                self.pool.advance();
                self.policy.delay.next_delay()
            }
            Outcome::Transient(reason) => {
                debug!(job_id = %self.id, sequence, credential = %credential_ref, %reason, "delivery failed");
                self.sequence += 1;
                self.pool.advance();
                match self.policy.delay.delay_on {
                    DelayTrigger::Always => self.policy.delay.next_delay(),
                    DelayTrigger::SuccessOnly => Duration::ZERO,
                }
            }
            Outcome::Fatal { reason, detail } => {
                self.pool.invalidate(index);
                warn!(
                    job_id = %self.id,
                    credential = %credential_ref,
                    %reason,
                    remaining = self.pool.valid_count(),
                    "dropping credential: {detail}"
                );
                if self.policy.delay.delay_after_fatal {
                    self.policy.delay.next_delay()
                } else {
                    Duration::ZERO
                }
            }
        };

        let attempt = DeliveryAttempt {
            sequence_number: sequence,
            credential_ref,
            identity,
            target,
            rendered_message: rendered,
            outcome: outcome.into(),
            timestamp: Utc::now(),
        };
        if self.sink.is_some() {
            self.exported.push(attempt.clone());
        }

        let mut state = self.state.write();
        state.credentials_valid = self.pool.valid_count();
        state.record(attempt);

        wait
    }

    /// Owner label for the credential at `index`, looked up once and cached.
    /// The lookup shares the send timeout and gives up on cancellation; an
    /// expired lookup is cached as unknown.
    async fn identity_for(&mut self, index: usize) -> Option<String> {
        if !self.policy.resolve_identity {
            return None;
        }
        if let Some(cached) = self.identities.get(&index) {
            return cached.clone();
        }

        let credential = &self.resources.credentials()[index];
        let label = tokio::select! {
            _ = self.cancel.cancelled() => return None,
            looked_up = timeout(self.policy.request_timeout, self.client.identify(credential)) => {
                looked_up.unwrap_or_else(|_| {
                    debug!(job_id = %self.id, index, "identity lookup timed out");
                    None
                })
            }
        };
        self.identities.insert(index, label.clone());
        label
    }

    /// Sleep for `duration`, waking early on cancellation. A zero duration
    /// still yields so a busy job cannot starve the runtime.
    async fn pause(&self, duration: Duration) {
        if duration.is_zero() {
            tokio::task::yield_now().await;
            return;
        }
        tokio::select! {
            _ = self.cancel.cancelled() => {}
            _ = sleep(duration) => {}
        }
    }

    async fn finish(&mut self, phase: Phase) {
        if phase == Phase::Stopped {
            self.state.write().phase = Phase::Stopping;
        }

        if let Some(sink) = self.sink.clone() {
            let report = JobReport {
                summary: {
                    let state = self.state.read();
                    let mut summary = state.snapshot(0);
                    summary.phase = phase;
                    summary
                },
                attempts: std::mem::take(&mut self.exported),
            };
            match tokio::task::spawn_blocking(move || sink.export(&report)).await {
                Ok(Ok(())) => debug!(job_id = %self.id, "job log exported"),
                Ok(Err(e)) => error!(job_id = %self.id, error = %e, "failed to export job log"),
                Err(e) => error!(job_id = %self.id, error = %e, "export task panicked"),
            }
        }

        let mut state = self.state.write();
        state.finish(phase);
        info!(
            job_id = %self.id,
            phase = %phase,
            success = state.success_count,
            failed = state.failed_count,
            "job finished"
        );
    }
}
