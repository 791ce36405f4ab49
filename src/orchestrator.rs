use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::delivery::DeliveryClient;
use crate::error::{Result, RotorError};
use crate::export::{JsonFileSink, LogSink};
use crate::job::{JobId, JobPolicy, JobSnapshot, JobState, Phase, ResourceSet};
use crate::worker::WorkerLoop;

/// Process-wide knobs that are not per-job policy.
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// How long a finished job stays queryable before it is evicted.
    pub retention: Duration,
    /// Write every finished job's attempts to `<dir>/<id>.json`.
    pub export_dir: Option<PathBuf>,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            retention: Duration::from_secs(600),
            export_dir: None,
        }
    }
}

struct JobEntry {
    state: Arc<RwLock<JobState>>,
    cancel: CancellationToken,
}

impl JobEntry {
    fn snapshot(&self) -> JobSnapshot {
        let mut snapshot = {
            let state = self.state.read();
            state.snapshot(state.log_capacity)
        };
        // Cancellation is asynchronous: report it before the worker gets there.
        if snapshot.phase == Phase::Running && self.cancel.is_cancelled() {
            snapshot.phase = Phase::Stopping;
        }
        snapshot
    }
}

type Registry = Arc<RwLock<HashMap<JobId, JobEntry>>>;

/// Owns every running job: starts workers, routes cancellations, serves
/// status snapshots and evicts finished jobs after the retention period.
pub struct Orchestrator<C: DeliveryClient> {
    client: Arc<C>,
    settings: OrchestratorSettings,
    sink: Option<Arc<dyn LogSink>>,
    registry: Registry,
    root: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl<C: DeliveryClient> Orchestrator<C> {
    pub fn new(client: Arc<C>, settings: OrchestratorSettings) -> Self {
        let sink = settings
            .export_dir
            .clone()
            .map(|dir| Arc::new(JsonFileSink::new(dir)) as Arc<dyn LogSink>);
        Self {
            client,
            settings,
            sink,
            registry: Arc::new(RwLock::new(HashMap::new())),
            root: CancellationToken::new(),
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Validate raw line-oriented inputs and start a job from them.
    pub fn start_from_text(
        &self,
        credentials: &str,
        messages: &str,
        targets: &str,
        prefix: Option<String>,
        suffix: Option<String>,
        policy: JobPolicy,
    ) -> Result<JobId> {
        let resources = ResourceSet::from_text(credentials, messages, targets, prefix, suffix)?;
        self.start(resources, policy)
    }

    /// Register a new job and spawn its worker. Returns without waiting for
    /// the first attempt.
    pub fn start(&self, resources: ResourceSet, policy: JobPolicy) -> Result<JobId> {
        policy.validate()?;

        let id = JobId::new();
        let state = Arc::new(RwLock::new(JobState::new(
            id.clone(),
            policy.log_capacity,
            resources.credentials().len(),
        )));
        let cancel = self.root.child_token();

        self.registry.write().insert(
            id.clone(),
            JobEntry {
                state: state.clone(),
                cancel: cancel.clone(),
            },
        );

        let worker = WorkerLoop::new(resources, policy, self.client.clone(), state, cancel)
            .with_sink(self.sink.clone());
        let registry = self.registry.clone();
        let root = self.root.clone();
        let retention = self.settings.retention;
        let job_id = id.clone();

        let handle = tokio::spawn(async move {
            let phase = worker.run().await;
            debug!(job_id = %job_id, %phase, ?retention, "retaining finished job");
            tokio::select! {
                _ = sleep(retention) => {}
                _ = root.cancelled() => {}
            }
            registry.write().remove(&job_id);
            debug!(job_id = %job_id, "job evicted");
        });

        let mut tasks = self.tasks.lock();
        tasks.retain(|task| !task.is_finished());
        tasks.push(handle);

        info!(job_id = %id, "job accepted");
        Ok(id)
    }

    /// Ask a job to stop. Returns immediately; the worker stops at its next
    /// check point.
    pub fn cancel(&self, id: &JobId) -> Result<()> {
        let registry = self.registry.read();
        let entry = registry
            .get(id)
            .ok_or_else(|| RotorError::UnknownJob(id.clone()))?;
        entry.cancel.cancel();
        info!(job_id = %id, "cancellation requested");
        Ok(())
    }

    /// Status of a job. Unknown ids yield an idle, zero-valued snapshot so a
    /// client may poll right after [`start`](Self::start).
    pub fn query(&self, id: &JobId) -> JobSnapshot {
        self.try_query(id)
            .unwrap_or_else(|_| JobSnapshot::idle(id.clone()))
    }

    /// Like [`query`](Self::query), but unknown or evicted ids are an error.
    pub fn try_query(&self, id: &JobId) -> Result<JobSnapshot> {
        self.registry
            .read()
            .get(id)
            .map(JobEntry::snapshot)
            .ok_or_else(|| RotorError::UnknownJob(id.clone()))
    }

    /// Snapshots of every registered job, oldest first.
    pub fn jobs(&self) -> Vec<JobSnapshot> {
        let mut jobs: Vec<_> = self
            .registry
            .read()
            .values()
            .map(JobEntry::snapshot)
            .collect();
        jobs.sort_by_key(|job| job.started_at);
        jobs
    }

    /// Cancel every job and wait for all workers (and their retention
    /// timers) to finish.
    pub async fn shutdown(&self) {
        self.root.cancel();
        let tasks = std::mem::take(&mut *self.tasks.lock());
        info!(jobs = tasks.len(), "shutting down");
        for task in tasks {
            if let Err(e) = task.await {
                error!(error = %e, "worker task failed");
            }
        }
    }
}
