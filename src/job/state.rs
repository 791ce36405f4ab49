use std::collections::VecDeque;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque job identifier handed out by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for JobId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for JobId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle phase of a job.
///
/// `Idle` is only ever reported for ids the orchestrator does not (yet) know.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Running,
    Stopping,
    Stopped,
    Exhausted,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Stopped | Phase::Exhausted)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Idle => write!(f, "IDLE"),
            Phase::Running => write!(f, "RUNNING"),
            Phase::Stopping => write!(f, "STOPPING"),
            Phase::Stopped => write!(f, "STOPPED"),
            Phase::Exhausted => write!(f, "EXHAUSTED"),
        }
    }
}

/// Why a credential was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FatalReason {
    InvalidCredential,
}

impl fmt::Display for FatalReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FatalReason::InvalidCredential => write!(f, "invalid credential"),
        }
    }
}

/// Recorded result of one attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AttemptOutcome {
    Success,
    TransientFailure { reason: String },
    FatalFailure { reason: FatalReason, detail: String },
}

impl AttemptOutcome {
    fn label(&self) -> String {
        match self {
            AttemptOutcome::Success => "OK".to_string(),
            AttemptOutcome::TransientFailure { reason } => format!("FAILED ({reason})"),
            AttemptOutcome::FatalFailure { reason, .. } => format!("DROPPED ({reason})"),
        }
    }
}

/// One send performed by a worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryAttempt {
    pub sequence_number: u64,
    pub credential_ref: String,
    pub identity: Option<String>,
    pub target: String,
    pub rendered_message: String,
    pub outcome: AttemptOutcome,
    pub timestamp: DateTime<Utc>,
}

impl DeliveryAttempt {
    /// One-line human readable rendering, e.g.
    /// `[14:02:11] [Profile] Ana => 1234 => hello => OK`.
    pub fn log_line(&self) -> String {
        let who = self.identity.as_deref().unwrap_or(&self.credential_ref);
        format!(
            "[{}] {who} => {} => {} => {}",
            self.timestamp.format("%H:%M:%S"),
            self.target,
            self.rendered_message,
            self.outcome.label()
        )
    }
}

/// Mask a credential for logs: its index and a short prefix, never the full secret.
pub fn credential_ref(index: usize, credential: &str) -> String {
    let head: String = credential.chars().take(6).collect();
    if head.len() < credential.len() {
        format!("#{index} {head}…")
    } else {
        format!("#{index} {head}")
    }
}

/// Mutable record for one job. Written only by its worker; readers take
/// [`JobSnapshot`]s.
#[derive(Debug, Clone)]
pub struct JobState {
    pub id: JobId,
    pub phase: Phase,
    pub success_count: u64,
    pub failed_count: u64,
    pub log: VecDeque<DeliveryAttempt>,
    pub log_capacity: usize,
    pub last_attempt: Option<DeliveryAttempt>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub credentials_total: usize,
    pub credentials_valid: usize,
}

impl JobState {
    pub fn new(id: JobId, log_capacity: usize, credentials_total: usize) -> Self {
        Self {
            id,
            phase: Phase::Running,
            success_count: 0,
            failed_count: 0,
            log: VecDeque::with_capacity(log_capacity),
            log_capacity,
            last_attempt: None,
            started_at: Utc::now(),
            finished_at: None,
            credentials_total,
            credentials_valid: credentials_total,
        }
    }

    /// Count and log one attempt. The oldest entry is dropped once the ring is full.
    pub fn record(&mut self, attempt: DeliveryAttempt) {
        match attempt.outcome {
            AttemptOutcome::Success => self.success_count += 1,
            _ => self.failed_count += 1,
        }
        if self.log.len() == self.log_capacity {
            self.log.pop_front();
        }
        self.log.push_back(attempt.clone());
        self.last_attempt = Some(attempt);
    }

    /// Move to a terminal phase. Terminal phases are sticky.
    pub fn finish(&mut self, phase: Phase) {
        if self.phase.is_terminal() {
            return;
        }
        self.phase = phase;
        if phase.is_terminal() {
            self.finished_at = Some(Utc::now());
        }
    }

    pub fn snapshot(&self, recent: usize) -> JobSnapshot {
        let skip = self.log.len().saturating_sub(recent);
        JobSnapshot {
            id: self.id.clone(),
            phase: self.phase,
            success_count: self.success_count,
            failed_count: self.failed_count,
            recent: self.log.iter().skip(skip).cloned().collect(),
            last_attempt: self.last_attempt.clone(),
            last_log: self
                .last_attempt
                .as_ref()
                .map(DeliveryAttempt::log_line)
                .unwrap_or_else(|| "Waiting...".to_string()),
            started_at: Some(self.started_at),
            finished_at: self.finished_at,
            credentials_total: self.credentials_total,
            credentials_valid: self.credentials_valid,
        }
    }
}

/// Read-only copy of a job's progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub id: JobId,
    pub phase: Phase,
    pub success_count: u64,
    pub failed_count: u64,
    pub recent: Vec<DeliveryAttempt>,
    pub last_attempt: Option<DeliveryAttempt>,
    pub last_log: String,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub credentials_total: usize,
    pub credentials_valid: usize,
}

impl JobSnapshot {
    /// Zero-value snapshot for an id nobody is running (yet).
    pub fn idle(id: JobId) -> Self {
        Self {
            id,
            phase: Phase::Idle,
            success_count: 0,
            failed_count: 0,
            recent: Vec::new(),
            last_attempt: None,
            last_log: "Waiting...".to_string(),
            started_at: None,
            finished_at: None,
            credentials_total: 0,
            credentials_valid: 0,
        }
    }

    pub fn attempts(&self) -> u64 {
        self.success_count + self.failed_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attempt(seq: u64, outcome: AttemptOutcome) -> DeliveryAttempt {
        DeliveryAttempt {
            sequence_number: seq,
            credential_ref: credential_ref(0, "secret-token"),
            identity: None,
            target: "t1".into(),
            rendered_message: "hello".into(),
            outcome,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn record_updates_counters() {
        let mut state = JobState::new(JobId::new(), 10, 1);
        state.record(attempt(0, AttemptOutcome::Success));
        state.record(attempt(
            1,
            AttemptOutcome::TransientFailure {
                reason: "status 500".into(),
            },
        ));
        state.record(attempt(
            1,
            AttemptOutcome::FatalFailure {
                reason: FatalReason::InvalidCredential,
                detail: "token expired".into(),
            },
        ));
        assert_eq!(state.success_count, 1);
        assert_eq!(state.failed_count, 2);
        assert_eq!(state.log.len(), 3);
        assert_eq!(state.last_attempt.as_ref().unwrap().sequence_number, 1);
    }

    #[test]
    fn ring_log_drops_oldest() {
        let mut state = JobState::new(JobId::new(), 3, 1);
        for seq in 0..5 {
            state.record(attempt(seq, AttemptOutcome::Success));
        }
        let seqs: Vec<_> = state.log.iter().map(|a| a.sequence_number).collect();
        assert_eq!(seqs, vec![2, 3, 4]);
        assert_eq!(state.success_count, 5);
    }

    #[test]
    fn snapshot_limits_recent_entries() {
        let mut state = JobState::new(JobId::new(), 10, 1);
        for seq in 0..6 {
            state.record(attempt(seq, AttemptOutcome::Success));
        }
        let snap = state.snapshot(2);
        let seqs: Vec<_> = snap.recent.iter().map(|a| a.sequence_number).collect();
        assert_eq!(seqs, vec![4, 5]);
        assert_eq!(snap.attempts(), 6);
    }

    #[test]
    fn terminal_phase_is_sticky() {
        let mut state = JobState::new(JobId::new(), 10, 1);
        state.finish(Phase::Exhausted);
        state.finish(Phase::Stopped);
        assert_eq!(state.phase, Phase::Exhausted);
        assert!(state.finished_at.is_some());
    }

    #[test]
    fn idle_snapshot_is_zero_valued() {
        let snap = JobSnapshot::idle(JobId::from("nope"));
        assert_eq!(snap.phase, Phase::Idle);
        assert_eq!(snap.attempts(), 0);
        assert_eq!(snap.last_log, "Waiting...");
    }

    #[test]
    fn credential_ref_masks_secret() {
        assert_eq!(credential_ref(2, "EAABsecretvalue"), "#2 EAABse…");
        assert_eq!(credential_ref(0, "abc"), "#0 abc");
    }

    #[test]
    fn log_line_prefers_identity() {
        let mut a = attempt(0, AttemptOutcome::Success);
        assert!(a.log_line().contains("#0 secret…"));
        a.identity = Some("[Profile] Ana".into());
        let line = a.log_line();
        assert!(line.contains("[Profile] Ana => t1 => hello => OK"));
    }

    #[test]
    fn outcome_serializes_tagged() {
        let json = serde_json::to_string(&AttemptOutcome::TransientFailure {
            reason: "timeout".into(),
        })
        .unwrap();
        assert_eq!(json, r#"{"kind":"transient_failure","reason":"timeout"}"#);
    }
}
