use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::resources::DEFAULT_DISALLOWED_FRAGMENTS;
use crate::error::{Result, RotorError};

/// Which attempt outcomes are followed by the inter-attempt delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DelayTrigger {
    /// Delay after successes and transient failures.
    Always,
    /// Delay only after successes; failures retry immediately.
    SuccessOnly,
}

/// Inter-attempt delay: fixed at `min`, or drawn uniformly from `[min, max]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DelayPolicy {
    pub min: Duration,
    pub max: Option<Duration>,
    pub delay_on: DelayTrigger,
    /// Also wait after a fatal credential failure instead of moving straight
    /// on to the next credential.
    pub delay_after_fatal: bool,
    /// Wait once before the very first attempt.
    pub delay_before_first: bool,
}

impl Default for DelayPolicy {
    fn default() -> Self {
        Self {
            min: Duration::from_secs(60),
            max: None,
            delay_on: DelayTrigger::Always,
            delay_after_fatal: false,
            delay_before_first: false,
        }
    }
}

impl DelayPolicy {
    pub fn fixed(delay: Duration) -> Self {
        Self {
            min: delay,
            ..Default::default()
        }
    }

    pub fn randomized(min: Duration, max: Duration) -> Self {
        Self {
            min,
            max: Some(max),
            ..Default::default()
        }
    }

    /// Pick the next delay.
    pub fn next_delay(&self) -> Duration {
        match self.max {
            Some(max) if max > self.min => rand::rng().random_range(self.min..=max),
            _ => self.min,
        }
    }
}

/// Everything a worker needs to know about how to pace and shape one job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobPolicy {
    pub delay: DelayPolicy,
    /// Minimum idle time for a credential between two uses.
    pub cooldown: Duration,
    /// How long to sleep before re-checking a credential that is cooling down.
    pub poll_interval: Duration,
    /// Upper bound on a single remote call.
    pub request_timeout: Duration,
    /// Fragments stripped from every rendered message.
    pub disallowed_fragments: Vec<String>,
    /// Look up a display label for each credential before sending.
    pub resolve_identity: bool,
    /// Number of attempts kept in the queryable ring log.
    pub log_capacity: usize,
}

impl Default for JobPolicy {
    fn default() -> Self {
        Self {
            delay: DelayPolicy::default(),
            cooldown: Duration::from_secs(60),
            poll_interval: Duration::from_secs(1),
            request_timeout: Duration::from_secs(10),
            disallowed_fragments: DEFAULT_DISALLOWED_FRAGMENTS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            resolve_identity: false,
            log_capacity: 100,
        }
    }
}

impl JobPolicy {
    pub fn validate(&self) -> Result<()> {
        if let Some(max) = self.delay.max
            && max < self.delay.min
        {
            return Err(RotorError::InvalidPolicy(format!(
                "max delay {max:?} is below min delay {:?}",
                self.delay.min
            )));
        }
        if self.poll_interval.is_zero() {
            return Err(RotorError::InvalidPolicy(
                "poll interval must be non-zero".into(),
            ));
        }
        if self.log_capacity == 0 {
            return Err(RotorError::InvalidPolicy(
                "log capacity must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
