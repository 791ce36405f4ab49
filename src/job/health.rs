use std::time::Duration;

use tokio::time::Instant;

/// Health of one credential within a single job.
#[derive(Debug, Clone)]
pub struct CredentialHealth {
    pub last_used_at: Option<Instant>,
    pub valid: bool,
}

impl Default for CredentialHealth {
    fn default() -> Self {
        Self {
            last_used_at: None,
            valid: true,
        }
    }
}

impl CredentialHealth {
    /// Time left before this credential may be used again, if any.
    pub fn cooldown_remaining(&self, now: Instant, cooldown: Duration) -> Option<Duration> {
        let last = self.last_used_at?;
        let elapsed = now.saturating_duration_since(last);
        (elapsed < cooldown).then(|| cooldown - elapsed)
    }
}

/// Per-job credential health plus the cursor that cycles over the
/// currently-valid subset.
///
/// The cursor is always taken modulo the *current* valid count, so
/// invalidating a credential shifts the cycle without leaving gaps.
#[derive(Debug, Clone)]
pub struct CredentialPool {
    health: Vec<CredentialHealth>,
    cursor: usize,
}

impl CredentialPool {
    pub fn new(count: usize) -> Self {
        Self {
            health: vec![CredentialHealth::default(); count],
            cursor: 0,
        }
    }

    pub fn valid_count(&self) -> usize {
        self.health.iter().filter(|h| h.valid).count()
    }

    /// Index (into the full credential list) of the credential under the cursor,
    /// or `None` once every credential has been invalidated.
    pub fn current(&self) -> Option<usize> {
        let valid = self.valid_count();
        if valid == 0 {
            return None;
        }
        self.health
            .iter()
            .enumerate()
            .filter(|(_, h)| h.valid)
            .nth(self.cursor % valid)
            .map(|(index, _)| index)
    }

    pub fn health(&self, index: usize) -> &CredentialHealth {
        &self.health[index]
    }

    pub fn mark_used(&mut self, index: usize, at: Instant) {
        self.health[index].last_used_at = Some(at);
    }

    /// Permanently exclude a credential. The cursor is re-normalised so the
    /// same slot now points at the next valid credential.
    pub fn invalidate(&mut self, index: usize) {
        self.health[index].valid = false;
        let valid = self.valid_count();
        self.cursor = if valid == 0 { 0 } else { self.cursor % valid };
    }

    pub fn advance(&mut self) {
        let valid = self.valid_count().max(1);
        self.cursor = (self.cursor + 1) % valid;
    }
}
