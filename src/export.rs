//! Export of a finished job's attempts to durable storage.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::job::{DeliveryAttempt, JobId, JobSnapshot};

/// Everything written out when a job reaches a terminal phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobReport {
    pub summary: JobSnapshot,
    pub attempts: Vec<DeliveryAttempt>,
}

/// Destination for finished job reports.
pub trait LogSink: Send + Sync {
    fn export(&self, report: &JobReport) -> Result<()>;
}

/// Writes `<dir>/<job id>.json`.
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    dir: PathBuf,
}

impl JsonFileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, id: &JobId) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }
}

impl LogSink for JsonFileSink {
    fn export(&self, report: &JobReport) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let json = serde_json::to_string_pretty(report)?;
        std::fs::write(self.path_for(&report.summary.id), json)?;
        Ok(())
    }
}
