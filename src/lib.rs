//! Background delivery jobs with credential rotation.
//!
//! An [`Orchestrator`](orchestrator::Orchestrator) owns any number of jobs.
//! Each job runs a [`WorkerLoop`](worker::WorkerLoop) that cycles through
//! credentials, messages and targets, sends through a
//! [`DeliveryClient`](delivery::DeliveryClient), and records what happened
//! in a [`JobState`](job::JobState) that clients can poll at any time.

pub mod config;
pub mod delivery;
pub mod error;
pub mod export;
pub mod job;
pub mod logging;
pub mod orchestrator;
pub mod worker;

#[cfg(test)]
mod testing;

pub use error::{Result, RotorError};
