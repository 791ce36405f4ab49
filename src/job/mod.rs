mod health;
mod policy;
mod resources;
mod state;

pub use health::{CredentialHealth, CredentialPool};
pub use policy::{DelayPolicy, DelayTrigger, JobPolicy};
pub use resources::{DEFAULT_DISALLOWED_FRAGMENTS, ResourceSet, sanitize};
pub use state::{
    AttemptOutcome, DeliveryAttempt, FatalReason, JobId, JobSnapshot, JobState, Phase,
    credential_ref,
};
