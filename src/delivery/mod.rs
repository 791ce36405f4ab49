pub mod client;
pub mod error;
pub mod types;

pub use client::{DEFAULT_FATAL_MARKERS, HttpDeliveryClient};
pub use error::DeliveryError;
pub use types::{DeliveryClient, Outcome};
