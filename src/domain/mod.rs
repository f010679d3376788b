//! Domain layer - patient records, call status, and the polling core
//!
//! This layer contains:
//! - Value objects: patients, upload summaries, call keys, call statuses
//! - The active-call registry (in-flight calls believed to be dialing)
//! - The call-status poller, the one piece with real state-transition logic
//! - Gateway interfaces: ports implemented by the infrastructure layer

pub mod active_call;
pub mod call_status;
pub mod gateway;
pub mod patient;
pub mod poller;
pub mod shared;

// Re-export commonly used types
pub use shared::{DomainError, Result};
