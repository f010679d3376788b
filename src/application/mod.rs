//! Application layer - use cases and orchestration
//!
//! Coordinates the domain objects against the gateway ports: loading
//! and filtering patient data, dispatching batch calls, and feeding the
//! call-status poller its collaborators.

pub mod dashboard;

pub use dashboard::{DashboardService, DashboardState};
