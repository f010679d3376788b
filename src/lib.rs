//! Callboard - dashboard client for patient-invoice batch calling
//!
//! A client of a remote invoice-calling API: it uploads patient-invoice
//! spreadsheets, fetches and filters patient records, dispatches batch
//! automated phone calls, and polls call status until a batch completes.
//! All business logic (spreadsheet parsing, dialing, persistence) lives
//! behind the remote API; the core of this crate is the call-status
//! polling state machine in [`domain::poller`].

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

// Re-export commonly used types
pub use domain::shared::error::DomainError;
pub use domain::shared::result::Result;
