//! Durable session-state persistence

pub mod session_store;

pub use session_store::FileSessionStore;
