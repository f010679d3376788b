//! Shared kernel - common types used across the domain layer

pub mod error;
pub mod result;

pub use error::DomainError;
pub use result::Result;
