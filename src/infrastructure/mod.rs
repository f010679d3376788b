//! Infrastructure layer - adapters for the domain gateway ports

pub mod api;
pub mod persistence;
