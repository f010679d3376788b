//! Remote invoice-calling API client

pub mod client;
pub mod dto;

pub use client::ApiClient;
