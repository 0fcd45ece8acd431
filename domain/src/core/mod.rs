//! Core domain concepts shared across all subdomains.
//!
//! - [`ids`]: opaque identifiers (turns, conversations, workers, approvals, checkpoints)
//! - [`error::DomainError`]: domain-level errors
//! - [`string`]: small text helpers used for log-friendly previews

pub mod error;
pub mod ids;
pub mod string;
