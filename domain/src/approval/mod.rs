//! Human approval domain
//!
//! An [`ApprovalRequest`] is raised when the execution runtime signals a
//! human-in-the-loop interrupt. It is resolved exactly once, by an
//! [`ApprovalResponse`] or by expiry.

pub mod entities;
pub mod response;

pub use entities::{ApprovalRequest, ApprovalStatus, OperationDescriptor, RiskLevel};
pub use response::{ApprovalDecision, ApprovalError, ApprovalOutcome, ApprovalResponse};
