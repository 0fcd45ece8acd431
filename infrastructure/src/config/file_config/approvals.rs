//! Approval handling configuration (`[approvals]` section)

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How the binary answers approval requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalPolicy {
    /// Ask on the terminal
    #[default]
    Interactive,
    AutoApprove,
    AutoReject,
}

impl ApprovalPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalPolicy::Interactive => "interactive",
            ApprovalPolicy::AutoApprove => "auto_approve",
            ApprovalPolicy::AutoReject => "auto_reject",
        }
    }
}

impl fmt::Display for ApprovalPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ApprovalPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "interactive" | "ask" => Ok(ApprovalPolicy::Interactive),
            "auto_approve" | "approve" => Ok(ApprovalPolicy::AutoApprove),
            "auto_reject" | "reject" => Ok(ApprovalPolicy::AutoReject),
            _ => Err(format!(
                "unknown approval policy '{}' (expected interactive, auto_approve or auto_reject)",
                s
            )),
        }
    }
}

/// Raw approvals configuration from TOML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileApprovalsConfig {
    pub policy: ApprovalPolicy,
    /// Words in worker instructions that make the offline runtime ask first
    pub risky_keywords: Vec<String>,
}

impl Default for FileApprovalsConfig {
    fn default() -> Self {
        Self {
            policy: ApprovalPolicy::default(),
            risky_keywords: ["deploy", "delete", "drop", "push", "migrate"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}
