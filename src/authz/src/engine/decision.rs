//! Decision explanation types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Evaluation step that produced a decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionStep {
    /// Principal or its direct roles hold `*`
    GlobalWildcard,
    /// Resource-instance ACL entry
    Acl,
    /// Owner / non-owner gate
    Ownership,
    /// Per-user permission override
    UserPermission,
    /// Weighted role grants (exact or wildcard fallback)
    RoleGrant,
    /// Nothing matched
    DefaultDeny,
}

impl DecisionStep {
    pub const ALL: [DecisionStep; 6] = [
        DecisionStep::GlobalWildcard,
        DecisionStep::Acl,
        DecisionStep::Ownership,
        DecisionStep::UserPermission,
        DecisionStep::RoleGrant,
        DecisionStep::DefaultDeny,
    ];

    /// Position in [`DecisionStep::ALL`]
    pub const fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionStep::GlobalWildcard => "global_wildcard",
            DecisionStep::Acl => "acl",
            DecisionStep::Ownership => "ownership",
            DecisionStep::UserPermission => "user_permission",
            DecisionStep::RoleGrant => "role_grant",
            DecisionStep::DefaultDeny => "default_deny",
        }
    }
}

impl fmt::Display for DecisionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured account of a decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    /// Final verdict
    pub allowed: bool,

    /// Step that concluded the evaluation
    pub step: DecisionStep,

    /// Human-readable reason
    pub reason: String,

    /// Step-specific data (matched permission, grants, owner flags)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl Explanation {
    pub fn new(allowed: bool, step: DecisionStep, reason: impl Into<String>) -> Self {
        Self {
            allowed,
            step,
            reason: reason.into(),
            details: None,
        }
    }

    /// Allow decision
    pub fn allow(step: DecisionStep, reason: impl Into<String>) -> Self {
        Self::new(true, step, reason)
    }

    /// Deny decision
    pub fn deny(step: DecisionStep, reason: impl Into<String>) -> Self {
        Self::new(false, step, reason)
    }

    /// Attach step-specific details
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}
