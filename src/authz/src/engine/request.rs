//! Immutable permission check request

use crate::error::{AuthzError, Result};
use crate::types::UserId;
use serde::{Deserialize, Serialize};

/// A resource instance addressed by type and id
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceRef {
    /// Resource type (e.g., "document")
    #[serde(rename = "type")]
    pub resource_type: String,

    /// Resource identifier within its type
    pub id: String,
}

impl ResourceRef {
    pub fn new(resource_type: impl Into<String>, id: impl ToString) -> Self {
        Self {
            resource_type: resource_type.into(),
            id: id.to_string(),
        }
    }
}

/// Permission check request
///
/// Built once and passed by reference; the `with_*`-style methods consume
/// and return the value so a request is never shared while half-built.
///
/// ```
/// use warden_authz::CheckRequest;
///
/// let request = CheckRequest::new("user-1", "document.edit")
///     .on_resource("document", 42)
///     .owned_by("user-2");
///
/// assert_eq!(request.resource.as_ref().map(|r| r.id.as_str()), Some("42"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CheckRequest {
    /// Principal whose permissions are evaluated
    pub principal_id: UserId,

    /// Permission name
    pub permission: String,

    /// Resource instance for ACL and ownership checks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<ResourceRef>,

    /// Owner of the resource; only meaningful together with `resource`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<UserId>,
}

impl CheckRequest {
    /// Create a request without resource context
    pub fn new(principal_id: impl Into<UserId>, permission: impl Into<String>) -> Self {
        Self {
            principal_id: principal_id.into(),
            permission: permission.into(),
            resource: None,
            owner_id: None,
        }
    }

    /// Scope the request to a resource instance
    pub fn on_resource(mut self, resource_type: impl Into<String>, resource_id: impl ToString) -> Self {
        self.resource = Some(ResourceRef::new(resource_type, resource_id));
        self
    }

    /// Record the owner of the resource
    pub fn owned_by(mut self, owner_id: impl Into<UserId>) -> Self {
        self.owner_id = Some(owner_id.into());
        self
    }

    /// Whether the principal owns the resource
    ///
    /// `None` unless both a resource and an owner were supplied.
    pub fn is_owner(&self) -> Option<bool> {
        match (&self.resource, &self.owner_id) {
            (Some(_), Some(owner)) => Some(owner == &self.principal_id),
            _ => None,
        }
    }

    /// Reject calls missing a principal or permission
    pub fn validate(&self) -> Result<()> {
        if self.principal_id.trim().is_empty() {
            return Err(AuthzError::InvalidInput("principal id must be set".to_string()));
        }
        if self.permission.trim().is_empty() {
            return Err(AuthzError::InvalidInput("permission must be set".to_string()));
        }
        Ok(())
    }
}
