//! Core authorization types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique permission identifier
pub type PermissionId = String;

/// Unique role identifier
pub type RoleId = String;

/// Unique principal (user) identifier
pub type UserId = String;

/// A named permission (`document.edit`, `document.*`, `document.edit.others`, `*`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Permission {
    pub id: PermissionId,
    pub name: String,
}

impl Permission {
    pub fn new(id: impl Into<PermissionId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Role with a priority weight
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Role identifier
    pub id: RoleId,

    /// Display name
    pub name: String,

    /// Unique machine name used by has-role checks
    pub slug: String,

    /// Priority used to break grant conflicts (higher wins)
    #[serde(default)]
    pub weight: i32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Role {
    /// Create a new role
    pub fn new(
        id: impl Into<RoleId>,
        name: impl Into<String>,
        slug: impl Into<String>,
        weight: i32,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            slug: slug.into(),
            weight,
            description: None,
        }
    }

    /// Attach a description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Grant (`true`) or explicit deny (`false`) of a permission on a role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleGrant {
    pub role_id: RoleId,
    pub permission_id: PermissionId,
    pub value: bool,
}

/// Resource-instance scoped grant or deny for one user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AclEntry {
    pub user_id: UserId,
    pub permission_id: PermissionId,
    pub resource_type: String,
    pub resource_id: String,
    pub value: bool,

    /// Last upsert time
    pub updated_at: DateTime<Utc>,
}

impl AclEntry {
    /// Create a new entry stamped with the current time
    pub fn new(
        user_id: impl Into<UserId>,
        permission_id: impl Into<PermissionId>,
        resource_type: impl Into<String>,
        resource_id: impl Into<String>,
        value: bool,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            permission_id: permission_id.into(),
            resource_type: resource_type.into(),
            resource_id: resource_id.into(),
            value,
            updated_at: Utc::now(),
        }
    }
}

/// Per-user permission override, independent of roles and resources
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPermission {
    pub user_id: UserId,
    pub permission_id: PermissionId,
    pub value: bool,
}

/// A grant value paired with the weight of the role it came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightedGrant {
    pub value: bool,
    pub weight: i32,
}

impl WeightedGrant {
    pub fn new(value: bool, weight: i32) -> Self {
        Self { value, weight }
    }
}
