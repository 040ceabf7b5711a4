//! In-memory authorization store

use super::GrantStore;
use crate::error::{AuthzError, Result};
use crate::permission::PermissionCatalog;
use crate::roles::RoleGraph;
use crate::types::{
    AclEntry, Permission, PermissionId, Role, RoleGrant, RoleId, UserId, UserPermission,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

type AclKey = (UserId, PermissionId, String, String);

#[derive(Debug, Default)]
struct Tables {
    permissions: HashMap<PermissionId, Permission>,
    permission_names: HashMap<String, PermissionId>,

    roles: HashMap<RoleId, Role>,
    role_slugs: HashMap<String, RoleId>,
    role_order: Vec<RoleId>,

    /// child -> parents, insertion ordered
    parents: HashMap<RoleId, Vec<RoleId>>,

    /// user -> directly assigned roles, insertion ordered
    assignments: HashMap<UserId, Vec<RoleId>>,

    role_grants: HashMap<(RoleId, PermissionId), bool>,
    acl: HashMap<AclKey, AclEntry>,
    user_permissions: HashMap<(UserId, PermissionId), bool>,
}

impl Tables {
    fn role(&self, role_id: &str) -> Result<&Role> {
        self.roles
            .get(role_id)
            .ok_or_else(|| AuthzError::NotFound(format!("role '{}'", role_id)))
    }

    fn permission(&self, permission_id: &str) -> Result<&Permission> {
        self.permissions
            .get(permission_id)
            .ok_or_else(|| AuthzError::NotFound(format!("permission '{}'", permission_id)))
    }

    fn roles_by_id(&self, ids: &[RoleId]) -> Vec<Role> {
        ids.iter().filter_map(|id| self.roles.get(id)).cloned().collect()
    }
}

/// Thread-safe in-memory store
///
/// Holds permissions, roles, the role graph, grants, ACL entries and user
/// overrides. Cloning shares the same tables.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a permission, returning the existing one if the name is taken
    pub async fn add_permission(&self, name: &str) -> Permission {
        let mut tables = self.tables.write().await;

        if let Some(id) = tables.permission_names.get(name) {
            if let Some(existing) = tables.permissions.get(id) {
                return existing.clone();
            }
        }

        let permission = Permission::new(Uuid::new_v4().to_string(), name);
        tables
            .permission_names
            .insert(permission.name.clone(), permission.id.clone());
        tables
            .permissions
            .insert(permission.id.clone(), permission.clone());
        permission
    }

    /// Register a role, returning the existing one if the slug is taken
    pub async fn add_role(&self, name: &str, slug: &str, weight: i32) -> Result<Role> {
        if let Some(existing) = self.role_by_slug(slug).await {
            return Ok(existing);
        }

        self.put_role(Role::new(Uuid::new_v4().to_string(), name, slug, weight))
            .await
    }

    /// Insert or replace a role by id
    ///
    /// Fails if the slug is blank or already belongs to a different role.
    pub async fn put_role(&self, role: Role) -> Result<Role> {
        if role.slug.trim().is_empty() {
            return Err(AuthzError::InvalidInput(format!("role '{}' has an empty slug", role.name)));
        }

        let mut tables = self.tables.write().await;

        if let Some(owner) = tables.role_slugs.get(&role.slug) {
            if owner != &role.id {
                return Err(AuthzError::InvalidInput(format!(
                    "role slug '{}' is already taken",
                    role.slug
                )));
            }
        }

        if let Some(previous) = tables.roles.get(&role.id).cloned() {
            tables.role_slugs.remove(&previous.slug);
        } else {
            tables.role_order.push(role.id.clone());
        }

        tables.role_slugs.insert(role.slug.clone(), role.id.clone());
        tables.roles.insert(role.id.clone(), role.clone());
        Ok(role)
    }

    /// Look up a role by slug
    pub async fn role_by_slug(&self, slug: &str) -> Option<Role> {
        let tables = self.tables.read().await;
        tables
            .role_slugs
            .get(slug)
            .and_then(|id| tables.roles.get(id))
            .cloned()
    }

    /// Make `parent_id` a parent of `role_id`
    pub async fn add_parent(&self, role_id: &str, parent_id: &str) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.role(role_id)?;
        tables.role(parent_id)?;

        let parents = tables.parents.entry(role_id.to_string()).or_default();
        if !parents.iter().any(|p| p == parent_id) {
            parents.push(parent_id.to_string());
        }
        Ok(())
    }

    /// Assign a role directly to a principal
    pub async fn assign_role(&self, user_id: &str, role_id: &str) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.role(role_id)?;

        let assigned = tables.assignments.entry(user_id.to_string()).or_default();
        if !assigned.iter().any(|r| r == role_id) {
            assigned.push(role_id.to_string());
        }
        Ok(())
    }

    /// Remove a direct role assignment; returns whether it existed
    pub async fn revoke_role(&self, user_id: &str, role_id: &str) -> bool {
        let mut tables = self.tables.write().await;
        match tables.assignments.get_mut(user_id) {
            Some(assigned) => {
                let before = assigned.len();
                assigned.retain(|r| r != role_id);
                assigned.len() != before
            }
            None => false,
        }
    }

    /// Grant (`true`) or deny (`false`) a permission on a role, overwriting
    pub async fn grant(&self, role_id: &str, permission_id: &str, value: bool) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.role(role_id)?;
        tables.permission(permission_id)?;

        tables
            .role_grants
            .insert((role_id.to_string(), permission_id.to_string()), value);
        Ok(())
    }

    /// Remove a role grant; returns whether it existed
    pub async fn revoke_grant(&self, role_id: &str, permission_id: &str) -> bool {
        let mut tables = self.tables.write().await;
        tables
            .role_grants
            .remove(&(role_id.to_string(), permission_id.to_string()))
            .is_some()
    }

    /// Upsert an ACL entry (last write wins)
    pub async fn set_acl(
        &self,
        user_id: &str,
        permission_id: &str,
        resource_type: &str,
        resource_id: &str,
        value: bool,
    ) -> Result<AclEntry> {
        let mut tables = self.tables.write().await;
        tables.permission(permission_id)?;

        let entry = AclEntry::new(user_id, permission_id, resource_type, resource_id, value);
        let key = (
            user_id.to_string(),
            permission_id.to_string(),
            resource_type.to_string(),
            resource_id.to_string(),
        );
        tables.acl.insert(key, entry.clone());
        Ok(entry)
    }

    /// Remove an ACL entry; returns whether it existed
    pub async fn remove_acl(
        &self,
        user_id: &str,
        permission_id: &str,
        resource_type: &str,
        resource_id: &str,
    ) -> bool {
        let mut tables = self.tables.write().await;
        let key = (
            user_id.to_string(),
            permission_id.to_string(),
            resource_type.to_string(),
            resource_id.to_string(),
        );
        tables.acl.remove(&key).is_some()
    }

    /// Upsert a per-user permission override
    pub async fn set_user_permission(&self, user_id: &str, permission_id: &str, value: bool) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.permission(permission_id)?;

        tables
            .user_permissions
            .insert((user_id.to_string(), permission_id.to_string()), value);
        Ok(())
    }
}

#[async_trait]
impl PermissionCatalog for InMemoryStore {
    async fn find_by_name(&self, name: &str) -> Result<Option<Permission>> {
        let tables = self.tables.read().await;
        Ok(tables
            .permission_names
            .get(name)
            .and_then(|id| tables.permissions.get(id))
            .cloned())
    }
}

#[async_trait]
impl RoleGraph for InMemoryStore {
    async fn roles_of(&self, user_id: &str) -> Result<Vec<Role>> {
        let tables = self.tables.read().await;
        Ok(tables
            .assignments
            .get(user_id)
            .map(|ids| tables.roles_by_id(ids))
            .unwrap_or_default())
    }

    async fn parents_of(&self, role_id: &str) -> Result<Vec<Role>> {
        let tables = self.tables.read().await;
        Ok(tables
            .parents
            .get(role_id)
            .map(|ids| tables.roles_by_id(ids))
            .unwrap_or_default())
    }

    async fn list_roles(&self) -> Result<Vec<Role>> {
        let tables = self.tables.read().await;
        Ok(tables.roles_by_id(&tables.role_order))
    }
}

#[async_trait]
impl GrantStore for InMemoryStore {
    async fn role_grant(&self, role_id: &str, permission_id: &str) -> Result<Option<RoleGrant>> {
        let tables = self.tables.read().await;
        Ok(tables
            .role_grants
            .get(&(role_id.to_string(), permission_id.to_string()))
            .map(|value| RoleGrant {
                role_id: role_id.to_string(),
                permission_id: permission_id.to_string(),
                value: *value,
            }))
    }

    async fn role_grants(&self, role_ids: &[RoleId], permission_id: &str) -> Result<Vec<RoleGrant>> {
        let tables = self.tables.read().await;
        Ok(role_ids
            .iter()
            .filter_map(|role_id| {
                tables
                    .role_grants
                    .get(&(role_id.clone(), permission_id.to_string()))
                    .map(|value| RoleGrant {
                        role_id: role_id.clone(),
                        permission_id: permission_id.to_string(),
                        value: *value,
                    })
            })
            .collect())
    }

    async fn acl_entry(
        &self,
        user_id: &str,
        permission_id: &str,
        resource_type: &str,
        resource_id: &str,
    ) -> Result<Option<AclEntry>> {
        let tables = self.tables.read().await;
        let key = (
            user_id.to_string(),
            permission_id.to_string(),
            resource_type.to_string(),
            resource_id.to_string(),
        );
        Ok(tables.acl.get(&key).cloned())
    }

    async fn user_permission(&self, user_id: &str, permission_id: &str) -> Result<Option<UserPermission>> {
        let tables = self.tables.read().await;
        Ok(tables
            .user_permissions
            .get(&(user_id.to_string(), permission_id.to_string()))
            .map(|value| UserPermission {
                user_id: user_id.to_string(),
                permission_id: permission_id.to_string(),
                value: *value,
            }))
    }

    async fn grants_for_role(&self, role_id: &str) -> Result<Vec<(Permission, bool)>> {
        let tables = self.tables.read().await;
        let mut grants: Vec<(Permission, bool)> = tables
            .role_grants
            .iter()
            .filter(|((role, _), _)| role == role_id)
            .filter_map(|((_, permission_id), value)| {
                tables
                    .permissions
                    .get(permission_id)
                    .map(|p| (p.clone(), *value))
            })
            .collect();

        grants.sort_by(|a, b| a.0.name.cmp(&b.0.name));
        Ok(grants)
    }

    async fn user_permissions(&self, user_id: &str) -> Result<Vec<(Permission, bool)>> {
        let tables = self.tables.read().await;
        let mut overrides: Vec<(Permission, bool)> = tables
            .user_permissions
            .iter()
            .filter(|((user, _), _)| user == user_id)
            .filter_map(|((_, permission_id), value)| {
                tables
                    .permissions
                    .get(permission_id)
                    .map(|p| (p.clone(), *value))
            })
            .collect();

        overrides.sort_by(|a, b| a.0.name.cmp(&b.0.name));
        Ok(overrides)
    }
}
