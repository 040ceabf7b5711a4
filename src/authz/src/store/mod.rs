//! Grant store contract and store implementations
//!
//! The engine reads everything through three narrow traits:
//! [`PermissionCatalog`], [`RoleGraph`] and [`GrantStore`]. Any type
//! implementing all three is an [`AuthzStore`].

pub mod cache;
pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

pub use cache::{CacheStats, CachedStore};
pub use memory::InMemoryStore;
#[cfg(feature = "postgres")]
pub use postgres::PostgresStore;

use crate::error::Result;
use crate::permission::PermissionCatalog;
use crate::roles::RoleGraph;
use crate::types::{AclEntry, Permission, RoleGrant, RoleId, UserPermission};
use async_trait::async_trait;
use futures::future::try_join_all;

/// Role grants, resource ACL entries and per-user overrides
#[async_trait]
pub trait GrantStore: Send + Sync {
    /// Grant or deny of `permission_id` on one role
    async fn role_grant(&self, role_id: &str, permission_id: &str) -> Result<Option<RoleGrant>>;

    /// Grants of `permission_id` across a role set
    ///
    /// Stores that can answer this in one round trip should override it.
    async fn role_grants(&self, role_ids: &[RoleId], permission_id: &str) -> Result<Vec<RoleGrant>> {
        let lookups = role_ids
            .iter()
            .map(|role_id| self.role_grant(role_id, permission_id));

        let found = try_join_all(lookups).await?;
        Ok(found.into_iter().flatten().collect())
    }

    /// ACL entry for `(user, permission, resource_type, resource_id)`
    async fn acl_entry(
        &self,
        user_id: &str,
        permission_id: &str,
        resource_type: &str,
        resource_id: &str,
    ) -> Result<Option<AclEntry>>;

    /// Per-user override of a permission
    async fn user_permission(&self, _user_id: &str, _permission_id: &str) -> Result<Option<UserPermission>> {
        Ok(None)
    }

    /// Every permission granted or denied on a role
    async fn grants_for_role(&self, role_id: &str) -> Result<Vec<(Permission, bool)>>;

    /// Every per-user override held by a principal
    async fn user_permissions(&self, _user_id: &str) -> Result<Vec<(Permission, bool)>> {
        Ok(Vec::new())
    }
}

/// Everything the decision engine reads
pub trait AuthzStore: PermissionCatalog + RoleGraph + GrantStore {}

impl<T> AuthzStore for T where T: PermissionCatalog + RoleGraph + GrantStore + ?Sized {}
