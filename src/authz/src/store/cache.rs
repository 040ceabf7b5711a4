//! Read-through cache in front of an authorization store
//!
//! Caches the reads the decision engine issues on every call: permission
//! lookups by name, direct role assignments, role grants and ACL entries.
//! Entries expire after the configured TTL; mutations made behind the
//! cache's back must be followed by the matching `invalidate_*` call.

use super::{AuthzStore, GrantStore};
use crate::config::CacheConfig;
use crate::error::Result;
use crate::permission::PermissionCatalog;
use crate::roles::RoleGraph;
use crate::types::{AclEntry, Permission, PermissionId, Role, RoleGrant, RoleId, UserId, UserPermission};
use async_trait::async_trait;
use blake3::Hasher;
use dashmap::DashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// ACL cache key (BLAKE3 hash of the 4-tuple)
type AclKey = [u8; 32];

/// Cached value with insertion time
#[derive(Clone)]
struct CachedEntry<V> {
    value: V,
    cached_at: Instant,
}

impl<V> CachedEntry<V> {
    fn new(value: V) -> Self {
        Self {
            value,
            cached_at: Instant::now(),
        }
    }

    fn is_expired(&self, ttl: Duration) -> bool {
        self.cached_at.elapsed() > ttl
    }
}

/// ACL lookups remember their principal so they can be invalidated per user
#[derive(Clone)]
struct AclSlot {
    user_id: UserId,
    entry: Option<AclEntry>,
}

/// Caching wrapper for any [`AuthzStore`]
///
/// Store errors are never cached. Reads the engine issues rarely
/// (`parents_of`, `list_roles`, per-user overrides, role grant listings)
/// pass straight through.
pub struct CachedStore {
    inner: Arc<dyn AuthzStore>,
    config: CacheConfig,

    permissions: DashMap<String, CachedEntry<Option<Permission>>>,
    roles: DashMap<UserId, CachedEntry<Vec<Role>>>,
    grants: DashMap<(RoleId, PermissionId), CachedEntry<Option<RoleGrant>>>,
    acl: DashMap<AclKey, CachedEntry<AclSlot>>,

    stats: DashMap<String, usize>,
}

impl CachedStore {
    /// Wrap a store
    pub fn new(inner: Arc<dyn AuthzStore>, config: CacheConfig) -> Self {
        Self {
            inner,
            config,
            permissions: DashMap::new(),
            roles: DashMap::new(),
            grants: DashMap::new(),
            acl: DashMap::new(),
            stats: DashMap::new(),
        }
    }

    /// Drop cached assignments and ACL entries of one principal
    pub fn invalidate_user(&self, user_id: &str) {
        self.roles.remove(user_id);
        self.acl.retain(|_, cached| cached.value.user_id != user_id);
        debug!("Cache invalidated for principal {}", user_id);
    }

    /// Drop cached grants of a role and assignments that include it
    pub fn invalidate_role(&self, role_id: &str) {
        self.grants.retain(|(role, _), _| role != role_id);
        self.roles
            .retain(|_, cached| !cached.value.iter().any(|r| r.id == role_id));
        debug!("Cache invalidated for role {}", role_id);
    }

    /// Drop one cached ACL lookup
    pub fn invalidate_acl(&self, user_id: &str, permission_id: &str, resource_type: &str, resource_id: &str) {
        let key = Self::acl_key(user_id, permission_id, resource_type, resource_id);
        self.acl.remove(&key);
    }

    /// Drop a cached permission lookup (including a cached miss)
    pub fn invalidate_permission(&self, name: &str) {
        self.permissions.remove(name);
    }

    /// Clear every cached read and reset statistics
    pub fn clear(&self) {
        self.permissions.clear();
        self.roles.clear();
        self.grants.clear();
        self.acl.clear();
        self.stats.clear();
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.get_stat("hits"),
            misses: self.get_stat("misses"),
            expirations: self.get_stat("expirations"),
            entries: self.permissions.len() + self.roles.len() + self.grants.len() + self.acl.len(),
            max_entries: self.config.capacity * 4,
        }
    }

    /// Compute the ACL cache key
    fn acl_key(user_id: &str, permission_id: &str, resource_type: &str, resource_id: &str) -> AclKey {
        let mut hasher = Hasher::new();

        // Length-prefix each part so ("ab", "c") and ("a", "bc") differ
        for part in [user_id, permission_id, resource_type, resource_id] {
            hasher.update(&(part.len() as u64).to_le_bytes());
            hasher.update(part.as_bytes());
        }

        *hasher.finalize().as_bytes()
    }

    fn lookup<K, V>(&self, map: &DashMap<K, CachedEntry<V>>, key: &K) -> Option<V>
    where
        K: Eq + Hash,
        V: Clone,
    {
        if let Some(entry) = map.get(key) {
            if entry.is_expired(self.config.ttl()) {
                // Expired - remove and fall through to a miss
                drop(entry);
                map.remove(key);
                self.increment_stat("expirations");
            } else {
                self.increment_stat("hits");
                return Some(entry.value.clone());
            }
        }

        self.increment_stat("misses");
        None
    }

    fn store<K, V>(&self, map: &DashMap<K, CachedEntry<V>>, key: K, value: V)
    where
        K: Eq + Hash,
    {
        if map.len() >= self.config.capacity {
            Self::evict_some(map, self.config.capacity);
        }
        map.insert(key, CachedEntry::new(value));
    }

    /// Evict roughly 10% of a full table
    fn evict_some<K, V>(map: &DashMap<K, CachedEntry<V>>, capacity: usize)
    where
        K: Eq + Hash,
    {
        let to_remove = (capacity / 10).max(1);
        let mut removed = 0;

        map.retain(|_, _| {
            if removed < to_remove {
                removed += 1;
                false
            } else {
                true
            }
        });
    }

    fn increment_stat(&self, key: &str) {
        self.stats
            .entry(key.to_string())
            .and_modify(|count| *count += 1)
            .or_insert(1);
    }

    fn get_stat(&self, key: &str) -> usize {
        self.stats.get(key).map(|v| *v).unwrap_or(0)
    }
}

#[async_trait]
impl PermissionCatalog for CachedStore {
    async fn find_by_name(&self, name: &str) -> Result<Option<Permission>> {
        if let Some(cached) = self.lookup(&self.permissions, &name.to_string()) {
            return Ok(cached);
        }

        let permission = self.inner.find_by_name(name).await?;
        self.store(&self.permissions, name.to_string(), permission.clone());
        Ok(permission)
    }
}

#[async_trait]
impl RoleGraph for CachedStore {
    async fn roles_of(&self, user_id: &str) -> Result<Vec<Role>> {
        if let Some(cached) = self.lookup(&self.roles, &user_id.to_string()) {
            return Ok(cached);
        }

        let roles = self.inner.roles_of(user_id).await?;
        self.store(&self.roles, user_id.to_string(), roles.clone());
        Ok(roles)
    }

    async fn parents_of(&self, role_id: &str) -> Result<Vec<Role>> {
        self.inner.parents_of(role_id).await
    }

    async fn list_roles(&self) -> Result<Vec<Role>> {
        self.inner.list_roles().await
    }
}

#[async_trait]
impl GrantStore for CachedStore {
    async fn role_grant(&self, role_id: &str, permission_id: &str) -> Result<Option<RoleGrant>> {
        let key = (role_id.to_string(), permission_id.to_string());
        if let Some(cached) = self.lookup(&self.grants, &key) {
            return Ok(cached);
        }

        let grant = self.inner.role_grant(role_id, permission_id).await?;
        self.store(&self.grants, key, grant.clone());
        Ok(grant)
    }

    async fn role_grants(&self, role_ids: &[RoleId], permission_id: &str) -> Result<Vec<RoleGrant>> {
        let mut grants = Vec::with_capacity(role_ids.len());
        let mut missing = Vec::new();

        for role_id in role_ids {
            let key = (role_id.clone(), permission_id.to_string());
            match self.lookup(&self.grants, &key) {
                Some(cached) => grants.extend(cached),
                None => missing.push(role_id.clone()),
            }
        }

        if missing.is_empty() {
            return Ok(grants);
        }

        // One batched read for every uncached role, then cache absences too
        let fetched = self.inner.role_grants(&missing, permission_id).await?;
        for role_id in missing {
            let grant = fetched.iter().find(|g| g.role_id == role_id).cloned();
            self.store(&self.grants, (role_id, permission_id.to_string()), grant);
        }

        grants.extend(fetched);
        Ok(grants)
    }

    async fn acl_entry(
        &self,
        user_id: &str,
        permission_id: &str,
        resource_type: &str,
        resource_id: &str,
    ) -> Result<Option<AclEntry>> {
        let key = Self::acl_key(user_id, permission_id, resource_type, resource_id);
        if let Some(cached) = self.lookup(&self.acl, &key) {
            return Ok(cached.entry);
        }

        let entry = self
            .inner
            .acl_entry(user_id, permission_id, resource_type, resource_id)
            .await?;
        let slot = AclSlot {
            user_id: user_id.to_string(),
            entry: entry.clone(),
        };
        self.store(&self.acl, key, slot);
        Ok(entry)
    }

    async fn user_permission(&self, user_id: &str, permission_id: &str) -> Result<Option<UserPermission>> {
        self.inner.user_permission(user_id, permission_id).await
    }

    async fn grants_for_role(&self, role_id: &str) -> Result<Vec<(Permission, bool)>> {
        self.inner.grants_for_role(role_id).await
    }

    async fn user_permissions(&self, user_id: &str) -> Result<Vec<(Permission, bool)>> {
        self.inner.user_permissions(user_id).await
    }
}

/// Cache statistics
#[derive(Debug, Clone)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    pub expirations: usize,
    pub entries: usize,
    pub max_entries: usize,
}

impl CacheStats {
    /// Calculate cache hit rate
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
