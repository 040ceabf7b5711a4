//! Seed documents for provisioning an in-memory store
//!
//! ```toml
//! permissions = ["document.view", "document.edit", "document.edit.others", "*"]
//!
//! [[roles]]
//! name = "Editor"
//! slug = "editor"
//! weight = 10
//! parents = ["reader"]
//! grants = { "document.edit" = true }
//!
//! [[users]]
//! id = "alice"
//! roles = ["editor"]
//!
//! [[acl]]
//! user = "bob"
//! permission = "document.edit"
//! resource_type = "document"
//! resource_id = "42"
//! value = false
//! ```

use crate::error::{AuthzError, Result};
use crate::store::InMemoryStore;
use crate::types::Role;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use tracing::info;
use uuid::Uuid;

/// Complete seed document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedData {
    /// Permission names to register
    #[serde(default)]
    pub permissions: Vec<String>,

    #[serde(default)]
    pub roles: Vec<RoleSeed>,

    #[serde(default)]
    pub users: Vec<UserSeed>,

    #[serde(default)]
    pub acl: Vec<AclSeed>,
}

/// One role with its parents and grants
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleSeed {
    pub name: String,
    pub slug: String,

    #[serde(default)]
    pub weight: i32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Parent role slugs
    #[serde(default)]
    pub parents: Vec<String>,

    /// Permission name to grant (`true`) or deny (`false`)
    #[serde(default)]
    pub grants: BTreeMap<String, bool>,
}

/// Role assignments and overrides for one principal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSeed {
    pub id: String,

    /// Directly assigned role slugs
    #[serde(default)]
    pub roles: Vec<String>,

    /// Per-user permission overrides
    #[serde(default)]
    pub permissions: BTreeMap<String, bool>,
}

/// Resource-instance ACL entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AclSeed {
    pub user: String,
    pub permission: String,
    pub resource_type: String,
    pub resource_id: String,
    pub value: bool,
}

/// Counts of what a seed provisioned
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub permissions: usize,
    pub roles: usize,
    pub grants: usize,
    pub assignments: usize,
    pub user_permissions: usize,
    pub acl_entries: usize,
}

impl SeedData {
    /// Load a seed document from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&contents)
    }

    /// Parse a seed document from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| AuthzError::Seed(format!("Failed to parse seed: {}", e)))
    }

    /// Check internal references without touching a store
    pub fn validate(&self) -> Result<()> {
        let permissions: HashSet<&str> = self.permissions.iter().map(String::as_str).collect();
        let mut slugs: HashSet<&str> = HashSet::new();

        for role in &self.roles {
            if role.slug.trim().is_empty() {
                return Err(AuthzError::Seed(format!("role '{}' has an empty slug", role.name)));
            }
            if !slugs.insert(role.slug.as_str()) {
                return Err(AuthzError::Seed(format!("duplicate role slug '{}'", role.slug)));
            }
        }

        let known_permission = |name: &str, context: &str| {
            if permissions.contains(name) {
                Ok(())
            } else {
                Err(AuthzError::Seed(format!("{} references unknown permission '{}'", context, name)))
            }
        };
        let known_role = |slug: &str, context: &str| {
            if slugs.contains(slug) {
                Ok(())
            } else {
                Err(AuthzError::Seed(format!("{} references unknown role '{}'", context, slug)))
            }
        };

        for role in &self.roles {
            let context = format!("role '{}'", role.slug);
            for parent in &role.parents {
                known_role(parent, &context)?;
            }
            for name in role.grants.keys() {
                known_permission(name, &context)?;
            }
        }

        for user in &self.users {
            let context = format!("user '{}'", user.id);
            for slug in &user.roles {
                known_role(slug, &context)?;
            }
            for name in user.permissions.keys() {
                known_permission(name, &context)?;
            }
        }

        for entry in &self.acl {
            known_permission(&entry.permission, &format!("ACL entry for '{}'", entry.user))?;
        }

        Ok(())
    }

    /// Provision `store` with this document
    ///
    /// Validates first, so nothing is written when a reference is broken.
    /// Roles whose slug already exists in the store are updated in place.
    pub async fn apply(&self, store: &InMemoryStore) -> Result<SeedSummary> {
        self.validate()?;
        let mut summary = SeedSummary::default();

        let mut permission_ids: HashMap<&str, String> = HashMap::new();
        for name in &self.permissions {
            let permission = store.add_permission(name).await;
            permission_ids.insert(name.as_str(), permission.id);
            summary.permissions += 1;
        }

        let mut role_ids: HashMap<&str, String> = HashMap::new();
        for seed in &self.roles {
            let id = match store.role_by_slug(&seed.slug).await {
                Some(existing) => existing.id,
                None => Uuid::new_v4().to_string(),
            };

            let mut role = Role::new(id, &seed.name, &seed.slug, seed.weight);
            if let Some(description) = &seed.description {
                role = role.with_description(description);
            }

            let role = store.put_role(role).await.map_err(seed_error)?;
            role_ids.insert(seed.slug.as_str(), role.id);
            summary.roles += 1;
        }

        for seed in &self.roles {
            let role_id = lookup(&role_ids, &seed.slug)?;

            for parent in &seed.parents {
                store
                    .add_parent(role_id, lookup(&role_ids, parent)?)
                    .await
                    .map_err(seed_error)?;
            }

            for (name, value) in &seed.grants {
                store
                    .grant(role_id, lookup(&permission_ids, name)?, *value)
                    .await
                    .map_err(seed_error)?;
                summary.grants += 1;
            }
        }

        for user in &self.users {
            for slug in &user.roles {
                store
                    .assign_role(&user.id, lookup(&role_ids, slug)?)
                    .await
                    .map_err(seed_error)?;
                summary.assignments += 1;
            }

            for (name, value) in &user.permissions {
                store
                    .set_user_permission(&user.id, lookup(&permission_ids, name)?, *value)
                    .await
                    .map_err(seed_error)?;
                summary.user_permissions += 1;
            }
        }

        for entry in &self.acl {
            store
                .set_acl(
                    &entry.user,
                    lookup(&permission_ids, &entry.permission)?,
                    &entry.resource_type,
                    &entry.resource_id,
                    entry.value,
                )
                .await
                .map_err(seed_error)?;
            summary.acl_entries += 1;
        }

        info!(
            "Seeded {} permissions, {} roles, {} grants, {} assignments, {} ACL entries",
            summary.permissions, summary.roles, summary.grants, summary.assignments, summary.acl_entries
        );

        Ok(summary)
    }
}

fn lookup<'a>(ids: &'a HashMap<&str, String>, key: &str) -> Result<&'a str> {
    ids.get(key)
        .map(String::as_str)
        .ok_or_else(|| AuthzError::Seed(format!("unresolved reference '{}'", key)))
}

fn seed_error(e: AuthzError) -> AuthzError {
    match e {
        AuthzError::Seed(_) => e,
        other => AuthzError::Seed(other.to_string()),
    }
}
