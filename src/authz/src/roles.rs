//! Role graph contract and has-role traversal
//!
//! Roles form a many-to-many parent/child graph that may contain cycles.
//! Every traversal here is breadth-first with a visited set keyed by role id,
//! so each role is expanded at most once per query.
//!
//! Permission grants never climb this graph; it is only consulted by the
//! coarse has-role checks and by diagnostics.

use crate::error::Result;
use crate::types::{Role, RoleId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use tracing::debug;

/// Role membership and inheritance lookups
#[async_trait]
pub trait RoleGraph: Send + Sync {
    /// Roles directly assigned to a principal (no inheritance)
    async fn roles_of(&self, user_id: &str) -> Result<Vec<Role>>;

    /// Direct parents of a role
    async fn parents_of(&self, role_id: &str) -> Result<Vec<Role>>;

    /// Every known role
    async fn list_roles(&self) -> Result<Vec<Role>>;
}

/// How far a has-role check looks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleDepth {
    /// Directly assigned roles only
    Direct,
    /// Directly assigned roles and their transitive parents
    Inherited,
}

/// Whether the principal holds any of `slugs`
///
/// With [`RoleDepth::Inherited`] the principal's direct roles seed a queue
/// and each dequeued role pushes its parents; the walk stops at the first
/// matching slug or when the queue is exhausted.
pub async fn has_any_role<G>(graph: &G, user_id: &str, slugs: &[&str], depth: RoleDepth) -> Result<bool>
where
    G: RoleGraph + ?Sized,
{
    if slugs.is_empty() {
        return Ok(false);
    }

    let wanted: HashSet<&str> = slugs.iter().copied().collect();
    let mut queue: VecDeque<Role> = graph.roles_of(user_id).await?.into();
    let mut visited: HashSet<RoleId> = HashSet::new();

    while let Some(role) = queue.pop_front() {
        if !visited.insert(role.id.clone()) {
            continue;
        }

        if wanted.contains(role.slug.as_str()) {
            debug!("Principal {} matched role '{}'", user_id, role.slug);
            return Ok(true);
        }

        if depth == RoleDepth::Inherited {
            queue.extend(graph.parents_of(&role.id).await?);
        }
    }

    Ok(false)
}

/// Whether the principal holds the role `slug`
pub async fn has_role<G>(graph: &G, user_id: &str, slug: &str, depth: RoleDepth) -> Result<bool>
where
    G: RoleGraph + ?Sized,
{
    has_any_role(graph, user_id, &[slug], depth).await
}

/// Transitive parents of a role, nearest first, excluding the role itself
pub async fn ancestors<G>(graph: &G, role_id: &str) -> Result<Vec<Role>>
where
    G: RoleGraph + ?Sized,
{
    let mut visited: HashSet<RoleId> = HashSet::from([role_id.to_string()]);
    let mut queue: VecDeque<Role> = graph.parents_of(role_id).await?.into();
    let mut found = Vec::new();

    while let Some(role) = queue.pop_front() {
        if !visited.insert(role.id.clone()) {
            continue;
        }

        queue.extend(graph.parents_of(&role.id).await?);
        found.push(role);
    }

    Ok(found)
}

/// Every role the principal holds directly or through inheritance
pub async fn effective_roles<G>(graph: &G, user_id: &str) -> Result<Vec<Role>>
where
    G: RoleGraph + ?Sized,
{
    let mut visited: HashSet<RoleId> = HashSet::new();
    let mut queue: VecDeque<Role> = graph.roles_of(user_id).await?.into();
    let mut found = Vec::new();

    while let Some(role) = queue.pop_front() {
        if !visited.insert(role.id.clone()) {
            continue;
        }

        queue.extend(graph.parents_of(&role.id).await?);
        found.push(role);
    }

    Ok(found)
}
