//! Permission decision engine
//!
//! Combines the permission catalog, role grants, resource ACL entries,
//! ownership and wildcard fallback into one allow/deny verdict.

pub mod decision;
pub mod grants;
pub mod metrics;
pub mod request;

pub use decision::{DecisionStep, Explanation};
pub use grants::{resolve_grants, top_weight};
pub use metrics::{EngineMetrics, MetricsCollector};
pub use request::{CheckRequest, ResourceRef};

use crate::config::EngineConfig;
use crate::error::{AuthzError, Result};
use crate::permission::{fallback_chain, others_variant, GLOBAL_WILDCARD};
use crate::roles::{self, RoleDepth};
use crate::store::{AuthzStore, CacheStats, CachedStore};
use crate::types::{Permission, Role, RoleId, WeightedGrant};

use serde::Serialize;
use serde_json::json;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// One role's contribution to a resolved permission
#[derive(Debug, Clone, Serialize)]
struct ContributingGrant {
    role: String,
    weight: i32,
    value: bool,
}

/// Aggregated role grants for one permission
#[derive(Debug, Clone)]
struct RoleResolution {
    matched: Permission,
    allowed: bool,
    top_weight: i32,
    grants: Vec<ContributingGrant>,
}

/// Outcome of the per-user and role layers for one permission name
#[derive(Debug, Clone)]
enum Granted {
    User { permission: Permission, value: bool },
    Roles(RoleResolution),
}

impl Granted {
    fn allowed(&self) -> bool {
        match self {
            Granted::User { value, .. } => *value,
            Granted::Roles(resolution) => resolution.allowed,
        }
    }

    fn into_explanation(self, requested: &str) -> Explanation {
        match self {
            Granted::User { permission, value } => {
                let verb = if value { "grants" } else { "denies" };
                Explanation::new(
                    value,
                    DecisionStep::UserPermission,
                    format!("User permission override {} '{}'", verb, permission.name),
                )
                .with_details(json!({ "permission": permission.name }))
            }
            Granted::Roles(resolution) => {
                let reason = if resolution.allowed {
                    format!("Top-weight roles grant '{}'", resolution.matched.name)
                } else {
                    format!("A top-weight role denies '{}'", resolution.matched.name)
                };

                Explanation::new(resolution.allowed, DecisionStep::RoleGrant, reason).with_details(json!({
                    "requested_permission": requested,
                    "matched_permission": resolution.matched.name,
                    "wildcard": resolution.matched.name != requested,
                    "top_weight": resolution.top_weight,
                    "grants": resolution.grants,
                }))
            }
        }
    }
}

/// Permission decision engine
///
/// # Evaluation order
///
/// ```text
/// 1. global wildcard  ── allow if the principal or a top-weight direct role holds `*`
/// 2. ACL              ── resource given: an entry's value is final
/// 3. ownership        ── resource + owner given: owner needs base,
///                        non-owner needs base and `.others`; always final
/// 4. user permission  ── per-user override of the exact name
/// 5. role grants      ── exact name, then `a.*` / `a.*.others`, then `*`
/// 6. aggregation      ── top weight wins, deny wins ties
/// 7. default deny
/// ```
///
/// The engine holds no per-call state and can be shared behind an `Arc`.
pub struct DecisionEngine {
    /// Store reads go through here (the cache when enabled)
    store: Arc<dyn AuthzStore>,

    /// Read-through cache, if enabled
    cache: Option<Arc<CachedStore>>,

    /// Metrics collector
    metrics: Option<Arc<MetricsCollector>>,

    /// Engine configuration
    config: EngineConfig,
}

impl DecisionEngine {
    /// Create an engine over `store` with a validated configuration
    pub fn new(config: EngineConfig, store: Arc<dyn AuthzStore>) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config, store))
    }

    /// Create an engine with the default configuration
    pub fn with_store(store: Arc<dyn AuthzStore>) -> Self {
        Self::build(EngineConfig::default(), store)
    }

    fn build(config: EngineConfig, store: Arc<dyn AuthzStore>) -> Self {
        let (store, cache) = if config.enable_cache {
            let cached = Arc::new(CachedStore::new(store, config.cache.clone()));
            (cached.clone() as Arc<dyn AuthzStore>, Some(cached))
        } else {
            (store, None)
        };

        let metrics = if config.enable_metrics {
            Some(Arc::new(MetricsCollector::new()))
        } else {
            None
        };

        info!(
            "DecisionEngine initialized with cache={}, metrics={}",
            config.enable_cache, config.enable_metrics
        );

        Self {
            store,
            cache,
            metrics,
            config,
        }
    }

    /// Decide whether the request is allowed
    ///
    /// Unknown principals and permissions deny. Only an invalid call or a
    /// failing store returns `Err`.
    pub async fn check(&self, request: &CheckRequest) -> Result<bool> {
        Ok(self.explain(request).await?.allowed)
    }

    /// Decide and report which step fired and why
    pub async fn explain(&self, request: &CheckRequest) -> Result<Explanation> {
        let start = Instant::now();
        let result = self.evaluate(request).await;

        match &result {
            Ok(explanation) => debug!(
                "Decision: {} for principal={} permission={} by {} ({})",
                if explanation.allowed { "ALLOW" } else { "DENY" },
                request.principal_id,
                request.permission,
                explanation.step,
                explanation.reason
            ),
            Err(AuthzError::InvalidInput(msg)) => debug!("Rejected permission check: {}", msg),
            Err(e) => warn!("Permission check failed: {}", e),
        }

        if let Some(metrics) = &self.metrics {
            metrics.record_latency(start.elapsed());
            match &result {
                Ok(explanation) => metrics.record_decision(explanation.step, explanation.allowed),
                Err(_) => metrics.record_error(),
            }
        }

        result
    }

    /// Whether any of `permissions` is allowed (no resource context)
    pub async fn check_any(&self, principal_id: &str, permissions: &[&str]) -> Result<bool> {
        if permissions.is_empty() {
            return Err(AuthzError::InvalidInput("at least one permission is required".to_string()));
        }

        for permission in permissions {
            if self.check(&CheckRequest::new(principal_id, *permission)).await? {
                return Ok(true);
            }
        }

        Ok(false)
    }

    /// Permission names the principal holds without resource context
    ///
    /// Each name granted to a direct role is aggregated by weight; per-user
    /// overrides then add (`true`) or remove (`false`) names. Wildcard names
    /// are listed as granted, not expanded.
    pub async fn effective_permissions(&self, principal_id: &str) -> Result<Vec<String>> {
        Self::require_principal(principal_id)?;

        let roles = self.store.roles_of(principal_id).await?;
        let mut by_name: BTreeMap<String, Vec<WeightedGrant>> = BTreeMap::new();

        for role in &roles {
            for (permission, value) in self.store.grants_for_role(&role.id).await? {
                by_name
                    .entry(permission.name)
                    .or_default()
                    .push(WeightedGrant::new(value, role.weight));
            }
        }

        let mut effective: BTreeSet<String> = by_name
            .into_iter()
            .filter(|(_, grants)| resolve_grants(grants) == Some(true))
            .map(|(name, _)| name)
            .collect();

        for (permission, value) in self.store.user_permissions(principal_id).await? {
            if value {
                effective.insert(permission.name);
            } else {
                effective.remove(&permission.name);
            }
        }

        Ok(effective.into_iter().collect())
    }

    /// Whether the principal holds the role `slug`
    pub async fn has_role(&self, principal_id: &str, slug: &str, depth: RoleDepth) -> Result<bool> {
        Self::require_principal(principal_id)?;
        roles::has_role(&*self.store, principal_id, slug, depth).await
    }

    /// Whether the principal holds any of the roles in `slugs`
    pub async fn has_any_role(&self, principal_id: &str, slugs: &[&str], depth: RoleDepth) -> Result<bool> {
        Self::require_principal(principal_id)?;
        roles::has_any_role(&*self.store, principal_id, slugs, depth).await
    }

    /// Drop every cached read
    pub fn invalidate_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.clear();
            info!("Authorization cache invalidated");
        }
    }

    /// The read-through cache, for targeted invalidation
    pub fn cache(&self) -> Option<&CachedStore> {
        self.cache.as_deref()
    }

    /// Get cache statistics
    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.cache.as_ref().map(|cache| cache.stats())
    }

    /// Get engine metrics
    pub fn metrics(&self) -> Option<EngineMetrics> {
        self.metrics.as_ref().map(|metrics| metrics.get_metrics())
    }

    /// Export metrics in Prometheus text format
    pub fn export_metrics(&self) -> Option<String> {
        self.metrics.as_ref().map(|metrics| metrics.export_prometheus())
    }

    /// Engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // Evaluation

    async fn evaluate(&self, request: &CheckRequest) -> Result<Explanation> {
        request.validate()?;
        let user_id = request.principal_id.as_str();

        debug!(
            "Permission check: principal={}, permission={}, resource={:?}, owner={:?}",
            user_id, request.permission, request.resource, request.owner_id
        );

        let roles = self.store.roles_of(user_id).await?;

        // Step 1: global wildcard
        if let Some(explanation) = self.global_wildcard(user_id, &roles).await? {
            return Ok(explanation);
        }

        if let Some(resource) = &request.resource {
            // Step 2: resource ACL
            if let Some(permission) = self.store.find_by_name(&request.permission).await? {
                let entry = self
                    .store
                    .acl_entry(user_id, &permission.id, &resource.resource_type, &resource.id)
                    .await?;

                if let Some(entry) = entry {
                    let verb = if entry.value { "grants" } else { "denies" };
                    return Ok(Explanation::new(
                        entry.value,
                        DecisionStep::Acl,
                        format!(
                            "ACL entry {} '{}' on {} {}",
                            verb, permission.name, resource.resource_type, resource.id
                        ),
                    )
                    .with_details(json!({
                        "permission": permission.name,
                        "resource_type": resource.resource_type,
                        "resource_id": resource.id,
                        "updated_at": entry.updated_at,
                    })));
                }
            }

            // Step 3: ownership gate
            if let Some(is_owner) = request.is_owner() {
                return self.ownership(request, &roles, is_owner).await;
            }
        }

        // Steps 4-6: user override, then weighted role grants with fallback
        match self.resolve(user_id, &roles, &request.permission).await? {
            Some(granted) => Ok(granted.into_explanation(&request.permission)),
            None => Ok(Explanation::deny(
                DecisionStep::DefaultDeny,
                format!("No grant found for '{}'", request.permission),
            )),
        }
    }

    async fn global_wildcard(&self, user_id: &str, roles: &[Role]) -> Result<Option<Explanation>> {
        let Some(wildcard) = self.store.find_by_name(GLOBAL_WILDCARD).await? else {
            return Ok(None);
        };

        if let Some(user_override) = self.store.user_permission(user_id, &wildcard.id).await? {
            if user_override.value {
                return Ok(Some(
                    Explanation::allow(
                        DecisionStep::GlobalWildcard,
                        "Principal holds the global wildcard permission",
                    )
                    .with_details(json!({ "source": "user" })),
                ));
            }
        }

        if let Some(resolution) = self.role_resolution(roles, &wildcard).await? {
            if resolution.allowed {
                return Ok(Some(
                    Explanation::allow(
                        DecisionStep::GlobalWildcard,
                        "Top-weight roles grant the global wildcard permission",
                    )
                    .with_details(json!({
                        "source": "roles",
                        "top_weight": resolution.top_weight,
                        "grants": resolution.grants,
                    })),
                ));
            }
        }

        Ok(None)
    }

    async fn ownership(
        &self,
        request: &CheckRequest,
        roles: &[Role],
        is_owner: bool,
    ) -> Result<Explanation> {
        let user_id = request.principal_id.as_str();
        let permission = request.permission.as_str();
        let base = self.is_granted(user_id, roles, permission).await?;

        if is_owner {
            let reason = if base {
                format!("Owner holds '{}'", permission)
            } else {
                format!("Owner lacks '{}'", permission)
            };

            return Ok(Explanation::new(base, DecisionStep::Ownership, reason).with_details(json!({
                "owner": true,
                "base_granted": base,
            })));
        }

        let others_name = others_variant(permission);
        let others = if base {
            Some(self.is_granted(user_id, roles, &others_name).await?)
        } else {
            None
        };
        let allowed = base && others == Some(true);

        let reason = if allowed {
            format!("Non-owner holds '{}' and '{}'", permission, others_name)
        } else if base {
            format!("Non-owner lacks '{}'", others_name)
        } else {
            format!("Non-owner lacks '{}'", permission)
        };

        Ok(Explanation::new(allowed, DecisionStep::Ownership, reason).with_details(json!({
            "owner": false,
            "owner_id": request.owner_id,
            "base_granted": base,
            "others_permission": others_name,
            "others_granted": others,
        })))
    }

    async fn is_granted(&self, user_id: &str, roles: &[Role], permission: &str) -> Result<bool> {
        Ok(self
            .resolve(user_id, roles, permission)
            .await?
            .map(|granted| granted.allowed())
            .unwrap_or(false))
    }

    /// Steps 4 and 5 for one permission name
    async fn resolve(&self, user_id: &str, roles: &[Role], name: &str) -> Result<Option<Granted>> {
        let exact = self.store.find_by_name(name).await?;

        if let Some(permission) = &exact {
            if let Some(user_override) = self.store.user_permission(user_id, &permission.id).await? {
                return Ok(Some(Granted::User {
                    permission: permission.clone(),
                    value: user_override.value,
                }));
            }
        }

        for (position, candidate) in fallback_chain(name).iter().enumerate() {
            let permission = if position == 0 {
                exact.clone()
            } else {
                self.store.find_by_name(candidate).await?
            };

            let Some(permission) = permission else {
                continue;
            };

            if let Some(resolution) = self.role_resolution(roles, &permission).await? {
                debug!(
                    "Resolved '{}' via '{}' ({} grants, top weight {})",
                    name,
                    permission.name,
                    resolution.grants.len(),
                    resolution.top_weight
                );
                return Ok(Some(Granted::Roles(resolution)));
            }
        }

        Ok(None)
    }

    /// Step 6 for one permission over the principal's direct roles
    async fn role_resolution(&self, roles: &[Role], permission: &Permission) -> Result<Option<RoleResolution>> {
        if roles.is_empty() {
            return Ok(None);
        }

        let role_ids: Vec<RoleId> = roles.iter().map(|r| r.id.clone()).collect();
        let found = self.store.role_grants(&role_ids, &permission.id).await?;

        let by_id: HashMap<&str, &Role> = roles.iter().map(|r| (r.id.as_str(), r)).collect();
        let grants: Vec<ContributingGrant> = found
            .iter()
            .filter_map(|grant| {
                by_id.get(grant.role_id.as_str()).map(|role| ContributingGrant {
                    role: role.slug.clone(),
                    weight: role.weight,
                    value: grant.value,
                })
            })
            .collect();

        let weighted: Vec<WeightedGrant> = grants
            .iter()
            .map(|g| WeightedGrant::new(g.value, g.weight))
            .collect();

        let Some(allowed) = resolve_grants(&weighted) else {
            return Ok(None);
        };

        Ok(Some(RoleResolution {
            matched: permission.clone(),
            allowed,
            top_weight: top_weight(&weighted).unwrap_or_default(),
            grants,
        }))
    }

    fn require_principal(principal_id: &str) -> Result<()> {
        if principal_id.trim().is_empty() {
            return Err(AuthzError::InvalidInput("principal id must be set".to_string()));
        }
        Ok(())
    }
}
