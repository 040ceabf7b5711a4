//! # Warden Authorization Engine
//!
//! Role-based permission checks with weighted roles, wildcard permissions,
//! resource ACL entries and ownership rules.
//!
//! ## Features
//!
//! - **Weighted role grants**: the highest-weight roles decide, deny wins ties
//! - **Wildcard fallback** from `a.b` to `a.*` to the global `*`
//! - **Resource ACL entries** that override role grants for one instance
//! - **Ownership gate** with `.others` permissions for non-owners
//! - **Explainable decisions** reporting the step that fired
//! - **Pluggable stores** (in-memory, cached, PostgreSQL behind `postgres`)
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use warden_authz::{CheckRequest, DecisionEngine, InMemoryStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = InMemoryStore::new();
//!     let editor = store.add_role("Editor", "editor", 10).await?;
//!     let edit = store.add_permission("document.edit").await;
//!     store.grant(&editor.id, &edit.id, true).await?;
//!     store.assign_role("alice", &editor.id).await?;
//!
//!     let engine = DecisionEngine::with_store(Arc::new(store));
//!     let request = CheckRequest::new("alice", "document.edit");
//!
//!     if engine.check(&request).await? {
//!         println!("Access granted!");
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod diagram;
pub mod engine;
pub mod error;
pub mod permission;
pub mod roles;
pub mod seed;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use config::{CacheConfig, EngineConfig};
pub use engine::{
    CheckRequest, DecisionEngine, DecisionStep, EngineMetrics, Explanation, ResourceRef,
};
pub use error::{AuthzError, Result};
pub use permission::PermissionCatalog;
pub use roles::{RoleDepth, RoleGraph};
pub use store::{AuthzStore, CacheStats, CachedStore, GrantStore, InMemoryStore};
pub use types::{
    AclEntry, Permission, PermissionId, Role, RoleGrant, RoleId, UserId, UserPermission,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
