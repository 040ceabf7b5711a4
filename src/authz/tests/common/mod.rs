//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::sync::Arc;
use warden_authz::{DecisionEngine, InMemoryStore, Permission, Role};

/// Store plus handles to the fixtures created in it
pub struct Fixture {
    pub store: InMemoryStore,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            store: InMemoryStore::new(),
        }
    }

    pub fn engine(&self) -> DecisionEngine {
        DecisionEngine::with_store(Arc::new(self.store.clone()))
    }

    pub async fn permission(&self, name: &str) -> Permission {
        self.store.add_permission(name).await
    }

    pub async fn role(&self, slug: &str, weight: i32) -> Role {
        self.store.add_role(slug, slug, weight).await.unwrap()
    }

    /// Grant `name` on `role`, registering the permission if needed
    pub async fn grant(&self, role: &Role, name: &str, value: bool) {
        let permission = self.permission(name).await;
        self.store.grant(&role.id, &permission.id, value).await.unwrap();
    }

    pub async fn assign(&self, user: &str, role: &Role) {
        self.store.assign_role(user, &role.id).await.unwrap();
    }

    pub async fn acl(&self, user: &str, name: &str, resource_type: &str, resource_id: &str, value: bool) {
        let permission = self.permission(name).await;
        self.store
            .set_acl(user, &permission.id, resource_type, resource_id, value)
            .await
            .unwrap();
    }
}
