//! In-memory store for tests and embedded use.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use mazure_core::{EdgeId, RelationType, RelationshipEdge, Resource, ResourceUpdate};

use crate::error::{Result, StoreError};
use crate::{matches_types, RelationshipStore, ResourceStore};

/// Both store traits over insertion-ordered vectors.
///
/// Listing returns records in insertion order, like a document collection
/// scanned without a sort. Besides the trait surface it exposes a few test
/// hooks: `set_offline` makes every call fail with `StoreError::Unavailable`,
/// `fail_deletes_for` makes deleting one id fail, and the mutation / delete
/// counters record every write attempt.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    resources: RwLock<Vec<Resource>>,
    edges: RwLock<Vec<RelationshipEdge>>,
    failing_deletes: RwLock<HashSet<String>>,
    offline: AtomicBool,
    mutations: AtomicU64,
    delete_calls: AtomicU64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate the backing store going away (or coming back).
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Make `delete_resource(resource_id)` fail from now on.
    pub async fn fail_deletes_for(&self, resource_id: impl Into<String>) {
        self.failing_deletes.write().await.insert(resource_id.into());
    }

    /// Number of write calls (create, update, delete) received so far.
    pub fn mutation_count(&self) -> u64 {
        self.mutations.load(Ordering::SeqCst)
    }

    /// Number of `delete_resource` calls received so far.
    pub fn delete_calls(&self) -> u64 {
        self.delete_calls.load(Ordering::SeqCst)
    }

    pub async fn resource_count(&self) -> usize {
        self.resources.read().await.len()
    }

    pub async fn edge_count(&self) -> usize {
        self.edges.read().await.len()
    }

    /// Snapshot of every stored edge, in insertion order.
    pub async fn all_edges(&self) -> Vec<RelationshipEdge> {
        self.edges.read().await.clone()
    }

    fn check_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("in-memory store is offline".to_string()));
        }
        Ok(())
    }

    fn record_mutation(&self) {
        self.mutations.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ResourceStore for InMemoryStore {
    async fn list_resources(
        &self,
        subscription_id: &str,
        resource_type: Option<&str>,
    ) -> Result<Vec<Resource>> {
        self.check_online()?;
        let resources = self.resources.read().await;
        Ok(resources
            .iter()
            .filter(|r| r.subscription_id == subscription_id)
            .filter(|r| resource_type.map_or(true, |t| r.resource_type == t))
            .cloned()
            .collect())
    }

    async fn get_resource(&self, resource_id: &str) -> Result<Option<Resource>> {
        self.check_online()?;
        let resources = self.resources.read().await;
        Ok(resources.iter().find(|r| r.id == resource_id).cloned())
    }

    async fn delete_resource(&self, resource_id: &str) -> Result<bool> {
        self.check_online()?;
        self.record_mutation();
        self.delete_calls.fetch_add(1, Ordering::SeqCst);

        if self.failing_deletes.read().await.contains(resource_id) {
            return Err(StoreError::Unavailable(format!(
                "delete rejected for {resource_id}"
            )));
        }

        let mut resources = self.resources.write().await;
        let before = resources.len();
        resources.retain(|r| r.id != resource_id);
        Ok(resources.len() < before)
    }

    async fn create_resource(&self, resource: Resource) -> Result<Resource> {
        self.check_online()?;
        self.record_mutation();

        let mut resources = self.resources.write().await;
        if resources.iter().any(|r| r.id == resource.id) {
            return Err(StoreError::Conflict(resource.id));
        }
        resources.push(resource.clone());
        Ok(resource)
    }

    async fn update_resource(&self, resource_id: &str, update: ResourceUpdate) -> Result<Resource> {
        self.check_online()?;
        self.record_mutation();

        let mut resources = self.resources.write().await;
        let resource = resources
            .iter_mut()
            .find(|r| r.id == resource_id)
            .ok_or_else(|| StoreError::NotFound(resource_id.to_string()))?;
        resource.apply_update(update);
        Ok(resource.clone())
    }
}

#[async_trait]
impl RelationshipStore for InMemoryStore {
    async fn find_outbound(
        &self,
        source_id: &str,
        relation_types: Option<&[RelationType]>,
    ) -> Result<Vec<RelationshipEdge>> {
        self.check_online()?;
        let edges = self.edges.read().await;
        Ok(edges
            .iter()
            .filter(|e| e.source_id == source_id && matches_types(&e.relation_type, relation_types))
            .cloned()
            .collect())
    }

    async fn find_inbound(
        &self,
        target_id: &str,
        relation_types: Option<&[RelationType]>,
    ) -> Result<Vec<RelationshipEdge>> {
        self.check_online()?;
        let edges = self.edges.read().await;
        Ok(edges
            .iter()
            .filter(|e| e.target_id == target_id && matches_types(&e.relation_type, relation_types))
            .cloned()
            .collect())
    }

    async fn delete_for_resource(&self, resource_id: &str) -> Result<u64> {
        self.check_online()?;
        self.record_mutation();

        let mut edges = self.edges.write().await;
        let before = edges.len();
        edges.retain(|e| !e.touches(resource_id));
        Ok((before - edges.len()) as u64)
    }

    async fn create_relationship(
        &self,
        source_id: &str,
        target_id: &str,
        relation_type: RelationType,
        weight: f64,
        metadata: Map<String, Value>,
    ) -> Result<RelationshipEdge> {
        self.check_online()?;
        self.record_mutation();

        let edge = RelationshipEdge {
            id: EdgeId::new(),
            source_id: source_id.to_string(),
            target_id: target_id.to_string(),
            relation_type,
            weight,
            metadata,
            created_at: Utc::now(),
        };
        self.edges.write().await.push(edge.clone());
        Ok(edge)
    }
}
