//! Mazure Store — adapters over the resource and relationship collections.
//!
//! Both engines talk to storage only through the [`ResourceStore`] and
//! [`RelationshipStore`] traits. Handles are passed in explicitly (usually
//! as `Arc<dyn ...>`), never looked up from a global connection.
//!
//! Two backends ship with the crate:
//! - [`InMemoryStore`]: insertion-ordered collections behind `tokio` locks,
//!   with hooks for simulating outages and counting mutations in tests.
//! - [`Neo4jStore`]: pooled Neo4j client; resources and edges are stored as
//!   `:Resource` and `:Relationship` nodes.

pub mod client;
pub mod error;
pub mod memory;
pub mod mutations;
pub mod queries;

pub use client::Neo4jStore;
pub use error::{Result, StoreError};
pub use memory::InMemoryStore;

use async_trait::async_trait;
use serde_json::{Map, Value};

use mazure_core::{RelationType, RelationshipEdge, Resource, ResourceUpdate};

/// CRUD over resource records keyed by their unique id.
///
/// Implementations provide per-record atomicity only.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// List resources in a subscription, optionally narrowed to one type.
    async fn list_resources(
        &self,
        subscription_id: &str,
        resource_type: Option<&str>,
    ) -> Result<Vec<Resource>>;

    /// Get a resource by id. Returns `None` if it doesn't exist.
    async fn get_resource(&self, resource_id: &str) -> Result<Option<Resource>>;

    /// Delete a resource. Returns `Ok(false)` if nothing was deleted.
    async fn delete_resource(&self, resource_id: &str) -> Result<bool>;

    /// Insert a new resource.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Conflict` if the id is already taken.
    async fn create_resource(&self, resource: Resource) -> Result<Resource>;

    /// Apply a partial update and return the stored result.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the resource doesn't exist.
    async fn update_resource(&self, resource_id: &str, update: ResourceUpdate) -> Result<Resource>;
}

/// CRUD over directed, typed relationship edges.
///
/// A `relation_types` filter of `None` or an empty slice matches every type.
#[async_trait]
pub trait RelationshipStore: Send + Sync {
    /// Edges whose source is `source_id`.
    async fn find_outbound(
        &self,
        source_id: &str,
        relation_types: Option<&[RelationType]>,
    ) -> Result<Vec<RelationshipEdge>>;

    /// Edges whose target is `target_id`.
    async fn find_inbound(
        &self,
        target_id: &str,
        relation_types: Option<&[RelationType]>,
    ) -> Result<Vec<RelationshipEdge>>;

    /// Delete every edge where `resource_id` is source or target.
    /// Returns the number of edges removed.
    async fn delete_for_resource(&self, resource_id: &str) -> Result<u64>;

    /// Record a new edge. Duplicates of an existing `(source, target, type)`
    /// triple are stored as separate edges.
    async fn create_relationship(
        &self,
        source_id: &str,
        target_id: &str,
        relation_type: RelationType,
        weight: f64,
        metadata: Map<String, Value>,
    ) -> Result<RelationshipEdge>;
}

/// True when `filter` is absent/empty or contains `relation_type`.
pub(crate) fn matches_types(relation_type: &RelationType, filter: Option<&[RelationType]>) -> bool {
    match filter {
        Some(types) if !types.is_empty() => types.contains(relation_type),
        _ => true,
    }
}
