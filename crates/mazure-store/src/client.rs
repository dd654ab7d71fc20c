//! Neo4j connection management and the `Neo4jStore` adapter.

use async_trait::async_trait;
use neo4rs::{query, ConfigBuilder, Graph, Query};
use serde_json::{Map, Value};

use mazure_core::config::Neo4jSettings;
use mazure_core::{RelationType, RelationshipEdge, Resource, ResourceUpdate};

use crate::error::{Result, StoreError};
use crate::{RelationshipStore, ResourceStore};

/// Schema statements applied by [`Neo4jStore::ensure_schema`].
///
/// Edge triples are deliberately left without a uniqueness constraint.
const SCHEMA: &[&str] = &[
    "CREATE CONSTRAINT resource_id IF NOT EXISTS FOR (n:Resource) REQUIRE n.id IS UNIQUE",
    "CREATE INDEX resource_sub_type IF NOT EXISTS FOR (n:Resource) ON (n.subscription_id, n.resource_type)",
    "CREATE INDEX resource_sub_group IF NOT EXISTS FOR (n:Resource) ON (n.subscription_id, n.resource_group)",
    "CREATE INDEX resource_location IF NOT EXISTS FOR (n:Resource) ON (n.location)",
    "CREATE INDEX relationship_outbound IF NOT EXISTS FOR (r:Relationship) ON (r.source_id, r.relation_type)",
    "CREATE INDEX relationship_inbound IF NOT EXISTS FOR (r:Relationship) ON (r.target_id, r.relation_type)",
    "CREATE INDEX relationship_pair IF NOT EXISTS FOR (r:Relationship) ON (r.source_id, r.target_id)",
];

/// Neo4j-backed implementation of both store traits.
///
/// Resources are `:Resource` nodes. Edges are standalone `:Relationship`
/// nodes carrying `source_id`/`target_id`, since an endpoint may be an
/// opaque URI with no matching resource. Clone is cheap (pooled inner graph).
#[derive(Clone)]
pub struct Neo4jStore {
    graph: Graph,
}

impl Neo4jStore {
    /// Connect to Neo4j with the given settings.
    pub async fn connect(settings: &Neo4jSettings) -> Result<Self> {
        let neo_config = ConfigBuilder::default()
            .uri(&settings.uri)
            .user(&settings.user)
            .password(&settings.password)
            .max_connections(settings.max_connections as usize)
            .fetch_size(settings.fetch_size)
            .build()
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        let graph = Graph::connect(neo_config)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        tracing::info!(uri = %settings.uri, "Connected to Neo4j");
        Ok(Self { graph })
    }

    /// Create the constraint and indexes the adapters rely on. Idempotent.
    pub async fn ensure_schema(&self) -> Result<()> {
        for statement in SCHEMA {
            self.run(query(statement)).await?;
        }
        tracing::info!(statements = SCHEMA.len(), "Neo4j schema ensured");
        Ok(())
    }

    /// Execute a write-only query.
    pub async fn run(&self, query: Query) -> Result<()> {
        self.graph.run(query).await?;
        Ok(())
    }

    /// Execute a read query and collect all rows.
    pub async fn query_rows(&self, query: Query) -> Result<Vec<neo4rs::Row>> {
        let mut stream = self.graph.execute(query).await?;
        let mut rows = Vec::new();
        while let Some(row) = stream.next().await? {
            rows.push(row);
        }
        Ok(rows)
    }

    /// Execute a read query and return the first row, if any.
    pub async fn query_one(&self, query: Query) -> Result<Option<neo4rs::Row>> {
        let mut stream = self.graph.execute(query).await?;
        Ok(stream.next().await?)
    }
}

#[async_trait]
impl ResourceStore for Neo4jStore {
    async fn list_resources(
        &self,
        subscription_id: &str,
        resource_type: Option<&str>,
    ) -> Result<Vec<Resource>> {
        self.list_resource_nodes(subscription_id, resource_type).await
    }

    async fn get_resource(&self, resource_id: &str) -> Result<Option<Resource>> {
        self.get_resource_node(resource_id).await
    }

    async fn delete_resource(&self, resource_id: &str) -> Result<bool> {
        self.delete_resource_node(resource_id).await
    }

    async fn create_resource(&self, resource: Resource) -> Result<Resource> {
        self.create_resource_node(resource).await
    }

    async fn update_resource(&self, resource_id: &str, update: ResourceUpdate) -> Result<Resource> {
        self.update_resource_node(resource_id, update).await
    }
}

#[async_trait]
impl RelationshipStore for Neo4jStore {
    async fn find_outbound(
        &self,
        source_id: &str,
        relation_types: Option<&[RelationType]>,
    ) -> Result<Vec<RelationshipEdge>> {
        self.find_edges("source_id", source_id, relation_types).await
    }

    async fn find_inbound(
        &self,
        target_id: &str,
        relation_types: Option<&[RelationType]>,
    ) -> Result<Vec<RelationshipEdge>> {
        self.find_edges("target_id", target_id, relation_types).await
    }

    async fn delete_for_resource(&self, resource_id: &str) -> Result<u64> {
        self.delete_edges_touching(resource_id).await
    }

    async fn create_relationship(
        &self,
        source_id: &str,
        target_id: &str,
        relation_type: RelationType,
        weight: f64,
        metadata: Map<String, Value>,
    ) -> Result<RelationshipEdge> {
        self.create_edge_node(source_id, target_id, relation_type, weight, metadata)
            .await
    }
}
