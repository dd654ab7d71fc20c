//! Write operations for the Neo4j store.
//!
//! Optional fields are stored as empty strings; JSON bags (`tags`,
//! `properties`, `metadata`) are stored as serialized strings.

use chrono::Utc;
use neo4rs::query;
use serde_json::{Map, Value};

use mazure_core::{EdgeId, RelationType, RelationshipEdge, Resource, ResourceUpdate};

use crate::client::Neo4jStore;
use crate::error::{Result, StoreError};

impl Neo4jStore {
    /// Insert a resource node. Fails with `Conflict` if the id is taken.
    pub async fn create_resource_node(&self, resource: Resource) -> Result<Resource> {
        if self.get_resource_node(&resource.id).await?.is_some() {
            return Err(StoreError::Conflict(resource.id));
        }

        let q = query(
            "CREATE (n:Resource {
               id: $id, name: $name, resource_type: $resource_type,
               subscription_id: $subscription_id, resource_group: $resource_group,
               location: $location, tags_json: $tags_json,
               properties_json: $properties_json, api_version: $api_version,
               created_at: $created_at, updated_at: $updated_at
             })",
        )
        .param("id", resource.id.clone())
        .param("name", resource.name.clone())
        .param("resource_type", resource.resource_type.clone())
        .param("subscription_id", resource.subscription_id.clone())
        .param("resource_group", resource.resource_group.clone())
        .param("location", resource.location.clone())
        .param("tags_json", ser(&resource.tags)?)
        .param("properties_json", ser(&resource.properties)?)
        .param("api_version", resource.api_version.clone().unwrap_or_default())
        .param("created_at", resource.created_at.to_rfc3339())
        .param("updated_at", resource.updated_at.to_rfc3339());

        self.run(q).await?;
        tracing::debug!(resource_id = %resource.id, "Created resource");
        Ok(resource)
    }

    /// Read, merge, and write back a partial update.
    pub async fn update_resource_node(
        &self,
        resource_id: &str,
        update: ResourceUpdate,
    ) -> Result<Resource> {
        let mut resource = self
            .get_resource_node(resource_id)
            .await?
            .ok_or_else(|| StoreError::NotFound(resource_id.to_string()))?;
        resource.apply_update(update);

        let q = query(
            "MATCH (n:Resource {id: $id})
             SET n.location = $location, n.tags_json = $tags_json,
                 n.properties_json = $properties_json, n.updated_at = $updated_at",
        )
        .param("id", resource.id.clone())
        .param("location", resource.location.clone())
        .param("tags_json", ser(&resource.tags)?)
        .param("properties_json", ser(&resource.properties)?)
        .param("updated_at", resource.updated_at.to_rfc3339());

        self.run(q).await?;
        Ok(resource)
    }

    /// Delete a resource node. Returns whether a node was removed.
    pub async fn delete_resource_node(&self, resource_id: &str) -> Result<bool> {
        let q = query(
            "MATCH (n:Resource {id: $id})
             DETACH DELETE n
             RETURN count(n) AS cnt",
        )
        .param("id", resource_id.to_string());

        let removed = match self.query_one(q).await? {
            Some(row) => row.get::<i64>("cnt").unwrap_or(0),
            None => 0,
        };
        Ok(removed > 0)
    }

    pub(crate) async fn create_edge_node(
        &self,
        source_id: &str,
        target_id: &str,
        relation_type: RelationType,
        weight: f64,
        metadata: Map<String, Value>,
    ) -> Result<RelationshipEdge> {
        let edge = RelationshipEdge {
            id: EdgeId::new(),
            source_id: source_id.to_string(),
            target_id: target_id.to_string(),
            relation_type,
            weight,
            metadata,
            created_at: Utc::now(),
        };

        let q = query(
            "CREATE (r:Relationship {
               id: $id, source_id: $source_id, target_id: $target_id,
               relation_type: $relation_type, weight: $weight,
               metadata_json: $metadata_json, created_at: $created_at
             })",
        )
        .param("id", edge.id.0.to_string())
        .param("source_id", edge.source_id.clone())
        .param("target_id", edge.target_id.clone())
        .param("relation_type", edge.relation_type.as_str().to_string())
        .param("weight", edge.weight)
        .param("metadata_json", ser(&edge.metadata)?)
        .param("created_at", edge.created_at.to_rfc3339());

        self.run(q).await?;
        Ok(edge)
    }

    /// Delete every edge with `resource_id` at either end.
    pub(crate) async fn delete_edges_touching(&self, resource_id: &str) -> Result<u64> {
        let q = query(
            "MATCH (r:Relationship)
             WHERE r.source_id = $id OR r.target_id = $id
             DELETE r
             RETURN count(r) AS cnt",
        )
        .param("id", resource_id.to_string());

        let removed = match self.query_one(q).await? {
            Some(row) => row.get::<i64>("cnt").unwrap_or(0),
            None => 0,
        };
        tracing::debug!(resource_id, removed, "Deleted relationships");
        Ok(removed.max(0) as u64)
    }
}

fn ser<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| StoreError::Serialization(e.to_string()))
}
