//! Read operations and row decoding for the Neo4j store.

use chrono::{DateTime, Utc};
use neo4rs::query;
use serde_json::Value;
use uuid::Uuid;

use mazure_core::{EdgeId, RelationType, RelationshipEdge, Resource};

use crate::client::Neo4jStore;
use crate::error::{Result, StoreError};

/// Scalar columns projected for a `:Resource` node bound to `n`.
pub(crate) const RESOURCE_COLUMNS: &str = "n.id AS id, n.name AS name, n.resource_type AS resource_type,
     n.subscription_id AS subscription_id, n.resource_group AS resource_group,
     n.location AS location, n.tags_json AS tags_json, n.properties_json AS properties_json,
     n.api_version AS api_version, n.created_at AS created_at, n.updated_at AS updated_at";

/// Scalar columns projected for a `:Relationship` node bound to `r`.
pub(crate) const EDGE_COLUMNS: &str = "r.id AS id, r.source_id AS source_id, r.target_id AS target_id,
     r.relation_type AS relation_type, r.weight AS weight,
     r.metadata_json AS metadata_json, r.created_at AS created_at";

impl Neo4jStore {
    /// Resources in a subscription, in creation order.
    pub async fn list_resource_nodes(
        &self,
        subscription_id: &str,
        resource_type: Option<&str>,
    ) -> Result<Vec<Resource>> {
        let cypher = format!(
            "MATCH (n:Resource {{subscription_id: $subscription_id}})
             WHERE $resource_type = '' OR n.resource_type = $resource_type
             RETURN {RESOURCE_COLUMNS}
             ORDER BY n.created_at"
        );

        let q = query(&cypher)
            .param("subscription_id", subscription_id.to_string())
            .param("resource_type", resource_type.unwrap_or_default().to_string());

        let rows = self.query_rows(q).await?;
        rows.iter().map(row_to_resource).collect()
    }

    pub async fn get_resource_node(&self, resource_id: &str) -> Result<Option<Resource>> {
        let cypher = format!(
            "MATCH (n:Resource {{id: $id}})
             RETURN {RESOURCE_COLUMNS}"
        );
        let q = query(&cypher).param("id", resource_id.to_string());

        match self.query_one(q).await? {
            Some(row) => Ok(Some(row_to_resource(&row)?)),
            None => Ok(None),
        }
    }

    /// Edges whose `column` (`source_id` or `target_id`) equals `id`.
    pub(crate) async fn find_edges(
        &self,
        column: &str,
        id: &str,
        relation_types: Option<&[RelationType]>,
    ) -> Result<Vec<RelationshipEdge>> {
        let types: Vec<String> = relation_types
            .unwrap_or_default()
            .iter()
            .map(|t| t.as_str().to_string())
            .collect();

        let cypher = format!(
            "MATCH (r:Relationship {{{column}: $id}})
             WHERE size($types) = 0 OR r.relation_type IN $types
             RETURN {EDGE_COLUMNS}
             ORDER BY r.created_at"
        );
        let q = query(&cypher)
            .param("id", id.to_string())
            .param("types", types);

        let rows = self.query_rows(q).await?;
        rows.iter().map(row_to_edge).collect()
    }
}

// ── Row decoding ─────────────────────────────────────────────────

fn get_string(row: &neo4rs::Row, key: &str) -> Result<String> {
    row.get::<String>(key)
        .map_err(|e| StoreError::Serialization(format!("column {key}: {e}")))
}

fn get_json(row: &neo4rs::Row, key: &str) -> Result<Value> {
    let raw = get_string(row, key)?;
    if raw.is_empty() {
        return Ok(Value::Object(Default::default()));
    }
    serde_json::from_str(&raw).map_err(|e| StoreError::Serialization(format!("column {key}: {e}")))
}

fn get_timestamp(row: &neo4rs::Row, key: &str) -> Result<DateTime<Utc>> {
    let raw = get_string(row, key)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Serialization(format!("column {key}: {e}")))
}

pub(crate) fn row_to_resource(row: &neo4rs::Row) -> Result<Resource> {
    let tags = serde_json::from_value(get_json(row, "tags_json")?)
        .map_err(|e| StoreError::Serialization(format!("column tags_json: {e}")))?;
    let api_version = get_string(row, "api_version")?;

    Ok(Resource {
        id: get_string(row, "id")?,
        resource_type: get_string(row, "resource_type")?,
        name: get_string(row, "name")?,
        subscription_id: get_string(row, "subscription_id")?,
        resource_group: get_string(row, "resource_group")?,
        location: get_string(row, "location")?,
        tags,
        properties: get_json(row, "properties_json")?,
        api_version: (!api_version.is_empty()).then_some(api_version),
        created_at: get_timestamp(row, "created_at")?,
        updated_at: get_timestamp(row, "updated_at")?,
    })
}

pub(crate) fn row_to_edge(row: &neo4rs::Row) -> Result<RelationshipEdge> {
    let id = Uuid::parse_str(&get_string(row, "id")?)
        .map_err(|e| StoreError::Serialization(format!("column id: {e}")))?;
    let metadata = match get_json(row, "metadata_json")? {
        Value::Object(map) => map,
        _ => Default::default(),
    };

    Ok(RelationshipEdge {
        id: EdgeId(id),
        source_id: get_string(row, "source_id")?,
        target_id: get_string(row, "target_id")?,
        relation_type: RelationType::from(get_string(row, "relation_type")?),
        weight: row.get::<f64>("weight").unwrap_or(1.0),
        metadata,
        created_at: get_timestamp(row, "created_at")?,
    })
}
