//! Core domain types for the mocked Azure resource estate.
//!
//! Resources are ARM-shaped records keyed by their hierarchical id;
//! relationship edges are directed, typed links between resource ids
//! (or opaque URIs such as `graph://group/{id}` for directory objects).

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// A query row: one JSON object per resource or container.
pub type Row = Map<String, Value>;

// ── Resource ──────────────────────────────────────────────────────

/// A mocked ARM resource.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub id: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    pub name: String,
    pub subscription_id: String,
    pub resource_group: String,
    pub location: String,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    #[serde(default = "empty_object")]
    pub properties: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Resource {
    /// Build a resource whose id is derived from its ARM coordinates.
    pub fn new(
        subscription_id: impl Into<String>,
        resource_group: impl Into<String>,
        resource_type: impl Into<String>,
        name: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        let subscription_id = subscription_id.into();
        let resource_group = resource_group.into();
        let resource_type = resource_type.into();
        let name = name.into();
        let now = Utc::now();
        Self {
            id: arm_id(&subscription_id, &resource_group, &resource_type, &name),
            resource_type,
            name,
            subscription_id,
            resource_group,
            location: location.into(),
            tags: BTreeMap::new(),
            properties: empty_object(),
            api_version: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Override the derived id (directory objects use opaque URIs).
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn with_properties(mut self, properties: Value) -> Self {
        self.properties = properties;
        self
    }

    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = Some(api_version.into());
        self
    }

    /// Apply a partial update and bump `updated_at`.
    pub fn apply_update(&mut self, update: ResourceUpdate) {
        if let Some(props) = update.properties {
            match self.properties.as_object_mut() {
                Some(existing) => existing.extend(props),
                None => self.properties = Value::Object(props),
            }
        }
        if let Some(tags) = update.tags {
            self.tags = tags;
        }
        if let Some(location) = update.location {
            self.location = location;
        }
        self.updated_at = Utc::now();
    }

    /// Render the resource as an ARM-style query row.
    pub fn to_row(&self) -> Row {
        let mut row = Map::new();
        row.insert("id".to_string(), Value::String(self.id.clone()));
        row.insert("name".to_string(), Value::String(self.name.clone()));
        row.insert("type".to_string(), Value::String(self.resource_type.clone()));
        row.insert("location".to_string(), Value::String(self.location.clone()));
        row.insert(
            "tags".to_string(),
            Value::Object(
                self.tags
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                    .collect(),
            ),
        );
        row.insert("properties".to_string(), self.properties.clone());
        row.insert(
            "subscriptionId".to_string(),
            Value::String(self.subscription_id.clone()),
        );
        row.insert(
            "resourceGroup".to_string(),
            Value::String(self.resource_group.clone()),
        );
        row
    }
}

/// Partial update applied by `ResourceStore::update_resource`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceUpdate {
    /// Merged key-by-key into the existing properties object.
    pub properties: Option<Map<String, Value>>,
    /// Replaces the tag map wholesale.
    pub tags: Option<BTreeMap<String, String>>,
    pub location: Option<String>,
}

/// Derive the ARM id `/subscriptions/{}/resourceGroups/{}/providers/{type}/{name}`.
pub fn arm_id(subscription_id: &str, resource_group: &str, resource_type: &str, name: &str) -> String {
    format!(
        "/subscriptions/{subscription_id}/resourceGroups/{resource_group}/providers/{resource_type}/{name}"
    )
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

// ── Relationships ─────────────────────────────────────────────────

/// Unique identifier for a relationship edge.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct EdgeId(pub Uuid);

impl EdgeId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EdgeId {
    fn default() -> Self {
        Self::new()
    }
}

/// The kind of a relationship. Open vocabulary: unknown strings are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RelationType {
    Contains,
    DependsOn,
    RequiredBy,
    ParentOf,
    ChildOf,
    HasMember,
    HasOwner,
    Other(String),
}

impl RelationType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Contains => "contains",
            Self::DependsOn => "depends_on",
            Self::RequiredBy => "required_by",
            Self::ParentOf => "parent_of",
            Self::ChildOf => "child_of",
            Self::HasMember => "has_member",
            Self::HasOwner => "has_owner",
            Self::Other(s) => s,
        }
    }
}

impl From<&str> for RelationType {
    fn from(s: &str) -> Self {
        match s {
            "contains" => Self::Contains,
            "depends_on" => Self::DependsOn,
            "required_by" => Self::RequiredBy,
            "parent_of" => Self::ParentOf,
            "child_of" => Self::ChildOf,
            "has_member" => Self::HasMember,
            "has_owner" => Self::HasOwner,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for RelationType {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl From<RelationType> for String {
    fn from(rt: RelationType) -> Self {
        rt.as_str().to_string()
    }
}

impl fmt::Display for RelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A directed, typed edge between two resource ids.
///
/// `(source_id, target_id, relation_type)` is not unique: re-importing the
/// same edge accumulates duplicates.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipEdge {
    pub id: EdgeId,
    pub source_id: String,
    pub target_id: String,
    pub relation_type: RelationType,
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    pub created_at: DateTime<Utc>,
}

impl RelationshipEdge {
    pub fn new(
        source_id: impl Into<String>,
        target_id: impl Into<String>,
        relation_type: impl Into<RelationType>,
    ) -> Self {
        Self {
            id: EdgeId::new(),
            source_id: source_id.into(),
            target_id: target_id.into(),
            relation_type: relation_type.into(),
            weight: default_weight(),
            metadata: Map::new(),
            created_at: Utc::now(),
        }
    }

    /// True if `resource_id` is either endpoint of this edge.
    pub fn touches(&self, resource_id: &str) -> bool {
        self.source_id == resource_id || self.target_id == resource_id
    }
}

pub fn default_weight() -> f64 {
    1.0
}
