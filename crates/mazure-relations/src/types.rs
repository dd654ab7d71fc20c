//! Request and outcome types for relationship operations.
//!
//! Outcomes are untagged so they serialize to the flat JSON objects callers
//! already consume (`{deleted, count, cascade, warnings}`, `{error, ...}`).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use mazure_core::RelationType;

/// An inbound edge that prevents a non-cascading delete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockingEdge {
    pub resource_id: String,
    pub relation_type: RelationType,
}

/// Result of `delete_with_dependents`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DeleteOutcome {
    /// Non-cascading delete with dependents. Nothing was mutated.
    Blocked {
        error: String,
        blocked_by: Vec<BlockingEdge>,
        message: String,
        deleted: Vec<String>,
        count: usize,
    },
    /// Plan only; nothing was mutated.
    DryRun {
        dry_run: bool,
        would_delete: Vec<String>,
        count: usize,
        warnings: Vec<String>,
        cascade: bool,
    },
    Executed {
        deleted: Vec<String>,
        count: usize,
        cascade: bool,
        warnings: Vec<String>,
    },
    /// Relationship tracking missing or the store failed.
    Failed {
        error: String,
        deleted: Vec<String>,
        count: usize,
    },
}

impl DeleteOutcome {
    pub(crate) fn failed(error: impl ToString) -> Self {
        Self::Failed {
            error: error.to_string(),
            deleted: Vec::new(),
            count: 0,
        }
    }

    /// The `error` field, if this outcome carries one.
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Blocked { error, .. } | Self::Failed { error, .. } => Some(error),
            _ => None,
        }
    }
}

/// Body of a create-time reference check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidateRequest {
    pub resource_type: String,
    #[serde(default)]
    pub properties: Value,
    #[serde(default)]
    pub subscription_id: Option<String>,
    #[serde(default)]
    pub resource_group: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// Result of `validate_create`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ValidationOutcome {
    Report(ValidationReport),
    Failed { error: String },
}

/// One edge in a dependency tree, seen from the tree's root.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DependencyEntry {
    pub resource_id: String,
    pub relation_type: RelationType,
    pub weight: f64,
    /// Present when the traversal expanded this resource.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<Box<DependencyTree>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DependencyTree {
    pub resource_id: String,
    pub depends_on: Vec<DependencyEntry>,
    pub depended_by: Vec<DependencyEntry>,
}

/// Result of `get_resource_dependencies`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DependencyOutcome {
    Tree(DependencyTree),
    Failed { resource_id: String, error: String },
}

/// Result of `analyze_impact`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ImpactOutcome {
    Delete(DeleteOutcome),
    Modify {
        operation: String,
        resource_id: String,
        potentially_affected: Vec<DependencyEntry>,
        message: String,
    },
    Failed { error: String },
}
