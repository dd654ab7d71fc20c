//! mazure-relations: Relationship-aware operations over the resource estate.
//!
//! Walks the directed edges in the relationship store to plan and execute
//! cascading deletes, check create-time references, build dependency trees,
//! and estimate the impact of a delete or modify. Each call is one bounded,
//! iterative traversal over edges fetched fresh from the store.
//!
//! Public operations never fail: blockers, missing relationship tracking,
//! and store errors are all reported as structured outcomes.

pub mod dependencies;
pub mod deletion;
pub mod error;
pub mod fetch;
pub mod types;
pub mod validation;

pub use error::RelationsError;
pub use types::{
    BlockingEdge, DeleteOutcome, DependencyEntry, DependencyOutcome, DependencyTree, ImpactOutcome,
    ValidateRequest, ValidationOutcome, ValidationReport,
};

use std::sync::Arc;

use mazure_store::{RelationshipStore, ResourceStore};

use crate::error::Result;

/// Dependency graph engine.
///
/// Relationship tracking is optional and fixed at construction; without it
/// every relationship-dependent operation reports
/// `"Relationship tracking not available"`. The engine takes no locks:
/// overlapping cascades are not serialized against each other.
pub struct RelationshipEngine {
    resources: Arc<dyn ResourceStore>,
    relationships: Option<Arc<dyn RelationshipStore>>,
}

impl RelationshipEngine {
    pub fn new(
        resources: Arc<dyn ResourceStore>,
        relationships: Option<Arc<dyn RelationshipStore>>,
    ) -> Self {
        if relationships.is_none() {
            tracing::warn!("Relationship store not configured, relationship operations disabled");
        }
        Self {
            resources,
            relationships,
        }
    }

    pub fn has_relationship_tracking(&self) -> bool {
        self.relationships.is_some()
    }

    fn relationships(&self) -> Result<&Arc<dyn RelationshipStore>> {
        self.relationships
            .as_ref()
            .ok_or(RelationsError::TrackingUnavailable)
    }

    /// Impact of `operation` (`delete` or `modify`) on `resource_id`.
    ///
    /// `delete` is a cascading dry run. `modify` lists the resources that
    /// directly depend on the target.
    pub async fn analyze_impact(&self, resource_id: &str, operation: &str) -> ImpactOutcome {
        match operation {
            "delete" => ImpactOutcome::Delete(self.delete_with_dependents(resource_id, true, true).await),
            "modify" => match self.build_dependency_tree(resource_id, 0, true).await {
                Ok(tree) => ImpactOutcome::Modify {
                    operation: operation.to_string(),
                    resource_id: resource_id.to_string(),
                    message: format!(
                        "{} resources may be affected by modification",
                        tree.depended_by.len()
                    ),
                    potentially_affected: tree.depended_by,
                },
                Err(e) => {
                    tracing::error!(resource_id, error = %e, "Impact analysis failed");
                    ImpactOutcome::Failed {
                        error: e.to_string(),
                    }
                }
            },
            other => ImpactOutcome::Failed {
                error: RelationsError::UnsupportedOperation(other.to_string()).to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mazure_core::RelationType;
    use mazure_store::InMemoryStore;
    use serde_json::{json, Map};

    async fn estate() -> Arc<InMemoryStore> {
        let store = Arc::new(InMemoryStore::new());
        for (src, tgt, rt) in [
            ("vm1", "disk1", RelationType::Contains),
            ("nic1", "vm1", RelationType::DependsOn),
            ("ext1", "vm1", RelationType::ChildOf),
        ] {
            store.create_relationship(src, tgt, rt, 1.0, Map::new()).await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_impact_of_delete_is_a_dry_run() {
        let store = estate().await;
        let engine = RelationshipEngine::new(store.clone(), Some(store.clone()));
        let impact = engine.analyze_impact("vm1", "delete").await;

        let ImpactOutcome::Delete(DeleteOutcome::DryRun { would_delete, cascade, .. }) = impact else {
            panic!("expected dry run, got {impact:?}");
        };
        assert!(cascade);
        assert_eq!(would_delete, vec!["disk1", "nic1", "ext1", "vm1"]);
        assert_eq!(store.delete_calls(), 0);
    }

    #[tokio::test]
    async fn test_impact_of_modify_lists_dependents() {
        let store = estate().await;
        let engine = RelationshipEngine::new(store.clone(), Some(store));
        let impact = engine.analyze_impact("vm1", "modify").await;

        let body = serde_json::to_value(&impact).unwrap();
        assert_eq!(body["operation"], "modify");
        assert_eq!(body["resource_id"], "vm1");
        assert_eq!(body["message"], "2 resources may be affected by modification");
        assert_eq!(body["potentially_affected"][0]["resource_id"], "nic1");
        assert_eq!(body["potentially_affected"][1]["relation_type"], "child_of");
    }

    #[tokio::test]
    async fn test_impact_of_unknown_operation() {
        let store = estate().await;
        let engine = RelationshipEngine::new(store.clone(), Some(store));
        assert_eq!(
            serde_json::to_value(engine.analyze_impact("vm1", "rename").await).unwrap(),
            json!({"error": "Unsupported operation: rename"})
        );
    }

    #[tokio::test]
    async fn test_capability_flag() {
        let store = Arc::new(InMemoryStore::new());
        let without = RelationshipEngine::new(store.clone(), None);
        assert!(!without.has_relationship_tracking());
        assert_eq!(
            serde_json::to_value(without.analyze_impact("vm1", "modify").await).unwrap(),
            json!({"error": "Relationship tracking not available"})
        );

        let with = RelationshipEngine::new(store.clone(), Some(store));
        assert!(with.has_relationship_tracking());
    }
}
