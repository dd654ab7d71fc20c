//! Cascading delete: blocker check, deletion plan, best-effort execution.

use std::collections::{HashSet, VecDeque};

use mazure_store::RelationshipStore;

use crate::error::Result;
use crate::fetch::{fetch_blockers, fetch_cascade_successors};
use crate::types::{BlockingEdge, DeleteOutcome};
use crate::RelationshipEngine;

/// A resource on the DFS work stack and the successors it still has to visit.
struct Frame {
    resource_id: String,
    pending: VecDeque<String>,
}

impl RelationshipEngine {
    /// Delete a resource, optionally cascading to children and dependents.
    ///
    /// Never returns an error: blockers, missing relationship tracking, and
    /// store failures are all reported through the outcome.
    pub async fn delete_with_dependents(
        &self,
        resource_id: &str,
        cascade: bool,
        dry_run: bool,
    ) -> DeleteOutcome {
        match self.try_delete_with_dependents(resource_id, cascade, dry_run).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(resource_id, error = %e, "Delete failed");
                DeleteOutcome::failed(e)
            }
        }
    }

    async fn try_delete_with_dependents(
        &self,
        resource_id: &str,
        cascade: bool,
        dry_run: bool,
    ) -> Result<DeleteOutcome> {
        let relationships = self.relationships()?;

        if !cascade {
            let blocked_by: Vec<BlockingEdge> = fetch_blockers(relationships.as_ref(), resource_id)
                .await?
                .into_iter()
                .map(|e| BlockingEdge {
                    resource_id: e.source_id,
                    relation_type: e.relation_type,
                })
                .collect();

            if !blocked_by.is_empty() {
                tracing::info!(resource_id, blockers = blocked_by.len(), "Delete blocked by dependents");
                return Ok(DeleteOutcome::Blocked {
                    error: "Resource has dependents".to_string(),
                    message: format!(
                        "Cannot delete {resource_id}: has {} dependent resources. Use cascade=true to delete dependents.",
                        blocked_by.len()
                    ),
                    blocked_by,
                    deleted: Vec::new(),
                    count: 0,
                });
            }
        }

        let plan = self.build_deletion_tree(resource_id, cascade).await?;

        if dry_run {
            return Ok(DeleteOutcome::DryRun {
                dry_run: true,
                count: plan.len(),
                would_delete: plan,
                warnings: Vec::new(),
                cascade,
            });
        }

        let (deleted, warnings) = self.execute_plan(relationships.as_ref(), &plan).await;
        tracing::info!(
            resource_id,
            deleted = deleted.len(),
            warnings = warnings.len(),
            "Cascade delete complete"
        );
        Ok(DeleteOutcome::Executed {
            count: deleted.len(),
            deleted,
            cascade,
            warnings,
        })
    }

    /// Ordered deletion plan for `resource_id`, root last.
    ///
    /// With `cascade`, a depth-first walk over children (`contains`,
    /// `parent_of` outbound) then dependents (`depends_on`, `child_of`
    /// inbound), emitting each id once in post-order. Without it, just the root.
    pub async fn build_deletion_tree(&self, resource_id: &str, cascade: bool) -> Result<Vec<String>> {
        if !cascade {
            return Ok(vec![resource_id.to_string()]);
        }
        let relationships = self.relationships()?;

        let mut order = Vec::new();
        let mut visited: HashSet<String> = HashSet::new();
        let mut stack: Vec<Frame> = Vec::new();

        visited.insert(resource_id.to_string());
        stack.push(Frame {
            resource_id: resource_id.to_string(),
            pending: fetch_cascade_successors(relationships.as_ref(), resource_id)
                .await?
                .into(),
        });

        while let Some(frame) = stack.last_mut() {
            match frame.pending.pop_front() {
                Some(next) => {
                    if !visited.insert(next.clone()) {
                        continue;
                    }
                    let pending = fetch_cascade_successors(relationships.as_ref(), &next).await?;
                    tracing::debug!(resource_id = %next, successors = pending.len(), "Expanding deletion tree");
                    stack.push(Frame {
                        resource_id: next,
                        pending: pending.into(),
                    });
                }
                None => {
                    if let Some(done) = stack.pop() {
                        order.push(done.resource_id);
                    }
                }
            }
        }

        Ok(order)
    }

    /// Delete every planned id, last planned first. Failures become warnings.
    async fn execute_plan(
        &self,
        relationships: &dyn RelationshipStore,
        plan: &[String],
    ) -> (Vec<String>, Vec<String>) {
        let mut deleted = Vec::new();
        let mut warnings = Vec::new();

        for rid in plan.iter().rev() {
            match self.resources.delete_resource(rid).await {
                Ok(true) => {
                    deleted.push(rid.clone());
                    if let Err(e) = relationships.delete_for_resource(rid).await {
                        tracing::warn!(resource_id = %rid, error = %e, "Failed to delete relationships");
                        warnings.push(format!("Failed to delete relationships for {rid}: {e}"));
                    }
                }
                Ok(false) => {
                    tracing::debug!(resource_id = %rid, "Resource already absent, skipping");
                }
                Err(e) => {
                    tracing::warn!(resource_id = %rid, error = %e, "Failed to delete resource");
                    warnings.push(format!("Failed to delete {rid}: {e}"));
                }
            }
        }

        (deleted, warnings)
    }
}
