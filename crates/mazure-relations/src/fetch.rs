//! Edge fetching from the relationship store, grouped by traversal role.

use mazure_core::{RelationType, RelationshipEdge};
use mazure_store::RelationshipStore;

use crate::error::Result;

/// Inbound edge types that block a non-cascading delete.
pub const BLOCKING_RELATIONS: &[RelationType] = &[
    RelationType::DependsOn,
    RelationType::RequiredBy,
    RelationType::ChildOf,
];

/// Outbound edge types whose targets are deleted with the source.
pub const CHILD_RELATIONS: &[RelationType] = &[RelationType::Contains, RelationType::ParentOf];

/// Inbound edge types whose sources are deleted with the target.
pub const DEPENDENT_RELATIONS: &[RelationType] = &[RelationType::DependsOn, RelationType::ChildOf];

/// Inbound edges that would block deleting `resource_id`.
pub async fn fetch_blockers(
    store: &dyn RelationshipStore,
    resource_id: &str,
) -> Result<Vec<RelationshipEdge>> {
    Ok(store.find_inbound(resource_id, Some(BLOCKING_RELATIONS)).await?)
}

/// Ids a cascade from `resource_id` reaches in one step: children
/// (outbound targets) first, then dependents (inbound sources).
pub async fn fetch_cascade_successors(
    store: &dyn RelationshipStore,
    resource_id: &str,
) -> Result<Vec<String>> {
    let children = store.find_outbound(resource_id, Some(CHILD_RELATIONS)).await?;
    let dependents = store
        .find_inbound(resource_id, Some(DEPENDENT_RELATIONS))
        .await?;

    Ok(children
        .into_iter()
        .map(|e| e.target_id)
        .chain(dependents.into_iter().map(|e| e.source_id))
        .collect())
}
