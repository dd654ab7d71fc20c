//! Dependency tree retrieval.

use mazure_core::RelationshipEdge;

use crate::error::Result;
use crate::types::{DependencyEntry, DependencyOutcome, DependencyTree};
use crate::RelationshipEngine;

/// A tree under construction. Children always sit at a higher arena index
/// than their parent, so assembling in reverse index order sees every
/// child before the parent that owns it.
struct Node {
    resource_id: String,
    parent: Option<usize>,
    depth: u32,
    include_dependents: bool,
    depends_on: Vec<(RelationshipEdge, Option<usize>)>,
    depended_by: Vec<RelationshipEdge>,
}

impl Node {
    fn new(resource_id: String, parent: Option<usize>, depth: u32, include_dependents: bool) -> Self {
        Self {
            resource_id,
            parent,
            depth,
            include_dependents,
            depends_on: Vec::new(),
            depended_by: Vec::new(),
        }
    }
}

/// True when `resource_id` is `index` itself or one of its ancestors.
fn on_path(arena: &[Node], index: usize, resource_id: &str) -> bool {
    let mut cursor = Some(index);
    while let Some(i) = cursor {
        if arena[i].resource_id == resource_id {
            return true;
        }
        cursor = arena[i].parent;
    }
    false
}

fn entry(edge: RelationshipEdge, resource_id: String, dependencies: Option<Box<DependencyTree>>) -> DependencyEntry {
    DependencyEntry {
        resource_id,
        relation_type: edge.relation_type,
        weight: edge.weight,
        dependencies,
    }
}

impl RelationshipEngine {
    /// Outbound dependency tree of `resource_id`, plus its direct dependents.
    ///
    /// `depth` 1 lists direct edges only, 0 is unbounded, and larger values
    /// allow that many levels. Nested trees never list dependents. A
    /// resource shared by several branches is expanded under each of them;
    /// an edge back to a resource already on the current path is listed
    /// without `dependencies`.
    pub async fn get_resource_dependencies(
        &self,
        resource_id: &str,
        depth: u32,
        include_dependents: bool,
    ) -> DependencyOutcome {
        match self.build_dependency_tree(resource_id, depth, include_dependents).await {
            Ok(tree) => DependencyOutcome::Tree(tree),
            Err(e) => {
                tracing::error!(resource_id, error = %e, "Dependency lookup failed");
                DependencyOutcome::Failed {
                    resource_id: resource_id.to_string(),
                    error: e.to_string(),
                }
            }
        }
    }

    pub(crate) async fn build_dependency_tree(
        &self,
        resource_id: &str,
        depth: u32,
        include_dependents: bool,
    ) -> Result<DependencyTree> {
        let relationships = self.relationships()?;

        let mut arena = vec![Node::new(resource_id.to_string(), None, depth, include_dependents)];
        let mut work = vec![0usize];

        while let Some(index) = work.pop() {
            let id = arena[index].resource_id.clone();
            let node_depth = arena[index].depth;

            let outbound = relationships.find_outbound(&id, None).await?;
            let mut depends_on = Vec::with_capacity(outbound.len());
            for edge in outbound {
                let child = if node_depth != 1 && !on_path(&arena, index, &edge.target_id) {
                    let next_depth = node_depth.saturating_sub(1);
                    arena.push(Node::new(edge.target_id.clone(), Some(index), next_depth, false));
                    work.push(arena.len() - 1);
                    Some(arena.len() - 1)
                } else {
                    None
                };
                depends_on.push((edge, child));
            }

            let depended_by = if arena[index].include_dependents {
                relationships.find_inbound(&id, None).await?
            } else {
                Vec::new()
            };

            tracing::debug!(resource_id = %id, outbound = depends_on.len(), "Expanded dependency node");
            arena[index].depends_on = depends_on;
            arena[index].depended_by = depended_by;
        }

        Ok(assemble(arena))
    }
}

/// Fold the arena into nested trees, leaves first.
fn assemble(arena: Vec<Node>) -> DependencyTree {
    let mut built: Vec<Option<DependencyTree>> = Vec::with_capacity(arena.len());
    built.resize_with(arena.len(), || None);

    for (index, node) in arena.into_iter().enumerate().rev() {
        let depends_on = node
            .depends_on
            .into_iter()
            .map(|(edge, child)| {
                let dependencies = child.and_then(|c| built[c].take()).map(Box::new);
                let target = edge.target_id.clone();
                entry(edge, target, dependencies)
            })
            .collect();
        let depended_by = node
            .depended_by
            .into_iter()
            .map(|edge| {
                let source = edge.source_id.clone();
                entry(edge, source, None)
            })
            .collect();

        built[index] = Some(DependencyTree {
            resource_id: node.resource_id,
            depends_on,
            depended_by,
        });
    }

    built
        .into_iter()
        .next()
        .flatten()
        .unwrap_or_else(|| DependencyTree {
            resource_id: String::new(),
            depends_on: Vec::new(),
            depended_by: Vec::new(),
        })
}
