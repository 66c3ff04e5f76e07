//! Kinematic spanning tree over the joint-adjacency graph
//!
//! The tree is discovered breadth-first from the grounded link. Each link is
//! grounded exactly once, the first time a pass reaches it, so the direction
//! of every tree edge follows the traversal and not the declared joint
//! direction. Records that would reach an already grounded link close a loop
//! and are reported as redundant.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::joints::JointRecord;
use crate::types::RigidTransform;

/// A joint record as it was traversed
#[derive(Debug, Clone, PartialEq)]
pub struct TreeEdge {
    /// Index into the input records
    pub record: usize,
    /// Link that was grounded first
    pub parent: String,
    /// Link discovered through this edge
    pub child: String,
    /// Traversal direction disagrees with the declared direction
    pub swapped: bool,
    /// Child frame in the parent frame, document units
    pub local: RigidTransform,
}

/// Result of [`span`]
#[derive(Debug, Clone, Default)]
pub struct SpanningTree {
    /// Tree edges in discovery order
    pub edges: Vec<TreeEdge>,
    /// Grounded links in discovery order, root first
    pub order: Vec<String>,
    /// Absolute frame of every grounded link, document units
    pub poses: HashMap<String, RigidTransform>,
    /// Records between two grounded links that were not used
    pub redundant: Vec<usize>,
}

impl SpanningTree {
    pub fn contains(&self, link: &str) -> bool {
        self.poses.contains_key(link)
    }

    pub fn pose(&self, link: &str) -> Option<&RigidTransform> {
        self.poses.get(link)
    }
}

/// Build the spanning tree rooted at `root`.
///
/// `pose_of` yields the raw CAD frame of a link; it is asked once per
/// discovered link. Non-fixed records replace the translation of that
/// frame with the joint origin.
pub fn span<E>(
    records: &[JointRecord],
    root: &str,
    root_pose: RigidTransform,
    mut pose_of: impl FnMut(&str) -> Result<RigidTransform, E>,
) -> Result<SpanningTree, E> {
    let mut incident: HashMap<&str, Vec<usize>> = HashMap::new();
    for (i, record) in records.iter().enumerate() {
        incident.entry(record.parent.as_str()).or_default().push(i);
        incident.entry(record.child.as_str()).or_default().push(i);
    }

    let mut tree = SpanningTree::default();
    let mut used: HashSet<usize> = HashSet::new();
    tree.order.push(root.to_string());
    tree.poses.insert(root.to_string(), root_pose);

    let mut frontier = vec![root.to_string()];
    while !frontier.is_empty() {
        let mut next = Vec::new();
        for current in &frontier {
            let Some(edges) = incident.get(current.as_str()) else {
                continue;
            };
            for &i in edges {
                let record = &records[i];
                let (neighbor, swapped) = if record.parent == *current {
                    (&record.child, false)
                } else {
                    (&record.parent, true)
                };
                if tree.poses.contains_key(neighbor) {
                    continue;
                }

                let mut absolute = pose_of(neighbor.as_str())?;
                if !record.kind.is_fixed()
                    && let Some(origin) = record.origin
                {
                    absolute = absolute.with_translation(origin);
                }
                let parent_pose = tree.poses.get(current).copied().unwrap_or_default();
                let local = parent_pose.inverse().compose(&absolute);

                debug!(
                    "Tree edge {}: {} -> {}{}",
                    record.name,
                    current,
                    neighbor,
                    if swapped { " (swapped)" } else { "" }
                );
                tree.poses.insert(neighbor.clone(), absolute);
                tree.order.push(neighbor.clone());
                tree.edges.push(TreeEdge {
                    record: i,
                    parent: current.clone(),
                    child: neighbor.clone(),
                    swapped,
                    local,
                });
                used.insert(i);
                next.push(neighbor.clone());
            }
        }
        frontier = next;
    }

    tree.redundant = (0..records.len())
        .filter(|i| !used.contains(i))
        .filter(|&i| tree.contains(&records[i].parent) && tree.contains(&records[i].child))
        .collect();
    Ok(tree)
}
