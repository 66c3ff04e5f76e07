//! Scene graph of the CAD assembly
//!
//! An arena mirroring the occurrence tree. Nodes are stored in depth-first
//! pre-order, so a node's subtree is a contiguous range starting at the node.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::design::{Body, CadDocument, EntityToken, HostError, Occurrence};

/// Index of a node in the scene graph
pub type NodeId = usize;

/// One occurrence in the scene graph
#[derive(Debug, Clone)]
pub struct SceneNode<'a> {
    pub occurrence: &'a Occurrence,
    /// Non-owning back-reference, `None` for top-level occurrences
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// Last node of this subtree in pre-order
    last: NodeId,
}

/// Bodies claimed by one link, split by visibility
#[derive(Debug, Clone, Default)]
pub struct ClaimedBodies<'a> {
    pub visible: Vec<(NodeId, &'a Body)>,
    pub hidden: Vec<(NodeId, &'a Body)>,
}

impl<'a> ClaimedBodies<'a> {
    pub fn is_empty(&self) -> bool {
        self.visible.is_empty()
    }

    /// Mass of the hidden bodies, in kg
    pub fn hidden_mass(&self) -> f64 {
        self.hidden.iter().map(|(_, body)| body.mass).sum()
    }

    pub fn extend(&mut self, other: ClaimedBodies<'a>) {
        self.visible.extend(other.visible);
        self.hidden.extend(other.hidden);
    }
}

/// Occurrence tree with token and name lookups
#[derive(Debug, Clone, Default)]
pub struct SceneGraph<'a> {
    nodes: Vec<SceneNode<'a>>,
    roots: Vec<NodeId>,
    by_token: HashMap<&'a EntityToken, NodeId>,
    by_name: HashMap<&'a str, NodeId>,
}

/// Break the external link of every referenced occurrence so the run only
/// sees local data
pub fn sever_linked_copies<D: CadDocument + ?Sized>(document: &mut D) -> Result<usize, HostError> {
    let mut linked = Vec::new();
    collect_linked(document.occurrences(), &mut linked);
    for (token, name) in &linked {
        document.break_link(token)?;
        info!("Broke link of referenced occurrence {}", name);
    }
    Ok(linked.len())
}

fn collect_linked(occurrences: &[Occurrence], linked: &mut Vec<(EntityToken, String)>) {
    for occurrence in occurrences {
        if occurrence.referenced {
            linked.push((occurrence.token.clone(), occurrence.name.clone()));
        }
        collect_linked(&occurrence.children, linked);
    }
}

impl<'a> SceneGraph<'a> {
    /// Build the graph from the top-level occurrences of the root component
    pub fn build(occurrences: &'a [Occurrence]) -> Self {
        let mut graph = Self::default();
        for occurrence in occurrences {
            let id = graph.insert(occurrence, None);
            graph.roots.push(id);
        }
        debug!(
            "Scene graph: {} occurrences, {} top-level",
            graph.nodes.len(),
            graph.roots.len()
        );
        graph
    }

    fn insert(&mut self, occurrence: &'a Occurrence, parent: Option<NodeId>) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(SceneNode {
            occurrence,
            parent,
            children: Vec::new(),
            last: id,
        });
        self.by_token.entry(&occurrence.token).or_insert(id);
        self.by_name.entry(occurrence.name.as_str()).or_insert(id);

        for child in &occurrence.children {
            let child_id = self.insert(child, Some(id));
            self.nodes[id].children.push(child_id);
        }
        self.nodes[id].last = self.nodes.len() - 1;
        id
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &SceneNode<'a> {
        &self.nodes[id]
    }

    pub fn occurrence(&self, id: NodeId) -> &'a Occurrence {
        self.nodes[id].occurrence
    }

    /// Top-level occurrences
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn find(&self, token: &EntityToken) -> Option<NodeId> {
        self.by_token.get(token).copied()
    }

    /// First occurrence in depth-first order with this display name
    pub fn find_by_name(&self, name: &str) -> Option<NodeId> {
        self.by_name.get(name).copied()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].parent
    }

    /// Ancestors from the parent up to the top-level occurrence
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.nodes[id].parent, |&n| self.nodes[n].parent)
    }

    /// The node and all its descendants in pre-order
    pub fn subtree(&self, id: NodeId) -> std::ops::RangeInclusive<NodeId> {
        id..=self.nodes[id].last
    }

    /// All nodes in depth-first pre-order
    pub fn dfs_order(&self) -> std::ops::Range<NodeId> {
        0..self.nodes.len()
    }

    /// Visible, with every ancestor visible too
    pub fn is_effectively_visible(&self, id: NodeId) -> bool {
        self.nodes[id].occurrence.visible
            && self
                .ancestors(id)
                .all(|a| self.nodes[a].occurrence.visible)
    }

    /// Bodies of the subtree rooted at `id`, not descending into children
    /// for which `stop` holds. Bodies under a hidden occurrence count as
    /// hidden.
    pub fn claimed_bodies(&self, id: NodeId, stop: impl Fn(NodeId) -> bool) -> ClaimedBodies<'a> {
        let mut claimed = ClaimedBodies::default();
        let mut stack = vec![(id, self.is_effectively_visible(id))];
        while let Some((node, shown)) = stack.pop() {
            for body in &self.nodes[node].occurrence.bodies {
                if shown && body.visible {
                    claimed.visible.push((node, body));
                } else {
                    claimed.hidden.push((node, body));
                }
            }
            for &child in self.nodes[node].children.iter().rev() {
                if !stop(child) {
                    let child_shown = shown && self.nodes[child].occurrence.visible;
                    stack.push((child, child_shown));
                }
            }
        }
        claimed
    }

    /// Visible bodies of a whole subtree
    pub fn flattened_bodies(&self, id: NodeId) -> Vec<&'a Body> {
        self.claimed_bodies(id, |_| false)
            .visible
            .into_iter()
            .map(|(_, body)| body)
            .collect()
    }

    /// Visible bodies per top-level occurrence, in order
    pub fn aggregate_bodies(&self) -> Vec<(NodeId, Vec<&'a Body>)> {
        self.roots
            .iter()
            .map(|&root| (root, self.flattened_bodies(root)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::design::DesignSnapshot;
    use crate::units::LengthUnit;

    fn sample() -> Vec<Occurrence> {
        vec![
            Occurrence::new("base", "base:1")
                .grounded()
                .with_body(Body::new("Plate", 1.0)),
            Occurrence::new("arm", "arm:1")
                .with_body(Body::new("Beam", 2.0))
                .with_child(
                    Occurrence::new("motor", "motor:1")
                        .with_body(Body::new("Stator", 0.5))
                        .with_child(Occurrence::new("rotor", "rotor:1").with_body(Body::new("Rotor", 0.25))),
                )
                .with_child(
                    Occurrence::new("cover", "cover:1")
                        .hidden()
                        .with_body(Body::new("Shell", 0.1)),
                )
                .with_body(Body::new("Label", 0.01).hidden()),
        ]
    }

    #[test]
    fn test_preorder_layout() {
        let occurrences = sample();
        let graph = SceneGraph::build(&occurrences);
        assert_eq!(graph.len(), 5);
        assert_eq!(graph.roots(), &[0, 1]);
        let names: Vec<_> = graph.dfs_order().map(|n| graph.occurrence(n).name.as_str()).collect();
        assert_eq!(names, ["base:1", "arm:1", "motor:1", "rotor:1", "cover:1"]);
        assert_eq!(graph.subtree(1), 1..=4);
        assert_eq!(graph.subtree(2), 2..=3);
    }

    #[test]
    fn test_lookups_and_ancestors() {
        let occurrences = sample();
        let graph = SceneGraph::build(&occurrences);
        let rotor = graph.find(&EntityToken::from("rotor")).unwrap();
        assert_eq!(graph.find_by_name("rotor:1"), Some(rotor));
        let ancestors: Vec<_> = graph.ancestors(rotor).collect();
        assert_eq!(ancestors, vec![2, 1]);
        assert_eq!(graph.parent(1), None);
    }

    #[test]
    fn test_claimed_bodies_split_visibility() {
        let occurrences = sample();
        let graph = SceneGraph::build(&occurrences);
        let claimed = graph.claimed_bodies(1, |_| false);
        let visible: Vec<_> = claimed.visible.iter().map(|(_, b)| b.name.as_str()).collect();
        assert_eq!(visible, ["Beam", "Stator", "Rotor"]);
        let hidden: Vec<_> = claimed.hidden.iter().map(|(_, b)| b.name.as_str()).collect();
        assert_eq!(hidden, ["Label", "Shell"]);
        approx::assert_relative_eq!(claimed.hidden_mass(), 0.11);
    }

    #[test]
    fn test_claimed_bodies_stop_at_nested_participant() {
        let occurrences = sample();
        let graph = SceneGraph::build(&occurrences);
        let motor = graph.find(&EntityToken::from("motor")).unwrap();
        let claimed = graph.claimed_bodies(1, |n| n == motor);
        let visible: Vec<_> = claimed.visible.iter().map(|(_, b)| b.name.as_str()).collect();
        assert_eq!(visible, ["Beam"]);
    }

    #[test]
    fn test_aggregate_bodies() {
        let occurrences = sample();
        let graph = SceneGraph::build(&occurrences);
        let aggregate = graph.aggregate_bodies();
        assert_eq!(aggregate.len(), 2);
        assert_eq!(aggregate[0].1.len(), 1);
        assert_eq!(aggregate[1].1.len(), 3);
    }

    #[test]
    fn test_sever_linked_copies() {
        let mut snapshot = DesignSnapshot::new("doc", LengthUnit::Centimeters);
        let mut linked = Occurrence::new("lib", "library:1");
        linked.referenced = true;
        let mut nested = Occurrence::new("inner", "inner:1");
        nested.referenced = true;
        snapshot = snapshot.with_occurrence(linked.with_child(nested));

        assert_eq!(sever_linked_copies(&mut snapshot).unwrap(), 2);
        assert!(!snapshot.occurrences[0].referenced);
        assert!(!snapshot.occurrences[0].children[0].referenced);
        assert_eq!(sever_linked_copies(&mut snapshot).unwrap(), 0);
    }
}
