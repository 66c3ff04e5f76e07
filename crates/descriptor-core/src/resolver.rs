//! A description run from design document to [`RobotDescription`]
//!
//! Phases, in order: sever linked copies, pick the root, extract joint
//! records, resolve materials, span the kinematic tree, place extras, check
//! reachability, then build links, joints and locations.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::config::Configuration;
use crate::design::{Body, CadDocument, EntityToken, HostError};
use crate::diagnostics::Diagnostics;
use crate::error::{DescriptorError, DescriptorResult};
use crate::export::{Locations, MeshBody, MeshEntry, MeshManifest, RobotDescription};
use crate::inertia::MassProperties;
use crate::joints::{JointExtractor, JointRecord};
use crate::kinematics::{SpanningTree, TreeEdge, span};
use crate::material::ColorTable;
use crate::naming::{BASE_LINK, DUMMY_JOINT, DUMMY_LINK, MeshNames, NameRegistry, format_name};
use crate::physics::link_inertial;
use crate::robot::{JointEntity, LinkEntity, LinkKind, RenderContext};
use crate::scene::{ClaimedBodies, NodeId, SceneGraph, sever_linked_copies};
use crate::types::{Pose, RigidTransform};
use crate::units::UnitScale;

/// Build the description of a document.
///
/// Linked copies are severed first, so the document is mutated.
pub fn describe<D: CadDocument + ?Sized>(
    document: &mut D,
    config: &Configuration,
) -> DescriptorResult<RobotDescription> {
    sever_linked_copies(document)?;
    Resolver::new(&*document, config)?.run()
}

/// Joint records of a document without building the description
pub fn preview_joints<D: CadDocument + ?Sized>(
    document: &D,
    config: &Configuration,
) -> DescriptorResult<Vec<JointRecord>> {
    Resolver::new(document, config)?.preview()
}

/// Occurrences that make up each link
#[derive(Debug, Default)]
struct LinkTable {
    /// Link name -> member nodes, the first one gives the frame
    members: HashMap<String, Vec<NodeId>>,
    owner: HashMap<NodeId, String>,
}

impl LinkTable {
    fn add(&mut self, link: &str, node: NodeId) {
        if self.owner.contains_key(&node) {
            return;
        }
        self.owner.insert(node, link.to_string());
        self.members.entry(link.to_string()).or_default().push(node);
    }

    fn members(&self, link: &str) -> &[NodeId] {
        self.members.get(link).map(Vec::as_slice).unwrap_or_default()
    }

    fn frame(&self, link: &str) -> Option<NodeId> {
        self.members(link).first().copied()
    }

    fn is_participant(&self, node: NodeId) -> bool {
        self.owner.contains_key(&node)
    }
}

/// Link owning a joint participant, named on first sight
fn link_for(
    links: &mut LinkTable,
    names: &mut NameRegistry,
    merged: &HashMap<NodeId, String>,
    scene: &SceneGraph,
    node: NodeId,
) -> String {
    if let Some(name) = links.owner.get(&node) {
        return name.clone();
    }
    let name = match merged.get(&node) {
        Some(name) => name.clone(),
        None => {
            let occurrence = scene.occurrence(node);
            names.resolve(&occurrence.token, &occurrence.name)
        }
    };
    links.add(&name, node);
    name
}

fn find_named(scene: &SceneGraph, name: &str, context: &str) -> DescriptorResult<NodeId> {
    scene
        .find_by_name(name)
        .ok_or_else(|| DescriptorError::OccurrenceNotFound {
            context: context.to_string(),
            name: name.to_string(),
        })
}

/// State of one description run
pub struct Resolver<'a, D: CadDocument + ?Sized> {
    document: &'a D,
    config: &'a Configuration,
    scene: SceneGraph<'a>,
    units: UnitScale,
    base_link: String,
    links: LinkTable,
    /// Merge members -> merged link name
    merged: HashMap<NodeId, String>,
    extras: Vec<NodeId>,
    link_names: NameRegistry,
    joint_names: NameRegistry,
    diagnostics: Diagnostics,
}

impl<'a, D: CadDocument + ?Sized> Resolver<'a, D> {
    pub fn new(document: &'a D, config: &'a Configuration) -> DescriptorResult<Self> {
        let scene = SceneGraph::build(document.occurrences());
        let units = config.units(document.length_unit());
        let mut link_names =
            NameRegistry::with_reserved(&[BASE_LINK, DUMMY_LINK]).with_name_map(config.name_lookup());
        let mut links = LinkTable::default();

        let mut merged = HashMap::new();
        for (key, members) in &config.merge_links {
            let name = link_names.resolve(&EntityToken::new(format!("merge:{key}")), key);
            for member in members {
                let node = find_named(&scene, member, &format!("MergeLinks '{key}'"))?;
                merged.insert(node, name.clone());
                links.add(&name, node);
            }
        }

        let root = match &config.root {
            Some(name) => find_named(&scene, name, "Root")?,
            None => scene
                .dfs_order()
                .find(|&node| scene.occurrence(node).grounded)
                .ok_or(DescriptorError::NoGroundedComponent)?,
        };
        let base_link = match merged.get(&root) {
            Some(name) => name.clone(),
            None => {
                link_names.assign(&scene.occurrence(root).token, BASE_LINK);
                links.add(BASE_LINK, root);
                BASE_LINK.to_string()
            }
        };
        info!(
            "Root occurrence {} becomes {}",
            scene.occurrence(root).name,
            base_link
        );

        let extras = config
            .extras
            .iter()
            .map(|name| find_named(&scene, name, "Extras"))
            .collect::<DescriptorResult<Vec<_>>>()?;

        Ok(Self {
            document,
            config,
            scene,
            units,
            base_link,
            links,
            merged,
            extras,
            link_names,
            joint_names: NameRegistry::with_reserved(&[DUMMY_JOINT]),
            diagnostics: Diagnostics::new(),
        })
    }

    /// Joint records from joints, then rigid groups
    fn records(&mut self) -> DescriptorResult<Vec<JointRecord>> {
        let settings = self.config.joint_settings(self.document.length_unit());
        let links = &mut self.links;
        let link_names = &mut self.link_names;
        let merged = &self.merged;
        let scene = &self.scene;
        let mut extractor = JointExtractor::new(scene, settings, |node| {
            link_for(links, link_names, merged, scene, node)
        });

        let mut records =
            extractor.joints(self.document.joints(), &mut self.joint_names, &mut self.diagnostics)?;
        records.extend(extractor.rigid_groups(
            self.document.rigid_groups(),
            &mut self.joint_names,
            &mut self.diagnostics,
        ));
        info!("Extracted {} joint records", records.len());
        Ok(records)
    }

    pub fn preview(mut self) -> DescriptorResult<Vec<JointRecord>> {
        let records = self.records()?;
        self.diagnostics.summarize();
        Ok(records)
    }

    pub fn run(mut self) -> DescriptorResult<RobotDescription> {
        let records = self.records()?;

        let mut colors = ColorTable::new();
        let materials: Vec<String> = self
            .scene
            .dfs_order()
            .map(|node| colors.resolve(self.scene.occurrence(node)))
            .collect();

        let root_pose = self.link_pose(&self.base_link)?;
        let mut tree = span(&records, &self.base_link, root_pose, |link| self.link_pose(link))?;
        for &i in &tree.redundant {
            let record = &records[i];
            self.diagnostics.warn(format!(
                "Joint {} between {} and {} closes a loop; ignoring it",
                record.name, record.parent, record.child
            ));
        }
        info!("Kinematic tree has {} links", tree.order.len());

        let extra_joints = self.place_extras(&mut tree)?;
        self.check_reachability(&tree)?;

        let mut mesh_names = MeshNames::new();
        let mut manifest = Vec::new();
        let mut links = Vec::new();
        for name in &tree.order {
            if extra_joints.iter().any(|j| &j.child == name) {
                links.push(LinkEntity::frame(name.as_str()));
                continue;
            }
            links.push(self.build_link(name, &tree, &materials, &mut mesh_names, &mut manifest)?);
        }

        let mut joints: Vec<JointEntity> = tree
            .edges
            .iter()
            .map(|edge| self.joint_entity(&records[edge.record], edge, &tree))
            .collect();
        joints.extend(extra_joints);
        for joint in joints.iter().filter(|j| j.kind.is_approximated()) {
            self.diagnostics.warn(format!(
                "Joint {} is {}, written as {}",
                joint.name,
                joint.kind,
                joint.kind.urdf_type()
            ));
        }

        let locations = self.locations(&tree)?;
        let name = self.robot_name();
        let tree_lines = tree_lines(&self.base_link, &joints);

        self.diagnostics.summarize();
        Ok(RobotDescription {
            render: RenderContext::new(name.as_str(), self.units.scale),
            name,
            source: self.document.name().to_string(),
            base_link: self.base_link.clone(),
            links,
            joints,
            colors,
            locations,
            mesh_manifest: MeshManifest {
                resolution: self.config.mesh_resolution,
                unit: self.document.length_unit(),
                meshes: manifest,
            },
            tree: tree_lines,
            warnings: self.diagnostics.warnings().to_vec(),
        })
    }

    fn robot_name(&self) -> String {
        match &self.config.robot_name {
            Some(name) => format_name(name),
            None => format_name(self.document.name().split_whitespace().next().unwrap_or_default()),
        }
    }

    fn transform_of(&self, node: NodeId) -> DescriptorResult<RigidTransform> {
        let occurrence = self.scene.occurrence(node);
        occurrence
            .rigid_transform()
            .ok_or_else(|| HostError::SingularTransform(occurrence.name.clone()).into())
    }

    /// CAD frame of a link's frame occurrence
    fn link_pose(&self, link: &str) -> DescriptorResult<RigidTransform> {
        let node = self
            .links
            .frame(link)
            .ok_or_else(|| DescriptorError::UnknownLink {
                context: "the joint graph".to_string(),
                name: link.to_string(),
            })?;
        self.transform_of(node)
    }

    /// Frame links for extras the joint graph did not reach, fixed to the
    /// link of their nearest grounded ancestor
    fn place_extras(&mut self, tree: &mut SpanningTree) -> DescriptorResult<Vec<JointEntity>> {
        let mut joints = Vec::new();
        for &node in &self.extras {
            if let Some(link) = self.links.owner.get(&node)
                && tree.contains(link)
            {
                continue;
            }
            let occurrence = self.scene.occurrence(node);
            let name = self.link_names.resolve(&occurrence.token, &occurrence.name);
            if tree.contains(&name) {
                debug!("Extra {} already placed", name);
                continue;
            }
            let parent = self
                .scene
                .ancestors(node)
                .find_map(|a| self.links.owner.get(&a).filter(|l| tree.contains(l)))
                .cloned()
                .unwrap_or_else(|| self.base_link.clone());

            let absolute = self.transform_of(node)?;
            let parent_pose = tree.pose(&parent).copied().unwrap_or_default();
            let local = parent_pose.inverse().compose(&absolute);

            let mut joint = JointEntity::fixed(
                self.joint_names.claim(&format!("{name}_joint")),
                parent.as_str(),
                name.as_str(),
            );
            joint.origin = Pose::from_transform(&local, self.units.scale);
            debug!("Extra {} attached to {}", name, parent);

            tree.poses.insert(name.clone(), absolute);
            tree.order.push(name);
            joints.push(joint);
        }
        Ok(joints)
    }

    fn has_visible_bodies(&self, node: NodeId) -> bool {
        !self
            .scene
            .claimed_bodies(node, |n| self.links.is_participant(n))
            .is_empty()
    }

    /// Every visible top-level occurrence with bodies must be part of a
    /// link, and every link with bodies must be in the tree
    fn check_reachability(&self, tree: &SpanningTree) -> DescriptorResult<()> {
        let mut unconnected = Vec::new();
        let mut unreachable = Vec::new();
        for (root, bodies) in self.scene.aggregate_bodies() {
            if bodies.is_empty() {
                debug!(
                    "{} has no visible bodies, skipped",
                    self.scene.occurrence(root).name
                );
                continue;
            }
            self.check_subtree(root, tree, &mut unconnected, &mut unreachable);
        }
        if unconnected.is_empty() && unreachable.is_empty() {
            return Ok(());
        }
        Err(DescriptorError::Unreachable {
            unconnected,
            unreachable,
        })
    }

    fn check_subtree(
        &self,
        root: NodeId,
        tree: &SpanningTree,
        unconnected: &mut Vec<String>,
        unreachable: &mut Vec<String>,
    ) {
        for node in self.scene.subtree(root) {
            if self.extras.contains(&node) || !self.scene.is_effectively_visible(node) {
                continue;
            }
            let name = &self.scene.occurrence(node).name;
            match self.links.owner.get(&node) {
                Some(link) => {
                    if !tree.contains(link) && self.has_visible_bodies(node) {
                        unreachable.push(name.clone());
                    }
                }
                None => {
                    if node == root && self.has_visible_bodies(node) {
                        unconnected.push(name.clone());
                    }
                }
            }
        }
    }

    /// Participants directly nested in `node`, with no other participant
    /// in between
    fn nested_participants(&self, node: NodeId) -> Vec<NodeId> {
        self.scene
            .subtree(node)
            .filter(|&n| n != node && self.links.is_participant(n))
            .filter(|&n| {
                self.scene
                    .ancestors(n)
                    .take_while(|&a| a != node)
                    .all(|a| !self.links.is_participant(a))
            })
            .collect()
    }

    fn query(&self, node: NodeId) -> DescriptorResult<MassProperties> {
        let occurrence = self.scene.occurrence(node);
        let properties = self
            .document
            .physical_properties(occurrence, self.config.inertia_precision)?;
        Ok(MassProperties::from_host(&properties, &occurrence.name)?)
    }

    /// Host properties of the members, without the links nested inside them
    fn mass_properties(&self, members: &[NodeId]) -> DescriptorResult<MassProperties> {
        let mut total: Option<MassProperties> = None;
        for &member in members {
            let mut properties = self.query(member)?;
            for nested in self.nested_participants(member) {
                properties = properties.subtract(&self.query(nested)?);
            }
            total = Some(match total {
                Some(sum) => sum.combine(&properties),
                None => properties,
            });
        }
        Ok(total.unwrap_or_default())
    }

    fn build_link(
        &self,
        name: &str,
        tree: &SpanningTree,
        materials: &[String],
        mesh_names: &mut MeshNames,
        manifest: &mut Vec<MeshEntry>,
    ) -> DescriptorResult<LinkEntity> {
        let members = self.links.members(name);
        let Some(&frame) = members.first() else {
            return Ok(LinkEntity::frame(name));
        };

        let mut claimed = ClaimedBodies::default();
        for &member in members {
            claimed.extend(
                self.scene
                    .claimed_bodies(member, |n| self.links.is_participant(n)),
            );
        }
        if claimed.is_empty() {
            debug!("Link {} has no visible bodies, emitted as a frame", name);
            return Ok(LinkEntity::frame(name));
        }

        let properties = self.mass_properties(members)?;
        let link = match tree.pose(name) {
            Some(pose) => *pose,
            None => self.transform_of(frame)?,
        };
        let inertial = link_inertial(&properties, claimed.hidden_mass(), &link, &self.units);

        let mesh_body = |(node, body): &(NodeId, &Body)| MeshBody {
            occurrence: self.scene.occurrence(*node).name.clone(),
            body: body.name.clone(),
        };
        let meshes = if self.config.sub_mesh {
            claimed
                .visible
                .iter()
                .map(|entry| {
                    let file = mesh_names.next(name, &entry.1.name);
                    manifest.push(MeshEntry {
                        file: file.clone(),
                        link: name.to_string(),
                        bodies: vec![mesh_body(entry)],
                    });
                    file
                })
                .collect()
        } else {
            manifest.push(MeshEntry {
                file: name.to_string(),
                link: name.to_string(),
                bodies: claimed.visible.iter().map(mesh_body).collect(),
            });
            vec![name.to_string()]
        };
        debug!(
            "Link {}: mass {} kg, {} visible bodies",
            name,
            inertial.mass,
            claimed.visible.len()
        );

        Ok(LinkEntity {
            name: name.to_string(),
            visual_origin: Pose::from_transform(&link.inverse(), self.units.scale),
            inertial,
            meshes,
            material: materials[frame].clone(),
            kind: LinkKind::Body,
        })
    }

    /// Joint along a tree edge. The axis is expressed in the child frame
    /// and flipped when the traversal reversed the joint.
    fn joint_entity(&self, record: &JointRecord, edge: &TreeEdge, tree: &SpanningTree) -> JointEntity {
        let child = tree.pose(&edge.child).copied().unwrap_or_default();
        let mut axis = (child.rotation.transpose() * record.axis).normalize_or_zero();
        if edge.swapped {
            axis = -axis;
        }
        JointEntity {
            name: record.name.clone(),
            kind: record.kind,
            origin: Pose::from_transform(&edge.local, self.units.scale),
            axis: axis.to_array(),
            limits: record.limits,
            parent: edge.parent.clone(),
            child: edge.child.clone(),
        }
    }

    /// Configured locations in the frame of their link
    fn locations(&self, tree: &SpanningTree) -> DescriptorResult<Locations> {
        let mut locations = Locations::new();
        for (link, entries) in &self.config.locations {
            let Some(link_pose) = tree.pose(link) else {
                return Err(DescriptorError::UnknownLink {
                    context: "Locations".to_string(),
                    name: link.clone(),
                });
            };
            let inverse = link_pose.inverse();
            for (location, occurrence) in entries {
                let node = find_named(&self.scene, occurrence, &format!("Locations '{link}'"))?;
                let local = inverse.compose(&self.transform_of(node)?);
                locations
                    .entry(link.clone())
                    .or_default()
                    .insert(location.clone(), Pose::from_transform(&local, self.units.scale));
            }
        }
        Ok(locations)
    }
}

/// One line per link, children indented under their parent
fn tree_lines(root: &str, joints: &[JointEntity]) -> Vec<String> {
    let mut lines = vec![root.to_string()];
    push_children(root, joints, 1, &mut lines);
    lines
}

fn push_children(link: &str, joints: &[JointEntity], depth: usize, lines: &mut Vec<String>) {
    for joint in joints.iter().filter(|j| j.parent == link) {
        lines.push(format!(
            "{}{} ({}, {})",
            "  ".repeat(depth),
            joint.child,
            joint.name,
            joint.kind.urdf_type()
        ));
        push_children(&joint.child, joints, depth + 1, lines);
    }
}
