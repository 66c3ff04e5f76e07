//! Joint records from CAD joints and rigid groups

use glam::DVec3;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::design::{
    CadJoint, EntityToken, HealthState, JointGeometry, JointMotion, MotionLimits, RigidGroup,
};
use crate::diagnostics::Diagnostics;
use crate::error::{DescriptorError, DescriptorResult};
use crate::naming::NameRegistry;
use crate::scene::{NodeId, SceneGraph};
use crate::types::{JointKind, JointLimits};
use crate::units::UnitScale;

/// Default coincidence tolerance for joint origins, in target units
pub const ORIGIN_TOLERANCE: f64 = 1e-7;

/// Which joint occurrence is declared the parent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum JointOrder {
    /// Occurrence one is the parent
    #[default]
    ParentChild,
    /// Occurrence two is the parent
    ChildParent,
}

/// An edge of the joint-adjacency graph
#[derive(Debug, Clone, PartialEq)]
pub struct JointRecord {
    pub name: String,
    pub kind: JointKind,
    /// Declared parent link
    pub parent: String,
    /// Declared child link
    pub child: String,
    /// Pivot in the global frame, document units. Always set for non-fixed
    /// kinds.
    pub origin: Option<DVec3>,
    /// Unit axis, zero for fixed and multi-axis kinds
    pub axis: DVec3,
    pub limits: JointLimits,
}

impl JointRecord {
    pub fn fixed(name: impl Into<String>, parent: impl Into<String>, child: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: JointKind::Fixed,
            parent: parent.into(),
            child: child.into(),
            origin: None,
            axis: DVec3::ZERO,
            limits: JointLimits::default(),
        }
    }
}

/// Settings shared by every joint of a run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointSettings {
    pub units: UnitScale,
    pub order: JointOrder,
    /// Coincidence tolerance in target units
    pub tolerance: f64,
}

impl JointSettings {
    pub fn new(units: UnitScale, order: JointOrder) -> Self {
        Self {
            units,
            order,
            tolerance: ORIGIN_TOLERANCE,
        }
    }

    /// Per-axis comparison in document units
    pub fn close_enough(&self, a: DVec3, b: DVec3) -> bool {
        let eps = self.units.tolerance(self.tolerance);
        (a - b).abs().max_element() < eps
    }
}

/// Turns CAD joints and rigid groups into [`JointRecord`]s
pub struct JointExtractor<'s, 'a, F> {
    scene: &'s SceneGraph<'a>,
    settings: JointSettings,
    /// Link owning a participant occurrence
    link_name: F,
}

impl<'s, 'a, F> JointExtractor<'s, 'a, F>
where
    F: FnMut(NodeId) -> String,
{
    pub fn new(scene: &'s SceneGraph<'a>, settings: JointSettings, link_name: F) -> Self {
        Self {
            scene,
            settings,
            link_name,
        }
    }

    /// Records for all usable joints, in document order
    pub fn joints(
        &mut self,
        joints: &[CadJoint],
        names: &mut NameRegistry,
        diagnostics: &mut Diagnostics,
    ) -> DescriptorResult<Vec<JointRecord>> {
        let mut records = Vec::new();
        for joint in joints {
            if let Some(record) = self.joint(joint, names, diagnostics)? {
                debug!(
                    "Joint {} ({}): {} -> {}",
                    record.name, record.kind, record.parent, record.child
                );
                records.push(record);
            }
        }
        Ok(records)
    }

    fn joint(
        &mut self,
        joint: &CadJoint,
        names: &mut NameRegistry,
        diagnostics: &mut Diagnostics,
    ) -> DescriptorResult<Option<JointRecord>> {
        match joint.health {
            HealthState::Healthy => {}
            HealthState::Suppressed | HealthState::RolledBack => {
                diagnostics.warn(format!(
                    "Skipping joint {} (child of {}) as it is suppressed or rolled back",
                    joint.name, joint.parent_component
                ));
                return Ok(None);
            }
            state => {
                return Err(DescriptorError::UnexpectedJointHealth {
                    joint: joint.name.clone(),
                    state: format!("{state:?}"),
                    message: joint.error_message.clone().unwrap_or_default(),
                });
            }
        }

        let kind = JointKind::from_ordinal(joint.joint_type).ok_or_else(|| {
            DescriptorError::UnknownJointType {
                joint: joint.name.clone(),
                ordinal: joint.joint_type,
            }
        })?;

        let (Some(node_one), Some(node_two)) = (
            self.participant(joint.occurrence_one.as_ref()),
            self.participant(joint.occurrence_two.as_ref()),
        ) else {
            diagnostics.warn(format!(
                "Failed to process joint {} (child of {}): an occurrence reference is missing; ignoring it",
                joint.name, joint.parent_component
            ));
            return Ok(None);
        };

        let link_one = (self.link_name)(node_one);
        let link_two = (self.link_name)(node_two);
        if link_one == link_two {
            debug!("Joint {} lies inside merged link {}, dropped", joint.name, link_one);
            return Ok(None);
        }
        let (parent, child) = match self.settings.order {
            JointOrder::ParentChild => (link_one, link_two),
            JointOrder::ChildParent => (link_two, link_one),
        };
        let name = names.claim(&joint.name);

        if kind.is_fixed() {
            return Ok(Some(JointRecord::fixed(name, parent, child)));
        }

        let origin_one = resolve_origin(joint, joint.geometry_one.as_ref(), 1);
        let origin_two = resolve_origin(joint, joint.geometry_two.as_ref(), 2);
        let Some(origin) = origin_one else {
            return Err(DescriptorError::MissingJointOrigin {
                joint: joint.name.clone(),
            });
        };
        if let Some(other) = origin_two
            && !self.settings.close_enough(origin, other)
        {
            return Err(DescriptorError::IncoincidentOrigins {
                joint: joint.name.clone(),
                occurrence_one: self.scene.occurrence(node_one).name.clone(),
                origin_one: origin.to_array(),
                occurrence_two: self.scene.occurrence(node_two).name.clone(),
                origin_two: other.to_array(),
            });
        }

        let (axis, limits) = self.motion(&joint.motion);
        Ok(Some(JointRecord {
            name,
            kind,
            parent,
            child,
            origin: Some(origin),
            axis,
            limits,
        }))
    }

    fn participant(&self, token: Option<&EntityToken>) -> Option<NodeId> {
        token.and_then(|t| self.scene.find(t))
    }

    /// Axis and limits by motion type
    fn motion(&self, motion: &JointMotion) -> (DVec3, JointLimits) {
        match motion {
            JointMotion::Revolute { axis, limits } => {
                let limits = match limits {
                    MotionLimits {
                        minimum: Some(min),
                        maximum: Some(max),
                    } if min != max => JointLimits::with_range(*min, *max),
                    _ => JointLimits::full_turn(),
                };
                (DVec3::from(*axis), limits)
            }
            JointMotion::Slider { direction, limits } => {
                let cm = self.settings.units.cm;
                let limits = JointLimits::with_range(
                    limits.minimum.unwrap_or(0.0) * cm,
                    limits.maximum.unwrap_or(0.0) * cm,
                );
                (DVec3::from(*direction), limits)
            }
            JointMotion::Rigid | JointMotion::Other => (DVec3::ZERO, JointLimits::default()),
        }
    }

    /// Fixed records for rigid groups: the first member is the parent of
    /// every other member
    pub fn rigid_groups(
        &mut self,
        groups: &[RigidGroup],
        names: &mut NameRegistry,
        diagnostics: &mut Diagnostics,
    ) -> Vec<JointRecord> {
        let mut records = Vec::new();
        for group in groups {
            let members: Vec<NodeId> = group
                .occurrences
                .iter()
                .filter_map(|token| {
                    let node = self.scene.find(token);
                    if node.is_none() {
                        diagnostics.warn(format!(
                            "Rigid group {} references unknown occurrence {}",
                            group.name, token
                        ));
                    }
                    node
                })
                .collect();
            let Some((&first, rest)) = members.split_first() else {
                continue;
            };
            let parent = (self.link_name)(first);
            for &member in rest {
                let child = (self.link_name)(member);
                if child == parent {
                    debug!("Rigid group {} member {} lies inside merged link {}", group.name, member, parent);
                    continue;
                }
                let name = names.claim(&group.name);
                debug!("Rigid group {}: {} -> {}", name, parent, child);
                records.push(JointRecord::fixed(name, parent.clone(), child));
            }
        }
        records
    }
}

fn resolve_origin(
    joint: &CadJoint,
    geometry: Option<&JointGeometry>,
    side: usize,
) -> Option<DVec3> {
    match geometry?.resolve() {
        Ok(origin) => Some(origin),
        Err(reason) => {
            debug!("Joint {} origin {} unavailable: {}", joint.name, side, reason);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::design::Occurrence;
    use crate::naming::{DUMMY_JOINT, format_name};
    use crate::units::LengthUnit;

    fn occurrences() -> Vec<Occurrence> {
        vec![
            Occurrence::new("a", "A:1").grounded(),
            Occurrence::new("b", "B:1").at([0.0, 0.0, 5.0]),
            Occurrence::new("c", "C:1").at([0.0, 0.0, 10.0]),
        ]
    }

    fn settings() -> JointSettings {
        JointSettings::new(
            UnitScale::new(LengthUnit::Centimeters, LengthUnit::Meters),
            JointOrder::ParentChild,
        )
    }

    fn extract(
        scene: &SceneGraph,
        settings: JointSettings,
        joints: &[CadJoint],
    ) -> DescriptorResult<Vec<JointRecord>> {
        let mut names = NameRegistry::with_reserved(&[DUMMY_JOINT]);
        let mut diagnostics = Diagnostics::new();
        let mut extractor =
            JointExtractor::new(scene, settings, |n| format_name(&scene.occurrence(n).name));
        extractor.joints(joints, &mut names, &mut diagnostics)
    }

    fn revolute(origin_two: [f64; 3]) -> CadJoint {
        CadJoint::new("Rev1", 1, "a", "b")
            .with_geometry(
                Some(JointGeometry::Point([0.0, 0.0, 0.0])),
                Some(JointGeometry::Point(origin_two)),
            )
            .with_motion(JointMotion::Revolute {
                axis: [0.0, 0.0, 1.0],
                limits: MotionLimits::new(-1.0, 2.0),
            })
    }

    #[test]
    fn test_coincident_origins_accepted() {
        let occs = occurrences();
        let scene = SceneGraph::build(&occs);
        let records = extract(&scene, settings(), &[revolute([0.0, 0.0, 1e-9])]).unwrap();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.kind, JointKind::Revolute);
        assert_eq!(record.parent, "A_1");
        assert_eq!(record.child, "B_1");
        assert_eq!(record.axis, DVec3::Z);
        assert_eq!(record.limits.lower, -1.0);
        assert_eq!(record.limits.upper, 2.0);
    }

    #[test]
    fn test_incoincident_origins_rejected() {
        let occs = occurrences();
        let scene = SceneGraph::build(&occs);
        let err = extract(&scene, settings(), &[revolute([0.0, 0.0, 0.01])]).unwrap_err();
        match &err {
            DescriptorError::IncoincidentOrigins {
                occurrence_one,
                occurrence_two,
                ..
            } => {
                assert_eq!(occurrence_one, "A:1");
                assert_eq!(occurrence_two, "B:1");
            }
            other => panic!("unexpected error: {other}"),
        }
        let message = err.to_string();
        assert!(message.contains("A:1") && message.contains("B:1"));
    }

    #[test]
    fn test_missing_first_origin_is_fatal() {
        let occs = occurrences();
        let scene = SceneGraph::build(&occs);
        let joint = revolute([0.0; 3]).with_geometry(
            Some(JointGeometry::Unavailable("deleted".to_string())),
            Some(JointGeometry::Point([0.0; 3])),
        );
        assert!(matches!(
            extract(&scene, settings(), &[joint]),
            Err(DescriptorError::MissingJointOrigin { .. })
        ));
    }

    #[test]
    fn test_unavailable_second_origin_is_ignored() {
        let occs = occurrences();
        let scene = SceneGraph::build(&occs);
        let joint = revolute([0.0; 3]).with_geometry(
            Some(JointGeometry::Point([1.0, 2.0, 3.0])),
            Some(JointGeometry::Unavailable("deleted".to_string())),
        );
        let records = extract(&scene, settings(), &[joint]).unwrap();
        assert_eq!(records[0].origin, Some(DVec3::new(1.0, 2.0, 3.0)));
    }

    #[test]
    fn test_fixed_joint_needs_no_origin() {
        let occs = occurrences();
        let scene = SceneGraph::build(&occs);
        let records = extract(&scene, settings(), &[CadJoint::new("Rigid", 0, "a", "b")]).unwrap();
        assert_eq!(records[0], JointRecord::fixed("Rigid", "A_1", "B_1"));
    }

    #[test]
    fn test_health_states() {
        let occs = occurrences();
        let scene = SceneGraph::build(&occs);
        let skipped = [
            CadJoint::new("S", 0, "a", "b").with_health(HealthState::Suppressed),
            CadJoint::new("R", 0, "a", "b").with_health(HealthState::RolledBack),
        ];
        assert!(extract(&scene, settings(), &skipped).unwrap().is_empty());

        let broken = CadJoint::new("E", 0, "a", "b").with_health(HealthState::Error);
        assert!(matches!(
            extract(&scene, settings(), &[broken]),
            Err(DescriptorError::UnexpectedJointHealth { .. })
        ));
    }

    #[test]
    fn test_missing_occurrence_reference_skipped() {
        let occs = occurrences();
        let scene = SceneGraph::build(&occs);
        let mut joint = CadJoint::new("Ghost", 0, "a", "b");
        joint.occurrence_two = None;
        let mut names = NameRegistry::new();
        let mut diagnostics = Diagnostics::new();
        let mut extractor =
            JointExtractor::new(&scene, settings(), |n| format_name(&scene.occurrence(n).name));
        let records = extractor.joints(&[joint], &mut names, &mut diagnostics).unwrap();
        assert!(records.is_empty());
        assert_eq!(diagnostics.count(), 1);
    }

    #[test]
    fn test_child_parent_order() {
        let occs = occurrences();
        let scene = SceneGraph::build(&occs);
        let mut settings = settings();
        settings.order = JointOrder::ChildParent;
        let records = extract(&scene, settings, &[CadJoint::new("J", 0, "a", "b")]).unwrap();
        assert_eq!(records[0].parent, "B_1");
        assert_eq!(records[0].child, "A_1");
    }

    #[test]
    fn test_unconstrained_revolute_gets_full_turn() {
        let occs = occurrences();
        let scene = SceneGraph::build(&occs);
        let equal = revolute([0.0; 3]).with_motion(JointMotion::Revolute {
            axis: [1.0, 0.0, 0.0],
            limits: MotionLimits::new(0.5, 0.5),
        });
        let records = extract(&scene, settings(), &[equal]).unwrap();
        assert_eq!(records[0].limits, JointLimits::full_turn());
    }

    #[test]
    fn test_slider_limits_scaled_from_cm() {
        let occs = occurrences();
        let scene = SceneGraph::build(&occs);
        let units = UnitScale::new(LengthUnit::Millimeters, LengthUnit::Meters);
        let joint = CadJoint::new("Slide", 2, "a", "b")
            .with_origin([0.0; 3])
            .with_motion(JointMotion::Slider {
                direction: [0.0, 1.0, 0.0],
                limits: MotionLimits::new(-5.0, 20.0),
            });
        let records = extract(&scene, JointSettings::new(units, JointOrder::ParentChild), &[joint]).unwrap();
        approx::assert_relative_eq!(records[0].limits.lower, -0.05);
        approx::assert_relative_eq!(records[0].limits.upper, 0.2);
        assert_eq!(records[0].axis, DVec3::Y);
    }

    #[test]
    fn test_other_motion_has_zero_axis() {
        let occs = occurrences();
        let scene = SceneGraph::build(&occs);
        let joint = CadJoint::new("Ball", 6, "a", "b")
            .with_origin([0.0; 3])
            .with_motion(JointMotion::Other);
        let records = extract(&scene, settings(), &[joint]).unwrap();
        assert_eq!(records[0].kind, JointKind::Ball);
        assert_eq!(records[0].axis, DVec3::ZERO);
        assert_eq!(records[0].limits.upper, 0.0);
    }

    #[test]
    fn test_duplicate_joint_names() {
        let occs = occurrences();
        let scene = SceneGraph::build(&occs);
        let mut second = CadJoint::new("Rigid", 0, "b", "c");
        second.token = EntityToken::from("other");
        let records =
            extract(&scene, settings(), &[CadJoint::new("Rigid", 0, "a", "b"), second]).unwrap();
        assert_eq!(records[0].name, "Rigid");
        assert_eq!(records[1].name, "Rigid_1");
    }

    #[test]
    fn test_duplicate_joint_tokens_get_unique_names() {
        let occs = occurrences();
        let scene = SceneGraph::build(&occs);
        let joints = [
            CadJoint::new("Rev1", 0, "a", "b"),
            CadJoint::new("Rev1", 0, "b", "c"),
        ];
        assert_eq!(joints[0].token, joints[1].token);
        let records = extract(&scene, settings(), &joints).unwrap();
        let names: Vec<_> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["Rev1", "Rev1_1"]);
    }

    #[test]
    fn test_rigid_group_first_member_is_parent() {
        let occs = occurrences();
        let scene = SceneGraph::build(&occs);
        let group = RigidGroup {
            name: "Frame".to_string(),
            occurrences: vec!["a".into(), "b".into(), "c".into()],
        };
        let mut names = NameRegistry::new();
        let mut diagnostics = Diagnostics::new();
        let mut extractor =
            JointExtractor::new(&scene, settings(), |n| format_name(&scene.occurrence(n).name));
        let records = extractor.rigid_groups(&[group], &mut names, &mut diagnostics);
        assert_eq!(
            records,
            vec![
                JointRecord::fixed("Frame", "A_1", "B_1"),
                JointRecord::fixed("Frame_1", "A_1", "C_1"),
            ]
        );
    }

    #[test]
    fn test_joint_inside_merged_link_dropped() {
        let occs = occurrences();
        let scene = SceneGraph::build(&occs);
        let mut names = NameRegistry::new();
        let mut diagnostics = Diagnostics::new();
        let mut extractor = JointExtractor::new(&scene, settings(), |_| "merged".to_string());
        let records = extractor
            .joints(&[CadJoint::new("J", 0, "a", "b")], &mut names, &mut diagnostics)
            .unwrap();
        assert!(records.is_empty());
        assert!(!names.contains_name("J"));
    }
}
