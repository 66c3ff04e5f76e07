//! Read-only model of the host CAD document
//!
//! The exporter never talks to a CAD application directly. It reads a
//! [`CadDocument`]: occurrences (placed component instances) with their
//! transforms, bodies and appearances, joint primitives and rigid groups.
//! [`DesignSnapshot`] is the serialized form of such a document.

mod snapshot;

pub use snapshot::DesignSnapshot;

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::types::RigidTransform;
use crate::units::LengthUnit;

/// Stable identity of a host entity
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityToken(pub String);

impl EntityToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EntityToken {
    fn from(token: &str) -> Self {
        Self(token.to_string())
    }
}

impl std::fmt::Display for EntityToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Accuracy tier for physical-property queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Accuracy {
    #[default]
    Low,
    Medium,
    High,
}

/// Appearance color, channels in 0..=255
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    pub opacity: u8,
}

impl Color {
    pub fn new(red: u8, green: u8, blue: u8, opacity: u8) -> Self {
        Self {
            red,
            green,
            blue,
            opacity,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appearance {
    pub name: String,
    /// Color property, if the appearance carries one
    #[serde(default)]
    pub color: Option<Color>,
}

/// Physical material of a component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub name: String,
    #[serde(default)]
    pub appearance: Option<Appearance>,
}

/// A solid body owned by an occurrence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Body {
    pub name: String,
    #[serde(default = "default_visible")]
    pub visible: bool,
    /// Mass in kg
    #[serde(default)]
    pub mass: f64,
    #[serde(default)]
    pub appearance: Option<Appearance>,
}

impl Body {
    pub fn new(name: impl Into<String>, mass: f64) -> Self {
        Self {
            name: name.into(),
            visible: true,
            mass,
            appearance: None,
        }
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }
}

/// Mass properties of an occurrence's whole subtree, as the host reports them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicalProperties {
    /// Mass in kg, hidden bodies included
    pub mass: f64,
    /// Center of mass in the global frame, document units
    pub center_of_mass: [f64; 3],
    /// Moments about the global origin `[xx, yy, zz, xy, yz, xz]` in kg·cm²;
    /// `None` when the host failed to compute them
    #[serde(default)]
    pub moments: Option<[f64; 6]>,
}

/// One placed instance of a component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Occurrence {
    pub token: EntityToken,
    pub name: String,
    #[serde(default = "default_visible")]
    pub visible: bool,
    #[serde(default)]
    pub grounded: bool,
    /// Linked copy of an external design
    #[serde(default)]
    pub referenced: bool,
    /// Row-major 4x4 transform into the global frame, document units
    #[serde(default = "identity_matrix")]
    pub transform: [f64; 16],
    #[serde(default)]
    pub bodies: Vec<Body>,
    #[serde(default)]
    pub appearance: Option<Appearance>,
    /// Material of the occurrence's component
    #[serde(default)]
    pub material: Option<Material>,
    #[serde(default)]
    pub physical: Option<PhysicalProperties>,
    #[serde(default)]
    pub children: Vec<Occurrence>,
}

impl Occurrence {
    pub fn new(token: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            token: EntityToken::new(token),
            name: name.into(),
            visible: true,
            grounded: false,
            referenced: false,
            transform: identity_matrix(),
            bodies: Vec::new(),
            appearance: None,
            material: None,
            physical: None,
            children: Vec::new(),
        }
    }

    pub fn grounded(mut self) -> Self {
        self.grounded = true;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn at(mut self, translation: [f64; 3]) -> Self {
        self.transform[3] = translation[0];
        self.transform[7] = translation[1];
        self.transform[11] = translation[2];
        self
    }

    pub fn with_transform(mut self, transform: [f64; 16]) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_body(mut self, body: Body) -> Self {
        self.bodies.push(body);
        self
    }

    pub fn with_child(mut self, child: Occurrence) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_appearance(mut self, appearance: Appearance) -> Self {
        self.appearance = Some(appearance);
        self
    }

    pub fn with_physical(mut self, physical: PhysicalProperties) -> Self {
        self.physical = Some(physical);
        self
    }

    /// The occurrence transform, or `None` if it cannot be inverted
    pub fn rigid_transform(&self) -> Option<RigidTransform> {
        RigidTransform::from_row_major(&self.transform)
    }
}

/// Health of a joint feature in the host's timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    #[default]
    Healthy,
    Suppressed,
    RolledBack,
    Warning,
    Error,
}

/// Geometry or joint-origin reference on one side of a joint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JointGeometry {
    Point([f64; 3]),
    Vector([f64; 3]),
    JointOrigin(Box<JointGeometry>),
    Geometry(Box<JointGeometry>),
    /// The host threw while evaluating this reference
    Unavailable(String),
}

impl JointGeometry {
    /// Levels of origin/geometry indirection followed before giving up
    pub const MAX_INDIRECTION: usize = 2;

    /// Resolve the reference down to a point
    pub fn resolve(&self) -> Result<DVec3, String> {
        self.resolve_at(0)
    }

    fn resolve_at(&self, depth: usize) -> Result<DVec3, String> {
        match self {
            JointGeometry::Point(p) | JointGeometry::Vector(p) => Ok(DVec3::from(*p)),
            JointGeometry::JointOrigin(inner) | JointGeometry::Geometry(inner) => {
                if depth >= Self::MAX_INDIRECTION {
                    return Err(format!(
                        "more than {} levels of indirection",
                        Self::MAX_INDIRECTION
                    ));
                }
                inner.resolve_at(depth + 1)
            }
            JointGeometry::Unavailable(reason) => Err(reason.clone()),
        }
    }
}

/// Min/max of a joint motion; a missing side is a disabled limit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct MotionLimits {
    #[serde(default)]
    pub minimum: Option<f64>,
    #[serde(default)]
    pub maximum: Option<f64>,
}

impl MotionLimits {
    pub fn new(minimum: f64, maximum: f64) -> Self {
        Self {
            minimum: Some(minimum),
            maximum: Some(maximum),
        }
    }
}

/// Motion definition of a joint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum JointMotion {
    #[default]
    Rigid,
    /// Limits in radians
    Revolute {
        axis: [f64; 3],
        #[serde(default)]
        limits: MotionLimits,
    },
    /// Limits in centimeters
    Slider {
        direction: [f64; 3],
        #[serde(default)]
        limits: MotionLimits,
    },
    /// Cylindrical, pin-slot, planar and ball motions
    Other,
}

/// A mechanical joint between two occurrences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CadJoint {
    pub token: EntityToken,
    pub name: String,
    /// Name of the component that owns the joint feature
    #[serde(default)]
    pub parent_component: String,
    #[serde(default)]
    pub health: HealthState,
    #[serde(default)]
    pub error_message: Option<String>,
    /// Host joint-type ordinal, see [`crate::types::JointKind::from_ordinal`]
    pub joint_type: u32,
    #[serde(default)]
    pub occurrence_one: Option<EntityToken>,
    #[serde(default)]
    pub occurrence_two: Option<EntityToken>,
    #[serde(default)]
    pub geometry_one: Option<JointGeometry>,
    #[serde(default)]
    pub geometry_two: Option<JointGeometry>,
    #[serde(default)]
    pub motion: JointMotion,
}

impl CadJoint {
    pub fn new(
        name: impl Into<String>,
        joint_type: u32,
        occurrence_one: impl Into<String>,
        occurrence_two: impl Into<String>,
    ) -> Self {
        let name = name.into();
        Self {
            token: EntityToken::new(format!("joint:{name}")),
            name,
            parent_component: String::new(),
            health: HealthState::Healthy,
            error_message: None,
            joint_type,
            occurrence_one: Some(EntityToken::new(occurrence_one)),
            occurrence_two: Some(EntityToken::new(occurrence_two)),
            geometry_one: None,
            geometry_two: None,
            motion: JointMotion::Rigid,
        }
    }

    /// Same point on both sides
    pub fn with_origin(mut self, origin: [f64; 3]) -> Self {
        self.geometry_one = Some(JointGeometry::Point(origin));
        self.geometry_two = Some(JointGeometry::Point(origin));
        self
    }

    pub fn with_geometry(mut self, one: Option<JointGeometry>, two: Option<JointGeometry>) -> Self {
        self.geometry_one = one;
        self.geometry_two = two;
        self
    }

    pub fn with_motion(mut self, motion: JointMotion) -> Self {
        self.motion = motion;
        self
    }

    pub fn with_health(mut self, health: HealthState) -> Self {
        self.health = health;
        self
    }
}

/// Occurrences that move together
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RigidGroup {
    pub name: String,
    pub occurrences: Vec<EntityToken>,
}

/// Errors reported by host queries
#[derive(Debug, Clone, thiserror::Error)]
pub enum HostError {
    #[error("Inverse transform failed for {0}")]
    SingularTransform(String),

    #[error("Physical properties unavailable for {0}")]
    PhysicalPropertiesUnavailable(String),

    #[error("Retrieving moments of inertia for {0} failed")]
    MomentsUnavailable(String),

    #[error("Unknown occurrence: {0}")]
    UnknownOccurrence(EntityToken),

    #[error("Failed to parse design: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(String),
}

/// Read access to a CAD document
pub trait CadDocument {
    /// Name of the root component
    fn name(&self) -> &str;

    /// Default length unit of the document
    fn length_unit(&self) -> LengthUnit;

    /// Top-level occurrences of the root component
    fn occurrences(&self) -> &[Occurrence];

    /// All joints in the design
    fn joints(&self) -> &[CadJoint];

    /// All rigid groups in the design
    fn rigid_groups(&self) -> &[RigidGroup];

    /// Mass properties of an occurrence and everything below it
    fn physical_properties(
        &self,
        occurrence: &Occurrence,
        accuracy: Accuracy,
    ) -> Result<PhysicalProperties, HostError>;

    /// Break the link of a referenced occurrence so that it is local to
    /// this document
    fn break_link(&mut self, token: &EntityToken) -> Result<(), HostError>;
}

fn default_visible() -> bool {
    true
}

fn identity_matrix() -> [f64; 16] {
    [
        1.0, 0.0, 0.0, 0.0, //
        0.0, 1.0, 0.0, 0.0, //
        0.0, 0.0, 1.0, 0.0, //
        0.0, 0.0, 0.0, 1.0,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_direct_point() {
        let g = JointGeometry::Point([1.0, 2.0, 3.0]);
        assert_eq!(g.resolve().unwrap(), DVec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_resolve_two_levels() {
        let g = JointGeometry::JointOrigin(Box::new(JointGeometry::Geometry(Box::new(
            JointGeometry::Vector([0.0, 0.0, 5.0]),
        ))));
        assert_eq!(g.resolve().unwrap(), DVec3::new(0.0, 0.0, 5.0));
    }

    #[test]
    fn test_resolve_too_deep() {
        let g = JointGeometry::Geometry(Box::new(JointGeometry::JointOrigin(Box::new(
            JointGeometry::Geometry(Box::new(JointGeometry::Point([0.0; 3]))),
        ))));
        assert!(g.resolve().is_err());
    }

    #[test]
    fn test_resolve_unavailable() {
        let g = JointGeometry::Geometry(Box::new(JointGeometry::Unavailable(
            "entity deleted".to_string(),
        )));
        assert_eq!(g.resolve().unwrap_err(), "entity deleted");
    }

    #[test]
    fn test_occurrence_at_sets_translation() {
        let occ = Occurrence::new("t", "part").at([1.0, 2.0, 3.0]);
        let t = occ.rigid_transform().unwrap();
        assert_eq!(t.translation, DVec3::new(1.0, 2.0, 3.0));
    }
}
