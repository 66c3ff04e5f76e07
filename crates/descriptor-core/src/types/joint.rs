//! Joint-related type definitions

use serde::{Deserialize, Serialize};

/// Joint kind, in the order CAD hosts number their joint types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum JointKind {
    #[default]
    Fixed,
    Revolute,
    Prismatic,
    Cylindrical,
    PinSlot,
    Planar,
    Ball,
}

impl JointKind {
    /// Map a host joint-type ordinal to a kind
    pub fn from_ordinal(ordinal: u32) -> Option<Self> {
        Self::all().get(ordinal as usize).copied()
    }

    /// Check if this joint kind allows motion
    pub fn is_fixed(&self) -> bool {
        matches!(self, JointKind::Fixed)
    }

    /// Type attribute written to the description. Kinds URDF has no type
    /// for are written as `floating`.
    pub fn urdf_type(&self) -> &'static str {
        match self {
            JointKind::Fixed => "fixed",
            JointKind::Revolute => "revolute",
            JointKind::Prismatic => "prismatic",
            JointKind::Planar => "planar",
            JointKind::Cylindrical | JointKind::PinSlot | JointKind::Ball => "floating",
        }
    }

    /// Check if the written type loses the joint's constraint
    pub fn is_approximated(&self) -> bool {
        matches!(
            self,
            JointKind::Cylindrical | JointKind::PinSlot | JointKind::Ball
        )
    }

    /// Name as the CAD host shows it
    pub fn display_name(&self) -> &'static str {
        match self {
            JointKind::Fixed => "Fixed",
            JointKind::Revolute => "Revolute",
            JointKind::Prismatic => "Prismatic",
            JointKind::Cylindrical => "Cylindrical",
            JointKind::PinSlot => "Pin-Slot",
            JointKind::Planar => "Planar",
            JointKind::Ball => "Ball",
        }
    }

    /// All joint kinds, indexed by host ordinal
    pub fn all() -> &'static [JointKind] {
        &[
            JointKind::Fixed,
            JointKind::Revolute,
            JointKind::Prismatic,
            JointKind::Cylindrical,
            JointKind::PinSlot,
            JointKind::Planar,
            JointKind::Ball,
        ]
    }
}

impl std::fmt::Display for JointKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Joint limits
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JointLimits {
    /// Lower position limit (rad or target length unit)
    pub lower: f64,
    /// Upper position limit (rad or target length unit)
    pub upper: f64,
    /// Maximum effort (N or Nm)
    pub effort: f64,
    /// Maximum velocity (rad/s or m/s)
    pub velocity: f64,
}

impl JointLimits {
    pub const DEFAULT_EFFORT: f64 = 100.0;
    pub const DEFAULT_VELOCITY: f64 = 100.0;
    /// Range used when a rotational joint is left unconstrained
    pub const FULL_TURN: f64 = std::f64::consts::PI;

    /// Create limits with specified range
    pub fn with_range(lower: f64, upper: f64) -> Self {
        Self {
            lower,
            upper,
            effort: Self::DEFAULT_EFFORT,
            velocity: Self::DEFAULT_VELOCITY,
        }
    }

    /// Full +/- pi range for unconstrained rotational joints
    pub fn full_turn() -> Self {
        Self::with_range(-Self::FULL_TURN, Self::FULL_TURN)
    }
}

impl Default for JointLimits {
    fn default() -> Self {
        Self::with_range(0.0, 0.0)
    }
}
