//! Inertia tensors and mass property arithmetic

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::design::{HostError, PhysicalProperties};
use crate::units::UnitScale;

/// Symmetric inertia tensor (ixx, iyy, izz, ixy, iyz, ixz)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct InertiaMatrix {
    pub ixx: f64,
    pub iyy: f64,
    pub izz: f64,
    pub ixy: f64,
    pub iyz: f64,
    pub ixz: f64,
}

impl InertiaMatrix {
    /// From host moments `[xx, yy, zz, xy, yz, xz]`
    pub fn from_moments(m: [f64; 6]) -> Self {
        Self {
            ixx: m[0],
            iyy: m[1],
            izz: m[2],
            ixy: m[3],
            iyz: m[4],
            ixz: m[5],
        }
    }

    pub fn to_array(&self) -> [f64; 6] {
        [self.ixx, self.iyy, self.izz, self.ixy, self.iyz, self.ixz]
    }

    /// Shift a tensor taken about the origin to the center of mass.
    ///
    /// `com` must be in the length unit of the tensor. Products follow the
    /// host convention, where they enter with a positive sign.
    pub fn origin_to_center_of_mass(&self, mass: f64, com: DVec3) -> Self {
        let DVec3 { x, y, z } = com;
        Self {
            ixx: self.ixx - mass * (y * y + z * z),
            iyy: self.iyy - mass * (x * x + z * z),
            izz: self.izz - mass * (x * x + y * y),
            ixy: self.ixy + mass * x * y,
            iyz: self.iyz + mass * y * z,
            ixz: self.ixz + mass * x * z,
        }
    }

    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            ixx: self.ixx * factor,
            iyy: self.iyy * factor,
            izz: self.izz * factor,
            ixy: self.ixy * factor,
            iyz: self.iyz * factor,
            ixz: self.ixz * factor,
        }
    }

    fn add(&self, other: &Self, sign: f64) -> Self {
        Self {
            ixx: self.ixx + sign * other.ixx,
            iyy: self.iyy + sign * other.iyy,
            izz: self.izz + sign * other.izz,
            ixy: self.ixy + sign * other.ixy,
            iyz: self.iyz + sign * other.iyz,
            ixz: self.ixz + sign * other.ixz,
        }
    }
}

/// Mass properties in the global frame as the host reports them
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MassProperties {
    /// kg
    pub mass: f64,
    /// Global frame, document units
    pub center_of_mass: DVec3,
    /// About the global origin, kg·cm²
    pub moments: InertiaMatrix,
}

impl MassProperties {
    /// Convert a host query result; missing moments are fatal
    pub fn from_host(properties: &PhysicalProperties, name: &str) -> Result<Self, HostError> {
        let moments = properties
            .moments
            .ok_or_else(|| HostError::MomentsUnavailable(name.to_string()))?;
        Ok(Self {
            mass: properties.mass,
            center_of_mass: DVec3::from(properties.center_of_mass),
            moments: InertiaMatrix::from_moments(moments),
        })
    }

    /// Properties of the union of two disjoint bodies
    pub fn combine(&self, other: &Self) -> Self {
        let mass = self.mass + other.mass;
        Self {
            mass,
            center_of_mass: weighted(self, other, mass, 1.0),
            moments: self.moments.add(&other.moments, 1.0),
        }
    }

    /// Properties with a contained part removed
    pub fn subtract(&self, other: &Self) -> Self {
        let mass = self.mass - other.mass;
        Self {
            mass,
            center_of_mass: weighted(self, other, mass, -1.0),
            moments: self.moments.add(&other.moments, -1.0),
        }
    }

    /// Tensor about the center of mass, in kg·target²
    pub fn inertia_at_center_of_mass(&self, mass: f64, units: &UnitScale) -> InertiaMatrix {
        self.moments
            .origin_to_center_of_mass(mass, self.center_of_mass * units.doc_to_cm)
            .scaled(units.inertia())
    }
}

fn weighted(a: &MassProperties, b: &MassProperties, mass: f64, sign: f64) -> DVec3 {
    if mass.abs() <= f64::EPSILON {
        return a.center_of_mass;
    }
    (a.center_of_mass * a.mass + sign * b.center_of_mass * b.mass) / mass
}
