//! Inertial block of a link

use serde::{Deserialize, Serialize};

use crate::inertia::{InertiaMatrix, MassProperties};
use crate::types::{Pose, RigidTransform};
use crate::units::UnitScale;

/// Inertial properties expressed in a link frame, target units
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Inertial {
    /// Center of mass and orientation of the tensor axes in the link frame
    pub origin: Pose,
    pub mass: f64,
    pub inertia: InertiaMatrix,
}

/// Inertial of a link from the host-reported properties of its members.
///
/// * `hidden_mass` - mass of hidden bodies included in `properties`
/// * `link` - absolute frame of the link
pub fn link_inertial(
    properties: &MassProperties,
    hidden_mass: f64,
    link: &RigidTransform,
    units: &UnitScale,
) -> Inertial {
    let mass = properties.mass - hidden_mass;

    // The host reports the center of mass in the global frame
    let link_inverse = link.inverse();
    let in_link = link_inverse.transform_point(properties.center_of_mass);

    Inertial {
        origin: Pose::new((in_link * units.scale).to_array(), link_inverse.rpy()),
        mass,
        inertia: properties.inertia_at_center_of_mass(mass, units),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::LengthUnit;
    use approx::assert_relative_eq;
    use glam::DVec3;

    fn properties(com: DVec3) -> MassProperties {
        MassProperties {
            mass: 2.0,
            center_of_mass: com,
            moments: InertiaMatrix::from_moments([2.0, 2.0, 2.0, 0.0, 0.0, 0.0]),
        }
    }

    #[test]
    fn test_hidden_mass_removed() {
        let units = UnitScale::default();
        let inertial = link_inertial(
            &properties(DVec3::ZERO),
            0.5,
            &RigidTransform::IDENTITY,
            &units,
        );
        assert_eq!(inertial.mass, 1.5);
    }

    #[test]
    fn test_com_in_link_frame() {
        let units = UnitScale::new(LengthUnit::Centimeters, LengthUnit::Meters);
        let link = RigidTransform::from_translation(DVec3::new(0.0, 0.0, 20.0));
        let inertial = link_inertial(
            &properties(DVec3::new(0.0, 0.0, 30.0)),
            0.0,
            &link,
            &units,
        );
        assert_relative_eq!(inertial.origin.xyz[2], 0.1, epsilon = 1e-12);
        assert_eq!(inertial.origin.rpy, [0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_rotated_link_frame() {
        let units = UnitScale::new(LengthUnit::Meters, LengthUnit::Meters);
        let link = RigidTransform::from_rpy(DVec3::ZERO, [0.0, 0.0, std::f64::consts::FRAC_PI_2]);
        let inertial = link_inertial(
            &properties(DVec3::new(1.0, 0.0, 0.0)),
            0.0,
            &link,
            &units,
        );
        // Global +x is the link's -y
        assert_relative_eq!(inertial.origin.xyz[0], 0.0, epsilon = 1e-12);
        assert_relative_eq!(inertial.origin.xyz[1], -1.0, epsilon = 1e-12);
        assert_relative_eq!(inertial.origin.rpy[2], -std::f64::consts::FRAC_PI_2, epsilon = 1e-12);
    }

    #[test]
    fn test_inertia_uses_corrected_mass() {
        let units = UnitScale::new(LengthUnit::Centimeters, LengthUnit::Meters);
        let inertial = link_inertial(
            &properties(DVec3::new(0.0, 0.0, 1.0)),
            1.0,
            &RigidTransform::IDENTITY,
            &units,
        );
        // 2 - 1 kg * 1 cm², scaled to m²
        assert_relative_eq!(inertial.inertia.ixx, 1e-4, epsilon = 1e-15);
        assert_relative_eq!(inertial.inertia.izz, 2e-4, epsilon = 1e-15);
    }
}
