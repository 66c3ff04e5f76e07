//! Run configuration
//!
//! A RON document with a closed set of PascalCase keys. Every key is
//! optional; an unknown key or a value of the wrong shape is an error.
//!
//! ```ron
//! (
//!     RobotName: Some("arm"),
//!     TargetUnits: m,
//!     SubMesh: true,
//!     MergeLinks: { "forearm": ["forearm:1", "wrist:1"] },
//!     Extras: ["camera:1"],
//! )
//! ```

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::design::Accuracy;
use crate::joints::{JointOrder, JointSettings};
use crate::units::{LengthUnit, UnitScale};

/// Errors loading a configuration document
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Deserialization error: {0}")]
    Deserialize(String),

    #[error("Serialization error: {0}")]
    Serialize(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Mesh tessellation tier, used by the mesh exporter only
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum MeshResolution {
    #[default]
    Low,
    Medium,
    High,
}

/// Downstream consumer of the description; recorded, not acted on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TargetPlatform {
    #[default]
    Generic,
    PyBullet,
    Rviz,
    Gazebo,
    MoveIt,
}

/// Complete run configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "PascalCase", deny_unknown_fields, default)]
pub struct Configuration {
    /// Robot name, defaults to the document name
    pub robot_name: Option<String>,
    /// Write the mesh manifest
    pub save_mesh: bool,
    /// One mesh per body instead of one per link
    pub sub_mesh: bool,
    pub mesh_resolution: MeshResolution,
    pub inertia_precision: Accuracy,
    pub target_units: LengthUnit,
    pub target_platform: TargetPlatform,
    pub joint_order: JointOrder,
    /// Display name -> link name
    pub name_map: BTreeMap<String, String>,
    /// Link name -> member display names; the first member gives the frame
    pub merge_links: BTreeMap<String, Vec<String>>,
    /// Link name -> (location name -> occurrence display name)
    pub locations: BTreeMap<String, BTreeMap<String, String>>,
    /// Occurrences emitted as frame links
    pub extras: Vec<String>,
    /// Root occurrence, overriding the grounded one
    pub root: Option<String>,
}

impl Configuration {
    /// Parse and validate a RON document
    pub fn from_ron(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            ron::from_str(content).map_err(|e| ConfigError::Deserialize(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_ron(&content)
    }

    pub fn to_ron(&self) -> Result<String, ConfigError> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| ConfigError::Serialize(e.to_string()))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if let Some((link, _)) = self.merge_links.iter().find(|(_, members)| members.is_empty()) {
            return Err(ConfigError::Invalid(format!(
                "MergeLinks entry '{link}' has no members"
            )));
        }
        let mut seen = HashMap::new();
        for (link, members) in &self.merge_links {
            for member in members {
                if let Some(other) = seen.insert(member.as_str(), link.as_str()) {
                    return Err(ConfigError::Invalid(format!(
                        "'{member}' is listed in both MergeLinks '{other}' and '{link}'"
                    )));
                }
            }
        }
        let mut extras = HashSet::new();
        if let Some(extra) = self.extras.iter().find(|e| !extras.insert(e.as_str())) {
            return Err(ConfigError::Invalid(format!(
                "'{extra}' is listed more than once in Extras"
            )));
        }
        Ok(())
    }

    pub fn units(&self, document: LengthUnit) -> UnitScale {
        UnitScale::new(document, self.target_units)
    }

    pub fn joint_settings(&self, document: LengthUnit) -> JointSettings {
        JointSettings::new(self.units(document), self.joint_order)
    }

    /// Name map as a lookup table
    pub fn name_lookup(&self) -> HashMap<String, String> {
        self.name_map
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}
