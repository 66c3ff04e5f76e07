//! Serialized design documents

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{
    Accuracy, CadDocument, CadJoint, EntityToken, HostError, Occurrence, PhysicalProperties,
    RigidGroup,
};
use crate::units::LengthUnit;

/// A CAD document captured as JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignSnapshot {
    pub name: String,
    #[serde(default)]
    pub length_unit: LengthUnit,
    #[serde(default)]
    pub occurrences: Vec<Occurrence>,
    #[serde(default)]
    pub joints: Vec<CadJoint>,
    #[serde(default)]
    pub rigid_groups: Vec<RigidGroup>,
}

impl DesignSnapshot {
    pub fn new(name: impl Into<String>, length_unit: LengthUnit) -> Self {
        Self {
            name: name.into(),
            length_unit,
            occurrences: Vec::new(),
            joints: Vec::new(),
            rigid_groups: Vec::new(),
        }
    }

    pub fn with_occurrence(mut self, occurrence: Occurrence) -> Self {
        self.occurrences.push(occurrence);
        self
    }

    pub fn with_joint(mut self, joint: CadJoint) -> Self {
        self.joints.push(joint);
        self
    }

    pub fn with_rigid_group(mut self, name: &str, members: &[&str]) -> Self {
        self.rigid_groups.push(RigidGroup {
            name: name.to_string(),
            occurrences: members.iter().map(|m| EntityToken::from(*m)).collect(),
        });
        self
    }

    /// Parse a snapshot from JSON text
    pub fn from_json(json: &str) -> Result<Self, HostError> {
        serde_json::from_str(json).map_err(|e| HostError::Parse(e.to_string()))
    }

    /// Load a snapshot from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, HostError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| HostError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&json)
    }

    pub fn to_json(&self) -> Result<String, HostError> {
        serde_json::to_string_pretty(self).map_err(|e| HostError::Parse(e.to_string()))
    }
}

impl CadDocument for DesignSnapshot {
    fn name(&self) -> &str {
        &self.name
    }

    fn length_unit(&self) -> LengthUnit {
        self.length_unit
    }

    fn occurrences(&self) -> &[Occurrence] {
        &self.occurrences
    }

    fn joints(&self) -> &[CadJoint] {
        &self.joints
    }

    fn rigid_groups(&self) -> &[RigidGroup] {
        &self.rigid_groups
    }

    /// Snapshots carry precomputed properties; the accuracy tier was chosen
    /// when the snapshot was captured.
    fn physical_properties(
        &self,
        occurrence: &Occurrence,
        _accuracy: Accuracy,
    ) -> Result<PhysicalProperties, HostError> {
        occurrence
            .physical
            .clone()
            .ok_or_else(|| HostError::PhysicalPropertiesUnavailable(occurrence.name.clone()))
    }

    fn break_link(&mut self, token: &EntityToken) -> Result<(), HostError> {
        let occurrence = find_mut(&mut self.occurrences, token)
            .ok_or_else(|| HostError::UnknownOccurrence(token.clone()))?;
        occurrence.referenced = false;
        Ok(())
    }
}

fn find_mut<'a>(occurrences: &'a mut [Occurrence], token: &EntityToken) -> Option<&'a mut Occurrence> {
    for occurrence in occurrences {
        if &occurrence.token == token {
            return Some(occurrence);
        }
        if let Some(found) = find_mut(&mut occurrence.children, token) {
            return Some(found);
        }
    }
    None
}
