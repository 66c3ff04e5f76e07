//! Output documents of a description run

mod writer;

pub use writer::{ExportError, OutputPaths, write_bundle};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::MeshResolution;
use crate::material::ColorTable;
use crate::naming::{DUMMY_JOINT, DUMMY_LINK};
use crate::robot::{JointEntity, LinkEntity, RenderContext};
use crate::types::Pose;
use crate::units::LengthUnit;
use crate::xml::{XmlWriter, xml_escape};

/// Body that goes into a mesh file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshBody {
    pub occurrence: String,
    pub body: String,
}

/// One mesh file to be produced by the mesh exporter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshEntry {
    pub file: String,
    pub link: String,
    pub bodies: Vec<MeshBody>,
}

/// Instructions for the mesh exporter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshManifest {
    pub resolution: MeshResolution,
    /// Unit the meshes are written in
    pub unit: LengthUnit,
    pub meshes: Vec<MeshEntry>,
}

/// Link name -> location name -> pose in the link frame
pub type Locations = BTreeMap<String, BTreeMap<String, Pose>>;

/// Everything a run produces
#[derive(Debug, Clone, PartialEq)]
pub struct RobotDescription {
    pub name: String,
    /// Name of the design the description was built from
    pub source: String,
    /// Link attached to the dummy root frame
    pub base_link: String,
    /// Links in discovery order
    pub links: Vec<LinkEntity>,
    /// Joints in discovery order
    pub joints: Vec<JointEntity>,
    pub colors: ColorTable,
    pub locations: Locations,
    pub mesh_manifest: MeshManifest,
    pub render: RenderContext,
    /// Tree summary, one line per link
    pub tree: Vec<String>,
    /// Recoverable events of the run
    pub warnings: Vec<String>,
}

impl RobotDescription {
    pub fn link(&self, name: &str) -> Option<&LinkEntity> {
        self.links.iter().find(|l| l.name == name)
    }

    pub fn joint(&self, name: &str) -> Option<&JointEntity> {
        self.joints.iter().find(|j| j.name == name)
    }

    fn header(&self, w: &mut XmlWriter) {
        w.write_line(r#"<?xml version="1.0" ?>"#);
        w.write_line(&format!(
            r#"<robot name="{}" xmlns:xacro="http://www.ros.org/wiki/xacro">"#,
            xml_escape(&self.name)
        ));
        w.blank();
    }

    /// The robot document: dummy root frame, then links, then joints
    pub fn robot_document(&self) -> String {
        let mut w = XmlWriter::new();
        self.header(&mut w);
        w.indent_by(1);
        w.write_line(&format!(
            r#"<xacro:include filename="$(find {})/urdf/materials.xacro" />"#,
            xml_escape(&self.name)
        ));
        w.blank();

        let mut out = w.finish();
        out.push_str(&LinkEntity::frame(DUMMY_LINK).render(&self.render));
        out.push_str(&JointEntity::fixed(DUMMY_JOINT, DUMMY_LINK, &self.base_link).render());
        for link in &self.links {
            out.push_str(&link.render(&self.render));
        }
        for joint in &self.joints {
            out.push_str(&joint.render());
        }
        out.push_str("</robot>\n");
        out
    }

    /// Companion document with the material colors
    pub fn materials_document(&self) -> String {
        let mut w = XmlWriter::new();
        self.header(&mut w);
        w.indent_by(1);
        for (name, rgba) in self.colors.iter() {
            w.open(&format!(r#"<material name="{}">"#, xml_escape(name)));
            w.write_line(&format!(r#"<color rgba="{rgba}"/>"#));
            w.close("</material>");
        }
        w.indent_by(-1);
        w.blank();
        w.write_line("</robot>");
        w.finish()
    }

    /// Configured location frames, `None` when there are none
    pub fn locations_json(&self) -> Result<Option<String>, ExportError> {
        if self.locations.is_empty() {
            return Ok(None);
        }
        serde_json::to_string_pretty(&self.locations)
            .map(Some)
            .map_err(|e| ExportError::Serialize(e.to_string()))
    }

    pub fn mesh_manifest_json(&self) -> Result<String, ExportError> {
        serde_json::to_string_pretty(&self.mesh_manifest)
            .map_err(|e| ExportError::Serialize(e.to_string()))
    }

    /// Human-readable summary of the discovered hierarchy
    pub fn tree_summary(&self) -> String {
        let mut out = format!(
            "Description structure created from design {}:\n",
            self.source
        );
        for line in &self.tree {
            out.push_str(line);
            out.push('\n');
        }
        out
    }
}
