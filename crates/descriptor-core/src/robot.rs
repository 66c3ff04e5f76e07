//! Link and joint entities of the generated description

use serde::{Deserialize, Serialize};

use crate::physics::Inertial;
use crate::types::{JointKind, JointLimits, Pose};
use crate::xml::{XmlWriter, fmt_f64, fmt_vec3, xml_escape};

/// What a link stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum LinkKind {
    /// Mesh-bearing link built from occurrences
    #[default]
    Body,
    /// Massless frame without geometry
    Frame,
}

/// A link of the kinematic tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkEntity {
    pub name: String,
    /// Mesh placement in the link frame (the inverse of the link frame,
    /// since meshes are exported in CAD space)
    pub visual_origin: Pose,
    pub inertial: Inertial,
    /// Mesh file stems
    pub meshes: Vec<String>,
    pub material: String,
    pub kind: LinkKind,
}

impl LinkEntity {
    /// Massless frame link
    pub fn frame(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            visual_origin: Pose::default(),
            inertial: Inertial::default(),
            meshes: Vec::new(),
            material: String::new(),
            kind: LinkKind::Frame,
        }
    }

    pub fn has_geometry(&self) -> bool {
        self.kind == LinkKind::Body && !self.meshes.is_empty()
    }

    /// Link fragment, indented one level. Body links without meshes render
    /// nothing.
    pub fn render(&self, context: &RenderContext) -> String {
        let name = xml_escape(&self.name);
        let mut w = XmlWriter::with_indent(1);
        if self.kind == LinkKind::Frame {
            w.write_line(&format!(r#"<link name="{name}" />"#));
            return w.finish();
        }
        if !self.has_geometry() {
            return String::new();
        }

        let inertia = &self.inertial.inertia;
        w.open(&format!(r#"<link name="{name}">"#));
        w.open("<inertial>");
        w.write_line(&origin_tag(&self.inertial.origin));
        w.write_line(&format!(r#"<mass value="{}"/>"#, fmt_f64(self.inertial.mass)));
        w.write_line(&format!(
            r#"<inertia ixx="{}" iyy="{}" izz="{}" ixy="{}" iyz="{}" ixz="{}"/>"#,
            fmt_f64(inertia.ixx),
            fmt_f64(inertia.iyy),
            fmt_f64(inertia.izz),
            fmt_f64(inertia.ixy),
            fmt_f64(inertia.iyz),
            fmt_f64(inertia.ixz)
        ));
        w.close("</inertial>");

        let material = xml_escape(&self.material);
        for mesh in &self.meshes {
            w.open("<visual>");
            w.write_line(&origin_tag(&self.visual_origin));
            self.write_mesh(&mut w, context, mesh);
            w.write_line(&format!(r#"<material name="{material}"/>"#));
            w.close("</visual>");
        }
        for mesh in &self.meshes {
            w.open("<collision>");
            w.write_line(&origin_tag(&self.visual_origin));
            self.write_mesh(&mut w, context, mesh);
            w.close("</collision>");
        }
        w.close("</link>");
        w.finish()
    }

    fn write_mesh(&self, w: &mut XmlWriter, context: &RenderContext, mesh: &str) {
        let s = fmt_f64(context.mesh_scale);
        w.open("<geometry>");
        w.write_line(&format!(
            r#"<mesh filename="{}" scale="{s} {s} {s}"/>"#,
            xml_escape(&context.mesh_uri(mesh))
        ));
        w.close("</geometry>");
    }
}

/// A joint of the kinematic tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointEntity {
    pub name: String,
    pub kind: JointKind,
    /// Child link frame in the parent link frame
    pub origin: Pose,
    pub axis: [f64; 3],
    pub limits: JointLimits,
    pub parent: String,
    pub child: String,
}

impl JointEntity {
    pub fn fixed(name: impl Into<String>, parent: impl Into<String>, child: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: JointKind::Fixed,
            origin: Pose::default(),
            axis: [0.0; 3],
            limits: JointLimits::default(),
            parent: parent.into(),
            child: child.into(),
        }
    }

    /// Joint fragment, indented one level
    pub fn render(&self) -> String {
        let mut w = XmlWriter::with_indent(1);
        w.open(&format!(
            r#"<joint name="{}" type="{}">"#,
            xml_escape(&self.name),
            self.kind.urdf_type()
        ));
        w.write_line(&origin_tag(&self.origin));
        w.write_line(&format!(r#"<parent link="{}"/>"#, xml_escape(&self.parent)));
        w.write_line(&format!(r#"<child link="{}"/>"#, xml_escape(&self.child)));
        if !self.kind.is_fixed() {
            w.write_line(&format!(r#"<axis xyz="{}"/>"#, fmt_vec3(self.axis)));
            w.write_line(&format!(
                r#"<limit upper="{}" lower="{}" effort="{}" velocity="{}"/>"#,
                fmt_f64(self.limits.upper),
                fmt_f64(self.limits.lower),
                fmt_f64(self.limits.effort),
                fmt_f64(self.limits.velocity)
            ));
        }
        w.close("</joint>");
        w.finish()
    }
}

/// Settings shared by all rendered fragments
#[derive(Debug, Clone, PartialEq)]
pub struct RenderContext {
    /// Package that holds the meshes
    pub package: String,
    /// Scale applied to meshes exported in document units
    pub mesh_scale: f64,
}

impl RenderContext {
    pub fn new(package: impl Into<String>, mesh_scale: f64) -> Self {
        Self {
            package: package.into(),
            mesh_scale,
        }
    }

    pub fn mesh_uri(&self, mesh: &str) -> String {
        format!("package://{}/meshes/{}.stl", self.package, mesh)
    }
}

fn origin_tag(pose: &Pose) -> String {
    format!(
        r#"<origin xyz="{}" rpy="{}"/>"#,
        fmt_vec3(pose.xyz),
        fmt_vec3(pose.rpy)
    )
}
