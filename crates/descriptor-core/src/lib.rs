//! CAD assembly to robot description conversion
//!
//! This crate turns the scene graph of a CAD assembly into a URDF
//! kinematic tree:
//! - design: host document model and JSON snapshots
//! - scene, joints, kinematics: occurrence tree, joint records, spanning tree
//! - inertia, physics: mass properties in link frames
//! - robot, export: rendered link/joint entities and output documents
//! - resolver: one description run end to end

pub mod config;
pub mod design;
pub mod diagnostics;
pub mod error;
pub mod export;
pub mod inertia;
pub mod joints;
pub mod kinematics;
pub mod material;
pub mod naming;
pub mod physics;
pub mod resolver;
pub mod robot;
pub mod scene;
pub mod types;
pub mod units;
pub mod xml;

pub use config::{ConfigError, Configuration, MeshResolution, TargetPlatform};
pub use design::*;
pub use error::{DescriptorError, DescriptorResult};
pub use export::{ExportError, OutputPaths, RobotDescription, write_bundle};
pub use joints::{JointOrder, JointRecord};
pub use resolver::{Resolver, describe, preview_joints};
pub use robot::{JointEntity, LinkEntity, LinkKind};
pub use types::*;
pub use units::{LengthUnit, UnitScale};
