//! Writing a description bundle to disk

use std::path::{Path, PathBuf};

use tracing::info;

use super::RobotDescription;

/// Errors writing output documents
#[derive(Debug, Clone, thiserror::Error)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Serialization error: {0}")]
    Serialize(String),
}

/// Files produced by [`write_bundle`]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OutputPaths {
    pub robot: PathBuf,
    pub materials: PathBuf,
    pub summary: PathBuf,
    pub locations: Option<PathBuf>,
    pub mesh_manifest: Option<PathBuf>,
}

impl OutputPaths {
    pub fn iter(&self) -> impl Iterator<Item = &PathBuf> {
        [&self.robot, &self.materials, &self.summary]
            .into_iter()
            .chain(self.locations.iter())
            .chain(self.mesh_manifest.iter())
    }
}

/// Write the description under `<out_dir>/<robot>/`:
///
/// ```text
/// <robot>/urdf/<robot>.xacro
/// <robot>/urdf/materials.xacro
/// <robot>/urdf/locations.json     (when locations are configured)
/// <robot>/urdf/descriptor.txt
/// <robot>/meshes/manifest.json    (when `with_meshes`)
/// ```
pub fn write_bundle(
    description: &RobotDescription,
    out_dir: &Path,
    with_meshes: bool,
) -> Result<OutputPaths, ExportError> {
    let package = out_dir.join(&description.name);
    let urdf_dir = package.join("urdf");
    create_dir(&urdf_dir)?;

    let mut paths = OutputPaths {
        robot: urdf_dir.join(format!("{}.xacro", description.name)),
        materials: urdf_dir.join("materials.xacro"),
        summary: urdf_dir.join("descriptor.txt"),
        ..Default::default()
    };
    write_file(&paths.robot, &description.robot_document())?;
    write_file(&paths.materials, &description.materials_document())?;
    write_file(&paths.summary, &description.tree_summary())?;

    if let Some(locations) = description.locations_json()? {
        let path = urdf_dir.join("locations.json");
        write_file(&path, &locations)?;
        paths.locations = Some(path);
    }

    if with_meshes {
        let mesh_dir = package.join("meshes");
        create_dir(&mesh_dir)?;
        let path = mesh_dir.join("manifest.json");
        write_file(&path, &description.mesh_manifest_json()?)?;
        paths.mesh_manifest = Some(path);
    }

    info!("Wrote description of {} to {:?}", description.name, package);
    Ok(paths)
}

fn create_dir(path: &Path) -> Result<(), ExportError> {
    std::fs::create_dir_all(path)
        .map_err(|e| ExportError::Io(format!("Failed to create {}: {}", path.display(), e)))
}

fn write_file(path: &Path, content: &str) -> Result<(), ExportError> {
    std::fs::write(path, content)
        .map_err(|e| ExportError::Io(format!("Failed to write {}: {}", path.display(), e)))
}
