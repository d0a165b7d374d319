//! Export of built boxes: STEP assembly, STL meshes and a build manifest.
//!
//! [`render`] produces every file in memory and touches no disk;
//! [`write`] puts rendered artifacts into a directory.

pub mod errors;
pub mod manifest;
pub mod naming;
pub mod stl;

use std::fs;
use std::path::{Path, PathBuf};

use deckbox_engine::{BuildError, BuiltBox, BuiltSolid};
use deckbox_kernel::RenderMesh;
use modeling_ops::KernelBundle;
use tracing::{debug, info, instrument};

pub use errors::ExportError;
pub use manifest::{BuildManifest, ManifestSolid};
pub use naming::{file_name, manifest_name, ExportFormat, Part};

/// Default chordal tolerance for tessellation, in millimetres.
pub const DEFAULT_MESH_TOLERANCE: f64 = 0.05;

/// What to export and where.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildOptions {
    pub formats: Vec<ExportFormat>,
    pub out_dir: PathBuf,
    pub mesh_tolerance: f64,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            formats: vec![ExportFormat::Step, ExportFormat::StlBinary],
            out_dir: PathBuf::from("."),
            mesh_tolerance: DEFAULT_MESH_TOLERANCE,
        }
    }
}

/// One rendered file.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Render every requested file for a build. Each solid is re-checked with
/// the kernel first; an open or empty solid fails the export.
#[instrument(skip_all, fields(slug = %built.params.slug, version = %built.params.version))]
pub fn render(
    kb: &mut dyn KernelBundle,
    built: &BuiltBox,
    formats: &[ExportFormat],
    mesh_tolerance: f64,
) -> Result<Vec<Artifact>, ExportError> {
    let slug = built.params.slug.as_str();
    let version = built.params.version.as_str();

    for solid in &built.solids {
        revalidate(kb, solid)?;
    }

    let mut formats = formats.to_vec();
    formats.sort();
    formats.dedup();

    let mut artifacts = Vec::new();
    if formats.contains(&ExportFormat::Step) {
        let name = file_name(slug, version, Part::Assembly, ExportFormat::Step);
        let handles: Vec<_> = built.solids.iter().map(|s| s.handle.clone()).collect();
        let text = kb
            .export_step(&handles, &name)
            .map_err(|source| ExportError::Kernel {
                part: Part::Assembly.to_string(),
                source,
            })?;
        artifacts.push(Artifact {
            file_name: name,
            bytes: text.into_bytes(),
        });
    }

    let mesh_formats: Vec<ExportFormat> = formats.iter().copied().filter(|f| f.is_mesh()).collect();
    if !mesh_formats.is_empty() {
        let mut assembly = RenderMesh::empty();
        let mut meshes = Vec::with_capacity(built.solids.len());
        for solid in &built.solids {
            let part = Part::Solid(solid.role);
            let mesh = kb
                .tessellate(&solid.handle, mesh_tolerance)
                .map_err(|source| ExportError::Kernel {
                    part: part.to_string(),
                    source,
                })?;
            debug!(%part, triangles = mesh.triangle_count(), "tessellated");
            assembly.append(&mesh);
            meshes.push((part, mesh));
        }

        for format in mesh_formats {
            for (part, mesh) in std::iter::once((Part::Assembly, &assembly))
                .chain(meshes.iter().map(|(p, m)| (*p, m)))
            {
                let name = file_name(slug, version, part, format);
                let label = format!("{slug}_{version}_{part}");
                let bytes = match format {
                    ExportFormat::StlAscii => stl::ascii_stl(mesh, &label).map(String::into_bytes),
                    _ => stl::binary_stl(mesh, &label),
                }
                .map_err(|reason| ExportError::Stl {
                    part: part.to_string(),
                    reason,
                })?;
                artifacts.push(Artifact {
                    file_name: name,
                    bytes,
                });
            }
        }
    }

    let files = artifacts.iter().map(|a| a.file_name.clone()).collect();
    let manifest = BuildManifest::new(built, files).to_json()?;
    artifacts.push(Artifact {
        file_name: manifest_name(slug, version),
        bytes: manifest.into_bytes(),
    });

    debug!(files = artifacts.len(), "export rendered");
    Ok(artifacts)
}

fn revalidate(kb: &mut dyn KernelBundle, solid: &BuiltSolid) -> Result<(), ExportError> {
    let part = solid.role.part_name();
    let check = kb
        .check_solid(&solid.handle)
        .map_err(|source| ExportError::Kernel {
            part: part.clone(),
            source,
        })?;
    if !check.is_valid() {
        return Err(ExportError::InvalidSolid {
            part,
            reason: format!("closed = {}, volume = {}", check.closed, check.volume),
        });
    }
    Ok(())
}

/// Write artifacts into `dir`, creating it when missing. Returns the
/// written paths in artifact order.
#[instrument(skip(artifacts), fields(dir = %dir.display(), files = artifacts.len()))]
pub fn write(artifacts: &[Artifact], dir: &Path) -> Result<Vec<PathBuf>, ExportError> {
    fs::create_dir_all(dir).map_err(|source| ExportError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut paths = Vec::with_capacity(artifacts.len());
    for artifact in artifacts {
        let path = dir.join(&artifact.file_name);
        fs::write(&path, &artifact.bytes).map_err(|source| ExportError::Io {
            path: path.clone(),
            source,
        })?;
        paths.push(path);
    }
    Ok(paths)
}

/// Render and write in one step, reporting failures in the build taxonomy.
pub fn export(
    kb: &mut dyn KernelBundle,
    built: &BuiltBox,
    options: &BuildOptions,
) -> Result<Vec<PathBuf>, BuildError> {
    let slug = built.params.slug.as_str();
    let artifacts = render(kb, built, &options.formats, options.mesh_tolerance)
        .map_err(|e| e.into_build_error(slug))?;
    let paths = write(&artifacts, &options.out_dir).map_err(|e| e.into_build_error(slug))?;
    info!(slug, files = paths.len(), dir = %options.out_dir.display(), "export written");
    Ok(paths)
}
