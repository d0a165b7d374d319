use serde::{Deserialize, Serialize};

// Re-export shared types from deckbox-types
pub use deckbox_types::{Profile, TopoKind, TopoSignature};

/// Opaque handle to a solid in the geometry kernel.
/// NEVER persisted. Valid only for the kernel instance that issued it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KernelSolidHandle(pub(crate) u64);

impl KernelSolidHandle {
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Transient kernel-internal entity identifier.
/// Stable within a single kernel session but NOT across rebuilds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KernelId(pub u64);

/// Errors from kernel operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum KernelError {
    #[error("invalid profile: {reason}")]
    InvalidProfile { reason: String },

    #[error("extrude failed: {reason}")]
    ExtrudeFailed { reason: String },

    #[error("boolean operation failed: {reason}")]
    BooleanFailed { reason: String },

    #[error("fillet failed: {reason}")]
    FilletFailed { reason: String },

    #[error("chamfer failed: {reason}")]
    ChamferFailed { reason: String },

    #[error("shell failed: {reason}")]
    ShellFailed { reason: String },

    #[error("tessellation failed: {reason}")]
    TessellationFailed { reason: String },

    #[error("STEP export failed: {reason}")]
    StepFailed { reason: String },

    #[error("entity not found: {id:?}")]
    EntityNotFound { id: KernelId },

    #[error("operation not supported: {operation}")]
    NotSupported { operation: String },
}

/// Result of a solid validity check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolidCheck {
    /// Every boundary shell is closed and manifold.
    pub closed: bool,
    /// Enclosed volume in cubic model units.
    pub volume: f64,
}

impl SolidCheck {
    /// A solid that can be exported: closed with positive volume.
    pub fn is_valid(&self) -> bool {
        self.closed && self.volume.is_finite() && self.volume > 0.0
    }
}

/// Tessellated triangle mesh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderMesh {
    /// Flat array of vertex positions [x0, y0, z0, x1, y1, z1, ...].
    pub vertices: Vec<f32>,
    /// Flat array of vertex normals [nx0, ny0, nz0, nx1, ny1, nz1, ...].
    pub normals: Vec<f32>,
    /// Triangle indices into the vertex array.
    pub indices: Vec<u32>,
    /// Mapping from triangle ranges to logical faces.
    pub face_ranges: Vec<FaceRange>,
}

impl RenderMesh {
    pub fn empty() -> Self {
        Self {
            vertices: Vec::new(),
            normals: Vec::new(),
            indices: Vec::new(),
            face_ranges: Vec::new(),
        }
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Append another mesh, re-basing its indices.
    pub fn append(&mut self, other: &RenderMesh) {
        let base_vertex = (self.vertices.len() / 3) as u32;
        let base_index = self.indices.len() as u32;
        self.vertices.extend_from_slice(&other.vertices);
        self.normals.extend_from_slice(&other.normals);
        self.indices
            .extend(other.indices.iter().map(|i| i + base_vertex));
        self.face_ranges.extend(other.face_ranges.iter().map(|r| FaceRange {
            face_id: r.face_id,
            start_index: r.start_index + base_index,
            end_index: r.end_index + base_index,
        }));
    }

    /// Signed enclosed volume (divergence theorem). Positive for an
    /// outward-oriented closed mesh. Triangles naming a vertex past the end
    /// of `vertices` are skipped.
    pub fn signed_volume(&self) -> f64 {
        let v = |i: u32| -> Option<[f64; 3]> {
            let b = (i as usize).checked_mul(3)?;
            let p = self.vertices.get(b..b.checked_add(3)?)?;
            Some([p[0] as f64, p[1] as f64, p[2] as f64])
        };
        self.indices
            .chunks_exact(3)
            .filter_map(|t| Some((v(t[0])?, v(t[1])?, v(t[2])?)))
            .map(|(a, b, c)| {
                (a[0] * (b[1] * c[2] - b[2] * c[1]) - a[1] * (b[0] * c[2] - b[2] * c[0])
                    + a[2] * (b[0] * c[1] - b[1] * c[0]))
                    / 6.0
            })
            .sum()
    }
}

/// Maps a contiguous range of triangles to a logical face.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceRange {
    /// The KernelId of the face this range belongs to.
    pub face_id: KernelId,
    /// Start index in the indices array (inclusive).
    pub start_index: u32,
    /// End index in the indices array (exclusive).
    pub end_index: u32,
}

// Custom Serialize/Deserialize for KernelId (needed for FaceRange serialization)
impl Serialize for KernelId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for KernelId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        u64::deserialize(deserializer).map(KernelId)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_tetra() -> RenderMesh {
        RenderMesh {
            vertices: vec![
                0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0,
            ],
            normals: vec![0.0; 12],
            indices: vec![0, 2, 1, 0, 1, 3, 0, 3, 2, 1, 2, 3],
            face_ranges: Vec::new(),
        }
    }

    #[test]
    fn tetra_volume_is_one_sixth() {
        let v = unit_tetra().signed_volume();
        assert!((v - 1.0 / 6.0).abs() < 1e-9, "got {v}");
    }

    #[test]
    fn append_rebases_indices() {
        let mut a = unit_tetra();
        let b = unit_tetra();
        a.append(&b);
        assert_eq!(a.triangle_count(), 8);
        assert_eq!(a.indices[12], 4);
        assert!((a.signed_volume() - 2.0 / 6.0).abs() < 1e-9);
    }

    #[test]
    fn out_of_range_indices_are_skipped() {
        let mut mesh = unit_tetra();
        mesh.indices.extend_from_slice(&[0, 1, 99]);
        mesh.indices.extend_from_slice(&[u32::MAX, 0, 1]);
        let v = mesh.signed_volume();
        assert!((v - 1.0 / 6.0).abs() < 1e-9, "got {v}");
    }

    #[test]
    fn solid_check_rejects_zero_volume() {
        let c = SolidCheck {
            closed: true,
            volume: 0.0,
        };
        assert!(!c.is_valid());
    }
}
