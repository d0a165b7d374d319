//! TruckKernel: the truck-backed geometry kernel.
//!
//! truck has no native shell, fillet or chamfer. They are expressed as
//! booleans against generated tool bodies: shell subtracts the cavity box,
//! fillet and chamfer subtract a prism swept along each edge whose
//! cross-section is the material outside the rounded (faceted) or
//! bevelled corner.

use crate::geometry::{shell_cavity, Aabb};
use crate::primitives;
use crate::tessellation;
use crate::traits::{Kernel, KernelIntrospect};
use crate::truck_introspect::faces;
use crate::types::*;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use tracing::{debug, warn};

// Import truck types selectively to avoid shadowing std::result::Result
use truck_modeling::topology::{Face, Solid};
use truck_modeling::{InnerSpace, Point3, Vector3};
use truck_stepio::out::{CompleteStepDisplay, StepHeaderDescriptor, StepModel};
use truck_topology::shell::ShellCondition;

/// Tolerance handed to truck-shapeops.
const BOOLEAN_TOLERANCE: f64 = 0.05;
/// How far an edge tool's cross-section reaches past the two faces it
/// cuts. Several times the boolean tolerance so no tool face or vertex
/// lands on a face of the solid.
const TOOL_CLEARANCE: f64 = 0.5;
/// How far an edge tool runs past each end of its edge.
const TOOL_END_OVERSHOOT: f64 = 0.2;
/// Facets per quarter-circle fillet.
const FILLET_SEGMENTS: usize = 8;
/// Tessellation tolerance for volume checks.
const CHECK_TOLERANCE: f64 = 0.05;

/// Real geometry kernel backed by the truck BREP library.
pub struct TruckKernel {
    next_handle: u64,
    next_id: u64,
    solids: HashMap<u64, Solid>,
    /// Standalone faces created by make_face_from_profile, awaiting extrude.
    standalone_faces: HashMap<u64, Face>,
}

impl TruckKernel {
    pub fn new() -> Self {
        Self {
            next_handle: 1,
            next_id: 1,
            solids: HashMap::new(),
            standalone_faces: HashMap::new(),
        }
    }

    fn alloc_handle(&mut self) -> KernelSolidHandle {
        let h = KernelSolidHandle(self.next_handle);
        self.next_handle += 1;
        h
    }

    fn alloc_id(&mut self) -> KernelId {
        let id = KernelId(self.next_id);
        self.next_id += 1;
        id
    }

    pub(crate) fn store_solid(&mut self, solid: Solid) -> KernelSolidHandle {
        let handle = self.alloc_handle();
        self.solids.insert(handle.id(), solid);
        handle
    }

    pub(crate) fn get_solid(&self, handle: &KernelSolidHandle) -> Option<&Solid> {
        self.solids.get(&handle.id())
    }

    fn solid(&self, handle: &KernelSolidHandle) -> Result<&Solid, KernelError> {
        self.get_solid(handle).ok_or(KernelError::EntityNotFound {
            id: KernelId(handle.id()),
        })
    }

    fn bounds(solid: &Solid) -> Option<Aabb> {
        Aabb::from_points(solid.boundaries().iter().flat_map(|s| s.vertex_iter()).map(|v| {
            let p = v.point();
            [p[0], p[1], p[2]]
        }))
    }

    fn face_normal(&self, face: KernelId) -> Result<[f64; 3], KernelError> {
        self.compute_signature(face, TopoKind::Face)
            .normal
            .ok_or(KernelError::EntityNotFound { id: face })
    }

    /// Tool prism swept along one edge. `profile` is given in the plane
    /// spanned by the two adjacent face normals, material at negative
    /// coordinates on both axes.
    fn edge_tool(
        &self,
        edge: KernelId,
        profile: &[(f64, f64)],
    ) -> Result<Solid, String> {
        let sig = self.compute_signature(edge, TopoKind::Edge);
        let (Some(dir), Some(mid), Some(len)) = (sig.direction, sig.centroid, sig.length) else {
            return Err(format!("edge {:?} is not a straight edge of the solid", edge));
        };
        let adjacent = self.edge_faces(edge);
        let [fa, fb] = adjacent.as_slice() else {
            return Err(format!(
                "edge {:?} borders {} faces, need 2",
                edge,
                adjacent.len()
            ));
        };
        let na = self.face_normal(*fa).map_err(|e| e.to_string())?;
        let nb = self.face_normal(*fb).map_err(|e| e.to_string())?;
        let (na, nb) = (to_vec(na), to_vec(nb));
        if na.dot(nb).abs() > 1e-6 {
            return Err(format!("faces at edge {:?} are not perpendicular", edge));
        }

        let e = to_vec(dir);
        let start = Point3::new(mid[0], mid[1], mid[2]) - e * (len / 2.0 + TOOL_END_OVERSHOOT);
        let points: Vec<Point3> = profile
            .iter()
            .map(|&(a, b)| start + na * a + nb * b)
            .collect();
        primitives::make_prism(&points, e * (len + 2.0 * TOOL_END_OVERSHOOT))
            .map_err(|e| e.to_string())
    }

    /// Subtract one tool per edge. Tools are built from the input solid
    /// before any cut, since positional ids change after each boolean.
    fn cut_edges(
        &mut self,
        solid: &KernelSolidHandle,
        edges: &[KernelId],
        profile: &[(f64, f64)],
    ) -> Result<KernelSolidHandle, String> {
        if edges.is_empty() {
            return Err("no edges selected".to_string());
        }
        let mut current = self.solid(solid).map_err(|e| e.to_string())?.clone();
        let tools = edges
            .iter()
            .map(|edge| self.edge_tool(*edge, profile))
            .collect::<Result<Vec<_>, _>>()?;
        for (i, tool) in tools.iter().enumerate() {
            current = subtract(&current, tool)
                .map_err(|reason| format!("cut for edge {}: {}", i, reason))?;
        }
        Ok(self.store_solid(current))
    }
}

/// Run a truck-shapeops call, turning a `None` result or a panic inside
/// truck into an error message.
fn guarded<F>(op: &str, f: F) -> Result<Solid, String>
where
    F: FnOnce() -> Option<Solid>,
{
    match std::panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Some(solid)) => Ok(solid),
        Ok(None) => Err(format!("truck {op} returned None")),
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            warn!(op, %message, "truck panicked");
            Err(format!("truck {op} panicked: {message}"))
        }
    }
}

/// `target` minus `tool`, as `target ∩ ¬tool`.
fn subtract(target: &Solid, tool: &Solid) -> Result<Solid, String> {
    let mut inverted = tool.clone();
    inverted.not();
    guarded("and", || {
        truck_shapeops::and(target, &inverted, BOOLEAN_TOLERANCE)
    })
}

impl Default for TruckKernel {
    fn default() -> Self {
        Self::new()
    }
}

/// Faceted quarter-round: corner square minus the arc. Arc end points are
/// left out so every tool vertex sits off the solid's faces.
fn fillet_profile(radius: f64) -> Vec<(f64, f64)> {
    let o = TOOL_CLEARANCE;
    let mut pts = vec![(o, o), (-radius, o)];
    for i in 1..FILLET_SEGMENTS {
        let theta = std::f64::consts::FRAC_PI_2 * (1.0 - i as f64 / FILLET_SEGMENTS as f64);
        pts.push((-radius + radius * theta.cos(), -radius + radius * theta.sin()));
    }
    pts.push((o, -radius));
    pts
}

/// 45 degree bevel: the corner triangle beyond the line a + b = -distance.
fn chamfer_profile(distance: f64) -> Vec<(f64, f64)> {
    let o = TOOL_CLEARANCE;
    vec![(o, o), (-distance - o, o), (o, -distance - o)]
}

fn to_vec(v: [f64; 3]) -> Vector3 {
    Vector3::new(v[0], v[1], v[2])
}

impl Kernel for TruckKernel {
    fn make_face_from_profile(&mut self, profile: &Profile) -> Result<KernelId, KernelError> {
        if profile.is_degenerate() {
            return Err(KernelError::InvalidProfile {
                reason: "profile has fewer than 3 points or zero area".to_string(),
            });
        }
        let points: Vec<Point3> = profile
            .world_points()
            .into_iter()
            .map(|p| Point3::new(p[0], p[1], p[2]))
            .collect();
        let face = primitives::polygon_face(&points)?;
        let face_id = self.alloc_id();
        self.standalone_faces.insert(face_id.0, face);
        Ok(face_id)
    }

    fn extrude_face(
        &mut self,
        face: KernelId,
        direction: [f64; 3],
        depth: f64,
    ) -> Result<KernelSolidHandle, KernelError> {
        let truck_face = self
            .standalone_faces
            .remove(&face.0)
            .ok_or(KernelError::EntityNotFound { id: face })?;
        if !(depth > 0.0) || !depth.is_finite() {
            return Err(KernelError::ExtrudeFailed {
                reason: format!("depth must be positive, got {depth}"),
            });
        }
        let dir = to_vec(direction);
        if dir.magnitude() < 1e-12 {
            return Err(KernelError::ExtrudeFailed {
                reason: "extrude direction has zero length".to_string(),
            });
        }
        let solid = primitives::sweep_face(&truck_face, dir.normalize() * depth)?;
        Ok(self.store_solid(solid))
    }

    fn shell(
        &mut self,
        solid: &KernelSolidHandle,
        faces_to_remove: &[KernelId],
        thickness: f64,
        face_thickness: &[(KernelId, f64)],
    ) -> Result<KernelSolidHandle, KernelError> {
        let source = self.solid(solid)?.clone();
        let open = faces_to_remove
            .iter()
            .map(|f| self.face_normal(*f))
            .collect::<Result<Vec<_>, _>>()?;
        let overrides = face_thickness
            .iter()
            .map(|(f, t)| self.face_normal(*f).map(|n| (n, *t)))
            .collect::<Result<Vec<_>, _>>()?;
        let outer = Self::bounds(&source).ok_or_else(|| KernelError::ShellFailed {
            reason: "solid has no vertices".to_string(),
        })?;
        let cavity = shell_cavity(&outer, &open, thickness, &overrides)?;
        debug!(?cavity, "shell cavity");

        let tool = primitives::make_box(&cavity);
        let result = subtract(&source, &tool).map_err(|reason| KernelError::ShellFailed {
            reason: format!("cavity subtraction: {reason}"),
        })?;
        Ok(self.store_solid(result))
    }

    fn boolean_union(
        &mut self,
        a: &KernelSolidHandle,
        b: &KernelSolidHandle,
    ) -> Result<KernelSolidHandle, KernelError> {
        let solid_a = self.solid(a)?.clone();
        let solid_b = self.solid(b)?.clone();

        let result = guarded("or", || {
            truck_shapeops::or(&solid_a, &solid_b, BOOLEAN_TOLERANCE)
        })
        .map_err(|reason| KernelError::BooleanFailed { reason })?;
        Ok(self.store_solid(result))
    }

    fn boolean_subtract(
        &mut self,
        a: &KernelSolidHandle,
        b: &KernelSolidHandle,
    ) -> Result<KernelSolidHandle, KernelError> {
        let result = subtract(self.solid(a)?, self.solid(b)?)
            .map_err(|reason| KernelError::BooleanFailed { reason })?;
        Ok(self.store_solid(result))
    }

    fn fillet_edges(
        &mut self,
        solid: &KernelSolidHandle,
        edges: &[KernelId],
        radius: f64,
    ) -> Result<KernelSolidHandle, KernelError> {
        if !(radius > 0.0) || !radius.is_finite() {
            return Err(KernelError::FilletFailed {
                reason: "radius must be positive".to_string(),
            });
        }
        self.cut_edges(solid, edges, &fillet_profile(radius))
            .map_err(|reason| KernelError::FilletFailed { reason })
    }

    fn chamfer_edges(
        &mut self,
        solid: &KernelSolidHandle,
        edges: &[KernelId],
        distance: f64,
    ) -> Result<KernelSolidHandle, KernelError> {
        if !(distance > 0.0) || !distance.is_finite() {
            return Err(KernelError::ChamferFailed {
                reason: "chamfer distance must be positive".to_string(),
            });
        }
        self.cut_edges(solid, edges, &chamfer_profile(distance))
            .map_err(|reason| KernelError::ChamferFailed { reason })
    }

    fn tessellate(
        &mut self,
        solid: &KernelSolidHandle,
        tolerance: f64,
    ) -> Result<RenderMesh, KernelError> {
        let truck_solid = self.solid(solid)?;
        tessellation::tessellate_solid(truck_solid, solid, tolerance)
    }

    fn check_solid(&mut self, solid: &KernelSolidHandle) -> Result<SolidCheck, KernelError> {
        let truck_solid = self.solid(solid)?;
        let closed = !faces(truck_solid).is_empty()
            && truck_solid
                .boundaries()
                .iter()
                .all(|shell| shell.shell_condition() == ShellCondition::Closed);
        let volume = tessellation::tessellate_solid(truck_solid, solid, CHECK_TOLERANCE)
            .map(|mesh| mesh.signed_volume())
            .unwrap_or(0.0);
        Ok(SolidCheck { closed, volume })
    }

    fn export_step(
        &mut self,
        solids: &[KernelSolidHandle],
        name: &str,
    ) -> Result<String, KernelError> {
        if solids.is_empty() {
            return Err(KernelError::StepFailed {
                reason: "no solids to export".to_string(),
            });
        }
        let mut shells = Vec::new();
        for handle in solids {
            shells.extend(self.solid(handle)?.boundaries().iter().cloned());
        }
        let combined = Solid::try_new(shells).map_err(|e| KernelError::StepFailed {
            reason: format!("cannot assemble solids: {}", e),
        })?;
        let compressed = combined.compress();
        let header = StepHeaderDescriptor {
            file_name: format!("{name}.step"),
            // Fixed so identical geometry yields identical bytes.
            time_stamp: "1970-01-01T00:00:00".to_string(),
            organization_system: "deckbox-kernel".to_string(),
            ..Default::default()
        };
        Ok(CompleteStepDisplay::new(StepModel::from(&compressed), header).to_string())
    }
}
