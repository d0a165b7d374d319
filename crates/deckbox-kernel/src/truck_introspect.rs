//! KernelIntrospect implementation wrapping truck topology queries.
//!
//! truck entities have no stable integer ids, so ids are positional:
//! `handle * STRIDE + base + index`, where index counts unique entities
//! in boundary iteration order. They are only meaningful for the solid
//! they were listed from.

use crate::traits::KernelIntrospect;
use crate::truck_kernel::TruckKernel;
use crate::types::*;
use std::collections::HashSet;

use truck_modeling::geometry::Surface;
use truck_modeling::topology::{Edge, Face, Solid, Vertex};
use truck_modeling::{BoundedCurve, ParametricCurve};

const STRIDE: u64 = 100_000;
const EDGE_BASE: u64 = 30_000;
const VERTEX_BASE: u64 = 60_000;

pub(crate) fn face_id(handle: &KernelSolidHandle, index: usize) -> KernelId {
    KernelId(handle.id() * STRIDE + index as u64)
}

fn edge_id(handle: &KernelSolidHandle, index: usize) -> KernelId {
    KernelId(handle.id() * STRIDE + EDGE_BASE + index as u64)
}

fn vertex_id(handle: &KernelSolidHandle, index: usize) -> KernelId {
    KernelId(handle.id() * STRIDE + VERTEX_BASE + index as u64)
}

/// Split an id into its solid handle and the positional index for `kind`.
fn decode(id: KernelId, kind: TopoKind) -> Option<(KernelSolidHandle, usize)> {
    let handle = KernelSolidHandle(id.0 / STRIDE);
    let local = id.0 % STRIDE;
    let index = match kind {
        TopoKind::Face if local < EDGE_BASE => local,
        TopoKind::Edge if (EDGE_BASE..VERTEX_BASE).contains(&local) => local - EDGE_BASE,
        TopoKind::Vertex if local >= VERTEX_BASE => local - VERTEX_BASE,
        _ => return None,
    };
    Some((handle, index as usize))
}

pub(crate) fn faces(solid: &Solid) -> Vec<&Face> {
    solid
        .boundaries()
        .iter()
        .flat_map(|shell| shell.face_iter())
        .collect()
}

pub(crate) fn unique_edges(solid: &Solid) -> Vec<Edge> {
    let mut seen = HashSet::new();
    solid
        .boundaries()
        .iter()
        .flat_map(|shell| shell.edge_iter())
        .filter(|e| seen.insert(e.id()))
        .collect()
}

fn unique_vertices(solid: &Solid) -> Vec<Vertex> {
    let mut seen = HashSet::new();
    solid
        .boundaries()
        .iter()
        .flat_map(|shell| shell.vertex_iter())
        .filter(|v| seen.insert(v.id()))
        .collect()
}

/// Direct KernelIntrospect implementation on TruckKernel, so it satisfies
/// the KernelBundle blanket impl (Kernel + KernelIntrospect).
impl KernelIntrospect for TruckKernel {
    fn list_faces(&self, solid: &KernelSolidHandle) -> Vec<KernelId> {
        self.get_solid(solid)
            .map(|s| (0..faces(s).len()).map(|i| face_id(solid, i)).collect())
            .unwrap_or_default()
    }

    fn list_edges(&self, solid: &KernelSolidHandle) -> Vec<KernelId> {
        self.get_solid(solid)
            .map(|s| (0..unique_edges(s).len()).map(|i| edge_id(solid, i)).collect())
            .unwrap_or_default()
    }

    fn list_vertices(&self, solid: &KernelSolidHandle) -> Vec<KernelId> {
        self.get_solid(solid)
            .map(|s| {
                (0..unique_vertices(s).len())
                    .map(|i| vertex_id(solid, i))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn edge_faces(&self, edge: KernelId) -> Vec<KernelId> {
        let Some((handle, index)) = decode(edge, TopoKind::Edge) else {
            return Vec::new();
        };
        let Some(solid) = self.get_solid(&handle) else {
            return Vec::new();
        };
        let Some(target) = unique_edges(solid).get(index).map(|e| e.id()) else {
            return Vec::new();
        };
        faces(solid)
            .iter()
            .enumerate()
            .filter(|(_, f)| {
                f.boundaries()
                    .iter()
                    .flat_map(|w| w.edge_iter())
                    .any(|e| e.id() == target)
            })
            .map(|(i, _)| face_id(&handle, i))
            .collect()
    }

    fn compute_signature(&self, entity: KernelId, kind: TopoKind) -> TopoSignature {
        let Some((handle, index)) = decode(entity, kind) else {
            return TopoSignature::empty();
        };
        let Some(solid) = self.get_solid(&handle) else {
            return TopoSignature::empty();
        };
        match kind {
            TopoKind::Face => faces(solid)
                .get(index)
                .map(|f| compute_face_signature(f))
                .unwrap_or_default(),
            TopoKind::Edge => unique_edges(solid)
                .get(index)
                .map(compute_edge_signature)
                .unwrap_or_default(),
            TopoKind::Vertex => unique_vertices(solid)
                .get(index)
                .map(compute_vertex_signature)
                .unwrap_or_default(),
        }
    }
}

fn compute_face_signature(face: &Face) -> TopoSignature {
    let surface = face.oriented_surface();
    let points: Vec<[f64; 3]> = face
        .boundaries()
        .iter()
        .flat_map(|w| w.vertex_iter())
        .map(|v| {
            let p = v.point();
            [p[0], p[1], p[2]]
        })
        .collect();
    let centroid = average(&points);

    match surface {
        Surface::Plane(plane) => {
            let n = plane.normal();
            let normal = [n[0], n[1], n[2]];
            // Outer loop area minus holes, projected on the normal.
            let area = face
                .boundaries()
                .iter()
                .map(|w| {
                    let loop_pts: Vec<[f64; 3]> = w
                        .vertex_iter()
                        .map(|v| {
                            let p = v.point();
                            [p[0], p[1], p[2]]
                        })
                        .collect();
                    dot(newell(&loop_pts), normal) / 2.0
                })
                .sum::<f64>()
                .abs();
            TopoSignature {
                surface_type: Some("planar".to_string()),
                area: Some(area),
                centroid: Some(centroid),
                normal: Some(normal),
                ..TopoSignature::empty()
            }
        }
        other => TopoSignature {
            surface_type: Some(classify_surface(&other).to_string()),
            centroid: Some(centroid),
            ..TopoSignature::empty()
        },
    }
}

fn compute_edge_signature(edge: &Edge) -> TopoSignature {
    let front = edge.front().point();
    let back = edge.back().point();
    let a = [front[0], front[1], front[2]];
    let b = [back[0], back[1], back[2]];
    let chord = [b[0] - a[0], b[1] - a[1], b[2] - a[2]];
    let length = dot(chord, chord).sqrt();
    let midpoint = [
        (a[0] + b[0]) / 2.0,
        (a[1] + b[1]) / 2.0,
        (a[2] + b[2]) / 2.0,
    ];

    // Booleans re-parametrize edges, so test distance to the chord line
    // rather than comparing parametric and chord midpoints.
    let curve = edge.oriented_curve();
    let (t0, t1) = curve.range_tuple();
    let mid = curve.subs((t0 + t1) / 2.0);
    let samples = [0.25, 0.5, 0.75].map(|f| {
        let p = curve.subs(t0 + (t1 - t0) * f);
        [p[0], p[1], p[2]]
    });
    let straight = is_straight(a, b, &samples);

    let bbox = [
        a[0].min(b[0]),
        a[1].min(b[1]),
        a[2].min(b[2]),
        a[0].max(b[0]),
        a[1].max(b[1]),
        a[2].max(b[2]),
    ];
    TopoSignature {
        surface_type: Some(if straight { "line" } else { "curve" }.to_string()),
        centroid: Some(if straight { midpoint } else { [mid[0], mid[1], mid[2]] }),
        direction: straight.then(|| [chord[0] / length, chord[1] / length, chord[2] / length]),
        bbox: Some(bbox),
        length: Some(length),
        ..TopoSignature::empty()
    }
}

/// Largest distance of a sample from the chord line a-b before an edge
/// counts as curved, in model units.
const STRAIGHT_TOLERANCE: f64 = 1e-4;

/// Whether every sample lies on the segment from `a` to `b`.
fn is_straight(a: [f64; 3], b: [f64; 3], samples: &[[f64; 3]]) -> bool {
    let chord = [b[0] - a[0], b[1] - a[1], b[2] - a[2]];
    let length = dot(chord, chord).sqrt();
    if length < 1e-12 {
        return false;
    }
    let unit = [chord[0] / length, chord[1] / length, chord[2] / length];
    samples.iter().all(|p| {
        let rel = [p[0] - a[0], p[1] - a[1], p[2] - a[2]];
        let along = dot(rel, unit);
        let off = [
            rel[0] - unit[0] * along,
            rel[1] - unit[1] * along,
            rel[2] - unit[2] * along,
        ];
        along >= -STRAIGHT_TOLERANCE
            && along <= length + STRAIGHT_TOLERANCE
            && dot(off, off).sqrt() <= STRAIGHT_TOLERANCE
    })
}

fn compute_vertex_signature(vertex: &Vertex) -> TopoSignature {
    let p = vertex.point();
    TopoSignature {
        surface_type: Some("point".to_string()),
        centroid: Some([p[0], p[1], p[2]]),
        ..TopoSignature::empty()
    }
}

fn classify_surface(surface: &Surface) -> &'static str {
    match surface {
        Surface::Plane(_) => "planar",
        Surface::RevolutedCurve(_) => "revolved",
        Surface::BSplineSurface(_) | Surface::NurbsSurface(_) => "nurbs",
    }
}

fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn newell(pts: &[[f64; 3]]) -> [f64; 3] {
    let n = pts.len();
    let mut acc = [0.0; 3];
    for i in 0..n {
        let (p, q) = (pts[i], pts[(i + 1) % n]);
        acc[0] += p[1] * q[2] - p[2] * q[1];
        acc[1] += p[2] * q[0] - p[0] * q[2];
        acc[2] += p[0] * q[1] - p[1] * q[0];
    }
    acc
}

fn average(pts: &[[f64; 3]]) -> [f64; 3] {
    if pts.is_empty() {
        return [0.0; 3];
    }
    let n = pts.len() as f64;
    let mut acc = [0.0; 3];
    for p in pts {
        for i in 0..3 {
            acc[i] += p[i];
        }
    }
    [acc[0] / n, acc[1] / n, acc[2] / n]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Aabb;
    use crate::primitives;
    use approx::assert_relative_eq;
    use deckbox_types::TopoQuery;

    fn box_kernel() -> (TruckKernel, KernelSolidHandle) {
        let mut kernel = TruckKernel::new();
        let solid = primitives::make_box(&Aabb::new([-1.0, -1.5, 0.0], [1.0, 1.5, 4.0]));
        let handle = kernel.store_solid(solid);
        (kernel, handle)
    }

    #[test]
    fn test_introspect_box_counts() {
        let (kernel, handle) = box_kernel();
        assert_eq!(kernel.list_faces(&handle).len(), 6);
        assert_eq!(kernel.list_edges(&handle).len(), 12);
        assert_eq!(kernel.list_vertices(&handle).len(), 8);
    }

    #[test]
    fn test_face_signatures_are_planar_with_area() {
        let (kernel, handle) = box_kernel();
        let sigs = kernel.compute_all_signatures(&handle, TopoKind::Face);
        let total: f64 = sigs.iter().map(|(_, s)| s.area.unwrap()).sum();
        // 2 * (2*3 + 2*4 + 3*4)
        assert_relative_eq!(total, 52.0, epsilon = 1e-9);
        for (_, sig) in &sigs {
            assert_eq!(sig.surface_type.as_deref(), Some("planar"));
        }
    }

    #[test]
    fn test_normals_point_outward() {
        let (kernel, handle) = box_kernel();
        for (_, sig) in kernel.compute_all_signatures(&handle, TopoKind::Face) {
            let n = sig.normal.unwrap();
            let c = sig.centroid.unwrap();
            let rel = [c[0], c[1], c[2] - 2.0];
            assert!(dot(n, rel) > 0.0, "normal {n:?} at {c:?}");
        }
    }

    #[test]
    fn test_top_face_query() {
        let (kernel, handle) = box_kernel();
        let q = TopoQuery::faces_facing([0.0, 0.0, 1.0]);
        let hits: Vec<_> = kernel
            .compute_all_signatures(&handle, TopoKind::Face)
            .into_iter()
            .filter(|(_, s)| q.matches(s))
            .collect();
        assert_eq!(hits.len(), 1);
        assert_relative_eq!(hits[0].1.centroid.unwrap()[2], 4.0);
    }

    #[test]
    fn test_edges_are_straight_with_two_faces() {
        let (kernel, handle) = box_kernel();
        for edge in kernel.list_edges(&handle) {
            let sig = kernel.compute_signature(edge, TopoKind::Edge);
            assert_eq!(sig.surface_type.as_deref(), Some("line"));
            assert!(sig.direction.is_some());
            assert_eq!(kernel.edge_faces(edge).len(), 2);
        }
    }

    #[test]
    fn test_ids_do_not_cross_kinds() {
        let (kernel, handle) = box_kernel();
        let face = kernel.list_faces(&handle)[0];
        assert_eq!(
            kernel.compute_signature(face, TopoKind::Edge),
            TopoSignature::empty()
        );
    }
}
