//! Higher-level primitive builders on top of truck's sweep API.
//!
//! truck has no built-in box or prism, everything is successive sweeps.

use crate::geometry::Aabb;
use crate::types::KernelError;
use truck_modeling::builder;
use truck_modeling::geometry::{Curve, Line, Surface};
use truck_modeling::topology::{Edge, Face, Solid, Wire};
use truck_modeling::{InnerSpace, Point3, Vector3};

/// Axis-aligned box spanning `bounds`, built by successive translational sweeps.
pub fn make_box(bounds: &Aabb) -> Solid {
    let v = builder::vertex(Point3::new(bounds.min[0], bounds.min[1], bounds.min[2]));
    let edge = builder::tsweep(&v, Vector3::new(bounds.extent(0), 0.0, 0.0));
    let face = builder::tsweep(&edge, Vector3::new(0.0, bounds.extent(1), 0.0));
    builder::tsweep(&face, Vector3::new(0.0, 0.0, bounds.extent(2)))
}

/// Planar face bounded by a closed polygon. Consecutive edges share
/// vertices so the wire is closed.
pub fn polygon_face(points: &[Point3]) -> Result<Face, KernelError> {
    if points.len() < 3 {
        return Err(KernelError::InvalidProfile {
            reason: format!("polygon has {} points, need at least 3", points.len()),
        });
    }
    let n = points.len();
    let vertices: Vec<_> = points.iter().map(|&p| builder::vertex(p)).collect();
    let wire: Wire = (0..n)
        .map(|i| {
            let j = (i + 1) % n;
            Edge::new(
                &vertices[i],
                &vertices[j],
                Curve::Line(Line(points[i], points[j])),
            )
        })
        .collect();
    builder::try_attach_plane(&[wire]).map_err(|e| KernelError::InvalidProfile {
        reason: format!("failed to create planar face: {}", e),
    })
}

/// Outward normal of a planar face, if it is planar.
pub fn face_normal(face: &Face) -> Option<Vector3> {
    match face.oriented_surface() {
        Surface::Plane(plane) => Some(plane.normal()),
        _ => None,
    }
}

/// Sweep a planar face into a prism. The face is flipped first when its
/// normal opposes the sweep so the result is outward-oriented.
pub fn sweep_face(face: &Face, sweep: Vector3) -> Result<Solid, KernelError> {
    if sweep.magnitude() < 1e-12 {
        return Err(KernelError::ExtrudeFailed {
            reason: "extrude direction has zero length".to_string(),
        });
    }
    let normal = face_normal(face).ok_or_else(|| KernelError::ExtrudeFailed {
        reason: "only planar faces can be extruded".to_string(),
    })?;
    let oriented = if normal.dot(sweep) < 0.0 {
        face.inverse()
    } else {
        face.clone()
    };
    Ok(builder::tsweep(&oriented, sweep))
}

/// Prism with a polygonal cross-section swept along `sweep`.
pub fn make_prism(points: &[Point3], sweep: Vector3) -> Result<Solid, KernelError> {
    let face = polygon_face(points)?;
    sweep_face(&face, sweep)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::collections::HashSet;

    #[test]
    fn test_make_box_topology() {
        let solid = make_box(&Aabb::new([0.0; 3], [1.0, 2.0, 3.0]));

        let boundaries = solid.boundaries();
        assert_eq!(boundaries.len(), 1, "Box should have 1 shell");

        let shell = &boundaries[0];
        let faces: Vec<_> = shell.face_iter().collect();
        let edge_ids: HashSet<_> = shell.edge_iter().map(|e| e.id()).collect();
        let vert_ids: HashSet<_> = shell.vertex_iter().map(|v| v.id()).collect();

        assert_eq!(faces.len(), 6, "Box should have 6 faces");
        assert_eq!(edge_ids.len(), 12, "Box should have 12 edges");
        assert_eq!(vert_ids.len(), 8, "Box should have 8 vertices");
    }

    #[test]
    fn test_make_box_respects_bounds() {
        let solid = make_box(&Aabb::new([-1.0, -2.0, 0.5], [1.0, 2.0, 4.5]));
        let points: Vec<[f64; 3]> = solid.boundaries()[0]
            .vertex_iter()
            .map(|v| {
                let p = v.point();
                [p[0], p[1], p[2]]
            })
            .collect();
        let bb = Aabb::from_points(points).unwrap();
        assert_relative_eq!(bb.min[0], -1.0);
        assert_relative_eq!(bb.max[1], 2.0);
        assert_relative_eq!(bb.min[2], 0.5);
        assert_relative_eq!(bb.extent(2), 4.0);
    }

    #[test]
    fn test_prism_from_triangle() {
        let pts = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let solid = make_prism(&pts, Vector3::new(0.0, 0.0, 2.0)).unwrap();
        let faces: Vec<_> = solid.boundaries()[0].face_iter().collect();
        assert_eq!(faces.len(), 5);
    }

    #[test]
    fn test_polygon_needs_three_points() {
        let pts = [Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0)];
        assert!(matches!(
            polygon_face(&pts),
            Err(KernelError::InvalidProfile { .. })
        ));
    }
}
