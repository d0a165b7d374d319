use serde::{Deserialize, Serialize};

/// The plane a profile is drawn on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SketchPlane {
    pub origin: [f64; 3],
    pub normal: [f64; 3],
    pub x_axis: [f64; 3],
}

impl SketchPlane {
    /// Horizontal plane at height `z`, normal +Z, local X along world X.
    pub fn xy_at(z: f64) -> Self {
        Self {
            origin: [0.0, 0.0, z],
            normal: [0.0, 0.0, 1.0],
            x_axis: [1.0, 0.0, 0.0],
        }
    }

    /// Local Y axis (normal × x_axis).
    pub fn y_axis(&self) -> [f64; 3] {
        let n = self.normal;
        let x = self.x_axis;
        [
            n[1] * x[2] - n[2] * x[1],
            n[2] * x[0] - n[0] * x[2],
            n[0] * x[1] - n[1] * x[0],
        ]
    }

    /// Map plane coordinates to world coordinates.
    pub fn to_world(&self, u: f64, v: f64) -> [f64; 3] {
        let y = self.y_axis();
        [
            self.origin[0] + self.x_axis[0] * u + y[0] * v,
            self.origin[1] + self.x_axis[1] * u + y[1] * v,
            self.origin[2] + self.x_axis[2] * u + y[2] * v,
        ]
    }
}

/// A closed polygonal profile on a sketch plane.
///
/// Points are in plane coordinates, counter-clockwise seen from the normal.
/// The closing edge from the last point back to the first is implicit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub plane: SketchPlane,
    pub points: Vec<(f64, f64)>,
}

impl Profile {
    /// Axis-aligned rectangle centered at `center`.
    pub fn rectangle(plane: SketchPlane, center: (f64, f64), width: f64, height: f64) -> Self {
        let (cx, cy) = center;
        let hw = width / 2.0;
        let hh = height / 2.0;
        Self {
            plane,
            points: vec![
                (cx - hw, cy - hh),
                (cx + hw, cy - hh),
                (cx + hw, cy + hh),
                (cx - hw, cy + hh),
            ],
        }
    }

    /// Signed area via the shoelace formula. Positive for CCW winding.
    pub fn signed_area(&self) -> f64 {
        let n = self.points.len();
        if n < 3 {
            return 0.0;
        }
        let mut acc = 0.0;
        for i in 0..n {
            let (x0, y0) = self.points[i];
            let (x1, y1) = self.points[(i + 1) % n];
            acc += x0 * y1 - x1 * y0;
        }
        acc / 2.0
    }

    pub fn area(&self) -> f64 {
        self.signed_area().abs()
    }

    /// A profile with fewer than 3 points or (near) zero area cannot bound a face.
    pub fn is_degenerate(&self) -> bool {
        self.points.len() < 3 || self.area() < 1e-9
    }

    /// Profile vertices in world coordinates.
    pub fn world_points(&self) -> Vec<[f64; 3]> {
        self.points
            .iter()
            .map(|&(u, v)| self.plane.to_world(u, v))
            .collect()
    }
}
