//! Axis-aligned helpers shared by both kernels.
//!
//! Box geometry is rectilinear by construction, so shell cavities and
//! cutter placement reduce to bounding-box arithmetic.

use crate::types::KernelError;

const AXIS_TOLERANCE: f64 = 1e-6;

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

impl Aabb {
    pub fn new(min: [f64; 3], max: [f64; 3]) -> Self {
        Self { min, max }
    }

    /// Smallest box containing every point. `None` for an empty iterator.
    pub fn from_points<I: IntoIterator<Item = [f64; 3]>>(points: I) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bb = Self::new(first, first);
        for p in iter {
            for i in 0..3 {
                bb.min[i] = bb.min[i].min(p[i]);
                bb.max[i] = bb.max[i].max(p[i]);
            }
        }
        Some(bb)
    }

    pub fn extent(&self, axis: usize) -> f64 {
        self.max[axis] - self.min[axis]
    }

    pub fn volume(&self) -> f64 {
        (0..3).map(|i| self.extent(i).max(0.0)).product()
    }

    pub fn center(&self) -> [f64; 3] {
        [
            (self.min[0] + self.max[0]) / 2.0,
            (self.min[1] + self.max[1]) / 2.0,
            (self.min[2] + self.max[2]) / 2.0,
        ]
    }

    /// Non-empty on every axis.
    pub fn is_solid(&self) -> bool {
        (0..3).all(|i| self.extent(i) > AXIS_TOLERANCE)
    }

    pub fn contains(&self, p: [f64; 3], eps: f64) -> bool {
        (0..3).all(|i| p[i] >= self.min[i] - eps && p[i] <= self.max[i] + eps)
    }

    pub fn intersection(&self, other: &Aabb) -> Aabb {
        let mut out = *self;
        for i in 0..3 {
            out.min[i] = self.min[i].max(other.min[i]);
            out.max[i] = self.max[i].min(other.max[i]);
        }
        out
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        let mut out = *self;
        for i in 0..3 {
            out.min[i] = self.min[i].min(other.min[i]);
            out.max[i] = self.max[i].max(other.max[i]);
        }
        out
    }
}

/// Which box side a unit normal points at: `(axis, positive)`.
/// `None` unless the normal is within tolerance of a coordinate axis.
pub fn axis_side(normal: [f64; 3]) -> Option<(usize, bool)> {
    let len = (normal[0] * normal[0] + normal[1] * normal[1] + normal[2] * normal[2]).sqrt();
    if len < 1e-12 {
        return None;
    }
    (0..3).find_map(|i| {
        let c = normal[i] / len;
        if (c.abs() - 1.0).abs() < AXIS_TOLERANCE {
            Some((i, c > 0.0))
        } else {
            None
        }
    })
}

/// Cavity left inside `outer` by a shell operation.
///
/// Each side is inset by `thickness`, or by the override for a face
/// pointing that way. Sides listed in `open` extend past the outer box by
/// `thickness` so the subtraction breaks through cleanly. Fails with
/// `ShellFailed` when the walls meet (the cavity would be empty).
pub fn shell_cavity(
    outer: &Aabb,
    open: &[[f64; 3]],
    thickness: f64,
    overrides: &[([f64; 3], f64)],
) -> Result<Aabb, KernelError> {
    if !(thickness > 0.0) || !thickness.is_finite() {
        return Err(KernelError::ShellFailed {
            reason: format!("thickness must be positive, got {thickness}"),
        });
    }
    let side_of = |n: [f64; 3]| {
        axis_side(n).ok_or_else(|| KernelError::NotSupported {
            operation: format!("shell with non axis-aligned face normal {n:?}"),
        })
    };

    let mut open_sides = Vec::with_capacity(open.len());
    for n in open {
        open_sides.push(side_of(*n)?);
    }
    let mut inset = [[thickness; 2]; 3];
    for (n, t) in overrides {
        if !(*t > 0.0) || !t.is_finite() {
            return Err(KernelError::ShellFailed {
                reason: format!("face thickness must be positive, got {t}"),
            });
        }
        let (axis, positive) = side_of(*n)?;
        inset[axis][positive as usize] = *t;
    }

    let mut cavity = *outer;
    for axis in 0..3 {
        let lo_open = open_sides.contains(&(axis, false));
        let hi_open = open_sides.contains(&(axis, true));
        cavity.min[axis] = if lo_open {
            outer.min[axis] - thickness
        } else {
            outer.min[axis] + inset[axis][0]
        };
        cavity.max[axis] = if hi_open {
            outer.max[axis] + thickness
        } else {
            outer.max[axis] - inset[axis][1]
        };
    }

    if !cavity.is_solid() {
        return Err(KernelError::ShellFailed {
            reason: format!(
                "walls of {:.3} x {:.3} x {:.3} solid meet at this thickness",
                outer.extent(0),
                outer.extent(1),
                outer.extent(2)
            ),
        });
    }
    Ok(cavity)
}
