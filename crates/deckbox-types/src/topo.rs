use serde::{Deserialize, Serialize};

/// The kind of topological entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TopoKind {
    Vertex,
    Edge,
    Face,
}

/// Geometric signature of a topological entity.
/// Queries are evaluated against signatures, never against kernel ids.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopoSignature {
    /// Surface or curve type (planar, cylindrical, line, ...).
    pub surface_type: Option<String>,
    /// Surface area (for faces).
    pub area: Option<f64>,
    /// Centroid position [x, y, z].
    pub centroid: Option<[f64; 3]>,
    /// Outward-pointing normal at centroid (for faces).
    pub normal: Option<[f64; 3]>,
    /// Unit tangent of a straight edge (for edges).
    pub direction: Option<[f64; 3]>,
    /// Axis-aligned bounding box [min_x, min_y, min_z, max_x, max_y, max_z].
    pub bbox: Option<[f64; 6]>,
    /// Edge length (for edges).
    pub length: Option<f64>,
}

impl TopoSignature {
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Geometric query for selecting faces or edges of a solid.
///
/// An entity matches when every filter accepts it. The optional tie-break
/// narrows a multi-entity match down to one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopoQuery {
    pub filters: Vec<Filter>,
    pub tie_break: Option<TieBreak>,
}

/// Filter predicate for TopoQuery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Filter {
    /// Entity's surface/curve type must match.
    SurfaceType { surface_type: String },
    /// Face normal must be within `tolerance` radians of `direction`.
    NormalDirection { direction: [f64; 3], tolerance: f64 },
    /// Centroid must be within `distance` of `point`.
    NearPoint { point: [f64; 3], distance: f64 },
    /// Face area must be in range [min, max].
    AreaRange { min: f64, max: f64 },
    /// Edge direction must be within `tolerance` radians of `direction`
    /// (either orientation).
    ParallelTo { direction: [f64; 3], tolerance: f64 },
    /// Centroid must lie inside the axis-aligned region.
    InRegion { min: [f64; 3], max: [f64; 3] },
}

/// Tie-breaking strategy when multiple entities match a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TieBreak {
    /// Pick the entity with the largest area.
    LargestArea,
    /// Pick the entity nearest to the given point.
    NearestTo { point: [f64; 3] },
    /// Pick the first match (deterministic for a deterministic kernel).
    SmallestIndex,
}

const ANGLE_TOLERANCE: f64 = 1e-3;

impl TopoQuery {
    pub fn new(filters: Vec<Filter>) -> Self {
        Self {
            filters,
            tie_break: None,
        }
    }

    pub fn with_tie_break(mut self, tie_break: TieBreak) -> Self {
        self.tie_break = Some(tie_break);
        self
    }

    /// Planar faces whose normal points along `direction`.
    pub fn faces_facing(direction: [f64; 3]) -> Self {
        Self::new(vec![Filter::NormalDirection {
            direction,
            tolerance: ANGLE_TOLERANCE,
        }])
    }

    /// The single edge parallel to `direction` whose centroid is nearest `point`.
    pub fn edge_near(point: [f64; 3], direction: [f64; 3], distance: f64) -> Self {
        Self::new(vec![
            Filter::ParallelTo {
                direction,
                tolerance: ANGLE_TOLERANCE,
            },
            Filter::NearPoint { point, distance },
        ])
        .with_tie_break(TieBreak::NearestTo { point })
    }

    /// Every edge whose centroid lies in the region.
    pub fn edges_in_region(min: [f64; 3], max: [f64; 3]) -> Self {
        Self::new(vec![Filter::InRegion { min, max }])
    }

    /// Whether a signature passes every filter.
    pub fn matches(&self, sig: &TopoSignature) -> bool {
        self.filters.iter().all(|f| f.matches(sig))
    }
}

impl Filter {
    pub fn matches(&self, sig: &TopoSignature) -> bool {
        match self {
            Filter::SurfaceType { surface_type } => {
                sig.surface_type.as_deref() == Some(surface_type.as_str())
            }
            Filter::NormalDirection {
                direction,
                tolerance,
            } => sig
                .normal
                .map(|n| angle_between(n, *direction) <= *tolerance)
                .unwrap_or(false),
            Filter::NearPoint { point, distance } => sig
                .centroid
                .map(|c| distance_between(c, *point) <= *distance)
                .unwrap_or(false),
            Filter::AreaRange { min, max } => {
                sig.area.map(|a| a >= *min && a <= *max).unwrap_or(false)
            }
            Filter::ParallelTo {
                direction,
                tolerance,
            } => sig
                .direction
                .map(|d| {
                    let angle = angle_between(d, *direction);
                    angle <= *tolerance || (std::f64::consts::PI - angle) <= *tolerance
                })
                .unwrap_or(false),
            Filter::InRegion { min, max } => sig
                .centroid
                .map(|c| (0..3).all(|i| c[i] >= min[i] && c[i] <= max[i]))
                .unwrap_or(false),
        }
    }
}

/// Angle in radians between two (not necessarily unit) vectors.
pub fn angle_between(a: [f64; 3], b: [f64; 3]) -> f64 {
    let la = (a[0] * a[0] + a[1] * a[1] + a[2] * a[2]).sqrt();
    let lb = (b[0] * b[0] + b[1] * b[1] + b[2] * b[2]).sqrt();
    if la < 1e-12 || lb < 1e-12 {
        return std::f64::consts::PI;
    }
    let cos = (a[0] * b[0] + a[1] * b[1] + a[2] * b[2]) / (la * lb);
    cos.clamp(-1.0, 1.0).acos()
}

pub fn distance_between(a: [f64; 3], b: [f64; 3]) -> f64 {
    ((a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2) + (a[2] - b[2]).powi(2)).sqrt()
}
