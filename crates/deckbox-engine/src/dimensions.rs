//! Derived box dimensions.
//!
//! Frame: the tray is centred on X/Y at the origin with its floor at z = 0.
//! X runs along the card width, Y is the stacking axis with the finger-notch
//! wall at +Y, Z is up.

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::errors::BuildError;
use crate::params::BoxParams;

/// An axis-aligned size: X width, Y depth, Z height.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub width: f64,
    pub depth: f64,
    pub height: f64,
}

impl Extent {
    pub fn new(width: f64, depth: f64, height: f64) -> Self {
        Self {
            width,
            depth,
            height,
        }
    }
}

/// Finger notch cut through the +Y wall, centred on X.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FingerNotch {
    pub width: f64,
    pub depth: f64,
}

/// One card compartment, numbered 1.. from the back (-Y) to the opening.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Compartment {
    pub index: usize,
    pub cards: u32,
    pub length: f64,
}

/// Divider slot `index` (1-based), centred at `center_y`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DividerSlot {
    pub index: usize,
    pub center_y: f64,
}

/// Every dimension the planner needs, computed once and validated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedDimensions {
    pub card_pitch: f64,
    pub cavity: Extent,
    pub tray_outer: Extent,
    pub wall_thickness: f64,
    pub floor_thickness: f64,
    pub lid_thickness: f64,
    /// Inside of the lid: tray footprint plus play, skirt depth tall.
    pub lid_inner: Extent,
    pub lid_outer: Extent,
    /// Z of the lid's open bottom edge when seated on the tray.
    pub lid_bottom_z: f64,
    /// Zero when corners stay sharp.
    pub corner_radius: f64,
    pub lid_corner_radius: f64,
    /// Zero when the rim is left square.
    pub rim_chamfer: f64,
    pub notch: Option<FingerNotch>,
    pub compartments: Vec<Compartment>,
    pub slots: Vec<DividerSlot>,
    /// How far each slot reaches into the side walls.
    pub slot_groove: f64,
    pub divider: Option<Extent>,
}

/// Split `card_count` cards across `divider_count + 1` compartments. Every
/// compartment gets the integer share; the remainder goes to the last
/// compartment, nearest the opening. `None` when some compartment would be
/// left without a card.
pub fn partition_cards(card_count: u32, divider_count: u32) -> Option<Vec<u32>> {
    if divider_count >= card_count {
        return None;
    }
    let parts = divider_count + 1;
    let share = card_count / parts;
    let mut cards = vec![share; parts as usize];
    if let Some(last) = cards.last_mut() {
        *last += card_count % parts;
    }
    Some(cards)
}

/// Derive every secondary dimension from resolved parameters. Any
/// non-positive or non-finite result fails before planning starts.
#[instrument(skip(params), fields(slug = %params.slug, version = %params.version))]
pub fn derive(params: &BoxParams) -> Result<DerivedDimensions, BuildError> {
    let wall = params.wall_thickness;
    let floor = params.floor_thickness;
    let card_pitch = params.card_pitch();
    let dividers = params.divider_count;

    let cavity = Extent::new(
        params.card_width + 2.0 * params.side_clearance,
        f64::from(params.card_count) * card_pitch
            + params.stack_clearance
            + f64::from(dividers) * wall,
        params.card_height + params.top_clearance,
    );
    let tray_outer = Extent::new(
        cavity.width + 2.0 * wall,
        cavity.depth + 2.0 * wall,
        cavity.height + floor,
    );

    let lid_thickness = wall - params.lid_clearance;
    let lid_inner = Extent::new(
        tray_outer.width + 2.0 * params.lid_clearance,
        tray_outer.depth + 2.0 * params.lid_clearance,
        params.lid_skirt_depth,
    );
    let lid_outer = Extent::new(
        lid_inner.width + 2.0 * lid_thickness,
        lid_inner.depth + 2.0 * lid_thickness,
        params.lid_skirt_depth + lid_thickness,
    );
    let lid_bottom_z = tray_outer.height - params.lid_skirt_depth;

    let corner_radius = params.corner_radius;
    let lid_corner_radius = if corner_radius > 0.0 {
        corner_radius + wall
    } else {
        0.0
    };
    let rim_chamfer = if params.style.has_rim_chamfer() {
        params.top_chamfer
    } else {
        0.0
    };

    let notch = params.style.has_finger_notch().then(|| {
        let bound = tray_outer.height / 2.0;
        let depth = params.finger_notch_depth.min(bound);
        if depth < params.finger_notch_depth {
            debug!(
                requested = params.finger_notch_depth,
                depth, "finger notch depth bounded to half the tray height"
            );
        }
        FingerNotch {
            width: params.finger_notch_width,
            depth,
        }
    });

    let shares = partition_cards(params.card_count, dividers).ok_or_else(|| {
        BuildError::DegenerateGeometry {
            slug: params.slug.clone(),
            dimension: "divider_count".to_string(),
            value: f64::from(dividers),
        }
    })?;
    let parts = f64::from(dividers) + 1.0;
    let compartments: Vec<Compartment> = shares
        .into_iter()
        .enumerate()
        .map(|(i, cards)| Compartment {
            index: i + 1,
            cards,
            length: f64::from(cards) * card_pitch + params.stack_clearance / parts,
        })
        .collect();

    let mut slots = Vec::with_capacity(dividers as usize);
    let mut y = -cavity.depth / 2.0;
    for (k, compartment) in compartments.iter().take(dividers as usize).enumerate() {
        y += compartment.length;
        slots.push(DividerSlot {
            index: k + 1,
            center_y: y + wall / 2.0,
        });
        y += wall;
    }
    let slot_groove = wall / 2.0;
    let divider = (dividers > 0).then(|| {
        Extent::new(
            cavity.width + 2.0 * slot_groove,
            wall,
            cavity.height - params.top_clearance,
        )
    });

    let dims = DerivedDimensions {
        card_pitch,
        cavity,
        tray_outer,
        wall_thickness: wall,
        floor_thickness: floor,
        lid_thickness,
        lid_inner,
        lid_outer,
        lid_bottom_z,
        corner_radius,
        lid_corner_radius,
        rim_chamfer,
        notch,
        compartments,
        slots,
        slot_groove,
        divider,
    };
    check_positive(&params.slug, &dims)?;

    debug!(
        cavity = ?dims.cavity,
        tray = ?dims.tray_outer,
        lid = ?dims.lid_outer,
        compartments = dims.compartments.len(),
        "dimensions derived"
    );
    Ok(dims)
}

/// Single validation pass over every produced dimension.
fn check_positive(slug: &str, dims: &DerivedDimensions) -> Result<(), BuildError> {
    let wall = dims.wall_thickness;
    let mut checks: Vec<(String, f64)> = vec![
        ("wall_thickness".into(), wall),
        ("floor_thickness".into(), dims.floor_thickness),
        ("card_pitch".into(), dims.card_pitch),
        ("cavity_width".into(), dims.cavity.width),
        ("cavity_depth".into(), dims.cavity.depth),
        ("cavity_height".into(), dims.cavity.height),
        ("tray_width".into(), dims.tray_outer.width),
        ("tray_depth".into(), dims.tray_outer.depth),
        ("tray_height".into(), dims.tray_outer.height),
        ("tray_inner_width".into(), dims.tray_outer.width - 2.0 * wall),
        ("tray_inner_depth".into(), dims.tray_outer.depth - 2.0 * wall),
        ("tray_inner_height".into(), dims.tray_outer.height - dims.floor_thickness),
        ("lid_thickness".into(), dims.lid_thickness),
        ("lid_inner_width".into(), dims.lid_inner.width),
        ("lid_inner_depth".into(), dims.lid_inner.depth),
        ("lid_skirt_depth".into(), dims.lid_inner.height),
        ("lid_width".into(), dims.lid_outer.width),
        ("lid_depth".into(), dims.lid_outer.depth),
        ("lid_height".into(), dims.lid_outer.height),
        ("tray_height_below_lid".into(), dims.lid_bottom_z),
    ];
    if dims.lid_corner_radius > 0.0 {
        let sqrt2 = std::f64::consts::SQRT_2;
        checks.push((
            "lid_corner_wall".into(),
            dims.lid_thickness * sqrt2 - dims.lid_corner_radius * (sqrt2 - 1.0),
        ));
    }
    if let Some(notch) = &dims.notch {
        checks.push(("finger_notch_width".into(), notch.width));
        checks.push(("finger_notch_depth".into(), notch.depth));
        checks.push((
            "finger_notch_side_margin".into(),
            (dims.cavity.width - notch.width) / 2.0,
        ));
    }
    for c in &dims.compartments {
        checks.push((format!("compartment_{}_cards", c.index), f64::from(c.cards)));
        checks.push((format!("compartment_{}_length", c.index), c.length));
    }
    if let Some(divider) = &dims.divider {
        checks.push(("divider_width".into(), divider.width));
        checks.push(("divider_thickness".into(), divider.depth));
        checks.push(("divider_height".into(), divider.height));
    }

    for (dimension, value) in checks {
        if !(value > 0.0) || !value.is_finite() {
            return Err(BuildError::DegenerateGeometry {
                slug: slug.to_string(),
                dimension,
                value,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::BoxStyle;
    use approx::assert_relative_eq;

    fn params() -> BoxParams {
        BoxParams {
            slug: "t".to_string(),
            label: "T".to_string(),
            ..BoxParams::base()
        }
    }

    #[test]
    fn base_dimensions() {
        let d = derive(&params()).unwrap();
        assert_relative_eq!(d.card_pitch, 0.76, epsilon = 1e-12);
        assert_relative_eq!(d.cavity.width, 69.0, epsilon = 1e-9);
        assert_relative_eq!(d.cavity.depth, 78.0, epsilon = 1e-9);
        assert_relative_eq!(d.cavity.height, 95.0, epsilon = 1e-9);
        assert_relative_eq!(d.tray_outer.width, 77.0, epsilon = 1e-9);
        assert_relative_eq!(d.tray_outer.depth, 86.0, epsilon = 1e-9);
        assert_relative_eq!(d.tray_outer.height, 99.0, epsilon = 1e-9);
        assert_relative_eq!(d.lid_thickness, 3.8, epsilon = 1e-12);
        assert_relative_eq!(d.lid_outer.width, 77.4 + 7.6, epsilon = 1e-9);
        assert_relative_eq!(d.lid_outer.height, 23.8, epsilon = 1e-9);
        assert_relative_eq!(d.lid_bottom_z, 79.0, epsilon = 1e-9);
        assert_relative_eq!(d.lid_corner_radius, 6.0, epsilon = 1e-12);
        assert_eq!(d.notch.map(|n| n.depth), Some(12.0));
        assert_eq!(d.compartments.len(), 1);
        assert!(d.slots.is_empty());
        assert!(d.divider.is_none());
    }

    #[test]
    fn notch_depth_is_bounded_by_half_height() {
        let mut p = params();
        p.finger_notch_depth = 500.0;
        let d = derive(&p).unwrap();
        assert_relative_eq!(d.notch.unwrap().depth, d.tray_outer.height / 2.0);
    }

    #[test]
    fn minimalist_has_no_notch_or_chamfer() {
        let mut p = params();
        p.style = BoxStyle::Minimalist;
        let d = derive(&p).unwrap();
        assert!(d.notch.is_none());
        assert_eq!(d.rim_chamfer, 0.0);
        assert!(d.corner_radius > 0.0);
    }

    #[test]
    fn partition_puts_remainder_at_opening() {
        assert_eq!(partition_cards(75, 1), Some(vec![37, 38]));
        assert_eq!(partition_cards(10, 2), Some(vec![3, 3, 4]));
        assert_eq!(partition_cards(9, 2), Some(vec![3, 3, 3]));
        assert_eq!(partition_cards(5, 0), Some(vec![5]));
    }

    #[test]
    fn slots_sit_between_compartments() {
        let mut p = params();
        p.style = BoxStyle::Compartmented;
        p.card_count = 10;
        p.divider_count = 2;
        let d = derive(&p).unwrap();
        assert_eq!(d.slots.len(), 2);

        let pitch = d.card_pitch;
        let clear = p.stack_clearance / 3.0;
        let back = -d.cavity.depth / 2.0;
        assert_relative_eq!(d.slots[0].center_y, back + 3.0 * pitch + clear + 2.0, epsilon = 1e-9);
        assert_relative_eq!(
            d.slots[1].center_y,
            back + 6.0 * pitch + 2.0 * clear + 4.0 + 2.0,
            epsilon = 1e-9
        );
        // Last compartment ends exactly at the front wall.
        let front = d.slots[1].center_y + 2.0 + d.compartments[2].length;
        assert_relative_eq!(front, d.cavity.depth / 2.0, epsilon = 1e-9);

        let divider = d.divider.unwrap();
        assert_relative_eq!(divider.width, d.cavity.width + 4.0, epsilon = 1e-9);
        assert_relative_eq!(divider.height, p.card_height, epsilon = 1e-9);
    }

    #[test]
    fn partition_refuses_empty_compartments() {
        assert_eq!(partition_cards(3, 3), None);
        assert_eq!(partition_cards(100, u32::MAX), None);
        assert_eq!(partition_cards(0, 0), None);
    }

    #[test]
    fn divider_count_past_card_count_is_degenerate() {
        let mut p = params();
        p.style = BoxStyle::Compartmented;
        p.divider_count = u32::MAX;
        match derive(&p).unwrap_err() {
            BuildError::DegenerateGeometry { dimension, value, .. } => {
                assert_eq!(dimension, "divider_count");
                assert_eq!(value, f64::from(u32::MAX));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn zero_wall_is_degenerate() {
        let mut p = params();
        p.wall_thickness = 0.0;
        match derive(&p).unwrap_err() {
            BuildError::DegenerateGeometry { dimension, value, .. } => {
                assert_eq!(dimension, "wall_thickness");
                assert_eq!(value, 0.0);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn skirt_taller_than_tray_is_degenerate() {
        let mut p = params();
        p.lid_skirt_depth = 200.0;
        match derive(&p).unwrap_err() {
            BuildError::DegenerateGeometry { dimension, .. } => {
                assert_eq!(dimension, "tray_height_below_lid")
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn notch_wider_than_cavity_is_degenerate() {
        let mut p = params();
        p.finger_notch_width = 80.0;
        match derive(&p).unwrap_err() {
            BuildError::DegenerateGeometry { dimension, .. } => {
                assert_eq!(dimension, "finger_notch_side_margin")
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
