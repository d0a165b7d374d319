//! Turns derived dimensions into construction plans for the tray, the lid
//! and each divider.

use deckbox_types::{Profile, SketchPlane, SolidRole, TopoQuery};
use tracing::{debug, instrument};

use crate::dimensions::DerivedDimensions;
use crate::errors::BuildError;
use crate::params::BoxParams;
use crate::plan::{BuildPlan, ConstructionOp, OpIndex, PlanError, SolidPlan, SolidPlanBuilder};

const UP: [f64; 3] = [0.0, 0.0, 1.0];
const DOWN: [f64; 3] = [0.0, 0.0, -1.0];

/// How far cutters reach past the faces they open, so no cutter face is
/// coplanar with a face of the body.
pub const CUT_OVERSHOOT: f64 = 1.0;

/// Height of the divider slots' bottom above the cavity floor. A slot
/// cutter ending exactly on the floor would leave its bottom face coplanar
/// with it. Dividers stand on the slot bottoms.
pub const SLOT_LIFT: f64 = 0.25;

/// Half-size of the selection boxes around expected edge positions.
const SELECT_EPS: f64 = 1e-3;

/// Build the plans for every solid of the box.
#[instrument(skip_all, fields(slug = %params.slug, version = %params.version))]
pub fn plan(params: &BoxParams, dims: &DerivedDimensions) -> Result<BuildPlan, BuildError> {
    let invalid = |role: SolidRole| {
        let slug = params.slug.clone();
        move |e: PlanError| BuildError::InvalidPlan {
            slug,
            role,
            op_index: e.op_index,
            reason: e.reason,
        }
    };

    let tray = plan_tray(dims).map_err(invalid(SolidRole::Tray))?;
    let lid = plan_lid(dims).map_err(invalid(SolidRole::Lid))?;
    let mut dividers = Vec::with_capacity(dims.slots.len());
    for slot in &dims.slots {
        let role = SolidRole::Divider { index: slot.index };
        dividers.push(plan_divider(dims, slot.index, slot.center_y).map_err(invalid(role))?);
    }

    debug!(
        tray_ops = tray.ops.len(),
        lid_ops = lid.ops.len(),
        dividers = dividers.len(),
        "construction planned"
    );
    Ok(BuildPlan {
        slug: params.slug.clone(),
        version: params.version.clone(),
        tray,
        lid,
        dividers,
    })
}

/// Sketch a rectangle on the XY plane at height `z` and extrude it up.
fn block(
    b: &mut SolidPlanBuilder,
    z: f64,
    center: (f64, f64),
    width: f64,
    depth: f64,
    height: f64,
) -> Result<OpIndex, PlanError> {
    let sketch = b.push(ConstructionOp::Sketch {
        profile: Profile::rectangle(SketchPlane::xy_at(z), center, width, depth),
    })?;
    b.push(ConstructionOp::Extrude {
        profile: sketch,
        direction: UP,
        depth: height,
    })
}

/// The four vertical outer corner edges of a box footprint.
fn vertical_corners(width: f64, depth: f64, z_mid: f64, reach: f64) -> Vec<TopoQuery> {
    let mut edges = Vec::with_capacity(4);
    for sx in [-1.0, 1.0] {
        for sy in [-1.0, 1.0] {
            edges.push(TopoQuery::edge_near(
                [sx * width / 2.0, sy * depth / 2.0, z_mid],
                UP,
                reach,
            ));
        }
    }
    edges
}

fn plan_tray(dims: &DerivedDimensions) -> Result<SolidPlan, PlanError> {
    let outer = dims.tray_outer;
    let cavity = dims.cavity;
    let wall = dims.wall_thickness;
    let floor = dims.floor_thickness;
    let mut b = SolidPlanBuilder::new(SolidRole::Tray);

    let body = block(&mut b, 0.0, (0.0, 0.0), outer.width, outer.depth, outer.height)?;

    let notch_tool = match &dims.notch {
        Some(notch) => Some(block(
            &mut b,
            outer.height - notch.depth,
            (0.0, outer.depth / 2.0 - wall / 2.0),
            notch.width,
            wall + 2.0 * CUT_OVERSHOOT,
            notch.depth + CUT_OVERSHOOT,
        )?),
        None => None,
    };

    let mut slot_tools = Vec::with_capacity(dims.slots.len());
    for slot in &dims.slots {
        slot_tools.push(block(
            &mut b,
            floor + SLOT_LIFT,
            (0.0, slot.center_y),
            cavity.width + 2.0 * dims.slot_groove,
            wall,
            outer.height - floor - SLOT_LIFT + CUT_OVERSHOOT,
        )?);
    }

    let mut solid = b.push(ConstructionOp::Shell {
        target: body,
        open_faces: TopoQuery::faces_facing(UP),
        thickness: wall,
        face_thickness: vec![(TopoQuery::faces_facing(DOWN), floor)],
    })?;
    for tool in notch_tool.into_iter().chain(slot_tools) {
        solid = b.push(ConstructionOp::Subtract {
            target: solid,
            tool,
        })?;
    }

    if dims.rim_chamfer > 0.0 {
        let rim = TopoQuery::edges_in_region(
            [
                -cavity.width / 2.0 - SELECT_EPS,
                -cavity.depth / 2.0 - SELECT_EPS,
                outer.height - SELECT_EPS,
            ],
            [
                cavity.width / 2.0 + SELECT_EPS,
                cavity.depth / 2.0 + SELECT_EPS,
                outer.height + SELECT_EPS,
            ],
        );
        solid = b.push(ConstructionOp::Chamfer {
            target: solid,
            edges: vec![rim],
            distance: dims.rim_chamfer,
        })?;
    }
    if dims.corner_radius > 0.0 {
        b.push(ConstructionOp::Fillet {
            target: solid,
            edges: vertical_corners(outer.width, outer.depth, outer.height / 2.0, wall / 2.0),
            radius: dims.corner_radius,
        })?;
    }
    b.finish()
}

fn plan_lid(dims: &DerivedDimensions) -> Result<SolidPlan, PlanError> {
    let outer = dims.lid_outer;
    let mut b = SolidPlanBuilder::new(SolidRole::Lid);

    let body = block(
        &mut b,
        dims.lid_bottom_z,
        (0.0, 0.0),
        outer.width,
        outer.depth,
        outer.height,
    )?;
    let shelled = b.push(ConstructionOp::Shell {
        target: body,
        open_faces: TopoQuery::faces_facing(DOWN),
        thickness: dims.lid_thickness,
        face_thickness: Vec::new(),
    })?;
    if dims.lid_corner_radius > 0.0 {
        b.push(ConstructionOp::Fillet {
            target: shelled,
            edges: vertical_corners(
                outer.width,
                outer.depth,
                dims.lid_bottom_z + outer.height / 2.0,
                dims.lid_thickness / 2.0,
            ),
            radius: dims.lid_corner_radius,
        })?;
    }
    b.finish()
}

fn plan_divider(dims: &DerivedDimensions, index: usize, center_y: f64) -> Result<SolidPlan, PlanError> {
    let mut b = SolidPlanBuilder::new(SolidRole::Divider { index });
    if let Some(divider) = &dims.divider {
        block(
            &mut b,
            dims.floor_thickness + SLOT_LIFT,
            (0.0, center_y),
            divider.width,
            divider.depth,
            divider.height,
        )?;
    }
    b.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dimensions::derive;
    use crate::params::BoxStyle;
    use crate::plan::Phase;

    fn params(style: BoxStyle, dividers: u32) -> BoxParams {
        BoxParams {
            slug: "t".to_string(),
            label: "T".to_string(),
            style,
            divider_count: dividers,
            ..BoxParams::base()
        }
    }

    fn names(plan: &SolidPlan) -> Vec<&'static str> {
        plan.ops.iter().map(ConstructionOp::name).collect()
    }

    #[test]
    fn standard_tray_sequence() {
        let p = params(BoxStyle::Standard, 0);
        let plan = plan(&p, &derive(&p).unwrap()).unwrap();
        assert_eq!(
            names(&plan.tray),
            vec![
                "sketch", "extrude", "sketch", "extrude", "shell", "subtract", "chamfer", "fillet"
            ]
        );
        assert_eq!(names(&plan.lid), vec!["sketch", "extrude", "shell", "fillet"]);
        assert!(plan.dividers.is_empty());
    }

    #[test]
    fn minimalist_tray_skips_notch_and_chamfer() {
        let p = params(BoxStyle::Minimalist, 0);
        let plan = plan(&p, &derive(&p).unwrap()).unwrap();
        assert_eq!(names(&plan.tray), vec!["sketch", "extrude", "shell", "fillet"]);
    }

    #[test]
    fn sharp_corners_skip_fillets() {
        let mut p = params(BoxStyle::Minimalist, 0);
        p.corner_radius = 0.0;
        let plan = plan(&p, &derive(&p).unwrap()).unwrap();
        assert_eq!(names(&plan.tray), vec!["sketch", "extrude", "shell"]);
        assert_eq!(names(&plan.lid), vec!["sketch", "extrude", "shell"]);
    }

    #[test]
    fn compartmented_tray_cuts_one_slot_per_divider() {
        let p = params(BoxStyle::Compartmented, 2);
        let plan = plan(&p, &derive(&p).unwrap()).unwrap();
        let subtracts = plan.tray.ops.iter().filter(|op| op.name() == "subtract").count();
        assert_eq!(subtracts, 3);
        assert_eq!(plan.dividers.len(), 2);
        assert_eq!(plan.dividers[1].role, SolidRole::Divider { index: 2 });
        assert_eq!(names(&plan.dividers[0]), vec!["sketch", "extrude"]);
    }

    #[test]
    fn shell_targets_the_outer_body_with_floor_override() {
        let p = params(BoxStyle::Standard, 0);
        let dims = derive(&p).unwrap();
        let plan = plan(&p, &dims).unwrap();
        let shell = plan
            .tray
            .ops
            .iter()
            .find(|op| op.name() == "shell")
            .unwrap();
        match shell {
            ConstructionOp::Shell {
                target,
                thickness,
                face_thickness,
                ..
            } => {
                assert_eq!(*target, OpIndex(1));
                assert_eq!(*thickness, dims.wall_thickness);
                assert_eq!(face_thickness.len(), 1);
                assert_eq!(face_thickness[0].1, dims.floor_thickness);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn every_plan_respects_phase_order() {
        let p = params(BoxStyle::Compartmented, 3);
        let plan = plan(&p, &derive(&p).unwrap()).unwrap();
        for solid in plan.solids() {
            assert_eq!(solid.validate(), Ok(()));
            if let (Some(add), Some(sub)) = (
                solid.last_index_of(Phase::Additive),
                solid.first_index_of(Phase::Subtractive),
            ) {
                assert!(add < sub);
            }
        }
    }

    #[test]
    fn notch_cutter_straddles_the_front_wall() {
        let p = params(BoxStyle::Standard, 0);
        let dims = derive(&p).unwrap();
        let plan = plan(&p, &dims).unwrap();
        let ConstructionOp::Sketch { profile } = &plan.tray.ops[2] else {
            panic!("expected notch sketch");
        };
        let ys: Vec<f64> = profile.world_points().iter().map(|p| p[1]).collect();
        let min = ys.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = ys.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let front = dims.tray_outer.depth / 2.0;
        assert!(min < front - dims.wall_thickness);
        assert!(max > front);
        let z = profile.world_points()[0][2];
        assert!((z - (dims.tray_outer.height - dims.notch.unwrap().depth)).abs() < 1e-9);
    }

    #[test]
    fn slot_cutters_clear_the_cavity_floor() {
        let p = params(BoxStyle::Compartmented, 2);
        let dims = derive(&p).unwrap();
        let plan = plan(&p, &dims).unwrap();
        let sketch_z = |solid: &SolidPlan| -> Vec<f64> {
            solid
                .ops
                .iter()
                .filter_map(|op| match op {
                    ConstructionOp::Sketch { profile } => Some(profile.world_points()[0][2]),
                    _ => None,
                })
                .collect()
        };
        let slot_bottom = dims.floor_thickness + SLOT_LIFT;
        let tray_z = sketch_z(&plan.tray);
        assert!(tray_z.iter().all(|z| (z - dims.floor_thickness).abs() > 0.1));
        assert_eq!(
            tray_z.iter().filter(|z| (*z - slot_bottom).abs() < 1e-9).count(),
            2
        );
        for divider in &plan.dividers {
            assert_eq!(sketch_z(divider), vec![slot_bottom]);
        }
    }
}
