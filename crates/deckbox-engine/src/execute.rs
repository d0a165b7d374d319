use deckbox_kernel::KernelSolidHandle;
use deckbox_types::SolidRole;
use modeling_ops::{
    execute_boolean, execute_chamfer, execute_extrude, execute_fillet, execute_shell,
    BooleanKind, KernelBundle, OpError, OpResult,
};
use tracing::{debug, instrument};

use crate::errors::BuildError;
use crate::plan::{ConstructionOp, OpIndex, SolidPlan};

/// One solid produced by executing its plan.
#[derive(Debug, Clone)]
pub struct ExecutedSolid {
    pub role: SolidRole,
    pub handle: KernelSolidHandle,
    pub volume: f64,
}

/// Replay a solid plan against the kernel, in order. Any kernel or
/// operation failure stops the plan and reports the failing op index.
#[instrument(skip(kb, plan), fields(role = %plan.role, ops = plan.ops.len()))]
pub fn execute_plan(
    kb: &mut dyn KernelBundle,
    slug: &str,
    plan: &SolidPlan,
) -> Result<ExecutedSolid, BuildError> {
    let role = plan.role;
    plan.validate().map_err(|e| BuildError::InvalidPlan {
        slug: slug.to_string(),
        role,
        op_index: e.op_index,
        reason: e.reason,
    })?;

    let mut results: Vec<Option<OpResult>> = Vec::with_capacity(plan.ops.len());
    for (op_index, op) in plan.ops.iter().enumerate() {
        let rejected = |e: OpError| BuildError::KernelRejected {
            slug: slug.to_string(),
            role,
            op_index,
            reason: e.to_string(),
        };
        let solid = |index: OpIndex| -> Result<KernelSolidHandle, BuildError> {
            results
                .get(index.0)
                .and_then(Option::as_ref)
                .map(|r| r.handle.clone())
                .ok_or_else(|| BuildError::InvalidPlan {
                    slug: slug.to_string(),
                    role,
                    op_index,
                    reason: format!("operation {} has no solid", index.0),
                })
        };

        let result = match op {
            ConstructionOp::Sketch { .. } => None,
            ConstructionOp::Extrude {
                profile,
                direction,
                depth,
            } => {
                let Some(ConstructionOp::Sketch { profile }) = plan.ops.get(profile.0) else {
                    return Err(BuildError::InvalidPlan {
                        slug: slug.to_string(),
                        role,
                        op_index,
                        reason: "extrude input is not a sketch".to_string(),
                    });
                };
                Some(execute_extrude(kb, profile, *direction, *depth).map_err(rejected)?)
            }
            ConstructionOp::Union { target, tool } => {
                let (target, tool) = (solid(*target)?, solid(*tool)?);
                Some(execute_boolean(kb, &target, &tool, BooleanKind::Union).map_err(rejected)?)
            }
            ConstructionOp::Subtract { target, tool } => {
                let (target, tool) = (solid(*target)?, solid(*tool)?);
                Some(
                    execute_boolean(kb, &target, &tool, BooleanKind::Subtract)
                        .map_err(rejected)?,
                )
            }
            ConstructionOp::Shell {
                target,
                open_faces,
                thickness,
                face_thickness,
            } => {
                let target = solid(*target)?;
                Some(
                    execute_shell(kb, &target, open_faces, *thickness, face_thickness)
                        .map_err(rejected)?,
                )
            }
            ConstructionOp::Chamfer {
                target,
                edges,
                distance,
            } => {
                let target = solid(*target)?;
                Some(execute_chamfer(kb, &target, edges, *distance).map_err(rejected)?)
            }
            ConstructionOp::Fillet {
                target,
                edges,
                radius,
            } => {
                let target = solid(*target)?;
                Some(execute_fillet(kb, &target, edges, *radius).map_err(rejected)?)
            }
        };

        if let Some(r) = &result {
            debug!(
                op_index,
                op = op.name(),
                volume = r.check.volume,
                kernel_time_ms = r.diagnostics.kernel_time_ms,
                "operation executed"
            );
        }
        results.push(result);
    }

    let last = results
        .pop()
        .flatten()
        .ok_or_else(|| BuildError::InvalidPlan {
            slug: slug.to_string(),
            role,
            op_index: plan.ops.len().saturating_sub(1),
            reason: "plan does not end in a solid".to_string(),
        })?;
    Ok(ExecutedSolid {
        role,
        handle: last.handle,
        volume: last.check.volume,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::SolidPlanBuilder;
    use deckbox_kernel::{KernelCall, MockKernel};
    use deckbox_types::{Profile, SketchPlane, TopoQuery};

    fn slab() -> SolidPlanBuilder {
        let mut b = SolidPlanBuilder::new(SolidRole::Tray);
        let s = b
            .push(ConstructionOp::Sketch {
                profile: Profile::rectangle(SketchPlane::xy_at(0.0), (0.0, 0.0), 10.0, 10.0),
            })
            .unwrap();
        b.push(ConstructionOp::Extrude {
            profile: s,
            direction: [0.0, 0.0, 1.0],
            depth: 2.0,
        })
        .unwrap();
        b
    }

    #[test]
    fn executes_a_simple_plan() {
        let mut kernel = MockKernel::new();
        let plan = slab().finish().unwrap();
        let solid = execute_plan(&mut kernel, "t", &plan).unwrap();
        assert_eq!(solid.role, SolidRole::Tray);
        assert!((solid.volume - 200.0).abs() < 1e-9);
        assert!(kernel.journal().contains(&KernelCall::Extrude { depth: 2.0 }));
    }

    #[test]
    fn unmatched_selection_reports_op_index() {
        let mut kernel = MockKernel::new();
        let mut b = slab();
        b.push(ConstructionOp::Fillet {
            target: OpIndex(1),
            edges: vec![TopoQuery::edge_near([50.0, 50.0, 1.0], [0.0, 0.0, 1.0], 0.1)],
            radius: 0.5,
        })
        .unwrap();
        let err = execute_plan(&mut kernel, "t", &b.finish().unwrap()).unwrap_err();
        match err {
            BuildError::KernelRejected { op_index, role, .. } => {
                assert_eq!(op_index, 2);
                assert_eq!(role, SolidRole::Tray);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn disordered_plan_never_reaches_kernel() {
        let mut kernel = MockKernel::new();
        let plan = SolidPlan {
            role: SolidRole::Lid,
            ops: vec![ConstructionOp::Extrude {
                profile: OpIndex(0),
                direction: [0.0, 0.0, 1.0],
                depth: 1.0,
            }],
        };
        let err = execute_plan(&mut kernel, "t", &plan).unwrap_err();
        assert!(matches!(err, BuildError::InvalidPlan { .. }));
        assert!(kernel.journal().is_empty());
    }
}
