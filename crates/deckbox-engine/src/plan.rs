//! Construction plans: replayable operation scripts, one per solid.

use deckbox_types::{Profile, SolidRole, TopoQuery};
use serde::{Deserialize, Serialize};

/// Position of an earlier operation within the same solid plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OpIndex(pub usize);

/// Construction phase. Within a plan the phase never goes backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Phase {
    Additive,
    Subtractive,
    Finishing,
}

/// One primitive construction step. Inputs are earlier steps, by index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ConstructionOp {
    Sketch {
        profile: Profile,
    },
    Extrude {
        profile: OpIndex,
        direction: [f64; 3],
        depth: f64,
    },
    Union {
        target: OpIndex,
        tool: OpIndex,
    },
    Shell {
        target: OpIndex,
        open_faces: TopoQuery,
        thickness: f64,
        face_thickness: Vec<(TopoQuery, f64)>,
    },
    Subtract {
        target: OpIndex,
        tool: OpIndex,
    },
    Chamfer {
        target: OpIndex,
        edges: Vec<TopoQuery>,
        distance: f64,
    },
    Fillet {
        target: OpIndex,
        edges: Vec<TopoQuery>,
        radius: f64,
    },
}

impl ConstructionOp {
    pub fn phase(&self) -> Phase {
        match self {
            ConstructionOp::Sketch { .. }
            | ConstructionOp::Extrude { .. }
            | ConstructionOp::Union { .. } => Phase::Additive,
            ConstructionOp::Shell { .. } | ConstructionOp::Subtract { .. } => Phase::Subtractive,
            ConstructionOp::Chamfer { .. } | ConstructionOp::Fillet { .. } => Phase::Finishing,
        }
    }

    /// Whether the op yields a solid (everything but a sketch does).
    pub fn produces_solid(&self) -> bool {
        !matches!(self, ConstructionOp::Sketch { .. })
    }

    pub fn name(&self) -> &'static str {
        match self {
            ConstructionOp::Sketch { .. } => "sketch",
            ConstructionOp::Extrude { .. } => "extrude",
            ConstructionOp::Union { .. } => "union",
            ConstructionOp::Shell { .. } => "shell",
            ConstructionOp::Subtract { .. } => "subtract",
            ConstructionOp::Chamfer { .. } => "chamfer",
            ConstructionOp::Fillet { .. } => "fillet",
        }
    }

    /// `(input, needs_solid)` for each referenced step.
    fn inputs(&self) -> Vec<(OpIndex, bool)> {
        match self {
            ConstructionOp::Sketch { .. } => Vec::new(),
            ConstructionOp::Extrude { profile, .. } => vec![(*profile, false)],
            ConstructionOp::Union { target, tool } | ConstructionOp::Subtract { target, tool } => {
                vec![(*target, true), (*tool, true)]
            }
            ConstructionOp::Shell { target, .. }
            | ConstructionOp::Chamfer { target, .. }
            | ConstructionOp::Fillet { target, .. } => vec![(*target, true)],
        }
    }
}

/// A plan that breaks the construction rules. Always a planner bug.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("operation {op_index}: {reason}")]
pub struct PlanError {
    pub op_index: usize,
    pub reason: String,
}

/// The ordered operations for one independent solid. The last op's result
/// is the solid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolidPlan {
    pub role: SolidRole,
    pub ops: Vec<ConstructionOp>,
}

impl SolidPlan {
    /// Replay the ops through a builder to re-check a plan that did not
    /// come from one (e.g. deserialized or hand-written).
    pub fn validate(&self) -> Result<(), PlanError> {
        let mut builder = SolidPlanBuilder::new(self.role);
        for op in &self.ops {
            builder.push(op.clone())?;
        }
        builder.finish().map(|_| ())
    }

    /// Index of the last op of a phase, if any.
    pub fn last_index_of(&self, phase: Phase) -> Option<usize> {
        self.ops.iter().rposition(|op| op.phase() == phase)
    }

    /// Index of the first op of a phase, if any.
    pub fn first_index_of(&self, phase: Phase) -> Option<usize> {
        self.ops.iter().position(|op| op.phase() == phase)
    }
}

/// Builds a [`SolidPlan`], rejecting out-of-phase pushes and dangling or
/// forward references as they happen.
#[derive(Debug)]
pub struct SolidPlanBuilder {
    role: SolidRole,
    ops: Vec<ConstructionOp>,
    phase: Phase,
}

impl SolidPlanBuilder {
    pub fn new(role: SolidRole) -> Self {
        Self {
            role,
            ops: Vec::new(),
            phase: Phase::Additive,
        }
    }

    pub fn push(&mut self, op: ConstructionOp) -> Result<OpIndex, PlanError> {
        let index = self.ops.len();
        let fail = |reason: String| PlanError {
            op_index: index,
            reason,
        };

        if op.phase() < self.phase {
            return Err(fail(format!(
                "{} ({:?}) after a {:?} operation",
                op.name(),
                op.phase(),
                self.phase
            )));
        }
        for (input, needs_solid) in op.inputs() {
            let Some(referenced) = self.ops.get(input.0) else {
                return Err(fail(format!(
                    "{} references operation {} which does not precede it",
                    op.name(),
                    input.0
                )));
            };
            if needs_solid != referenced.produces_solid() {
                let wanted = if needs_solid { "a solid" } else { "a sketch" };
                return Err(fail(format!(
                    "{} input {} is a {}, expected {}",
                    op.name(),
                    input.0,
                    referenced.name(),
                    wanted
                )));
            }
        }
        match &op {
            ConstructionOp::Extrude { depth, .. } if !(*depth > 0.0) => {
                return Err(fail(format!("extrude depth {depth} is not positive")));
            }
            ConstructionOp::Shell { thickness, .. } if !(*thickness > 0.0) => {
                return Err(fail(format!("shell thickness {thickness} is not positive")));
            }
            ConstructionOp::Chamfer { distance, edges, .. }
                if !(*distance > 0.0) || edges.is_empty() =>
            {
                return Err(fail("chamfer needs edges and a positive distance".into()));
            }
            ConstructionOp::Fillet { radius, edges, .. } if !(*radius > 0.0) || edges.is_empty() => {
                return Err(fail("fillet needs edges and a positive radius".into()));
            }
            _ => {}
        }

        self.phase = op.phase();
        self.ops.push(op);
        Ok(OpIndex(index))
    }

    pub fn finish(self) -> Result<SolidPlan, PlanError> {
        let ends_in_solid = self.ops.last().map_or(false, ConstructionOp::produces_solid);
        if !ends_in_solid {
            return Err(PlanError {
                op_index: self.ops.len().saturating_sub(1),
                reason: "plan does not end in a solid".to_string(),
            });
        }
        Ok(SolidPlan {
            role: self.role,
            ops: self.ops,
        })
    }
}

/// Plans for every solid of one box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildPlan {
    pub slug: String,
    pub version: String,
    pub tray: SolidPlan,
    pub lid: SolidPlan,
    pub dividers: Vec<SolidPlan>,
}

impl BuildPlan {
    /// Tray, lid, then dividers back to front.
    pub fn solids(&self) -> impl Iterator<Item = &SolidPlan> {
        [&self.tray, &self.lid].into_iter().chain(self.dividers.iter())
    }
}
