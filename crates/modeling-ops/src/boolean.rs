use std::time::Instant;

use deckbox_kernel::KernelSolidHandle;
use tracing::debug;

use crate::kernel_ext::KernelBundle;
use crate::types::{check_result, OpError, OpResult};

/// Which boolean to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BooleanKind {
    Union,
    Subtract,
}

/// Execute a boolean operation on two solids. For `Subtract` the result is
/// `target` minus `tool`.
pub fn execute_boolean(
    kb: &mut dyn KernelBundle,
    target: &KernelSolidHandle,
    tool: &KernelSolidHandle,
    kind: BooleanKind,
) -> Result<OpResult, OpError> {
    let started = Instant::now();
    let handle = match kind {
        BooleanKind::Union => kb.boolean_union(target, tool)?,
        BooleanKind::Subtract => kb.boolean_subtract(target, tool)?,
    };
    debug!(?kind, target = target.id(), tool = tool.id(), "boolean applied");
    let op = match kind {
        BooleanKind::Union => "union",
        BooleanKind::Subtract => "subtract",
    };
    check_result(kb, op, handle, started, Vec::new())
}
