use std::time::Instant;

use deckbox_kernel::KernelSolidHandle;
use deckbox_types::{TopoKind, TopoQuery};
use tracing::debug;

use crate::kernel_ext::KernelBundle;
use crate::resolve::resolve_selection;
use crate::types::{check_result, require_positive, OpError, OpResult};

/// Execute a chamfer operation: bevel every edge matched by `edges` by
/// `distance` along both adjacent faces.
pub fn execute_chamfer(
    kb: &mut dyn KernelBundle,
    solid: &KernelSolidHandle,
    edges: &[TopoQuery],
    distance: f64,
) -> Result<OpResult, OpError> {
    require_positive("chamfer distance", distance)?;
    if edges.is_empty() {
        return Err(OpError::InvalidParameter {
            reason: "chamfer needs at least one edge selection".to_string(),
        });
    }

    let selection = resolve_selection(kb.as_introspect(), solid, TopoKind::Edge, edges)?;
    let ids = selection.ids;
    let started = Instant::now();
    let handle = kb.chamfer_edges(solid, &ids, distance)?;
    debug!(edges = ids.len(), distance, "chamfered edges");
    check_result(kb, "chamfer", handle, started, selection.warnings)
}
