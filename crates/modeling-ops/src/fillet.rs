use std::time::Instant;

use deckbox_kernel::KernelSolidHandle;
use deckbox_types::{TopoKind, TopoQuery};
use tracing::debug;

use crate::kernel_ext::KernelBundle;
use crate::resolve::resolve_selection;
use crate::types::{check_result, require_positive, OpError, OpResult};

/// Execute a fillet operation.
///
/// Resolves each edge query against the solid, then rounds the union of
/// the matched edges with `radius`.
pub fn execute_fillet(
    kb: &mut dyn KernelBundle,
    solid: &KernelSolidHandle,
    edges: &[TopoQuery],
    radius: f64,
) -> Result<OpResult, OpError> {
    require_positive("fillet radius", radius)?;
    if edges.is_empty() {
        return Err(OpError::InvalidParameter {
            reason: "fillet needs at least one edge selection".to_string(),
        });
    }

    let selection = resolve_selection(kb.as_introspect(), solid, TopoKind::Edge, edges)?;
    let ids = selection.ids;
    let started = Instant::now();
    let handle = kb.fillet_edges(solid, &ids, radius)?;
    debug!(edges = ids.len(), radius, "filleted edges");
    check_result(kb, "fillet", handle, started, selection.warnings)
}
