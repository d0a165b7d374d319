use std::time::Instant;

use deckbox_kernel::{KernelId, KernelSolidHandle};
use deckbox_types::{TopoKind, TopoQuery};
use tracing::debug;

use crate::kernel_ext::KernelBundle;
use crate::resolve::resolve_query;
use crate::types::{check_result, require_positive, OpError, OpResult};

/// Execute a shell operation.
///
/// Removes the faces matched by `open_faces` and hollows the solid to
/// `thickness`. Each `(query, thickness)` override gives the faces it
/// matches their own wall thickness, e.g. a thicker floor.
pub fn execute_shell(
    kb: &mut dyn KernelBundle,
    solid: &KernelSolidHandle,
    open_faces: &TopoQuery,
    thickness: f64,
    overrides: &[(TopoQuery, f64)],
) -> Result<OpResult, OpError> {
    require_positive("shell thickness", thickness)?;

    let faces_to_remove = resolve_query(kb.as_introspect(), solid, TopoKind::Face, open_faces)?;
    let mut face_thickness: Vec<(KernelId, f64)> = Vec::new();
    let mut warnings = Vec::new();
    for (query, value) in overrides {
        require_positive("shell face thickness", *value)?;
        for id in resolve_query(kb.as_introspect(), solid, TopoKind::Face, query)? {
            if faces_to_remove.contains(&id) {
                return Err(OpError::InvalidParameter {
                    reason: "a thickness override selects a removed face".to_string(),
                });
            }
            if face_thickness.iter().any(|(seen, _)| *seen == id) {
                warnings.push(format!(
                    "face {} has more than one thickness override; using {value}",
                    id.0
                ));
                face_thickness.retain(|(seen, _)| *seen != id);
            }
            face_thickness.push((id, *value));
        }
    }

    let started = Instant::now();
    let handle = kb.shell(solid, &faces_to_remove, thickness, &face_thickness)?;
    debug!(
        removed = faces_to_remove.len(),
        overridden = face_thickness.len(),
        thickness,
        "shelled solid"
    );
    check_result(kb, "shell", handle, started, warnings)
}
