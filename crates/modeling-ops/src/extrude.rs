use std::time::Instant;

use deckbox_types::Profile;
use tracing::debug;

use crate::kernel_ext::KernelBundle;
use crate::types::{check_result, require_positive, OpError, OpResult};

/// Execute an extrude operation.
///
/// Turns a closed profile into a planar face and sweeps it along
/// `direction` by `depth`. Degenerate profiles (fewer than three points or
/// zero area) are rejected before the kernel sees them.
pub fn execute_extrude(
    kb: &mut dyn KernelBundle,
    profile: &Profile,
    direction: [f64; 3],
    depth: f64,
) -> Result<OpResult, OpError> {
    require_positive("extrude depth", depth)?;
    if profile.is_degenerate() {
        return Err(OpError::InvalidParameter {
            reason: format!(
                "profile with {} points and area {} cannot be extruded",
                profile.points.len(),
                profile.area()
            ),
        });
    }
    let len = (direction[0].powi(2) + direction[1].powi(2) + direction[2].powi(2)).sqrt();
    if !(len > 1e-12) {
        return Err(OpError::InvalidParameter {
            reason: "extrude direction is zero".to_string(),
        });
    }

    let started = Instant::now();
    let face = kb.make_face_from_profile(profile)?;
    let handle = kb.extrude_face(face, direction, depth)?;
    debug!(depth, area = profile.area(), "extruded profile");
    check_result(kb, "extrude", handle, started, Vec::new())
}
