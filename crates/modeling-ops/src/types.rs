use std::time::Instant;

use deckbox_kernel::{KernelSolidHandle, SolidCheck};
use tracing::{debug, warn};

use crate::kernel_ext::KernelBundle;

/// Complete result of a modeling operation: the new solid plus the
/// validity check it passed.
#[derive(Debug, Clone)]
pub struct OpResult {
    /// Handle to the solid in the kernel. Runtime-only, not persisted.
    pub handle: KernelSolidHandle,
    /// Post-operation check: closed boundary, positive volume.
    pub check: SolidCheck,
    /// Non-fatal warnings and timing information.
    pub diagnostics: Diagnostics,
}

/// Non-fatal diagnostics from an operation.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    /// Warning messages.
    pub warnings: Vec<String>,
    /// Time taken for the kernel operation, in milliseconds.
    pub kernel_time_ms: f64,
}

/// Errors from modeling operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum OpError {
    #[error("kernel error: {0}")]
    Kernel(#[from] deckbox_kernel::KernelError),

    #[error("invalid parameter: {reason}")]
    InvalidParameter { reason: String },

    #[error("selection matched nothing: {query}")]
    NoMatch { query: String },

    #[error("kernel produced an invalid solid: {reason}")]
    InvalidResult { reason: String },
}

pub(crate) fn require_positive(name: &str, value: f64) -> Result<(), OpError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(OpError::InvalidParameter {
            reason: format!("{name} must be positive and finite, got {value}"),
        })
    }
}

/// Re-check a solid a kernel call just produced. A result that is open or
/// has no volume is rejected even if the kernel reported success.
/// `warnings` collected while preparing the call are logged and returned.
pub(crate) fn check_result(
    kb: &mut dyn KernelBundle,
    op: &str,
    handle: KernelSolidHandle,
    started: Instant,
    warnings: Vec<String>,
) -> Result<OpResult, OpError> {
    let kernel_time_ms = started.elapsed().as_secs_f64() * 1000.0;

    let check = kb.check_solid(&handle)?;
    if !check.closed {
        return Err(OpError::InvalidResult {
            reason: format!("{op} produced a non-manifold solid"),
        });
    }
    if !(check.volume > 0.0) || !check.volume.is_finite() {
        return Err(OpError::InvalidResult {
            reason: format!("{op} produced a solid with volume {}", check.volume),
        });
    }
    debug!(op, volume = check.volume, kernel_time_ms, "operation checked");
    for warning in &warnings {
        warn!(op, "{warning}");
    }

    Ok(OpResult {
        handle,
        check,
        diagnostics: Diagnostics {
            warnings,
            kernel_time_ms,
        },
    })
}
