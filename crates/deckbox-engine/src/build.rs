//! The build pipeline: slug to solids.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use deckbox_kernel::{Kernel, KernelIntrospect, KernelSolidHandle};
use deckbox_types::SolidRole;
use modeling_ops::KernelBundle;
use rayon::prelude::*;
use tracing::{info, instrument};

use crate::dimensions::{derive, DerivedDimensions};
use crate::errors::BuildError;
use crate::execute::execute_plan;
use crate::params::BoxParams;
use crate::plan::BuildPlan;
use crate::planner::plan;
use crate::registry::Registry;

/// Shared cancellation flag. Checked before each solid's kernel work
/// starts; a solid already under construction always completes.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A finished solid, owned by the kernel that built it.
#[derive(Debug, Clone)]
pub struct BuiltSolid {
    pub role: SolidRole,
    pub handle: KernelSolidHandle,
    pub volume: f64,
}

/// Everything a successful build produced.
#[derive(Debug, Clone)]
pub struct BuiltBox {
    pub params: BoxParams,
    pub dims: DerivedDimensions,
    pub plan: BuildPlan,
    pub catalog_version: u32,
    /// Tray, lid, then dividers back to front.
    pub solids: Vec<BuiltSolid>,
}

impl BuiltBox {
    pub fn solid(&self, role: SolidRole) -> Option<&BuiltSolid> {
        self.solids.iter().find(|s| s.role == role)
    }

    pub fn dividers(&self) -> impl Iterator<Item = &BuiltSolid> {
        self.solids
            .iter()
            .filter(|s| matches!(s.role, SolidRole::Divider { .. }))
    }
}

/// Resolve, derive, plan and execute one model. All solids are built in
/// the same kernel so they can be exported together.
#[instrument(skip(registry, kb, cancel))]
pub fn build(
    registry: &Registry,
    slug: &str,
    kb: &mut dyn KernelBundle,
    cancel: &CancelToken,
) -> Result<BuiltBox, BuildError> {
    let params = registry.resolve(slug)?;
    let dims = derive(&params)?;
    let plan = plan(&params, &dims)?;

    let mut solids = Vec::with_capacity(2 + plan.dividers.len());
    for solid_plan in plan.solids() {
        if cancel.is_cancelled() {
            return Err(BuildError::Cancelled {
                slug: slug.to_string(),
                role: solid_plan.role,
            });
        }
        let executed = execute_plan(kb, slug, solid_plan)?;
        solids.push(BuiltSolid {
            role: executed.role,
            handle: executed.handle,
            volume: executed.volume,
        });
    }

    info!(
        version = %params.version,
        solids = solids.len(),
        "box built"
    );
    Ok(BuiltBox {
        params,
        dims,
        plan,
        catalog_version: registry.catalog_version(),
        solids,
    })
}

/// A build together with the kernel that owns its solids.
#[derive(Debug)]
pub struct KernelBuild<K> {
    pub kernel: K,
    pub built: BuiltBox,
}

/// Build several models concurrently, one fresh kernel per model from
/// `factory`. Results come back in the order of `slugs`.
pub fn build_many<K, F>(
    registry: &Registry,
    slugs: &[&str],
    factory: F,
    cancel: &CancelToken,
) -> Vec<Result<KernelBuild<K>, BuildError>>
where
    K: Kernel + KernelIntrospect + Send,
    F: Fn() -> K + Sync,
{
    slugs
        .par_iter()
        .map(|slug| -> Result<KernelBuild<K>, BuildError> {
            let mut kernel = factory();
            let built = build(registry, slug, &mut kernel, cancel)?;
            Ok(KernelBuild { kernel, built })
        })
        .collect()
}
