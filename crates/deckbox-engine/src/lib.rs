pub mod build;
pub mod dimensions;
pub mod errors;
pub mod execute;
pub mod params;
pub mod plan;
pub mod planner;
pub mod registry;

pub use build::{build, build_many, BuiltBox, BuiltSolid, CancelToken, KernelBuild};
pub use dimensions::{
    derive, partition_cards, Compartment, DerivedDimensions, DividerSlot, Extent, FingerNotch,
};
pub use errors::{BuildError, RegistryLoadError};
pub use execute::{execute_plan, ExecutedSolid};
pub use params::{BoxParams, BoxStyle, ParamOverrides, Violation};
pub use plan::{BuildPlan, ConstructionOp, OpIndex, Phase, PlanError, SolidPlan, SolidPlanBuilder};
pub use planner::plan;
pub use registry::{changelog, ModelEntry, Registry, BUILTIN_CATALOG_VERSION};
