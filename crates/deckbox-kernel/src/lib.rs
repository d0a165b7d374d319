pub mod geometry;
pub mod mock_kernel;
pub mod primitives;
pub mod tessellation;
pub mod traits;
pub mod truck_introspect;
pub mod truck_kernel;
pub mod types;

pub use geometry::Aabb;
pub use mock_kernel::{KernelCall, MockKernel};
pub use traits::*;
pub use truck_kernel::TruckKernel;
pub use types::*;
