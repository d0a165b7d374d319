pub mod boolean;
pub mod chamfer;
pub mod extrude;
pub mod fillet;
pub mod kernel_ext;
pub mod resolve;
pub mod shell;
pub mod types;

pub use boolean::{execute_boolean, BooleanKind};
pub use chamfer::execute_chamfer;
pub use extrude::execute_extrude;
pub use fillet::execute_fillet;
pub use kernel_ext::KernelBundle;
pub use resolve::{resolve_all, resolve_query, resolve_selection, Selection};
pub use shell::execute_shell;
pub use types::*;
