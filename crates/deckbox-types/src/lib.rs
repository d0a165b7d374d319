pub mod profile;
pub mod roles;
pub mod topo;

pub use profile::*;
pub use roles::*;
pub use topo::*;
