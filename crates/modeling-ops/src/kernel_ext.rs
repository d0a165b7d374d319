use deckbox_kernel::{Kernel, KernelIntrospect};

/// A kernel the executors can both mutate and query. Query resolution
/// borrows the introspection side while the operation itself needs `&mut`.
pub trait KernelBundle: Kernel + KernelIntrospect {
    fn as_introspect(&self) -> &dyn KernelIntrospect;
}

impl<T: Kernel + KernelIntrospect> KernelBundle for T {
    fn as_introspect(&self) -> &dyn KernelIntrospect {
        self
    }
}
