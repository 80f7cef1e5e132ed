//! The kernel of the call in progress
//!
//! Script callbacks are plain functions registered with the interpreter, so
//! they cannot receive the kernel as an argument. The entry point installs the
//! kernel here for the length of a call and the callbacks look it up. Scopes
//! nest: dropping a guard restores whatever was active before it.

use crate::kernel::{Kernel, KernelHandle};
use std::cell::RefCell;

thread_local! {
    static ACTIVE_KERNEL: RefCell<Option<KernelHandle>> = const { RefCell::new(None) };
}

/// Keeps a kernel active until dropped
#[must_use = "the kernel is only active while the guard is alive"]
pub struct ActiveKernelGuard {
    previous: Option<KernelHandle>,
}

/// Make `kernel` the active kernel for the current thread
pub fn enter(kernel: KernelHandle) -> ActiveKernelGuard {
    let previous = ACTIVE_KERNEL.with(|slot| slot.borrow_mut().replace(kernel));
    ActiveKernelGuard { previous }
}

impl Drop for ActiveKernelGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        ACTIVE_KERNEL.with(|slot| *slot.borrow_mut() = previous);
    }
}

/// Run `f` against the active kernel, or return `None` outside a call
pub fn with_active<R>(f: impl FnOnce(&dyn Kernel) -> R) -> Option<R> {
    // Clone the handle out so `f` may re-enter this module.
    let kernel = ACTIVE_KERNEL.with(|slot| slot.borrow().clone())?;
    Some(f(kernel.as_ref()))
}

pub fn is_active() -> bool {
    ACTIVE_KERNEL.with(|slot| slot.borrow().is_some())
}
