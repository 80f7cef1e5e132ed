//! Access to the TRNSYS simulation kernel
//!
//! The kernel drives every Type through one argument-less entry point and
//! exposes its state through a family of global accessor functions. This crate
//! wraps that surface:
//! 1. [`Kernel`] is the seam the Type logic is written against
//! 2. [`TrnsysKernel`] resolves the real accessors from the loaded kernel library
//! 3. [`testing::RecordingKernel`] stands in for the kernel in tests
//! 4. [`scope`] makes the kernel of the current call reachable from script callbacks

mod context;
pub mod errors;
mod ffi;
mod kernel;
pub mod scope;
pub mod testing;

pub use context::{InvocationContext, PhaseFlags, Severity};
pub use errors::KernelError;
pub use ffi::{KernelSymbols, TrnsysKernel};
pub use kernel::{Kernel, KernelHandle};
