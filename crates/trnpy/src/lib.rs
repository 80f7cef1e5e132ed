//! TRNSYS Type 169: call a Python function every time step
//!
//! A deck configures each unit of this Type with two parameters (number of
//! inputs, number of outputs) and two labels (script file, function name).
//! At start time the script is imported into an embedded interpreter; at
//! every steady-state call the function runs and reads and writes the
//! simulation through the `TRNSYSpy` module.
//!
//! The kernel-facing symbol is [`TYPE169`]. The rest of the crate is plain
//! Rust written against [`trnpy_kernel::Kernel`], so it can be driven from
//! tests with [`trnpy_kernel::testing::RecordingKernel`].

mod entry;
pub mod errors;
pub mod lifecycle;
mod logging;
pub mod path_resolver;
pub mod phase;
pub mod runtime;
pub mod unit;

pub use entry::TYPE169;
pub use errors::UnitError;
pub use lifecycle::Lifecycle;
pub use path_resolver::{resolve_reference, ResolvedScript};
pub use phase::Phase;
pub use runtime::{PythonRuntime, ScriptRuntime};
