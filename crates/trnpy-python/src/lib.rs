//! Embedded Python for the trnpy Type
//!
//! This crate provides a minimal, focused interface for:
//! 1. Starting the interpreter once per process ([`Interpreter`])
//! 2. Exposing the kernel to scripts as the `TRNSYSpy` module
//! 3. Loading a script's entry point and calling it each step ([`Session`])

pub mod bridge_module;
pub mod errors;
mod initialization;
mod session;

pub use bridge_module::BRIDGE_MODULE_NAME;
pub use errors::BridgeError;
pub use initialization::Interpreter;
pub use session::{format_python_error, Session};
