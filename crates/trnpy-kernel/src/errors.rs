use thiserror::Error;

/// Errors raised while binding to the kernel library
#[derive(Error, Debug)]
pub enum KernelError {
    #[error("Failed to open kernel library '{name}': {reason}")]
    LibraryLoad { name: String, reason: String },

    #[error("Kernel symbol '{symbol}' not found: {reason}")]
    MissingSymbol { symbol: String, reason: String },
}
