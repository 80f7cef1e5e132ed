use thiserror::Error;
use trnpy_config::VenvPathError;

/// Errors that can occur while driving the embedded interpreter
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Python error: {0}")]
    Python(String),

    #[error("Failed to initialize Python interpreter: {0}")]
    Initialization(String),

    #[error("Invalid Python environment: {0}")]
    Environment(#[from] VenvPathError),

    #[error("Failed to import module '{module}': {message}")]
    Import { module: String, message: String },

    #[error("Module '{module}' has no attribute '{function}'")]
    EntryPointMissing { module: String, function: String },

    #[error("Looking up '{function}' in module '{module}' failed: {message}")]
    EntryPointLookup {
        module: String,
        function: String,
        message: String,
    },

    #[error("'{function}' in module '{module}' is not callable")]
    NotCallable { module: String, function: String },

    #[error("Call to '{function}' in module '{module}' failed: {message}")]
    Invocation {
        module: String,
        function: String,
        message: String,
    },
}

/// Generic conversion from PyErr to BridgeError.
///
/// NOTE: This conversion loses the Python traceback. Where the traceback
/// matters (imports, script calls) use `format_python_error()` instead.
impl From<pyo3::PyErr> for BridgeError {
    fn from(err: pyo3::PyErr) -> Self {
        BridgeError::Python(format!("{}", err))
    }
}
