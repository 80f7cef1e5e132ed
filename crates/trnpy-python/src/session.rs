//! One unit's loaded script and entry point

use crate::errors::BridgeError;
use crate::initialization::{acquire_search_path, path_str, release_search_path, Interpreter};
use pyo3::exceptions::PyAttributeError;
use pyo3::prelude::*;
use pyo3::types::PyModule;
use std::path::{Path, PathBuf};
use tracing::trace;
use trnpy_logger as logger;

/// The executed script module and the function the kernel calls each step
///
/// Created at start time and consumed by [`Session::release`] at the last
/// call. The callable handle never changes for the life of the session.
pub struct Session {
    module: Py<PyAny>,
    callable: Py<PyAny>,
    module_key: String,
    function_name: String,
    search_dir: PathBuf,
}

impl Session {
    /// Execute the script at `script_path` and resolve `function_name`
    ///
    /// The module is registered in `sys.modules` under `module_key`, so two
    /// scripts with the same file name in different directories never share
    /// a module. `search_dir` is put on `sys.path` so the script can import
    /// its own siblings; on any failure both changes are undone.
    pub fn load(
        _interpreter: &Interpreter,
        script_path: &Path,
        search_dir: &Path,
        module_key: &str,
        function_name: &str,
    ) -> Result<Session, BridgeError> {
        let search_dir = search_dir.to_path_buf();
        Python::attach(|py| {
            acquire_search_path(py, &search_dir).map_err(|e| BridgeError::Import {
                module: module_key.to_string(),
                message: e.to_string(),
            })?;

            let loaded = execute_module(py, script_path, module_key).and_then(|module| {
                match lookup_entry_point(py, &module, module_key, function_name) {
                    Ok(callable) => Ok((module, callable)),
                    Err(e) => {
                        forget_module(py, module_key, &module);
                        Err(e)
                    }
                }
            });

            match loaded {
                Ok((module, callable)) => Ok(Session {
                    module: module.unbind(),
                    callable: callable.unbind(),
                    module_key: module_key.to_string(),
                    function_name: function_name.to_string(),
                    search_dir,
                }),
                Err(e) => {
                    if let Err(cleanup) = release_search_path(py, &search_dir) {
                        logger::warn(&format!("Failed to restore sys.path: {}", cleanup));
                    }
                    Err(e)
                }
            }
        })
    }

    /// Name of the module in `sys.modules`
    pub fn module_key(&self) -> &str {
        &self.module_key
    }

    pub fn function_name(&self) -> &str {
        &self.function_name
    }

    /// Call the entry point with no arguments
    ///
    /// The script reads and writes the kernel through `TRNSYSpy`; its return
    /// value is ignored. Any exception becomes [`BridgeError::Invocation`].
    pub fn invoke(&self) -> Result<(), BridgeError> {
        trace!(module = %self.module_key, function = %self.function_name, "calling entry point");
        Python::attach(|py| {
            self.callable
                .bind(py)
                .call0()
                .map(|_| ())
                .map_err(|e| BridgeError::Invocation {
                    module: self.module_key.clone(),
                    function: self.function_name.clone(),
                    message: format_python_error(py, &e),
                })
        })
    }

    /// Drop the module from `sys.modules` and give back the search path
    pub fn release(self) {
        Python::attach(|py| {
            let Session {
                module,
                callable,
                module_key,
                search_dir,
                ..
            } = self;
            forget_module(py, &module_key, module.bind(py));
            if let Err(e) = release_search_path(py, &search_dir) {
                logger::warn(&format!("Failed to restore sys.path: {}", e));
            }
            // Release while attached so the references are dropped now.
            drop(callable);
            drop(module);
        });
    }
}

/// Run the script file as a fresh module registered under `module_key`
///
/// An explicit source loader lets scripts without a `.py` extension load too.
fn execute_module<'py>(
    py: Python<'py>,
    script_path: &Path,
    module_key: &str,
) -> Result<Bound<'py, PyAny>, BridgeError> {
    logger::debug(&format!(
        "Loading {} as module {}",
        script_path.display(),
        module_key
    ));
    let import_error = |e: PyErr| BridgeError::Import {
        module: module_key.to_string(),
        message: format_python_error(py, &e),
    };

    let location = path_str(script_path);
    let loader = PyModule::import(py, "importlib.machinery")
        .and_then(|machinery| machinery.getattr("SourceFileLoader"))
        .and_then(|loader| loader.call1((module_key, &location)))
        .map_err(import_error)?;
    let util = PyModule::import(py, "importlib.util").map_err(import_error)?;
    let spec = util
        .call_method1("spec_from_loader", (module_key, &loader))
        .map_err(import_error)?;
    if spec.is_none() {
        return Err(BridgeError::Import {
            module: module_key.to_string(),
            message: format!("{} cannot be loaded as a Python module", location),
        });
    }
    let module = util
        .call_method1("module_from_spec", (&spec,))
        .map_err(import_error)?;

    let modules = PyModule::import(py, "sys")
        .and_then(|sys| sys.getattr("modules"))
        .map_err(import_error)?;
    modules.set_item(module_key, &module).map_err(import_error)?;
    if let Err(e) = loader.call_method1("exec_module", (&module,)) {
        let _ = modules.del_item(module_key);
        return Err(import_error(e));
    }
    Ok(module)
}

fn lookup_entry_point<'py>(
    py: Python<'py>,
    module: &Bound<'py, PyAny>,
    module_key: &str,
    function_name: &str,
) -> Result<Bound<'py, PyAny>, BridgeError> {
    let callable = match module.getattr(function_name) {
        Ok(callable) => callable,
        Err(e) if e.is_instance_of::<PyAttributeError>(py) => {
            return Err(BridgeError::EntryPointMissing {
                module: module_key.to_string(),
                function: function_name.to_string(),
            });
        }
        Err(e) => {
            return Err(BridgeError::EntryPointLookup {
                module: module_key.to_string(),
                function: function_name.to_string(),
                message: format_python_error(py, &e),
            });
        }
    };
    if !callable.is_callable() {
        return Err(BridgeError::NotCallable {
            module: module_key.to_string(),
            function: function_name.to_string(),
        });
    }
    Ok(callable)
}

/// Remove `module` from `sys.modules` unless the key was rebound since
fn forget_module(py: Python<'_>, module_key: &str, module: &Bound<'_, PyAny>) {
    let removed = PyModule::import(py, "sys")
        .and_then(|sys| sys.getattr("modules"))
        .and_then(|modules| match modules.get_item(module_key) {
            Ok(current) if current.as_ptr() == module.as_ptr() => modules.del_item(module_key),
            _ => Ok(()),
        });
    if let Err(e) = removed {
        logger::warn(&format!("Failed to unregister module {}: {}", module_key, e));
    }
}

/// Render a Python exception for the kernel message and the log
///
/// The full traceback goes to the log file; the returned text is the final
/// `ExceptionType: message` line, which fits the kernel's message limit.
pub fn format_python_error(py: Python<'_>, err: &PyErr) -> String {
    let summary = err.to_string();
    match err.traceback(py).map(|tb| tb.format()) {
        Some(Ok(traceback)) => logger::python(&format!("{}{}", traceback, summary)),
        _ => logger::python(&summary),
    }
    summary
}
