//! Python interpreter bootstrap
//!
//! The interpreter is process-wide: it is started the first time any unit of
//! this Type reaches its start-time call and stays up until the kernel
//! unloads the DLL. PyO3 cannot finalize and restart an interpreter, so
//! per-run state lives in [`crate::Session`] instead.

use crate::bridge_module;
use crate::errors::BridgeError;
use once_cell::sync::{Lazy, OnceCell};
use pyo3::prelude::*;
use pyo3::types::PyModule;
use std::collections::HashMap;
use std::env;
use std::path::Path;
use std::sync::Mutex;
use trnpy_config::{resolve_python_home, resolve_site_packages, Config};
use trnpy_logger as logger;

/// Handle proving the interpreter is up and the bridge is registered
pub struct Interpreter {
    version: String,
}

static INTERPRETER: OnceCell<Result<Interpreter, BridgeError>> = OnceCell::new();

/// A `sys.path` entry shared by the sessions loaded from one directory
struct SearchPathEntry {
    users: usize,
    /// Whether the entry was put there by a session rather than found
    inserted: bool,
}

static SEARCH_PATHS: Lazy<Mutex<HashMap<String, SearchPathEntry>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

impl Interpreter {
    /// Get or initialize the interpreter singleton
    ///
    /// A failed bootstrap is remembered; later calls report the same failure
    /// instead of retrying against a half-initialized runtime.
    pub fn get(config: &Config) -> Result<&'static Interpreter, BridgeError> {
        match INTERPRETER.get_or_init(|| Interpreter::initialize(config)) {
            Ok(interpreter) => Ok(interpreter),
            Err(e) => Err(BridgeError::Initialization(format!("{}", e))),
        }
    }

    /// Python version string of the running interpreter, e.g. `3.12.1`
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Initialize Python and configure the environment
    ///
    /// This performs:
    /// 1. Resolve PYTHONHOME from config or the configured venv
    /// 2. Initialize the interpreter
    /// 3. Register the `TRNSYSpy` bridge module
    /// 4. Add venv site-packages and extra search paths
    fn initialize(config: &Config) -> Result<Interpreter, BridgeError> {
        let start_time = std::time::Instant::now();

        let venv_path = config.get_venv_path();
        let python_home = match (config.get_python_home(), venv_path.as_deref()) {
            (Some(home), _) => Some(home),
            (None, Some(venv)) => Some(resolve_python_home(venv)?),
            (None, None) => None,
        };
        let site_packages = venv_path
            .as_deref()
            .map(resolve_site_packages)
            .transpose()?;

        if let Some(ref home) = python_home {
            env::set_var("PYTHONHOME", home);
            logger::debug(&format!("Set PYTHONHOME={}", home.display()));
        }

        let pyo3_start = std::time::Instant::now();
        pyo3::Python::initialize();
        logger::debug(&format!(
            "pyo3::Python::initialize took: {:?}",
            pyo3_start.elapsed()
        ));

        let version = pyo3::Python::attach(|py| {
            bridge_module::register(py).map_err(|e| {
                BridgeError::Initialization(format!(
                    "Failed to register the {} module: {}",
                    bridge_module::BRIDGE_MODULE_NAME,
                    e
                ))
            })?;

            if let Some(ref site_packages) = site_packages {
                add_site_dir(py, site_packages)?;
            }
            for extra in config.get_extra_sys_paths() {
                add_search_path(py, &extra)?;
            }

            let sys = PyModule::import(py, "sys")
                .map_err(|e| BridgeError::Python(format!("Failed to import sys module: {}", e)))?;
            let version = sys
                .getattr("version")?
                .extract::<String>()
                .map_err(|e| BridgeError::Python(format!("Failed to read sys.version: {}", e)))?;
            Ok::<String, BridgeError>(
                version
                    .split_whitespace()
                    .next()
                    .unwrap_or_default()
                    .to_string(),
            )
        })?;

        logger::info(&format!("Embedded Python {} ready", version));
        logger::debug(&format!(
            "Total interpreter initialization took: {:?}",
            start_time.elapsed()
        ));

        Ok(Interpreter { version })
    }
}

fn add_site_dir(py: Python<'_>, site_packages: &Path) -> Result<(), BridgeError> {
    let site = PyModule::import(py, "site")
        .map_err(|e| BridgeError::Python(format!("Failed to import site module: {}", e)))?;
    site.call_method1("addsitedir", (path_str(site_packages),))
        .map_err(|e| BridgeError::Python(format!("Failed to add site directory: {}", e)))?;
    logger::debug(&format!("Added site directory {}", site_packages.display()));
    Ok(())
}

/// Put `dir` at the front of `sys.path` unless it is already listed
///
/// Returns whether the entry was added by this call.
fn add_search_path(py: Python<'_>, dir: &Path) -> Result<bool, BridgeError> {
    let entry = path_str(dir);
    let sys_path = PyModule::import(py, "sys")?.getattr("path")?;
    if sys_path.contains(&entry)? {
        return Ok(false);
    }
    sys_path
        .call_method1("insert", (0, &entry))
        .map_err(|e| BridgeError::Python(format!("Failed to extend sys.path: {}", e)))?;
    logger::debug(&format!("Added {} to sys.path", entry));
    Ok(true)
}

/// Register one more session using `dir`, adding it to `sys.path` for the first
pub(crate) fn acquire_search_path(py: Python<'_>, dir: &Path) -> Result<(), BridgeError> {
    let entry = path_str(dir);
    let mut paths = SEARCH_PATHS
        .lock()
        .map_err(|_| BridgeError::Python("search path registry poisoned".to_string()))?;
    if let Some(existing) = paths.get_mut(&entry) {
        existing.users += 1;
        return Ok(());
    }
    let inserted = add_search_path(py, dir)?;
    paths.insert(entry, SearchPathEntry { users: 1, inserted });
    Ok(())
}

/// Drop one session's use of `dir`
///
/// The `sys.path` entry goes away with its last user, and only if a session
/// added it.
pub(crate) fn release_search_path(py: Python<'_>, dir: &Path) -> Result<(), BridgeError> {
    let entry = path_str(dir);
    let mut paths = SEARCH_PATHS
        .lock()
        .map_err(|_| BridgeError::Python("search path registry poisoned".to_string()))?;
    let Some(existing) = paths.get_mut(&entry) else {
        return Ok(());
    };
    existing.users = existing.users.saturating_sub(1);
    if existing.users > 0 {
        return Ok(());
    }
    let inserted = existing.inserted;
    paths.remove(&entry);
    if inserted {
        remove_search_path(py, dir)?;
    }
    Ok(())
}

/// Remove `dir` from `sys.path` if present
fn remove_search_path(py: Python<'_>, dir: &Path) -> Result<(), BridgeError> {
    let entry = path_str(dir);
    let sys_path = PyModule::import(py, "sys")?.getattr("path")?;
    if sys_path.contains(&entry)? {
        sys_path.call_method1("remove", (&entry,))?;
    }
    Ok(())
}

pub(crate) fn path_str(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
