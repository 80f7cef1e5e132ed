//! The `TRNSYSpy` module scripts import to talk to the kernel
//!
//! Every function forwards straight to the kernel of the call in progress:
//! values are never cached and indices are passed through 1-based, exactly as
//! the kernel numbers its parameters, inputs and outputs.
//!
//! ```python
//! import TRNSYSpy as TRNSYS
//!
//! def main():
//!     t = TRNSYS.getSimulationTime()
//!     TRNSYS.setOutputValue(1, TRNSYS.getInputValue(1) * 2.0)
//! ```

use pyo3::exceptions::PyRuntimeError;
use pyo3::prelude::*;
use trnpy_kernel::scope;

/// Name under which the bridge is importable
pub const BRIDGE_MODULE_NAME: &str = "TRNSYSpy";

/// Snake-case aliases installed next to the kernel-style names
const ALIASES: &[(&str, &str)] = &[
    ("get_parameter", "getParameterValue"),
    ("get_input", "getInputValue"),
    ("set_output", "setOutputValue"),
    ("get_simulation_time", "getSimulationTime"),
    ("get_simulation_timestep", "getSimulationTimeStep"),
    ("get_current_unit", "getCurrentUnit"),
    ("get_current_type", "getCurrentType"),
];

fn no_active_kernel() -> PyErr {
    PyRuntimeError::new_err(
        "TRNSYSpy can only be used while the kernel is calling this Type",
    )
}

/// A double precision function that returns the value of the current Unit's ith parameter.
#[pyfunction]
#[pyo3(name = "getParameterValue")]
fn get_parameter_value(index: i32) -> PyResult<f64> {
    scope::with_active(|kernel| kernel.parameter_value(index)).ok_or_else(no_active_kernel)
}

/// A double precision function that returns the current value of the current Unit's ith input.
#[pyfunction]
#[pyo3(name = "getInputValue")]
fn get_input_value(index: i32) -> PyResult<f64> {
    scope::with_active(|kernel| kernel.input_value(index)).ok_or_else(no_active_kernel)
}

/// Send the value back to the TRNSYS kernel for global storage.
#[pyfunction]
#[pyo3(name = "setOutputValue")]
fn set_output_value(index: i32, value: f64) -> PyResult<()> {
    scope::with_active(|kernel| kernel.set_output_value(index, value)).ok_or_else(no_active_kernel)
}

/// Get simulation time
#[pyfunction]
#[pyo3(name = "getSimulationTime")]
fn get_simulation_time() -> PyResult<f64> {
    scope::with_active(|kernel| kernel.simulation_time()).ok_or_else(no_active_kernel)
}

/// Get the simulation time step
#[pyfunction]
#[pyo3(name = "getSimulationTimeStep")]
fn get_simulation_timestep() -> PyResult<f64> {
    scope::with_active(|kernel| kernel.simulation_timestep()).ok_or_else(no_active_kernel)
}

/// Get the number of the Unit being called
#[pyfunction]
#[pyo3(name = "getCurrentUnit")]
fn get_current_unit() -> PyResult<i32> {
    scope::with_active(|kernel| kernel.current_unit()).ok_or_else(no_active_kernel)
}

/// Get the Type number of the Unit being called
#[pyfunction]
#[pyo3(name = "getCurrentType")]
fn get_current_type() -> PyResult<i32> {
    scope::with_active(|kernel| kernel.current_type()).ok_or_else(no_active_kernel)
}

#[pymodule]
#[pyo3(name = "TRNSYSpy")]
fn trnsys_py(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(get_parameter_value, m)?)?;
    m.add_function(wrap_pyfunction!(get_input_value, m)?)?;
    m.add_function(wrap_pyfunction!(set_output_value, m)?)?;
    m.add_function(wrap_pyfunction!(get_simulation_time, m)?)?;
    m.add_function(wrap_pyfunction!(get_simulation_timestep, m)?)?;
    m.add_function(wrap_pyfunction!(get_current_unit, m)?)?;
    m.add_function(wrap_pyfunction!(get_current_type, m)?)?;
    for (alias, target) in ALIASES {
        m.add(*alias, m.getattr(*target)?)?;
    }
    Ok(())
}

/// Make `TRNSYSpy` importable in an initialized interpreter
///
/// The module is placed straight into `sys.modules`, which works whether or
/// not the interpreter was started by this Type.
pub fn register(py: Python<'_>) -> PyResult<()> {
    let module = pyo3::wrap_pymodule!(trnsys_py)(py);
    let sys = PyModule::import(py, "sys")?;
    sys.getattr("modules")?
        .set_item(BRIDGE_MODULE_NAME, module)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aliases_point_at_exported_names() {
        let exported = [
            "getParameterValue",
            "getInputValue",
            "setOutputValue",
            "getSimulationTime",
            "getSimulationTimeStep",
            "getCurrentUnit",
            "getCurrentType",
        ];
        for (_, target) in ALIASES {
            assert!(exported.contains(target), "unknown alias target {}", target);
        }
    }

    #[test]
    fn test_outside_call_is_an_error() {
        assert!(get_parameter_value(1).is_err());
        assert!(set_output_value(1, 0.0).is_err());
    }
}
