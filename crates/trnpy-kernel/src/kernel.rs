use crate::context::{InvocationContext, PhaseFlags, Severity};
use std::rc::Rc;

/// Shared handle to the kernel for the duration of one entry-point call
pub type KernelHandle = Rc<dyn Kernel>;

/// The kernel's global access functions, as seen by a Type
///
/// Indices are 1-based, matching the kernel's own convention. Out-of-range
/// indices are passed through untouched; what happens then is up to the
/// kernel.
pub trait Kernel {
    fn simulation_time(&self) -> f64;
    fn simulation_timestep(&self) -> f64;
    fn current_unit(&self) -> i32;
    fn current_type(&self) -> i32;
    fn phase_flags(&self) -> PhaseFlags;

    fn parameter_value(&self, index: i32) -> f64;
    fn input_value(&self, index: i32) -> f64;
    fn set_output_value(&self, index: i32, value: f64);

    fn set_type_version(&self, version: i32);
    fn set_number_of_parameters(&self, count: i32);
    fn set_number_of_inputs(&self, count: i32);
    fn set_number_of_derivatives(&self, count: i32);
    fn set_number_of_outputs(&self, count: i32);
    fn set_iteration_mode(&self, mode: i32);
    fn set_number_stored_variables(&self, static_count: i32, dynamic_count: i32);
    fn set_input_units(&self, index: i32, unit: &str);
    fn set_output_units(&self, index: i32, unit: &str);

    /// Label `index` attached to `unit` in the deck, exactly as the kernel
    /// stores it (padding included).
    fn label(&self, unit: i32, index: i32) -> String;
    fn root_dir(&self) -> String;
    fn input_file_dir(&self) -> String;

    /// Send a message through the kernel's message channel.
    fn report(&self, severity: Severity, unit: i32, type_number: i32, message: &str);

    /// Flag a parameter as invalid; fatal severities stop the run.
    fn found_bad_parameter(&self, index: i32, severity: Severity, message: &str);

    fn context(&self) -> InvocationContext {
        InvocationContext {
            time: self.simulation_time(),
            timestep: self.simulation_timestep(),
            unit: self.current_unit(),
            type_number: self.current_type(),
            flags: self.phase_flags(),
        }
    }
}
