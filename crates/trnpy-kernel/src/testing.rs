//! In-memory kernel for exercising Type logic without a simulation
//!
//! [`RecordingKernel`] holds the values a deck would provide and records
//! everything the Type sends back, so tests can assert on declarations,
//! outputs and messages.

use crate::context::{PhaseFlags, Severity};
use crate::kernel::Kernel;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};

/// A message sent through `report`
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub severity: Severity,
    pub unit: i32,
    pub type_number: i32,
    pub message: String,
}

/// A call to `found_bad_parameter`
#[derive(Debug, Clone, PartialEq)]
pub struct BadParameter {
    pub index: i32,
    pub severity: Severity,
    pub message: String,
}

/// What the Type declared about itself during the first call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypeDeclaration {
    pub version: Option<i32>,
    pub parameters: Option<i32>,
    pub inputs: Option<i32>,
    pub outputs: Option<i32>,
    pub derivatives: Option<i32>,
    pub iteration_mode: Option<i32>,
    pub stored_variables: Option<(i32, i32)>,
    pub input_units: BTreeMap<i32, String>,
    pub output_units: BTreeMap<i32, String>,
}

#[derive(Debug, Default)]
struct State {
    time: f64,
    timestep: f64,
    unit: i32,
    type_number: i32,
    flags: PhaseFlags,
    parameters: Vec<f64>,
    inputs: Vec<f64>,
    outputs: BTreeMap<i32, f64>,
    output_writes: usize,
    labels: HashMap<(i32, i32), String>,
    root_dir: String,
    input_file_dir: String,
    declaration: TypeDeclaration,
    reports: Vec<Report>,
    bad_parameters: Vec<BadParameter>,
}

#[derive(Debug)]
pub struct RecordingKernel {
    state: RefCell<State>,
}

impl Default for RecordingKernel {
    fn default() -> Self {
        Self::new()
    }
}

fn slot(values: &[f64], index: i32) -> f64 {
    usize::try_from(index)
        .ok()
        .and_then(|i| i.checked_sub(1))
        .and_then(|i| values.get(i).copied())
        .unwrap_or(0.0)
}

impl RecordingKernel {
    pub fn new() -> Self {
        Self {
            state: RefCell::new(State {
                timestep: 1.0,
                unit: 1,
                type_number: 169,
                ..State::default()
            }),
        }
    }

    pub fn with_unit(self, unit: i32, type_number: i32) -> Self {
        {
            let mut state = self.state.borrow_mut();
            state.unit = unit;
            state.type_number = type_number;
        }
        self
    }

    pub fn with_parameters(self, parameters: &[f64]) -> Self {
        self.state.borrow_mut().parameters = parameters.to_vec();
        self
    }

    pub fn with_inputs(self, inputs: &[f64]) -> Self {
        self.state.borrow_mut().inputs = inputs.to_vec();
        self
    }

    /// Attach labels 1..=n to `unit`
    pub fn with_labels(self, unit: i32, labels: &[&str]) -> Self {
        {
            let mut state = self.state.borrow_mut();
            for (i, label) in labels.iter().enumerate() {
                state.labels.insert((unit, i as i32 + 1), (*label).to_string());
            }
        }
        self
    }

    pub fn with_dirs(self, root_dir: &str, input_file_dir: &str) -> Self {
        {
            let mut state = self.state.borrow_mut();
            state.root_dir = root_dir.to_string();
            state.input_file_dir = input_file_dir.to_string();
        }
        self
    }

    pub fn set_flags(&self, flags: PhaseFlags) {
        self.state.borrow_mut().flags = flags;
    }

    pub fn set_unit(&self, unit: i32) {
        self.state.borrow_mut().unit = unit;
    }

    pub fn set_time(&self, time: f64, timestep: f64) {
        let mut state = self.state.borrow_mut();
        state.time = time;
        state.timestep = timestep;
    }

    pub fn set_input(&self, index: i32, value: f64) {
        let mut state = self.state.borrow_mut();
        if let Some(i) = usize::try_from(index).ok().and_then(|i| i.checked_sub(1)) {
            if state.inputs.len() <= i {
                state.inputs.resize(i + 1, 0.0);
            }
            state.inputs[i] = value;
        }
    }

    pub fn output(&self, index: i32) -> Option<f64> {
        self.state.borrow().outputs.get(&index).copied()
    }

    pub fn outputs(&self) -> BTreeMap<i32, f64> {
        self.state.borrow().outputs.clone()
    }

    pub fn output_writes(&self) -> usize {
        self.state.borrow().output_writes
    }

    pub fn declaration(&self) -> TypeDeclaration {
        self.state.borrow().declaration.clone()
    }

    pub fn reports(&self) -> Vec<Report> {
        self.state.borrow().reports.clone()
    }

    pub fn bad_parameters(&self) -> Vec<BadParameter> {
        self.state.borrow().bad_parameters.clone()
    }

    /// Fatal messages from either reporting channel
    pub fn fatal_messages(&self) -> Vec<String> {
        let state = self.state.borrow();
        state
            .bad_parameters
            .iter()
            .filter(|p| p.severity == Severity::Fatal)
            .map(|p| p.message.clone())
            .chain(
                state
                    .reports
                    .iter()
                    .filter(|r| r.severity == Severity::Fatal)
                    .map(|r| r.message.clone()),
            )
            .collect()
    }
}

impl Kernel for RecordingKernel {
    fn simulation_time(&self) -> f64 {
        self.state.borrow().time
    }

    fn simulation_timestep(&self) -> f64 {
        self.state.borrow().timestep
    }

    fn current_unit(&self) -> i32 {
        self.state.borrow().unit
    }

    fn current_type(&self) -> i32 {
        self.state.borrow().type_number
    }

    fn phase_flags(&self) -> PhaseFlags {
        self.state.borrow().flags
    }

    fn parameter_value(&self, index: i32) -> f64 {
        slot(&self.state.borrow().parameters, index)
    }

    fn input_value(&self, index: i32) -> f64 {
        slot(&self.state.borrow().inputs, index)
    }

    fn set_output_value(&self, index: i32, value: f64) {
        let mut state = self.state.borrow_mut();
        state.outputs.insert(index, value);
        state.output_writes += 1;
    }

    fn set_type_version(&self, version: i32) {
        self.state.borrow_mut().declaration.version = Some(version);
    }

    fn set_number_of_parameters(&self, count: i32) {
        self.state.borrow_mut().declaration.parameters = Some(count);
    }

    fn set_number_of_inputs(&self, count: i32) {
        self.state.borrow_mut().declaration.inputs = Some(count);
    }

    fn set_number_of_derivatives(&self, count: i32) {
        self.state.borrow_mut().declaration.derivatives = Some(count);
    }

    fn set_number_of_outputs(&self, count: i32) {
        self.state.borrow_mut().declaration.outputs = Some(count);
    }

    fn set_iteration_mode(&self, mode: i32) {
        self.state.borrow_mut().declaration.iteration_mode = Some(mode);
    }

    fn set_number_stored_variables(&self, static_count: i32, dynamic_count: i32) {
        self.state.borrow_mut().declaration.stored_variables = Some((static_count, dynamic_count));
    }

    fn set_input_units(&self, index: i32, unit: &str) {
        self.state
            .borrow_mut()
            .declaration
            .input_units
            .insert(index, unit.to_string());
    }

    fn set_output_units(&self, index: i32, unit: &str) {
        self.state
            .borrow_mut()
            .declaration
            .output_units
            .insert(index, unit.to_string());
    }

    fn label(&self, unit: i32, index: i32) -> String {
        self.state
            .borrow()
            .labels
            .get(&(unit, index))
            .cloned()
            .unwrap_or_default()
    }

    fn root_dir(&self) -> String {
        self.state.borrow().root_dir.clone()
    }

    fn input_file_dir(&self) -> String {
        self.state.borrow().input_file_dir.clone()
    }

    fn report(&self, severity: Severity, unit: i32, type_number: i32, message: &str) {
        self.state.borrow_mut().reports.push(Report {
            severity,
            unit,
            type_number,
            message: message.to_string(),
        });
    }

    fn found_bad_parameter(&self, index: i32, severity: Severity, message: &str) {
        self.state.borrow_mut().bad_parameters.push(BadParameter {
            index,
            severity,
            message: message.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slots_are_one_based() {
        let kernel = RecordingKernel::new()
            .with_parameters(&[3.0, 2.0])
            .with_inputs(&[10.0]);
        assert_eq!(kernel.parameter_value(1), 3.0);
        assert_eq!(kernel.parameter_value(2), 2.0);
        assert_eq!(kernel.parameter_value(0), 0.0);
        assert_eq!(kernel.input_value(1), 10.0);
        assert_eq!(kernel.input_value(5), 0.0);
    }

    #[test]
    fn test_context_snapshot() {
        let kernel = RecordingKernel::new().with_unit(7, 169);
        kernel.set_time(12.5, 0.25);
        kernel.set_flags(PhaseFlags {
            start_time: true,
            ..PhaseFlags::default()
        });

        let ctx = kernel.context();
        assert_eq!(ctx.unit, 7);
        assert_eq!(ctx.type_number, 169);
        assert_eq!(ctx.time, 12.5);
        assert_eq!(ctx.timestep, 0.25);
        assert!(ctx.flags.start_time);
    }
}
