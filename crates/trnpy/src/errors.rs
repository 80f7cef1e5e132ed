use crate::path_resolver::PathError;
use thiserror::Error;
use trnpy_kernel::{Kernel, Severity};
use trnpy_logger as logger;

/// A parameter value the Type cannot run with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterViolation {
    /// Index reported to the kernel's bad-parameter channel
    pub index: i32,
    pub message: &'static str,
}

pub const NEGATIVE_INPUTS: ParameterViolation = ParameterViolation {
    index: 2,
    message: "The number of inputs cannot be less than 0.",
};

pub const NEGATIVE_OUTPUTS: ParameterViolation = ParameterViolation {
    index: 3,
    message: "The number of outputs cannot be less than 0.",
};

/// Everything that stops a unit of this Type
///
/// Each variant is sent to the kernel as exactly one fatal message per
/// problem, see [`UnitError::report`].
#[derive(Error, Debug)]
pub enum UnitError {
    #[error("{}", describe(.0))]
    InvalidParameters(Vec<ParameterViolation>),

    #[error(transparent)]
    Script(#[from] PathError),

    #[error("The Python interpreter could not be started: {0}")]
    InterpreterInit(String),

    #[error("The Python script file failed to load: {script} ({message})")]
    ModuleImport { script: String, message: String },

    #[error("Failed to load the function, {function}, from the Python script file: {script}")]
    EntryPoint { function: String, script: String },

    #[error("Failed to load the function, {function}, from the Python script file: {script} ({message})")]
    EntryPointLookup {
        function: String,
        script: String,
        message: String,
    },

    #[error("Failed to call the function, {function}, from the Python script file: {script} ({message})")]
    Invocation {
        function: String,
        script: String,
        message: String,
    },

    #[error("No Python function is loaded for unit {0}; the start-time call did not complete.")]
    NotLoaded(i32),
}

fn describe(violations: &[ParameterViolation]) -> String {
    violations
        .iter()
        .map(|v| v.message)
        .collect::<Vec<_>>()
        .join(" ")
}

impl UnitError {
    /// Send this error to the kernel as a fatal message and log it
    pub fn report(&self, kernel: &dyn Kernel, unit: i32, type_number: i32) {
        match self {
            UnitError::InvalidParameters(violations) => {
                for violation in violations {
                    logger::error(violation.message);
                    kernel.found_bad_parameter(violation.index, Severity::Fatal, violation.message);
                }
            }
            other => {
                let message = other.to_string();
                logger::error(&message);
                kernel.report(Severity::Fatal, unit, type_number, &message);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trnpy_kernel::testing::RecordingKernel;

    #[test]
    fn test_each_violation_is_its_own_bad_parameter() {
        let kernel = RecordingKernel::new();
        UnitError::InvalidParameters(vec![NEGATIVE_INPUTS, NEGATIVE_OUTPUTS]).report(&kernel, 4, 169);

        let bad = kernel.bad_parameters();
        assert_eq!(bad.len(), 2);
        assert_eq!(bad[0].index, 2);
        assert_eq!(bad[1].index, 3);
        assert!(bad.iter().all(|p| p.severity == Severity::Fatal));
        assert!(kernel.reports().is_empty());
    }

    #[test]
    fn test_other_errors_use_the_message_channel() {
        let kernel = RecordingKernel::new();
        UnitError::EntryPoint {
            function: "step".to_string(),
            script: "model.py".to_string(),
        }
        .report(&kernel, 4, 169);

        let reports = kernel.reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].unit, 4);
        assert_eq!(reports[0].severity, Severity::Fatal);
        assert_eq!(
            reports[0].message,
            "Failed to load the function, step, from the Python script file: model.py"
        );
    }

    #[test]
    fn test_missing_script_names_the_path() {
        let err = UnitError::from(PathError::NotFound("C:\\Deck1\\model.py".to_string()));
        assert!(err.to_string().ends_with("C:\\Deck1\\model.py"));
    }
}
