//! Per-unit settings read from the deck

use crate::errors::{ParameterViolation, UnitError, NEGATIVE_INPUTS, NEGATIVE_OUTPUTS};
use trnpy_kernel::Kernel;

/// Parameter holding the number of inputs
pub const INPUT_COUNT_PARAMETER: i32 = 1;
/// Parameter holding the number of outputs
pub const OUTPUT_COUNT_PARAMETER: i32 = 2;
/// Label holding the script reference
pub const SCRIPT_LABEL: i32 = 1;
/// Label holding the entry-point function name
pub const FUNCTION_LABEL: i32 = 2;

/// Input and output counts of a unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Counts {
    pub inputs: i32,
    pub outputs: i32,
}

impl Counts {
    pub fn read(kernel: &dyn Kernel) -> Counts {
        Counts {
            inputs: read_count(kernel, INPUT_COUNT_PARAMETER),
            outputs: read_count(kernel, OUTPUT_COUNT_PARAMETER),
        }
    }

    /// Every negative count, in parameter order
    pub fn validate(&self) -> Result<(), UnitError> {
        let mut violations: Vec<ParameterViolation> = Vec::new();
        if self.inputs < 0 {
            violations.push(NEGATIVE_INPUTS);
        }
        if self.outputs < 0 {
            violations.push(NEGATIVE_OUTPUTS);
        }
        if violations.is_empty() {
            Ok(())
        } else {
            Err(UnitError::InvalidParameters(violations))
        }
    }
}

/// What a unit was configured with at start time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitConfiguration {
    pub counts: Counts,
    pub script_reference: String,
    pub function_name: String,
}

impl UnitConfiguration {
    pub fn read(kernel: &dyn Kernel, unit: i32, counts: Counts) -> UnitConfiguration {
        UnitConfiguration {
            counts,
            script_reference: trim_label(&kernel.label(unit, SCRIPT_LABEL)),
            function_name: trim_label(&kernel.label(unit, FUNCTION_LABEL)),
        }
    }
}

/// Integer count from a real-valued parameter
///
/// The kernel stores every parameter as a double; the offset absorbs values
/// such as `2.9999999` coming out of deck equations.
pub fn read_count(kernel: &dyn Kernel, index: i32) -> i32 {
    (kernel.parameter_value(index) + 0.1).floor() as i32
}

/// Strip the blank and NUL padding of a fixed-length kernel string
pub fn trim_label(label: &str) -> String {
    label
        .trim_matches(|c: char| c.is_whitespace() || c == '\0')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use trnpy_kernel::testing::RecordingKernel;

    #[test]
    fn test_counts_round_near_integers() {
        let kernel = RecordingKernel::new().with_parameters(&[2.9999, 4.0]);
        assert_eq!(
            Counts::read(&kernel),
            Counts {
                inputs: 3,
                outputs: 4
            }
        );
    }

    #[test]
    fn test_negative_count_stays_negative() {
        let kernel = RecordingKernel::new().with_parameters(&[-1.0, 0.0]);
        let counts = Counts::read(&kernel);
        assert_eq!(counts.inputs, -1);
        assert_eq!(counts.outputs, 0);
    }

    #[test]
    fn test_validate_collects_both_violations() {
        let counts = Counts {
            inputs: -1,
            outputs: -2,
        };
        match counts.validate() {
            Err(UnitError::InvalidParameters(violations)) => {
                let indices: Vec<i32> = violations.iter().map(|v| v.index).collect();
                assert_eq!(indices, vec![2, 3]);
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(Counts {
            inputs: 0,
            outputs: 0
        }
        .validate()
        .is_ok());
    }

    #[test]
    fn test_labels_are_trimmed() {
        let kernel = RecordingKernel::new()
            .with_parameters(&[1.0, 1.0])
            .with_labels(7, &["  model.py   ", "step\0\0\0"]);
        let config = UnitConfiguration::read(&kernel, 7, Counts::read(&kernel));
        assert_eq!(config.script_reference, "model.py");
        assert_eq!(config.function_name, "step");
    }
}
