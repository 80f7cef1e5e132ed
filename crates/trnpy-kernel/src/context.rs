use std::fmt;

/// Phase signals the kernel sets before calling a Type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PhaseFlags {
    pub version_query: bool,
    pub first_call: bool,
    pub start_time: bool,
    pub end_of_step: bool,
    pub last_call: bool,
}

/// Snapshot of the kernel globals taken at the top of every call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InvocationContext {
    pub time: f64,
    pub timestep: f64,
    pub unit: i32,
    pub type_number: i32,
    pub flags: PhaseFlags,
}

/// Severity of a message sent through the kernel's reporting channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Notice,
    Warning,
    Fatal,
}

impl Severity {
    /// Label the kernel expects in the `type` argument of `messages`
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Notice => "Notice",
            Severity::Warning => "Warning",
            Severity::Fatal => "Fatal",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_labels() {
        assert_eq!(Severity::Fatal.to_string(), "Fatal");
        assert_eq!(Severity::Notice.as_str(), "Notice");
        assert_eq!(Severity::Warning.as_str(), "Warning");
    }
}
