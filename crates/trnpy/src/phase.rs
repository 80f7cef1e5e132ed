use std::fmt;
use trnpy_kernel::PhaseFlags;

/// What the kernel is asking of the Type on this call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    VersionQuery,
    LastCall,
    EndOfStep,
    FirstCall,
    StartTime,
    SteadyState,
}

impl Phase {
    /// Decode the kernel's flags; the first flag set wins, in declaration order
    pub fn decode(flags: PhaseFlags) -> Phase {
        if flags.version_query {
            Phase::VersionQuery
        } else if flags.last_call {
            Phase::LastCall
        } else if flags.end_of_step {
            Phase::EndOfStep
        } else if flags.first_call {
            Phase::FirstCall
        } else if flags.start_time {
            Phase::StartTime
        } else {
            Phase::SteadyState
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::VersionQuery => "version query",
            Phase::LastCall => "last call",
            Phase::EndOfStep => "end of step",
            Phase::FirstCall => "first call",
            Phase::StartTime => "start time",
            Phase::SteadyState => "steady state",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_flags_is_steady_state() {
        assert_eq!(Phase::decode(PhaseFlags::default()), Phase::SteadyState);
    }

    #[test]
    fn test_single_flags() {
        let cases = [
            (
                PhaseFlags {
                    version_query: true,
                    ..PhaseFlags::default()
                },
                Phase::VersionQuery,
            ),
            (
                PhaseFlags {
                    last_call: true,
                    ..PhaseFlags::default()
                },
                Phase::LastCall,
            ),
            (
                PhaseFlags {
                    end_of_step: true,
                    ..PhaseFlags::default()
                },
                Phase::EndOfStep,
            ),
            (
                PhaseFlags {
                    first_call: true,
                    ..PhaseFlags::default()
                },
                Phase::FirstCall,
            ),
            (
                PhaseFlags {
                    start_time: true,
                    ..PhaseFlags::default()
                },
                Phase::StartTime,
            ),
        ];
        for (flags, expected) in cases {
            assert_eq!(Phase::decode(flags), expected);
        }
    }

    #[test]
    fn test_priority_when_flags_overlap() {
        let all = PhaseFlags {
            version_query: true,
            first_call: true,
            start_time: true,
            end_of_step: true,
            last_call: true,
        };
        assert_eq!(Phase::decode(all), Phase::VersionQuery);

        let closing = PhaseFlags {
            last_call: true,
            end_of_step: true,
            ..PhaseFlags::default()
        };
        assert_eq!(Phase::decode(closing), Phase::LastCall);

        let starting = PhaseFlags {
            first_call: true,
            start_time: true,
            ..PhaseFlags::default()
        };
        assert_eq!(Phase::decode(starting), Phase::FirstCall);
    }
}
