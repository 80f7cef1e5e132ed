//! The script runtime behind the lifecycle
//!
//! [`crate::lifecycle::Lifecycle`] only needs to load a script, call it and
//! let it go. [`PythonRuntime`] does that with the embedded interpreter;
//! tests substitute a runtime that never starts Python.

use crate::path_resolver::ResolvedScript;
use trnpy_config::Config;
use tracing::debug;
use trnpy_python::{BridgeError, Interpreter, Session};

pub trait ScriptRuntime {
    /// A loaded script and its resolved entry point
    type Session;

    /// Load `script` for `unit`; each unit gets its own module instance
    fn load(
        &mut self,
        script: &ResolvedScript,
        function: &str,
        unit: i32,
    ) -> Result<Self::Session, BridgeError>;

    fn invoke(&mut self, session: &Self::Session) -> Result<(), BridgeError>;

    fn release(&mut self, session: Self::Session);
}

/// Name a unit's script module is registered under in `sys.modules`
///
/// Dots would make Python treat the key as a package path.
pub fn module_key(module_name: &str, unit: i32) -> String {
    format!("{}__unit{}", module_name.replace('.', "_"), unit)
}

/// Runs scripts in the process-wide embedded interpreter
pub struct PythonRuntime {
    config: Config,
}

impl PythonRuntime {
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ScriptRuntime for PythonRuntime {
    type Session = Session;

    fn load(
        &mut self,
        script: &ResolvedScript,
        function: &str,
        unit: i32,
    ) -> Result<Session, BridgeError> {
        let interpreter = Interpreter::get(&self.config)?;
        debug!(python = %interpreter.version(), script = %script.path.display(), "loading script");
        Session::load(
            interpreter,
            &script.path,
            &script.directory,
            &module_key(&script.module_name, unit),
            function,
        )
    }

    fn invoke(&mut self, session: &Session) -> Result<(), BridgeError> {
        session.invoke()
    }

    fn release(&mut self, session: Session) {
        session.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_key_is_unique_per_unit() {
        assert_eq!(module_key("controller", 12), "controller__unit12");
        assert_ne!(module_key("controller", 12), module_key("controller", 13));
        assert_eq!(module_key("model.v2", 3), "model_v2__unit3");
    }
}
