//! Per-call dispatch for every unit of this Type
//!
//! The kernel calls the Type many times per time step and once for each of
//! the simulation's housekeeping phases. [`Lifecycle::call`] decodes which
//! phase this call is and runs the matching step:
//! - version query: sign the Type
//! - first call: declare parameters, inputs and outputs
//! - start time: validate, locate the script and load its entry point
//! - steady state: call the entry point
//! - last call: release the unit's script
//!
//! Each unit keeps its own configuration and script, so one deck can use the
//! Type several times with different scripts.

use crate::errors::UnitError;
use crate::path_resolver::ResolvedScript;
use crate::phase::Phase;
use crate::runtime::ScriptRuntime;
use crate::unit::{Counts, UnitConfiguration};
use std::collections::HashMap;
use tracing::{debug, trace};
use trnpy_config::Config;
use trnpy_kernel::{scope, InvocationContext, Kernel, KernelHandle, Severity};
use trnpy_logger as logger;
use trnpy_python::BridgeError;

/// Parameters every unit of this Type takes
pub const PARAMETER_COUNT: i32 = 2;

struct UnitState<S> {
    config: UnitConfiguration,
    script: ResolvedScript,
    session: S,
}

pub struct Lifecycle<R: ScriptRuntime> {
    runtime: R,
    type_version: i32,
    default_unit: String,
    units: HashMap<i32, UnitState<R::Session>>,
    startup_warning: Option<String>,
}

impl<R: ScriptRuntime> Lifecycle<R> {
    pub fn new(runtime: R, config: &Config) -> Self {
        Self {
            runtime,
            type_version: config.get_type_version(),
            default_unit: config.get_default_unit().to_string(),
            units: HashMap::new(),
            startup_warning: None,
        }
    }

    /// Queue a warning for the kernel, sent on the next start-time call
    pub fn set_startup_warning(&mut self, message: String) {
        self.startup_warning = Some(message);
    }

    /// Handle one call from the kernel
    ///
    /// Failures are reported to the kernel here; the kernel decides whether
    /// the run continues.
    pub fn call(&mut self, kernel: &KernelHandle) {
        let ctx = kernel.context();
        logger::set_current_unit(Some(ctx.unit));
        let phase = Phase::decode(ctx.flags);
        trace!(unit = ctx.unit, time = ctx.time, %phase, "TYPE169 called");

        let result = match phase {
            Phase::VersionQuery => {
                kernel.set_type_version(self.type_version);
                Ok(())
            }
            Phase::LastCall => {
                self.release(ctx.unit);
                Ok(())
            }
            Phase::EndOfStep => Ok(()),
            Phase::FirstCall => {
                self.declare(kernel.as_ref());
                Ok(())
            }
            Phase::StartTime => self.start(kernel, &ctx),
            Phase::SteadyState => self.step(kernel, &ctx),
        };

        if let Err(e) = result {
            e.report(kernel.as_ref(), ctx.unit, ctx.type_number);
        }
    }

    /// Number of units with a loaded script
    pub fn loaded_units(&self) -> usize {
        self.units.len()
    }

    pub fn is_loaded(&self, unit: i32) -> bool {
        self.units.contains_key(&unit)
    }

    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    fn declare(&self, kernel: &dyn Kernel) {
        let counts = Counts::read(kernel);
        kernel.set_number_of_parameters(PARAMETER_COUNT);
        kernel.set_number_of_inputs(counts.inputs);
        kernel.set_number_of_derivatives(0);
        kernel.set_number_of_outputs(counts.outputs);
        kernel.set_iteration_mode(1);
        kernel.set_number_stored_variables(0, 0);
        for index in 1..=counts.inputs {
            kernel.set_input_units(index, &self.default_unit);
        }
        for index in 1..=counts.outputs {
            kernel.set_output_units(index, &self.default_unit);
        }
    }

    fn start(&mut self, kernel: &KernelHandle, ctx: &InvocationContext) -> Result<(), UnitError> {
        // A unit restarted without a last call still holds the previous run's script.
        self.release(ctx.unit);

        if let Some(warning) = self.startup_warning.take() {
            logger::warn(&warning);
            kernel.report(Severity::Warning, ctx.unit, ctx.type_number, &warning);
        }

        let counts = Counts::read(kernel.as_ref());
        counts.validate()?;
        for index in 1..=counts.outputs {
            kernel.set_output_value(index, 0.0);
        }

        let config = UnitConfiguration::read(kernel.as_ref(), ctx.unit, counts);
        let script = ResolvedScript::locate(
            &config.script_reference,
            &kernel.root_dir(),
            &kernel.input_file_dir(),
        )?;
        logger::debug(&format!(
            "Unit {} uses {} (module {})",
            ctx.unit,
            script.path.display(),
            script.module_name
        ));

        // Module-level code may already use TRNSYSpy.
        let loaded = {
            let _active = scope::enter(kernel.clone());
            self.runtime.load(&script, &config.function_name, ctx.unit)
        };
        let session = loaded.map_err(|e| load_failure(e, &script, &config.function_name))?;

        let notice = format!(
            "The Python function, {}, was loaded from the script file: {}",
            config.function_name,
            script.path.display()
        );
        logger::info(&notice);
        kernel.report(Severity::Notice, ctx.unit, ctx.type_number, &notice);

        self.units.insert(
            ctx.unit,
            UnitState {
                config,
                script,
                session,
            },
        );
        Ok(())
    }

    fn step(&mut self, kernel: &KernelHandle, ctx: &InvocationContext) -> Result<(), UnitError> {
        let counts = Counts::read(kernel.as_ref());
        let Some(state) = self.units.get_mut(&ctx.unit) else {
            return Err(UnitError::NotLoaded(ctx.unit));
        };
        state.config.counts = counts;

        let result = {
            let _active = scope::enter(kernel.clone());
            self.runtime.invoke(&state.session)
        };
        match result {
            Ok(()) => Ok(()),
            Err(e) => {
                let err = invocation_failure(e, &state.script, &state.config.function_name);
                // The run is over for this unit; do not keep a broken script around.
                self.release(ctx.unit);
                Err(err)
            }
        }
    }

    fn release(&mut self, unit: i32) {
        if let Some(state) = self.units.remove(&unit) {
            debug!(unit, function = %state.config.function_name, "releasing script");
            self.runtime.release(state.session);
        }
    }
}

fn load_failure(err: BridgeError, script: &ResolvedScript, function: &str) -> UnitError {
    let script_path = script.path.display().to_string();
    match err {
        BridgeError::Import { message, .. }
        | BridgeError::Python(message)
        | BridgeError::Invocation { message, .. } => UnitError::ModuleImport {
            script: script_path,
            message,
        },
        BridgeError::EntryPointMissing { .. } | BridgeError::NotCallable { .. } => {
            UnitError::EntryPoint {
                function: function.to_string(),
                script: script_path,
            }
        }
        BridgeError::EntryPointLookup { message, .. } => UnitError::EntryPointLookup {
            function: function.to_string(),
            script: script_path,
            message,
        },
        BridgeError::Initialization(message) => UnitError::InterpreterInit(message),
        BridgeError::Environment(e) => UnitError::InterpreterInit(e.to_string()),
    }
}

fn invocation_failure(err: BridgeError, script: &ResolvedScript, function: &str) -> UnitError {
    let message = match err {
        BridgeError::Invocation { message, .. } => message,
        other => other.to_string(),
    };
    UnitError::Invocation {
        function: function.to_string(),
        script: script.path.display().to_string(),
        message,
    }
}
