//! The `TYPE169` symbol called by the kernel
//!
//! Everything that outlives a single call sits in process-wide cells: the
//! configuration, the resolved kernel symbols and the [`Lifecycle`] with the
//! units' loaded scripts. The kernel calls Types one at a time from one
//! thread, so the lifecycle lock is only ever contended by re-entry.

use crate::lifecycle::Lifecycle;
use crate::logging;
use crate::runtime::PythonRuntime;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;
use trnpy_config::Config;
use trnpy_kernel::{KernelHandle, KernelSymbols, Severity, TrnsysKernel};
use trnpy_logger as logger;

struct PluginConfig {
    config: Config,
    /// Why the configuration file was ignored, if it was
    warning: Option<String>,
}

static CONFIG: OnceCell<PluginConfig> = OnceCell::new();
static SYMBOLS: OnceCell<Result<KernelSymbols, String>> = OnceCell::new();
static LIFECYCLE: OnceCell<Mutex<Lifecycle<PythonRuntime>>> = OnceCell::new();

fn plugin_config() -> &'static PluginConfig {
    CONFIG.get_or_init(|| match Config::load() {
        Ok(config) => PluginConfig {
            config,
            warning: None,
        },
        Err(e) => PluginConfig {
            config: Config::default(),
            warning: Some(format!(
                "The trnpy configuration file was ignored and defaults are used: {}",
                e
            )),
        },
    })
}

fn kernel_symbols() -> Result<&'static KernelSymbols, &'static str> {
    SYMBOLS
        .get_or_init(|| {
            KernelSymbols::load(plugin_config().config.get_kernel_library()).map_err(|e| e.to_string())
        })
        .as_ref()
        .map_err(String::as_str)
}

fn lifecycle() -> &'static Mutex<Lifecycle<PythonRuntime>> {
    LIFECYCLE.get_or_init(|| {
        let plugin = plugin_config();
        if let Err(e) = logging::init(&plugin.config) {
            eprintln!("trnpy: failed to initialize logging: {}", e);
        }
        logger::debug(&format!("trnpy {} loaded", env!("CARGO_PKG_VERSION")));

        let mut lifecycle = Lifecycle::new(PythonRuntime::new(plugin.config.clone()), &plugin.config);
        if let Some(ref warning) = plugin.warning {
            lifecycle.set_startup_warning(warning.clone());
        }
        Mutex::new(lifecycle)
    })
}

/// Entry point of TRNSYS Type 169
///
/// Takes no arguments; all state is read from and written to the kernel
/// through its access functions. Never unwinds into the kernel.
#[no_mangle]
#[allow(non_snake_case)]
pub extern "C" fn TYPE169() {
    // Without the kernel's access functions there is no channel to report on.
    let symbols = match kernel_symbols() {
        Ok(symbols) => symbols,
        Err(e) => {
            eprintln!("trnpy: cannot reach the TRNSYS kernel: {}", e);
            return;
        }
    };
    let kernel: KernelHandle = Rc::new(TrnsysKernel::new(symbols));

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| dispatch(&kernel)));
    if let Err(payload) = outcome {
        let message = format!(
            "The Python Type stopped on an internal error: {}",
            panic_message(payload.as_ref())
        );
        logger::error(&message);
        kernel.report(Severity::Fatal, kernel.current_unit(), kernel.current_type(), &message);
    }
}

fn dispatch(kernel: &KernelHandle) {
    match lifecycle().try_lock() {
        Some(mut lifecycle) => lifecycle.call(kernel),
        None => {
            let message = "TYPE169 was called again while a call was in progress; \
                           Python scripts must not drive the simulation.";
            logger::error(message);
            kernel.report(Severity::Fatal, kernel.current_unit(), kernel.current_type(), message);
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}
