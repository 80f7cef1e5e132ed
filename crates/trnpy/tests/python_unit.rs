//! A unit driven through every phase with the embedded interpreter

use std::fs;
use std::rc::Rc;
use tempfile::TempDir;
use trnpy::{Lifecycle, PythonRuntime};
use trnpy_config::Config;
use trnpy_kernel::testing::RecordingKernel;
use trnpy_kernel::{KernelHandle, PhaseFlags, Severity};

fn run_phase(lifecycle: &mut Lifecycle<PythonRuntime>, kernel: &Rc<RecordingKernel>, flags: PhaseFlags) {
    kernel.set_flags(flags);
    let handle: KernelHandle = kernel.clone();
    lifecycle.call(&handle);
}

#[test]
fn test_full_run_with_python_script() {
    let Ok(deck) = TempDir::new() else {
        panic!("failed to create temp dir");
    };
    let script = r#"
import TRNSYSpy as TRNSYS

calls = 0

def heat_balance():
    global calls
    calls += 1
    mass_flow = TRNSYS.getInputValue(1)
    delta_t = TRNSYS.getInputValue(2)
    TRNSYS.setOutputValue(1, mass_flow * 4.19 * delta_t)
    TRNSYS.setOutputValue(2, float(calls))
"#;
    assert!(fs::write(deck.path().join("trnpy_heat_balance.py"), script).is_ok());

    let config = Config::default();
    let mut lifecycle = Lifecycle::new(PythonRuntime::new(config.clone()), &config);
    let kernel = Rc::new(
        RecordingKernel::new()
            .with_unit(3, 169)
            .with_parameters(&[2.0, 2.0])
            .with_inputs(&[10.0, 5.0])
            .with_labels(3, &["trnpy_heat_balance.py", "heat_balance"])
            .with_dirs("/opt/trnsys", &deck.path().to_string_lossy()),
    );

    run_phase(
        &mut lifecycle,
        &kernel,
        PhaseFlags {
            first_call: true,
            ..PhaseFlags::default()
        },
    );
    assert_eq!(kernel.declaration().inputs, Some(2));

    run_phase(
        &mut lifecycle,
        &kernel,
        PhaseFlags {
            start_time: true,
            ..PhaseFlags::default()
        },
    );
    assert!(kernel.fatal_messages().is_empty(), "{:?}", kernel.fatal_messages());
    assert!(kernel
        .reports()
        .iter()
        .any(|r| r.severity == Severity::Notice && r.message.contains("heat_balance")));
    assert_eq!(kernel.output(1), Some(0.0));

    run_phase(&mut lifecycle, &kernel, PhaseFlags::default());
    assert_eq!(kernel.output(1), Some(10.0 * 4.19 * 5.0));
    assert_eq!(kernel.output(2), Some(1.0));

    kernel.set_input(2, 0.0);
    run_phase(&mut lifecycle, &kernel, PhaseFlags::default());
    assert_eq!(kernel.output(1), Some(0.0));
    assert_eq!(kernel.output(2), Some(2.0));

    run_phase(
        &mut lifecycle,
        &kernel,
        PhaseFlags {
            last_call: true,
            ..PhaseFlags::default()
        },
    );
    assert!(!lifecycle.is_loaded(3));
}

#[test]
fn test_missing_function_is_fatal() {
    let Ok(deck) = TempDir::new() else {
        panic!("failed to create temp dir");
    };
    assert!(fs::write(deck.path().join("trnpy_wrong_name.py"), "def other():\n    pass\n").is_ok());

    let config = Config::default();
    let mut lifecycle = Lifecycle::new(PythonRuntime::new(config.clone()), &config);
    let kernel = Rc::new(
        RecordingKernel::new()
            .with_parameters(&[0.0, 1.0])
            .with_labels(1, &["trnpy_wrong_name.py", "main"])
            .with_dirs("/opt/trnsys", &deck.path().to_string_lossy()),
    );

    run_phase(
        &mut lifecycle,
        &kernel,
        PhaseFlags {
            start_time: true,
            ..PhaseFlags::default()
        },
    );
    let fatal = kernel.fatal_messages();
    assert_eq!(fatal.len(), 1);
    assert!(fatal[0].starts_with("Failed to load the function, main"));
    assert!(!lifecycle.is_loaded(1));
}

#[test]
fn test_units_with_same_script_name_stay_separate() {
    let Ok(deck) = TempDir::new() else {
        panic!("failed to create temp dir");
    };
    for (dir, value) in [("north", 111.0), ("south", 222.0)] {
        let script = format!(
            "import TRNSYSpy as TRNSYS\n\ndef step():\n    TRNSYS.setOutputValue(1, {:.1})\n",
            value
        );
        assert!(fs::create_dir_all(deck.path().join(dir)).is_ok());
        assert!(fs::write(deck.path().join(dir).join("zone_controller.py"), script).is_ok());
    }

    let config = Config::default();
    let mut lifecycle = Lifecycle::new(PythonRuntime::new(config.clone()), &config);
    let kernel = Rc::new(
        RecordingKernel::new()
            .with_parameters(&[0.0, 1.0])
            .with_labels(10, &["north/zone_controller.py", "step"])
            .with_labels(20, &["south/zone_controller.py", "step"])
            .with_dirs("/opt/trnsys", &deck.path().to_string_lossy()),
    );
    let start_time = PhaseFlags {
        start_time: true,
        ..PhaseFlags::default()
    };

    kernel.set_unit(10);
    run_phase(&mut lifecycle, &kernel, start_time);
    kernel.set_unit(20);
    run_phase(&mut lifecycle, &kernel, start_time);
    assert!(kernel.fatal_messages().is_empty(), "{:?}", kernel.fatal_messages());

    kernel.set_unit(10);
    run_phase(&mut lifecycle, &kernel, PhaseFlags::default());
    assert_eq!(kernel.output(1), Some(111.0));

    kernel.set_unit(20);
    run_phase(&mut lifecycle, &kernel, PhaseFlags::default());
    assert_eq!(kernel.output(1), Some(222.0));

    // Releasing one unit leaves the other's module in place.
    kernel.set_unit(10);
    run_phase(
        &mut lifecycle,
        &kernel,
        PhaseFlags {
            last_call: true,
            ..PhaseFlags::default()
        },
    );
    kernel.set_unit(20);
    run_phase(&mut lifecycle, &kernel, PhaseFlags::default());
    assert_eq!(kernel.output(1), Some(222.0));
    assert!(lifecycle.is_loaded(20));
}
