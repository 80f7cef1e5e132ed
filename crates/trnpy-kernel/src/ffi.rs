//! Binding to the kernel's exported access functions
//!
//! The kernel exports its access functions from the library that loaded this
//! Type (`TRNDll64.dll` on Windows). Rather than linking against an import
//! library, the symbols are resolved at runtime from the already-loaded
//! kernel module, so the Type can be built and tested without the kernel.
//!
//! The functions follow the Fortran calling convention used by `TRNSYS.h`:
//! every scalar is passed by pointer and every character argument carries a
//! hidden `size_t` length after the regular arguments (or right after the
//! result buffer for character-valued functions).

use crate::context::{PhaseFlags, Severity};
use crate::errors::KernelError;
use crate::kernel::Kernel;
use libloading::Library;
use std::ffi::c_char;
use trnpy_logger as logger;

type GetF64 = unsafe extern "C" fn() -> f64;
type GetI32 = unsafe extern "C" fn() -> i32;
type GetFlag = unsafe extern "C" fn() -> u8;
type GetIndexed = unsafe extern "C" fn(*const i32) -> f64;
type SetIndexed = unsafe extern "C" fn(*const i32, *const f64);
type SetI32 = unsafe extern "C" fn(*const i32);
type SetI32Pair = unsafe extern "C" fn(*const i32, *const i32);
type SetUnits = unsafe extern "C" fn(*const i32, *const c_char, usize);
type GetLabel = unsafe extern "C" fn(*mut c_char, usize, *const i32, *const i32) -> *mut c_char;
type GetDir = unsafe extern "C" fn(*mut c_char, usize) -> *mut c_char;
type Messages = unsafe extern "C" fn(
    *const i32,
    *const c_char,
    *const c_char,
    *const i32,
    *const i32,
    usize,
    usize,
);
type FoundBadParameter =
    unsafe extern "C" fn(*const i32, *const c_char, *const c_char, usize, usize);

/// Fallback buffer size when the kernel reports a non-positive length
const FALLBACK_STRING_LENGTH: usize = 300;

/// Resolved kernel entry points
///
/// The library handle is kept as a field so the function pointers stay valid
/// for as long as the table exists.
pub struct KernelSymbols {
    get_simulation_time: GetF64,
    get_simulation_timestep: GetF64,
    get_current_unit: GetI32,
    get_current_type: GetI32,
    get_is_version_signing_time: GetFlag,
    get_is_first_call: GetFlag,
    get_is_start_time: GetFlag,
    get_is_end_of_timestep: GetFlag,
    get_is_last_call: GetFlag,
    get_parameter_value: GetIndexed,
    get_input_value: GetIndexed,
    set_output_value: SetIndexed,
    set_type_version: SetI32,
    set_number_of_parameters: SetI32,
    set_number_of_inputs: SetI32,
    set_number_of_derivatives: SetI32,
    set_number_of_outputs: SetI32,
    set_iteration_mode: SetI32,
    set_number_stored_variables: SetI32Pair,
    set_input_units: SetUnits,
    set_output_units: SetUnits,
    get_label: GetLabel,
    get_max_label_length: GetI32,
    get_max_path_length: GetI32,
    get_root_dir: GetDir,
    get_input_file_dir: GetDir,
    messages: Messages,
    found_bad_parameter: FoundBadParameter,
    _library: Library,
}

impl KernelSymbols {
    /// Resolve every access function from the kernel library
    ///
    /// `library_name` names an already-loaded module; `None` searches the
    /// global symbol namespace of the running process.
    pub fn load(library_name: Option<&str>) -> Result<Self, KernelError> {
        let library = open_library(library_name)?;
        logger::debug(&format!(
            "Resolving kernel symbols from {}",
            library_name.unwrap_or("<process>")
        ));

        Ok(KernelSymbols {
            get_simulation_time: load(&library, "TRNSYSFUNCTIONS_mp_GETSIMULATIONTIME")?,
            get_simulation_timestep: load(&library, "TRNSYSFUNCTIONS_mp_GETSIMULATIONTIMESTEP")?,
            get_current_unit: load(&library, "TRNSYSFUNCTIONS_mp_GETCURRENTUNIT")?,
            get_current_type: load(&library, "TRNSYSFUNCTIONS_mp_GETCURRENTTYPE")?,
            get_is_version_signing_time: load(
                &library,
                "TRNSYSFUNCTIONS_mp_GETISVERSIONSIGNINGTIME",
            )?,
            get_is_first_call: load(&library, "TRNSYSFUNCTIONS_mp_GETISFIRSTCALLOFSIMULATION")?,
            get_is_start_time: load(&library, "TRNSYSFUNCTIONS_mp_GETISSTARTTIME")?,
            get_is_end_of_timestep: load(&library, "TRNSYSFUNCTIONS_mp_GETISENDOFTIMESTEP")?,
            get_is_last_call: load(&library, "TRNSYSFUNCTIONS_mp_GETISLASTCALLOFSIMULATION")?,
            get_parameter_value: load(&library, "TRNSYSFUNCTIONS_mp_GETPARAMETERVALUE")?,
            get_input_value: load(&library, "TRNSYSFUNCTIONS_mp_GETINPUTVALUE")?,
            set_output_value: load(&library, "TRNSYSFUNCTIONS_mp_SETOUTPUTVALUE")?,
            set_type_version: load(&library, "TRNSYSFUNCTIONS_mp_SETTYPEVERSION")?,
            set_number_of_parameters: load(&library, "TRNSYSFUNCTIONS_mp_SETNUMBEROFPARAMETERS")?,
            set_number_of_inputs: load(&library, "TRNSYSFUNCTIONS_mp_SETNUMBEROFINPUTS")?,
            set_number_of_derivatives: load(
                &library,
                "TRNSYSFUNCTIONS_mp_SETNUMBEROFDERIVATIVES",
            )?,
            set_number_of_outputs: load(&library, "TRNSYSFUNCTIONS_mp_SETNUMBEROFOUTPUTS")?,
            set_iteration_mode: load(&library, "TRNSYSFUNCTIONS_mp_SETITERATIONMODE")?,
            set_number_stored_variables: load(
                &library,
                "TRNSYSFUNCTIONS_mp_SETNUMBERSTOREDVARIABLES",
            )?,
            set_input_units: load(&library, "TRNSYSFUNCTIONS_mp_SETINPUTUNITS")?,
            set_output_units: load(&library, "TRNSYSFUNCTIONS_mp_SETOUTPUTUNITS")?,
            get_label: load(&library, "TRNSYSFUNCTIONS_mp_GETLABEL")?,
            get_max_label_length: load(&library, "TRNSYSFUNCTIONS_mp_GETMAXLABELLENGTH")?,
            get_max_path_length: load(&library, "TRNSYSFUNCTIONS_mp_GETMAXPATHLENGTH")?,
            get_root_dir: load(&library, "TRNSYSFUNCTIONS_mp_GETTRNSYSROOTDIR")?,
            get_input_file_dir: load(&library, "TRNSYSFUNCTIONS_mp_GETTRNSYSINPUTFILEDIR")?,
            messages: load(&library, "MESSAGES")?,
            found_bad_parameter: load(&library, "TRNSYSFUNCTIONS_mp_FOUNDBADPARAMETER")?,
            _library: library,
        })
    }
}

fn open_library(library_name: Option<&str>) -> Result<Library, KernelError> {
    let name = library_name.unwrap_or("<process>").to_string();
    let opened = match library_name {
        #[cfg(windows)]
        Some(library_name) => {
            libloading::os::windows::Library::open_already_loaded(library_name).map(Library::from)
        }
        #[cfg(unix)]
        // SAFETY: the kernel library is already mapped by the host process, so
        // opening it again only bumps its reference count; no initialisers run.
        Some(library_name) => unsafe { Library::new(library_name) },
        #[cfg(windows)]
        None => libloading::os::windows::Library::this().map(Library::from),
        #[cfg(unix)]
        None => Ok(Library::from(libloading::os::unix::Library::this())),
    };
    opened.map_err(|e| KernelError::LibraryLoad {
        name,
        reason: e.to_string(),
    })
}

fn load<T: Copy>(library: &Library, symbol: &str) -> Result<T, KernelError> {
    let name = format!("{}\0", symbol);
    // SAFETY: `T` is one of the function pointer aliases above, matching the
    // prototypes declared in TRNSYS.h for the named export.
    let resolved = unsafe { library.get::<T>(name.as_bytes()) }.map_err(|e| {
        KernelError::MissingSymbol {
            symbol: symbol.to_string(),
            reason: e.to_string(),
        }
    })?;
    Ok(*resolved)
}

/// Decode a blank- or NUL-padded Fortran character buffer
fn decode_fortran_string(buffer: &[u8]) -> String {
    let end = buffer.iter().position(|&b| b == 0).unwrap_or(buffer.len());
    String::from_utf8_lossy(&buffer[..end]).into_owned()
}

fn buffer_length(reported: i32) -> usize {
    usize::try_from(reported)
        .ok()
        .filter(|len| *len > 0)
        .unwrap_or(FALLBACK_STRING_LENGTH)
}

/// The real kernel, reached through the resolved symbol table
#[derive(Clone, Copy)]
pub struct TrnsysKernel {
    symbols: &'static KernelSymbols,
}

impl TrnsysKernel {
    pub fn new(symbols: &'static KernelSymbols) -> Self {
        Self { symbols }
    }

    fn read_directory(&self, getter: GetDir) -> String {
        // SAFETY: no arguments, returns a plain integer.
        let length = buffer_length(unsafe { (self.symbols.get_max_path_length)() });
        let mut buffer = vec![b' '; length];
        // SAFETY: the buffer is `length` bytes long and the kernel writes at
        // most the hidden length it is given.
        unsafe {
            getter(buffer.as_mut_ptr().cast::<c_char>(), length);
        }
        decode_fortran_string(&buffer)
    }
}

// SAFETY (applies to every call below): the symbols were resolved with the
// prototypes from TRNSYS.h, scalar arguments point at live locals for the
// duration of the call, and string arguments pass their exact byte length.
impl Kernel for TrnsysKernel {
    fn simulation_time(&self) -> f64 {
        unsafe { (self.symbols.get_simulation_time)() }
    }

    fn simulation_timestep(&self) -> f64 {
        unsafe { (self.symbols.get_simulation_timestep)() }
    }

    fn current_unit(&self) -> i32 {
        unsafe { (self.symbols.get_current_unit)() }
    }

    fn current_type(&self) -> i32 {
        unsafe { (self.symbols.get_current_type)() }
    }

    fn phase_flags(&self) -> PhaseFlags {
        unsafe {
            PhaseFlags {
                version_query: (self.symbols.get_is_version_signing_time)() != 0,
                first_call: (self.symbols.get_is_first_call)() != 0,
                start_time: (self.symbols.get_is_start_time)() != 0,
                end_of_step: (self.symbols.get_is_end_of_timestep)() != 0,
                last_call: (self.symbols.get_is_last_call)() != 0,
            }
        }
    }

    fn parameter_value(&self, index: i32) -> f64 {
        unsafe { (self.symbols.get_parameter_value)(&index) }
    }

    fn input_value(&self, index: i32) -> f64 {
        unsafe { (self.symbols.get_input_value)(&index) }
    }

    fn set_output_value(&self, index: i32, value: f64) {
        unsafe { (self.symbols.set_output_value)(&index, &value) }
    }

    fn set_type_version(&self, version: i32) {
        unsafe { (self.symbols.set_type_version)(&version) }
    }

    fn set_number_of_parameters(&self, count: i32) {
        unsafe { (self.symbols.set_number_of_parameters)(&count) }
    }

    fn set_number_of_inputs(&self, count: i32) {
        unsafe { (self.symbols.set_number_of_inputs)(&count) }
    }

    fn set_number_of_derivatives(&self, count: i32) {
        unsafe { (self.symbols.set_number_of_derivatives)(&count) }
    }

    fn set_number_of_outputs(&self, count: i32) {
        unsafe { (self.symbols.set_number_of_outputs)(&count) }
    }

    fn set_iteration_mode(&self, mode: i32) {
        unsafe { (self.symbols.set_iteration_mode)(&mode) }
    }

    fn set_number_stored_variables(&self, static_count: i32, dynamic_count: i32) {
        unsafe { (self.symbols.set_number_stored_variables)(&static_count, &dynamic_count) }
    }

    fn set_input_units(&self, index: i32, unit: &str) {
        unsafe {
            (self.symbols.set_input_units)(&index, unit.as_ptr().cast::<c_char>(), unit.len())
        }
    }

    fn set_output_units(&self, index: i32, unit: &str) {
        unsafe {
            (self.symbols.set_output_units)(&index, unit.as_ptr().cast::<c_char>(), unit.len())
        }
    }

    fn label(&self, unit: i32, index: i32) -> String {
        let length = buffer_length(unsafe { (self.symbols.get_max_label_length)() });
        let mut buffer = vec![b' '; length];
        unsafe {
            (self.symbols.get_label)(buffer.as_mut_ptr().cast::<c_char>(), length, &unit, &index);
        }
        decode_fortran_string(&buffer)
    }

    fn root_dir(&self) -> String {
        self.read_directory(self.symbols.get_root_dir)
    }

    fn input_file_dir(&self) -> String {
        self.read_directory(self.symbols.get_input_file_dir)
    }

    fn report(&self, severity: Severity, unit: i32, type_number: i32, message: &str) {
        let error_code: i32 = -1;
        let severity = severity.as_str();
        unsafe {
            (self.symbols.messages)(
                &error_code,
                message.as_ptr().cast::<c_char>(),
                severity.as_ptr().cast::<c_char>(),
                &unit,
                &type_number,
                message.len(),
                severity.len(),
            )
        }
    }

    fn found_bad_parameter(&self, index: i32, severity: Severity, message: &str) {
        let severity = severity.as_str();
        unsafe {
            (self.symbols.found_bad_parameter)(
                &index,
                severity.as_ptr().cast::<c_char>(),
                message.as_ptr().cast::<c_char>(),
                severity.len(),
                message.len(),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_stops_at_nul() {
        assert_eq!(decode_fortran_string(b"model.py  \0garbage"), "model.py  ");
    }

    #[test]
    fn test_decode_keeps_blank_padding() {
        assert_eq!(decode_fortran_string(b"main    "), "main    ");
    }

    #[test]
    fn test_buffer_length_fallback() {
        assert_eq!(buffer_length(0), FALLBACK_STRING_LENGTH);
        assert_eq!(buffer_length(-4), FALLBACK_STRING_LENGTH);
        assert_eq!(buffer_length(80), 80);
    }

    #[test]
    #[cfg(unix)]
    fn test_missing_symbol_is_reported() {
        // The test binary does not export the kernel functions.
        let result = KernelSymbols::load(None);
        assert!(matches!(result, Err(KernelError::MissingSymbol { .. })));
    }
}
