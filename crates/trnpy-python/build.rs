//! Stage a Python runtime library next to the built Type.
//!
//! TRNSYS loads Types from `UserLib/ReleaseDLLs` and resolves their
//! dependencies from the same directory, so a bundled `python3X.dll` (or
//! `libpython3.X.so`) has to sit beside `trnpy.dll`. Point
//! `TRNPY_PYTHON_RUNTIME_DIR` at a directory holding that library to have it
//! linked against and copied into the profile directory.

use std::env;
use std::path::{Path, PathBuf};

fn main() {
    println!("cargo:rerun-if-env-changed=TRNPY_PYTHON_RUNTIME_DIR");

    let Ok(runtime_dir) = env::var("TRNPY_PYTHON_RUNTIME_DIR").map(PathBuf::from) else {
        return;
    };
    if !runtime_dir.is_dir() {
        println!(
            "cargo:warning=TRNPY_PYTHON_RUNTIME_DIR does not exist: {}",
            runtime_dir.display()
        );
        return;
    }

    let target = env::var("TARGET").unwrap_or_default();
    let Some(lib_file) = find_runtime_library(&runtime_dir) else {
        println!(
            "cargo:warning=no Python runtime library found in {}",
            runtime_dir.display()
        );
        return;
    };

    println!("cargo:rustc-link-search=native={}", runtime_dir.display());
    println!("cargo:rerun-if-changed={}", lib_file.display());
    if target.contains("linux") {
        println!("cargo:rustc-link-arg=-Wl,-rpath,$ORIGIN");
    }

    if let Err(err) = stage_next_to_artifacts(&lib_file) {
        println!("cargo:warning=failed to stage Python runtime: {}", err);
    }
}

fn find_runtime_library(dir: &Path) -> Option<PathBuf> {
    dir.read_dir()
        .ok()?
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .find(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| {
                    (name.starts_with("libpython") && name.contains(".so"))
                        || (name.starts_with("python") && name.ends_with(".dll"))
                })
        })
}

fn stage_next_to_artifacts(lib_file: &Path) -> std::io::Result<()> {
    let out_dir = PathBuf::from(env::var("OUT_DIR").map_err(std::io::Error::other)?);
    // OUT_DIR is target/<profile>/build/<crate>-<hash>/out
    let profile_dir = out_dir
        .ancestors()
        .nth(3)
        .ok_or_else(|| std::io::Error::other("cannot locate target profile directory"))?;
    let file_name = lib_file
        .file_name()
        .ok_or_else(|| std::io::Error::other("runtime library has no file name"))?;
    std::fs::create_dir_all(profile_dir)?;
    std::fs::copy(lib_file, profile_dir.join(file_name))?;
    Ok(())
}
