//! Locating the script named in a unit's first label
//!
//! Decks written in TRNSYS Studio use Windows paths, and the same deck may be
//! run by a kernel built for another platform, so both `\` and `/` are
//! treated as separators throughout. Resolution order:
//! 1. `.\rest` (or `./rest`) is relative to the TRNSYS install root
//! 2. anything not absolute is relative to the deck's directory
//! 3. absolute references are used unchanged

use std::path::{self, Path, PathBuf, MAIN_SEPARATOR};
use thiserror::Error;

const SEPARATORS: [char; 2] = ['\\', '/'];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("The Python script reference '{0}' is too short to name a file.")]
    TooShort(String),

    #[error("The specified Python script file does not exist at the specified location: {0}")]
    NotFound(String),
}

/// A script reference resolved against the run's directories
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedScript {
    /// Absolute path of the script file
    pub path: PathBuf,
    /// Directory holding the script, added to the interpreter search path
    pub directory: PathBuf,
    /// File name without its final extension
    pub module_name: String,
}

impl ResolvedScript {
    /// Resolve `reference` and check the file exists
    pub fn locate(
        reference: &str,
        install_root: &str,
        config_dir: &str,
    ) -> Result<ResolvedScript, PathError> {
        let resolved = resolve_reference(reference, install_root, config_dir)?;
        if !Path::new(&resolved).is_file() {
            return Err(PathError::NotFound(resolved));
        }

        let absolute = path::absolute(&resolved)
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or(resolved);
        let (directory, file_name) = split_file_name(&absolute);
        let directory = if directory.is_empty() { "." } else { directory };

        Ok(ResolvedScript {
            path: PathBuf::from(&absolute),
            directory: PathBuf::from(directory),
            module_name: module_name(file_name).to_string(),
        })
    }
}

/// Apply the resolution rules without touching the filesystem
pub fn resolve_reference(
    reference: &str,
    install_root: &str,
    config_dir: &str,
) -> Result<String, PathError> {
    if reference.chars().count() < 2 {
        return Err(PathError::TooShort(reference.to_string()));
    }

    if let Some(rest) = strip_install_marker(reference) {
        return Ok(join(install_root, rest));
    }
    if !is_absolute(reference) {
        return Ok(join(config_dir, reference));
    }
    Ok(reference.to_string())
}

/// Bare module name: the file name minus its final extension
///
/// Names without an extension, and dot-files such as `.startup`, are kept
/// as they are.
pub fn module_name(file_name: &str) -> &str {
    match file_name.rfind('.') {
        Some(dot) if dot > 0 => &file_name[..dot],
        _ => file_name,
    }
}

fn strip_install_marker(reference: &str) -> Option<&str> {
    reference
        .strip_prefix(".\\")
        .or_else(|| reference.strip_prefix("./"))
}

fn is_absolute(reference: &str) -> bool {
    let bytes = reference.as_bytes();
    let drive = bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':';
    drive || reference.starts_with(SEPARATORS) || Path::new(reference).is_absolute()
}

/// Separator matching the convention `base` already uses
fn separator_for(base: &str) -> char {
    match (base.contains('\\'), base.contains('/')) {
        (true, false) => '\\',
        (false, true) => '/',
        _ => MAIN_SEPARATOR,
    }
}

fn join(base: &str, rest: &str) -> String {
    if base.is_empty() {
        return rest.to_string();
    }
    format!(
        "{}{}{}",
        base.trim_end_matches(SEPARATORS),
        separator_for(base),
        rest
    )
}

fn split_file_name(path: &str) -> (&str, &str) {
    match path.rfind(SEPARATORS) {
        Some(0) => (&path[..1], &path[1..]),
        Some(i) => (&path[..i], &path[i + 1..]),
        None => ("", path),
    }
}
