//! Path helpers for running user scripts against a Python virtual environment
//!
//! When `venv-path` is configured the interpreter bootstrap needs two things
//! from the environment before it can import user scripts:
//! - the base installation the venv was created from (`PYTHONHOME`)
//! - the venv's site-packages directory

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Library directory inside a venv
#[cfg(windows)]
pub const PYTHON_LIB_DIR: &str = "Lib";
#[cfg(not(windows))]
pub const PYTHON_LIB_DIR: &str = "lib";

const SITE_PACKAGES: &str = "site-packages";
const PYVENV_CFG: &str = "pyvenv.cfg";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VenvPathError {
    #[error("Virtual environment not found: {}", .0.display())]
    VenvNotFound(PathBuf),

    #[error("No site-packages directory under {}", .0.display())]
    SitePackagesNotFound(PathBuf),

    #[error("{} has no 'home' entry", .0.display())]
    MissingHome(PathBuf),

    #[error("Failed to read {path}: {message}")]
    Unreadable { path: String, message: String },
}

fn unreadable(path: &Path, err: &std::io::Error) -> VenvPathError {
    VenvPathError::Unreadable {
        path: path.display().to_string(),
        message: err.to_string(),
    }
}

/// Locate the site-packages directory of a venv
///
/// Windows venvs keep it at `Lib/site-packages`; elsewhere it sits one level
/// deeper in `lib/python3.X/site-packages`; the last `python*` directory
/// (by name) holding one wins.
pub fn resolve_site_packages(venv_path: &Path) -> Result<PathBuf, VenvPathError> {
    if !venv_path.is_dir() {
        return Err(VenvPathError::VenvNotFound(venv_path.to_path_buf()));
    }
    let lib_dir = venv_path.join(PYTHON_LIB_DIR);

    let direct = lib_dir.join(SITE_PACKAGES);
    if cfg!(windows) && direct.is_dir() {
        return Ok(direct);
    }

    if lib_dir.is_dir() {
        let mut versioned: Vec<PathBuf> = fs::read_dir(&lib_dir)
            .map_err(|e| unreadable(&lib_dir, &e))?
            .filter_map(Result::ok)
            .filter(|entry| entry.file_name().to_string_lossy().starts_with("python"))
            .map(|entry| entry.path().join(SITE_PACKAGES))
            .filter(|candidate| candidate.is_dir())
            .collect();
        versioned.sort();
        if let Some(site_packages) = versioned.pop() {
            return Ok(site_packages);
        }
    }

    Err(VenvPathError::SitePackagesNotFound(lib_dir))
}

/// Locate the base Python installation a venv was created from
///
/// `pyvenv.cfg` carries a `home = ...` line naming the directory holding the
/// base interpreter. On Unix that is `<prefix>/bin`, so the prefix is its
/// parent; on Windows the interpreter sits directly in the prefix.
pub fn resolve_python_home(venv_path: &Path) -> Result<PathBuf, VenvPathError> {
    let pyvenv_cfg = venv_path.join(PYVENV_CFG);
    if !pyvenv_cfg.is_file() {
        return Err(VenvPathError::VenvNotFound(venv_path.to_path_buf()));
    }
    let content = fs::read_to_string(&pyvenv_cfg).map_err(|e| unreadable(&pyvenv_cfg, &e))?;

    let home = content
        .lines()
        .filter_map(|line| line.split_once('='))
        .find(|(key, _)| key.trim() == "home")
        .map(|(_, value)| PathBuf::from(value.trim()))
        .ok_or(VenvPathError::MissingHome(pyvenv_cfg))?;

    if cfg!(windows) {
        return Ok(home);
    }
    match home.parent() {
        Some(prefix) if home.ends_with("bin") => Ok(prefix.to_path_buf()),
        _ => Ok(home),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[cfg(not(windows))]
    fn unix_venv(versions: &[&str]) -> Option<TempDir> {
        let venv = TempDir::new().ok()?;
        for version in versions {
            fs::create_dir_all(venv.path().join("lib").join(version).join(SITE_PACKAGES)).ok()?;
        }
        fs::write(
            venv.path().join(PYVENV_CFG),
            "home = /opt/python/3.12/bin\ninclude-system-site-packages = false\nversion = 3.12.1\n",
        )
        .ok()?;
        Some(venv)
    }

    #[test]
    #[cfg(not(windows))]
    fn test_site_packages_in_versioned_dir() {
        let Some(venv) = unix_venv(&["python3.12"]) else {
            panic!("failed to create venv layout");
        };
        let result = resolve_site_packages(venv.path());
        assert!(result.is_ok_and(|p| p.ends_with("lib/python3.12/site-packages")));
    }

    #[test]
    #[cfg(not(windows))]
    fn test_python_home_strips_bin() {
        let Some(venv) = unix_venv(&["python3.12"]) else {
            panic!("failed to create venv layout");
        };
        assert_eq!(
            resolve_python_home(venv.path()),
            Ok(PathBuf::from("/opt/python/3.12"))
        );
    }

    #[test]
    fn test_empty_venv_has_no_site_packages() {
        let Ok(venv) = TempDir::new() else {
            panic!("failed to create temp dir");
        };
        assert!(matches!(
            resolve_site_packages(venv.path()),
            Err(VenvPathError::SitePackagesNotFound(_))
        ));
    }

    #[test]
    fn test_missing_home_key() {
        let Ok(venv) = TempDir::new() else {
            panic!("failed to create temp dir");
        };
        assert!(fs::write(venv.path().join(PYVENV_CFG), "version = 3.12.1\n").is_ok());
        assert!(matches!(
            resolve_python_home(venv.path()),
            Err(VenvPathError::MissingHome(_))
        ));
    }

    #[test]
    fn test_venv_not_found() {
        let missing = PathBuf::from("/tmp/non_existent_trnpy_venv_12345");
        assert_eq!(
            resolve_site_packages(&missing),
            Err(VenvPathError::VenvNotFound(missing.clone()))
        );
    }
}
