use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Version number reported to the kernel when it signs Types.
pub const DEFAULT_TYPE_VERSION: i32 = 17;

/// Unit label declared for every input and output ("dimensionless").
pub const DEFAULT_UNIT: &str = "DM1";

/// Environment variable that points at an explicit config file.
pub const CONFIG_ENV_VAR: &str = "TRNPY_CONFIG";

#[cfg(all(target_os = "windows", target_pointer_width = "64"))]
const DEFAULT_KERNEL_LIBRARY: Option<&str> = Some("TRNDll64.dll");
#[cfg(all(target_os = "windows", not(target_pointer_width = "64")))]
const DEFAULT_KERNEL_LIBRARY: Option<&str> = Some("TRNDll.dll");
#[cfg(not(target_os = "windows"))]
const DEFAULT_KERNEL_LIBRARY: Option<&str> = None;

/// Errors that can occur while loading the configuration file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Could not determine the user configuration directory")]
    NoConfigDir,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verbosity: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quiet: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_version: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kernel_library: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub venv_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub python_home: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra_sys_paths: Vec<String>,
}

impl Config {
    /// Location of the config file.
    ///
    /// `TRNPY_CONFIG` wins when set and non-empty, otherwise the platform
    /// config directory is used (`~/.config/trnpy/trnpy.toml` on Unix,
    /// `%APPDATA%\trnpy\trnpy.toml` on Windows).
    pub fn path() -> Result<PathBuf, ConfigError> {
        if let Ok(env_path) = std::env::var(CONFIG_ENV_VAR) {
            let trimmed = env_path.trim();
            if !trimmed.is_empty() {
                return Ok(PathBuf::from(trimmed));
            }
        }

        #[cfg(not(target_os = "windows"))]
        let default = dirs::home_dir()
            .ok_or(ConfigError::NoConfigDir)?
            .join(".config")
            .join("trnpy")
            .join("trnpy.toml");

        #[cfg(target_os = "windows")]
        let default = dirs::config_dir()
            .ok_or(ConfigError::NoConfigDir)?
            .join("trnpy")
            .join("trnpy.toml");

        Ok(default)
    }

    /// Load the config from its default location; a missing file yields defaults.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn get_verbosity(&self) -> u8 {
        self.verbosity.unwrap_or(0)
    }

    pub fn get_log_file(&self) -> Option<PathBuf> {
        self.log_file.as_deref().map(PathBuf::from)
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet.unwrap_or(false)
    }

    pub fn get_type_version(&self) -> i32 {
        self.type_version.unwrap_or(DEFAULT_TYPE_VERSION)
    }

    pub fn get_default_unit(&self) -> &str {
        self.default_unit.as_deref().unwrap_or(DEFAULT_UNIT)
    }

    /// Name of the kernel library to resolve host symbols from.
    ///
    /// `None` means the symbols are looked up in the global namespace of the
    /// running process, which is how the kernel exposes them on Unix.
    pub fn get_kernel_library(&self) -> Option<&str> {
        self.kernel_library.as_deref().or(DEFAULT_KERNEL_LIBRARY)
    }

    pub fn get_venv_path(&self) -> Option<PathBuf> {
        self.venv_path.as_deref().map(PathBuf::from)
    }

    pub fn get_python_home(&self) -> Option<PathBuf> {
        self.python_home.as_deref().map(PathBuf::from)
    }

    pub fn get_extra_sys_paths(&self) -> Vec<PathBuf> {
        self.extra_sys_paths.iter().map(PathBuf::from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_yields_defaults() {
        let Ok(dir) = TempDir::new() else {
            panic!("failed to create temp dir");
        };
        let config = Config::load_from(&dir.path().join("absent.toml"));
        assert!(matches!(config, Ok(ref c) if *c == Config::default()));
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.get_type_version(), 17);
        assert_eq!(config.get_default_unit(), "DM1");
        assert_eq!(config.get_verbosity(), 0);
        assert!(!config.is_quiet());
        assert!(config.get_venv_path().is_none());
        #[cfg(not(target_os = "windows"))]
        assert!(config.get_kernel_library().is_none());
    }

    #[test]
    fn test_parse_kebab_case_keys() {
        let Ok(dir) = TempDir::new() else {
            panic!("failed to create temp dir");
        };
        let path = dir.path().join("trnpy.toml");
        let content = r#"
verbosity = 2
type-version = 18
default-unit = "-"
kernel-library = "TRNDll64.dll"
venv-path = "C:\\envs\\trnsys"
extra-sys-paths = ["C:\\shared\\python"]
"#;
        assert!(fs::write(&path, content).is_ok());

        let Ok(config) = Config::load_from(&path) else {
            panic!("config should parse");
        };
        assert_eq!(config.get_verbosity(), 2);
        assert_eq!(config.get_type_version(), 18);
        assert_eq!(config.get_default_unit(), "-");
        assert_eq!(config.get_kernel_library(), Some("TRNDll64.dll"));
        assert_eq!(
            config.get_venv_path(),
            Some(PathBuf::from("C:\\envs\\trnsys"))
        );
        assert_eq!(config.get_extra_sys_paths().len(), 1);
    }

    #[test]
    fn test_parse_error_names_the_file() {
        let Ok(dir) = TempDir::new() else {
            panic!("failed to create temp dir");
        };
        let path = dir.path().join("broken.toml");
        assert!(fs::write(&path, "verbosity = [").is_ok());

        let err = Config::load_from(&path);
        assert!(matches!(err, Err(ConfigError::Parse { .. })));
        if let Err(e) = err {
            assert!(e.to_string().contains("broken.toml"));
        }
    }
}
