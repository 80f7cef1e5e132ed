//! Plugin-wide configuration for the trnpy Type
//!
//! Per-unit settings travel through the deck (parameters and labels). Everything
//! that applies to the DLL as a whole, such as logging, the Python environment and
//! the kernel library name, lives in a small TOML file read once per process.

pub mod config;
pub mod venv_paths;

pub use config::{Config, ConfigError};
pub use venv_paths::{resolve_python_home, resolve_site_packages, VenvPathError};
