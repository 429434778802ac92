//! Configuration loading and root folder resolution
//!
//! Resolution priority for every setting:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing config file is never fatal: a warning is logged and the
//! compiled defaults apply.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "GALAMSEY_ROOT_FOLDER";

/// Database file name inside the root folder
pub const DATABASE_FILE: &str = "galamsey.db";

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 8000;

/// Default upload limit (10 MiB)
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Contents of `config.toml`; every key is optional
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct TomlConfig {
    pub root_folder: Option<PathBuf>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub max_upload_bytes: Option<usize>,
}

/// Values supplied on the command line (or by clap from the environment)
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub root_folder: Option<PathBuf>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub max_upload_bytes: Option<usize>,
}

/// Compiled defaults used when nothing else is configured
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub root_folder: PathBuf,
    pub host: String,
    pub port: u16,
    pub max_upload_bytes: usize,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        Self {
            root_folder: default_root_folder(),
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

/// Fully resolved service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub root_folder: PathBuf,
    pub host: String,
    pub port: u16,
    pub max_upload_bytes: usize,
}

impl ServiceConfig {
    /// Merge command-line overrides, environment, TOML file and defaults
    ///
    /// `config_file` is an explicit path (`--config`); when it is given the
    /// file must exist. Without it the platform config location is tried.
    pub fn resolve(overrides: ConfigOverrides, config_file: Option<&Path>) -> Result<Self> {
        let toml_config = load_toml_config(config_file)?;
        let defaults = CompiledDefaults::for_current_platform();

        let root_folder = resolve_root_folder(
            overrides.root_folder,
            ROOT_FOLDER_ENV,
            toml_config.root_folder.clone(),
        )
        .unwrap_or(defaults.root_folder);

        Ok(Self {
            root_folder,
            host: overrides
                .host
                .or(toml_config.host)
                .unwrap_or(defaults.host),
            port: overrides
                .port
                .or(toml_config.port)
                .unwrap_or(defaults.port),
            max_upload_bytes: overrides
                .max_upload_bytes
                .or(toml_config.max_upload_bytes)
                .unwrap_or(defaults.max_upload_bytes),
        })
    }

    /// Path of the SQLite database file
    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join(DATABASE_FILE)
    }

    /// Create the root folder if it does not exist yet
    pub fn ensure_root_folder(&self) -> Result<()> {
        if !self.root_folder.exists() {
            std::fs::create_dir_all(&self.root_folder)?;
            debug!("Created root folder: {}", self.root_folder.display());
        }
        Ok(())
    }

    /// Socket address string for the HTTP listener
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Root folder resolution: CLI argument, then environment variable, then
/// the TOML value. `None` means the compiled default applies.
pub fn resolve_root_folder(
    cli_arg: Option<PathBuf>,
    env_var_name: &str,
    toml_value: Option<PathBuf>,
) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path);
    }

    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    toml_value
}

/// Load the TOML config file
///
/// Explicit path: missing or unparsable file is an error.
/// Default location: missing file yields defaults with a warning.
pub fn load_toml_config(explicit: Option<&Path>) -> Result<TomlConfig> {
    let (path, required) = match explicit {
        Some(path) => (path.to_path_buf(), true),
        None => match default_config_path() {
            Some(path) => (path, false),
            None => {
                warn!("Could not determine config directory, using defaults");
                return Ok(TomlConfig::default());
            }
        },
    };

    if !path.exists() {
        if required {
            return Err(Error::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        warn!("No config file at {}, using defaults", path.display());
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(&path)?;
    parse_toml_config(&content)
}

/// Parse config file contents
pub fn parse_toml_config(content: &str) -> Result<TomlConfig> {
    toml::from_str(content).map_err(|e| Error::Config(format!("Invalid config file: {}", e)))
}

/// Platform config file location (`<config dir>/galamsey/config.toml`)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("galamsey").join("config.toml"))
}

/// OS-dependent default root folder
fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("galamsey"))
        .unwrap_or_else(|| PathBuf::from("./galamsey_data"))
}
