//! Resolution of the project configuration file
//!
//! The configuration lives in `toolgraph.toml` at the project root. It names the
//! application, controls which source files are scanned and where the build
//! output goes, and carries the metadata merged into the manifest (entry points
//! per mode, CSP domains, widget settings and default invocation labels).
//!
//! `TOOLGRAPH_CONFIG` overrides the location, which is mostly useful for tests
//! and monorepos where the config sits outside the package directory.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// File name looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "toolgraph.toml";

/// Environment variable overriding the config location
pub const CONFIG_ENV_VAR: &str = "TOOLGRAPH_CONFIG";

/// Source files scanned when `include` is not set
pub const DEFAULT_INCLUDE: &str = "src/**/*.{ts,tsx,js,jsx,mts,cts,mjs,cjs}";

/// Build output directory when `out_dir` is not set
pub const DEFAULT_OUT_DIR: &str = "dist";

/// Error type for configuration resolution
#[derive(Debug)]
pub enum ConfigError {
    /// No configuration file at the resolved path
    NotFound(PathBuf),
    /// The file exists but could not be read
    Io(PathBuf, std::io::Error),
    /// The file is not valid TOML or does not match the expected shape
    Parse(PathBuf, toml::de::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::NotFound(path) => {
                write!(f, "Project configuration not found: {}", path.display())
            }
            ConfigError::Io(path, err) => {
                write!(f, "Failed to read {}: {}", path.display(), err)
            }
            ConfigError::Parse(path, err) => {
                write!(f, "Invalid configuration in {}: {}", path.display(), err)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::NotFound(_) => None,
            ConfigError::Io(_, err) => Some(err),
            ConfigError::Parse(_, err) => Some(err),
        }
    }
}

/// Parsed `toolgraph.toml`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ProjectConfig {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Glob, relative to the project root, selecting the files to scan
    #[serde(default = "default_include")]
    pub include: String,
    #[serde(default = "default_out_dir")]
    pub out_dir: PathBuf,
    /// Resource address per mode name (e.g. `production`, `staging`)
    #[serde(default)]
    pub entry: BTreeMap<String, String>,
    #[serde(default)]
    pub csp: CspConfig,
    #[serde(default)]
    pub widget: WidgetConfig,
    #[serde(default)]
    pub labels: LabelsConfig,
}

/// Content-security-policy allow-lists
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct CspConfig {
    #[serde(default)]
    pub connect_domains: Vec<String>,
    #[serde(default)]
    pub resource_domains: Vec<String>,
    #[serde(default)]
    pub frame_domains: Vec<String>,
    #[serde(default)]
    pub redirect_domains: Vec<String>,
}

/// How the host should frame the application
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct WidgetConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefers_border: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Default labels shown while a tool runs and after it finishes
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_invocation: Option<InvocationLabelsConfig>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct InvocationLabelsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoking: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoked: Option<String>,
}

fn default_include() -> String {
    DEFAULT_INCLUDE.to_string()
}

fn default_out_dir() -> PathBuf {
    PathBuf::from(DEFAULT_OUT_DIR)
}

impl ProjectConfig {
    /// Config path for a project rooted at `cwd`, honoring `TOOLGRAPH_CONFIG`
    pub fn path(cwd: &Path) -> PathBuf {
        let env_path = std::env::var(CONFIG_ENV_VAR).ok();
        Self::resolve_path(cwd, env_path.as_deref())
    }

    fn resolve_path(cwd: &Path, override_path: Option<&str>) -> PathBuf {
        if let Some(raw) = override_path {
            let trimmed = raw.trim();
            if !trimmed.is_empty() {
                let path = PathBuf::from(trimmed);
                return if path.is_absolute() {
                    path
                } else {
                    cwd.join(path)
                };
            }
        }
        cwd.join(CONFIG_FILE_NAME)
    }

    /// Load the configuration for a project rooted at `cwd`
    pub fn load(cwd: &Path) -> Result<Self, ConfigError> {
        Self::load_from_path(&Self::path(cwd))
    }

    /// Load the configuration from an explicit file
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.is_file() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let content =
            fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml_str(&content).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Output directory resolved against the project root
    pub fn out_dir_in(&self, cwd: &Path) -> PathBuf {
        if self.out_dir.is_absolute() {
            self.out_dir.clone()
        } else {
            cwd.join(&self.out_dir)
        }
    }
}
