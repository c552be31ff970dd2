//! Project configuration for the toolgraph manifest compiler.

pub mod project;

pub use project::{
    ConfigError, CspConfig, InvocationLabelsConfig, LabelsConfig, ProjectConfig, WidgetConfig,
    CONFIG_ENV_VAR, CONFIG_FILE_NAME, DEFAULT_INCLUDE, DEFAULT_OUT_DIR,
};
