//! Error type for the compiler lifecycle
//!
//! Every failure from configuration, compilation or manifest assembly reaches
//! the trigger's caller unchanged; the session never recovers locally.

use std::io;
use thiserror::Error;
use toolgraph_ast::CompileError;
use toolgraph_config::ConfigError;
use toolgraph_manifest::ManifestError;

#[derive(Error, Debug)]
pub enum LifecycleError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error("`{trigger}` is not available when running as {command}")]
    WrongMode {
        trigger: &'static str,
        command: &'static str,
    },

    #[error("The bundle was already finalized; the manifest is written once per build")]
    AlreadyFinalized,

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to watch {path}: {message}")]
    Watch { path: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrapped_errors_keep_their_message() {
        let err = LifecycleError::from(ManifestError::MissingEntryPoint("staging".to_string()));
        assert!(err.to_string().contains("\"staging\""));
    }

    #[test]
    fn test_wrong_mode_display() {
        let err = LifecycleError::WrongMode {
            trigger: "bundle_finalized",
            command: "a dev server",
        };
        assert_eq!(
            err.to_string(),
            "`bundle_finalized` is not available when running as a dev server"
        );
    }
}
