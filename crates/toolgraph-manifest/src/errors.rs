use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while assembling, writing or reading a manifest
#[derive(Error, Debug)]
pub enum ManifestError {
    #[error(
        "Found multiple operations marked as `@prefetch`: {}. Only one operation may be marked as `@prefetch`.",
        .0.join(", ")
    )]
    MultiplePrefetchOperations(Vec<String>),

    #[error("No entry point found for mode \"{0}\". Add `entry.{0}` to the project configuration.")]
    MissingEntryPoint(String),

    #[error("The dev server address is not known yet; the manifest cannot be written before the server is listening")]
    DevServerUnavailable,

    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to serialize manifest: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to parse manifest {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl ManifestError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        ManifestError::Io {
            path: path.into(),
            source,
        }
    }
}
