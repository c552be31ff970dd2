//! Toolgraph operation manifest
//!
//! This crate holds the manifest data model and everything that happens after
//! operations are compiled: enforcing manifest-wide invariants, resolving the
//! application's resource address, merging project metadata and writing the
//! JSON artifact to its two sentinel locations.

pub mod assemble;
pub mod context;
pub mod errors;
pub mod manifest_writer;
pub mod runtime;
pub mod types;

pub use assemble::{assemble, check_single_prefetch};
pub use context::{
    resolve_resource, BuildContext, CommandKind, ServerAddress, DEFAULT_RESOURCE, PRODUCTION_MODE,
};
pub use errors::ManifestError;
pub use manifest_writer::{read_from_path, write_manifest, write_to_path, MANIFEST_FILE_NAME};
pub use types::{
    Csp, ExtraInput, InvocationLabels, Manifest, OperationDescriptor, OperationType, ToolLabels,
    ToolSpec, WidgetSettings, MANIFEST_FORMAT, MANIFEST_VERSION, PREFETCH_ID,
};
