//! Manifest assembly from compiled operations and project configuration

use crate::context::{resolve_resource, BuildContext};
use crate::errors::ManifestError;
use crate::types::{
    Csp, Manifest, OperationDescriptor, ToolLabels, WidgetSettings, MANIFEST_FORMAT,
    MANIFEST_VERSION,
};
use std::sync::Arc;
use toolgraph_config::ProjectConfig;
use tracing::debug;

/// Build the manifest from every cached operation
///
/// `operations` must already be in file-scan order; that order is kept.
pub fn assemble<'a, I>(
    operations: I,
    config: &ProjectConfig,
    context: &BuildContext,
) -> Result<Manifest, ManifestError>
where
    I: IntoIterator<Item = &'a OperationDescriptor>,
{
    let operations: Vec<OperationDescriptor> = operations.into_iter().cloned().collect();

    check_single_prefetch(&operations)?;
    let resource = resolve_resource(&config.entry, context)?;
    let hash = content_hash(&operations)?;

    debug!(
        "Assembled manifest for {} ({} operations, resource {})",
        config.name,
        operations.len(),
        resource
    );

    let mut manifest = Manifest {
        format: Arc::from(MANIFEST_FORMAT),
        version: Arc::from(MANIFEST_VERSION),
        name: Arc::from(config.name.as_str()),
        description: Arc::from(config.description.as_str()),
        hash: Arc::from(hash),
        resource: Arc::from(resource),
        operations,
        csp: Csp::from(&config.csp),
        widget_settings: WidgetSettings::from(&config.widget),
        labels: ToolLabels::from(&config.labels),
        operation_index: ahash::AHashMap::new(),
    };
    manifest.rebuild_indexes();
    Ok(manifest)
}

/// At most one operation in the whole manifest may be marked `@prefetch`
pub fn check_single_prefetch(operations: &[OperationDescriptor]) -> Result<(), ManifestError> {
    let marked: Vec<String> = operations
        .iter()
        .filter(|op| op.prefetch)
        .map(|op| op.name.to_string())
        .collect();

    if marked.len() > 1 {
        return Err(ManifestError::MultiplePrefetchOperations(marked));
    }
    Ok(())
}

// Mixes in the generation time, so two identical builds get different tokens.
fn content_hash(operations: &[OperationDescriptor]) -> Result<String, ManifestError> {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&serde_json::to_vec(operations)?);
    let generated_at = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
    hasher.update(&generated_at.to_le_bytes());
    Ok(hasher.finalize().to_hex().to_string())
}
