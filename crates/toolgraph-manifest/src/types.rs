//! Serializable types of the operation manifest
//!
//! This module provides:
//! - `Manifest`, the root artifact read by the runtime and the hosting environment
//! - `OperationDescriptor`, one compiled query or mutation
//! - `ToolSpec` and its extra inputs / labels, as declared by `@tool`
//!
//! Field names follow the camelCase wire format consumed by the JavaScript
//! runtime. Unknown keys are ignored when reading a manifest back.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::BTreeMap;
use std::sync::Arc;
use toolgraph_config::{CspConfig, InvocationLabelsConfig, LabelsConfig, WidgetConfig};

/// Format tag written into every manifest
pub const MANIFEST_FORMAT: &str = "toolgraph-manifest";

/// Version of the manifest layout
pub const MANIFEST_VERSION: &str = "1";

/// Slot identifier carried by the prefetch operation
pub const PREFETCH_ID: &str = "__anonymous";

// =============================================================================
// MANIFEST
// =============================================================================

/// Root manifest artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub format: Arc<str>,
    pub version: Arc<str>,
    pub name: Arc<str>,
    #[serde(default)]
    pub description: Arc<str>,
    /// Cache-busting token, changes on every regeneration
    pub hash: Arc<str>,
    /// Address at which the running application can be found
    pub resource: Arc<str>,
    #[serde(default)]
    pub operations: Vec<OperationDescriptor>,
    #[serde(default)]
    pub csp: Csp,
    #[serde(default)]
    pub widget_settings: WidgetSettings,
    #[serde(default)]
    pub labels: ToolLabels,

    /// Runtime only - operation name to position in `operations`
    #[serde(skip)]
    pub operation_index: AHashMap<Arc<str>, usize>,
}

impl Default for Manifest {
    fn default() -> Self {
        Manifest {
            format: Arc::from(MANIFEST_FORMAT),
            version: Arc::from(MANIFEST_VERSION),
            name: Arc::from(""),
            description: Arc::from(""),
            hash: Arc::from(""),
            resource: Arc::from(""),
            operations: Vec::new(),
            csp: Csp::default(),
            widget_settings: WidgetSettings::default(),
            labels: ToolLabels::default(),
            operation_index: AHashMap::new(),
        }
    }
}

impl Manifest {
    /// Rebuild the name index after deserialization or mutation
    pub fn rebuild_indexes(&mut self) {
        self.operation_index.clear();
        for (idx, operation) in self.operations.iter().enumerate() {
            self.operation_index.insert(operation.name.clone(), idx);
        }
    }
}

// =============================================================================
// OPERATION DESCRIPTOR
// =============================================================================

/// GraphQL operation kinds allowed in a manifest
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Hash, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    Query,
    Mutation,
}

impl OperationType {
    pub fn as_str(self) -> &'static str {
        match self {
            OperationType::Query => "query",
            OperationType::Mutation => "mutation",
        }
    }
}

impl std::fmt::Display for OperationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical representation of one compiled operation document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OperationDescriptor {
    /// Hex SHA-256 of `body`
    pub id: Arc<str>,
    pub name: Arc<str>,
    #[serde(rename = "type")]
    pub operation_type: OperationType,
    /// Normalized document text, custom directives removed
    pub body: Arc<str>,
    /// Variable name to its unwrapped named type
    #[serde(default)]
    pub variables: BTreeMap<Arc<str>, Arc<str>>,
    #[serde(default)]
    pub prefetch: bool,
    #[serde(rename = "prefetchID", default, skip_serializing_if = "Option::is_none")]
    pub prefetch_id: Option<Arc<str>>,
    #[serde(default)]
    pub tools: SmallVec<[ToolSpec; 1]>,
}

// =============================================================================
// TOOLS
// =============================================================================

/// Tool declared by an `@tool` directive
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ToolSpec {
    pub name: Arc<str>,
    pub description: Arc<str>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra_inputs: Vec<ExtraInput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<ToolLabels>,
}

/// Tool input that is not a GraphQL variable
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ExtraInput {
    pub name: String,
    #[serde(rename = "type")]
    pub input_type: String,
    pub description: String,
}

/// Labels shown by the host around a tool invocation
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ToolLabels {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_invocation: Option<InvocationLabels>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct InvocationLabels {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoking: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoked: Option<String>,
}

// =============================================================================
// PROJECT METADATA
// =============================================================================

/// Content-security-policy allow-lists
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Csp {
    #[serde(default)]
    pub connect_domains: Vec<String>,
    #[serde(default)]
    pub resource_domains: Vec<String>,
    #[serde(default)]
    pub frame_domains: Vec<String>,
    #[serde(default)]
    pub redirect_domains: Vec<String>,
}

/// Widget display settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WidgetSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefers_border: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl From<&CspConfig> for Csp {
    fn from(config: &CspConfig) -> Self {
        Csp {
            connect_domains: config.connect_domains.clone(),
            resource_domains: config.resource_domains.clone(),
            frame_domains: config.frame_domains.clone(),
            redirect_domains: config.redirect_domains.clone(),
        }
    }
}

impl From<&WidgetConfig> for WidgetSettings {
    fn from(config: &WidgetConfig) -> Self {
        WidgetSettings {
            prefers_border: config.prefers_border,
            domain: config.domain.clone(),
            description: config.description.clone(),
        }
    }
}

impl From<&InvocationLabelsConfig> for InvocationLabels {
    fn from(config: &InvocationLabelsConfig) -> Self {
        InvocationLabels {
            invoking: config.invoking.clone(),
            invoked: config.invoked.clone(),
        }
    }
}

impl From<&LabelsConfig> for ToolLabels {
    fn from(config: &LabelsConfig) -> Self {
        ToolLabels {
            tool_invocation: config.tool_invocation.as_ref().map(InvocationLabels::from),
        }
    }
}
