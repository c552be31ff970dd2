//! Lookups used by manifest consumers at runtime
//!
//! The host hands tool invocations to the application as one flat argument
//! object that mixes GraphQL variables with `extraInputs`. Only declared
//! variables may be forwarded to the GraphQL operation.

use crate::types::{Manifest, OperationDescriptor, ToolSpec};
use serde_json::{Map, Value};

impl OperationDescriptor {
    /// Keep only the arguments declared as variables of this operation
    pub fn select_variables(&self, arguments: &Map<String, Value>) -> Map<String, Value> {
        arguments
            .iter()
            .filter(|(key, _)| self.variables.contains_key(key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    /// Tool declared on this operation under `name`
    pub fn tool(&self, name: &str) -> Option<&ToolSpec> {
        self.tools.iter().find(|tool| tool.name.as_ref() == name)
    }
}

impl Manifest {
    /// O(1) operation lookup by name
    #[inline]
    pub fn get_operation(&self, name: &str) -> Option<&OperationDescriptor> {
        self.operation_index
            .get(name)
            .and_then(|&idx| self.operations.get(idx))
    }

    /// The operation marked `@prefetch`, if any
    pub fn prefetch_operation(&self) -> Option<&OperationDescriptor> {
        self.operations.iter().find(|op| op.prefetch)
    }

    /// Resolve a tool name to its operation and declaration
    pub fn find_tool(&self, tool_name: &str) -> Option<(&OperationDescriptor, &ToolSpec)> {
        self.operations
            .iter()
            .find_map(|op| op.tool(tool_name).map(|tool| (op, tool)))
    }

    /// Every declared tool in manifest order
    pub fn tools(&self) -> impl Iterator<Item = (&OperationDescriptor, &ToolSpec)> {
        self.operations
            .iter()
            .flat_map(|op| op.tools.iter().map(move |tool| (op, tool)))
    }
}
