//! Compilation of one operation document into an `OperationDescriptor`
//!
//! The validation chain runs in a fixed order and stops at the first failure:
//! operation count, operation kind, name, variables, `@prefetch`, each `@tool`.
//! Only then is the document normalized, printed and hashed.

use crate::directives::{find_argument, required_string};
use crate::errors::{CompileError, LiteralKind};
use crate::normalize::{normalize, operation_name, print_document};
use graphql_parser::query::{
    parse_query, Definition, Directive, Document, OperationDefinition, Type, VariableDefinition,
};
use sha2::{Digest, Sha256};
use smallvec::SmallVec;
use std::collections::BTreeMap;
use std::sync::Arc;
use toolgraph_manifest::{
    ExtraInput, OperationDescriptor, OperationType, ToolLabels, ToolSpec, PREFETCH_ID,
};

const TOOL_DIRECTIVE: &str = "tool";
const PREFETCH_DIRECTIVE: &str = "prefetch";

/// Parse `source` and compile it
///
/// Returns `Ok(None)` for documents that only define fragments.
pub fn compile_document(source: &str) -> Result<Option<OperationDescriptor>, CompileError> {
    let document: Document<'_, String> = parse_query(source)?;
    let has_operation = document
        .definitions
        .iter()
        .any(|def| matches!(def, Definition::Operation(_)));
    if !has_operation {
        return Ok(None);
    }
    build_descriptor(document).map(Some)
}

/// Build the descriptor for a parsed document
pub fn build_descriptor(document: Document<'_, String>) -> Result<OperationDescriptor, CompileError> {
    let operations: Vec<&OperationDefinition<'_, String>> = document
        .definitions
        .iter()
        .filter_map(|def| match def {
            Definition::Operation(operation) => Some(operation),
            Definition::Fragment(_) => None,
        })
        .collect();
    let [operation] = operations.as_slice() else {
        return Err(CompileError::OperationCount(operations.len()));
    };

    let (operation_type, variable_definitions, directives) = inspect(operation)?;
    let name: Arc<str> = operation_name(operation)
        .map(Arc::from)
        .ok_or(CompileError::AnonymousOperation)?;

    let variables = variable_types(variable_definitions);
    let prefetch = directives.iter().any(|d| d.name == PREFETCH_DIRECTIVE);
    let tools = directives
        .iter()
        .filter(|d| d.name == TOOL_DIRECTIVE)
        .map(parse_tool)
        .collect::<Result<SmallVec<[ToolSpec; 1]>, _>>()?;

    let body = print_document(&normalize(document));
    let id = content_id(&body);

    Ok(OperationDescriptor {
        id: Arc::from(id),
        name,
        operation_type,
        body: Arc::from(body),
        variables,
        prefetch,
        prefetch_id: prefetch.then(|| Arc::from(PREFETCH_ID)),
        tools,
    })
}

type OperationParts<'d, 'a> = (
    OperationType,
    &'d [VariableDefinition<'a, String>],
    &'d [Directive<'a, String>],
);

fn inspect<'d, 'a>(
    operation: &'d OperationDefinition<'a, String>,
) -> Result<OperationParts<'d, 'a>, CompileError> {
    match operation {
        OperationDefinition::SelectionSet(_) => Ok((OperationType::Query, &[] as &[_], &[] as &[_])),
        OperationDefinition::Query(query) => Ok((
            OperationType::Query,
            &query.variable_definitions,
            &query.directives,
        )),
        OperationDefinition::Mutation(mutation) => Ok((
            OperationType::Mutation,
            &mutation.variable_definitions,
            &mutation.directives,
        )),
        OperationDefinition::Subscription(_) => Err(CompileError::UnsupportedOperationType(
            "subscription".to_string(),
        )),
    }
}

fn variable_types(definitions: &[VariableDefinition<'_, String>]) -> BTreeMap<Arc<str>, Arc<str>> {
    definitions
        .iter()
        .map(|def| (Arc::from(def.name.as_str()), Arc::from(named_type(&def.var_type))))
        .collect()
}

/// Innermost named type, through any number of list / non-null wrappers
pub fn named_type<'t>(ty: &'t Type<'_, String>) -> &'t str {
    let mut current = ty;
    loop {
        match current {
            Type::NamedType(name) => return name.as_str(),
            Type::ListType(inner) | Type::NonNullType(inner) => current = inner.as_ref(),
        }
    }
}

fn parse_tool(directive: &Directive<'_, String>) -> Result<ToolSpec, CompileError> {
    let name = required_string(directive, TOOL_DIRECTIVE, "name")?;
    if name.chars().any(char::is_whitespace) {
        return Err(CompileError::InvalidToolName(name));
    }
    let description = required_string(directive, TOOL_DIRECTIVE, "description")?;

    let extra_inputs: Vec<ExtraInput> =
        match find_argument(directive, "extraInputs", LiteralKind::List)? {
            Some(value) => value.into_typed("extraInputs")?,
            None => Vec::new(),
        };
    let labels: Option<ToolLabels> = find_argument(directive, "labels", LiteralKind::Object)?
        .map(|value| value.into_typed("labels"))
        .transpose()?;

    Ok(ToolSpec {
        name: Arc::from(name),
        description: Arc::from(description),
        extra_inputs,
        labels,
    })
}

/// Hex SHA-256 of the canonical body
pub fn content_id(body: &str) -> String {
    format!("{:x}", Sha256::digest(body.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(source: &str) -> Result<OperationDescriptor, CompileError> {
        compile_document(source)?.ok_or(CompileError::OperationCount(0))
    }

    #[test]
    fn test_product_tool_query() -> anyhow::Result<()> {
        let op = compile(
            r#"query Product($id: ID!) @tool(name: "GetProduct", description: "Get a product") { product(id: $id) { id title } }"#,
        )?;
        assert_eq!(op.operation_type, OperationType::Query);
        assert_eq!(op.name.as_ref(), "Product");
        assert_eq!(op.variables.len(), 1);
        assert_eq!(op.variables.get("id").map(|v| &**v), Some("ID"));
        assert!(!op.prefetch);
        assert!(op.prefetch_id.is_none());
        assert_eq!(op.tools.len(), 1);
        assert_eq!(op.tools[0].name.as_ref(), "GetProduct");
        assert_eq!(op.tools[0].description.as_ref(), "Get a product");
        assert!(op.tools[0].extra_inputs.is_empty());
        assert!(op.tools[0].labels.is_none());
        assert_eq!(op.id.as_ref(), content_id(&op.body));
        assert_eq!(op.id.len(), 64);
        Ok(())
    }

    #[test]
    fn test_body_never_contains_compiler_directives() -> anyhow::Result<()> {
        let op = compile(
            r#"query Home @prefetch @tool(name: "A", description: "a") @tool(name: "B", description: "b") { home { id } }"#,
        )?;
        assert!(!op.body.contains("@tool"));
        assert!(!op.body.contains("@prefetch"));
        assert!(op.prefetch);
        assert_eq!(op.prefetch_id.as_deref(), Some(PREFETCH_ID));
        let names: Vec<&str> = op.tools.iter().map(|t| t.name.as_ref()).collect();
        assert_eq!(names, vec!["A", "B"]);
        Ok(())
    }

    #[test]
    fn test_id_ignores_fragment_order_and_directives() -> anyhow::Result<()> {
        let first = compile(
            r#"
fragment Price on Product { price }
query Product($id: ID!) @tool(name: "GetProduct", description: "Get a product") { product(id: $id) { ...Title ...Price } }
fragment Title on Product { title }
"#,
        )?;
        let second = compile(
            r#"
fragment Title on Product { title }
fragment Price on Product { price }
query Product($id: ID!) @prefetch { product(id: $id) { ...Title ...Price } }
"#,
        )?;
        assert_eq!(first.id, second.id);
        assert_eq!(first.body, second.body);
        Ok(())
    }

    #[test]
    fn test_variable_types_are_unwrapped() -> anyhow::Result<()> {
        let op = compile(
            "mutation Tag($ids: [[ID!]!]!, $label: String, $input: TagInput!) { tag(ids: $ids, label: $label, input: $input) }",
        )?;
        assert_eq!(op.operation_type, OperationType::Mutation);
        let variables: Vec<(&str, &str)> = op
            .variables
            .iter()
            .map(|(k, v)| (k.as_ref(), v.as_ref()))
            .collect();
        assert_eq!(
            variables,
            vec![("ids", "ID"), ("input", "TagInput"), ("label", "String")]
        );
        Ok(())
    }

    #[test]
    fn test_extra_inputs_and_labels() -> anyhow::Result<()> {
        let op = compile(
            r#"query Search($q: String!) @tool(
                name: "Search",
                description: "Search the catalog",
                extraInputs: [{name: "reason", type: "string", description: "Why"}],
                labels: {toolInvocation: {invoking: "Searching", invoked: "Searched"}}
            ) { search(q: $q) { id } }"#,
        )?;
        let tool = &op.tools[0];
        assert_eq!(
            tool.extra_inputs,
            vec![ExtraInput {
                name: "reason".to_string(),
                input_type: "string".to_string(),
                description: "Why".to_string(),
            }]
        );
        let invocation = tool.labels.as_ref().and_then(|l| l.tool_invocation.as_ref());
        assert_eq!(
            invocation.and_then(|i| i.invoking.as_deref()),
            Some("Searching")
        );
        assert_eq!(invocation.and_then(|i| i.invoked.as_deref()), Some("Searched"));
        Ok(())
    }

    #[test]
    fn test_tool_name_with_whitespace() {
        let result = compile(r#"query Q @tool(name: "Get Product", description: "d") { a }"#);
        assert!(matches!(result, Err(CompileError::InvalidToolName(ref n)) if n == "Get Product"));
    }

    #[test]
    fn test_tool_requires_name_and_description() {
        let no_name = compile(r#"query Q @tool(description: "d") { a }"#);
        assert!(matches!(
            no_name,
            Err(CompileError::MissingArgument { argument: "name", .. })
        ));
        let no_description = compile(r#"query Q @tool(name: "Q") { a }"#);
        assert!(matches!(
            no_description,
            Err(CompileError::MissingArgument {
                argument: "description",
                ..
            })
        ));
    }

    #[test]
    fn test_extra_inputs_must_be_a_list() {
        let result = compile(
            r#"query Q @tool(name: "Q", description: "d", extraInputs: {name: "a"}) { a }"#,
        );
        assert!(matches!(
            result,
            Err(CompileError::ArgumentKindMismatch {
                expected: LiteralKind::List,
                actual: LiteralKind::Object,
                ..
            })
        ));
    }

    #[test]
    fn test_subscriptions_are_rejected() {
        let result = compile("subscription OnOrder { order { id } }");
        assert!(matches!(result, Err(CompileError::UnsupportedOperationType(ref k)) if k == "subscription"));
    }

    #[test]
    fn test_anonymous_operations_are_rejected() {
        assert!(matches!(
            compile("{ shop { name } }"),
            Err(CompileError::AnonymousOperation)
        ));
        assert!(matches!(
            compile("query { shop { name } }"),
            Err(CompileError::AnonymousOperation)
        ));
    }

    #[test]
    fn test_one_operation_per_document() {
        let result = compile("query A { a } query B { b }");
        assert!(matches!(result, Err(CompileError::OperationCount(2))));
    }

    #[test]
    fn test_fragment_only_documents_are_skipped() -> anyhow::Result<()> {
        assert!(compile_document("fragment F on T { a }")?.is_none());
        Ok(())
    }

    #[test]
    fn test_parse_errors_surface() {
        assert!(matches!(
            compile_document("query Broken {"),
            Err(CompileError::Parse(_))
        ));
    }
}
