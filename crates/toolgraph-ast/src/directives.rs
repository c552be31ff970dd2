//! Decoding of custom directive arguments
//!
//! `@tool` and `@prefetch` only accept string, boolean, list and object
//! literals. Every other GraphQL literal kind is rejected loudly instead of
//! being coerced, so a typo like `name: GetProduct` (an enum) fails the build.

use crate::errors::{CompileError, LiteralKind};
use graphql_parser::query::{Directive, Value};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value as JsonValue};
use std::collections::BTreeMap;

/// Plain value decoded from a directive argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectiveValue {
    String(String),
    Boolean(bool),
    List(Vec<DirectiveValue>),
    Object(BTreeMap<String, DirectiveValue>),
}

impl DirectiveValue {
    pub fn kind(&self) -> LiteralKind {
        match self {
            DirectiveValue::String(_) => LiteralKind::String,
            DirectiveValue::Boolean(_) => LiteralKind::Boolean,
            DirectiveValue::List(_) => LiteralKind::List,
            DirectiveValue::Object(_) => LiteralKind::Object,
        }
    }

    pub fn into_json(self) -> JsonValue {
        match self {
            DirectiveValue::String(s) => JsonValue::String(s),
            DirectiveValue::Boolean(b) => JsonValue::Bool(b),
            DirectiveValue::List(items) => {
                JsonValue::Array(items.into_iter().map(DirectiveValue::into_json).collect())
            }
            DirectiveValue::Object(fields) => JsonValue::Object(
                fields
                    .into_iter()
                    .map(|(key, value)| (key, value.into_json()))
                    .collect::<Map<String, JsonValue>>(),
            ),
        }
    }

    /// Deserialize into a typed record; `argument` names the source in errors
    pub fn into_typed<T: DeserializeOwned>(self, argument: &str) -> Result<T, CompileError> {
        serde_json::from_value(self.into_json()).map_err(|e| CompileError::InvalidArgumentShape {
            argument: argument.to_string(),
            message: e.to_string(),
        })
    }
}

/// Literal kind of a raw value node
pub fn literal_kind(value: &Value<'_, String>) -> LiteralKind {
    match value {
        Value::String(_) => LiteralKind::String,
        Value::Boolean(_) => LiteralKind::Boolean,
        Value::List(_) => LiteralKind::List,
        Value::Object(_) => LiteralKind::Object,
        Value::Int(_) => LiteralKind::Int,
        Value::Float(_) => LiteralKind::Float,
        Value::Enum(_) => LiteralKind::Enum,
        Value::Null => LiteralKind::Null,
        Value::Variable(_) => LiteralKind::Variable,
    }
}

/// Convert a value node into a plain value
pub fn decode_value(value: &Value<'_, String>) -> Result<DirectiveValue, CompileError> {
    match value {
        Value::String(s) => Ok(DirectiveValue::String(s.clone())),
        Value::Boolean(b) => Ok(DirectiveValue::Boolean(*b)),
        Value::List(items) => items
            .iter()
            .map(decode_value)
            .collect::<Result<Vec<_>, _>>()
            .map(DirectiveValue::List),
        Value::Object(fields) => fields
            .iter()
            .map(|(key, value)| decode_value(value).map(|decoded| (key.clone(), decoded)))
            .collect::<Result<BTreeMap<_, _>, _>>()
            .map(DirectiveValue::Object),
        Value::Int(_) | Value::Float(_) | Value::Enum(_) | Value::Null | Value::Variable(_) => {
            Err(CompileError::UnsupportedLiteral {
                kind: literal_kind(value),
            })
        }
    }
}

/// Find `name` among the directive's arguments and decode it
///
/// Returns `Ok(None)` when the argument is absent; callers decide whether that
/// is an error.
pub fn find_argument(
    directive: &Directive<'_, String>,
    name: &str,
    expected: LiteralKind,
) -> Result<Option<DirectiveValue>, CompileError> {
    let Some((_, value)) = directive.arguments.iter().find(|(arg, _)| arg == name) else {
        return Ok(None);
    };

    let actual = literal_kind(value);
    if actual != expected {
        return Err(CompileError::ArgumentKindMismatch {
            argument: name.to_string(),
            expected,
            actual,
        });
    }
    decode_value(value).map(Some)
}

/// Like [`find_argument`] for a string argument that must be present
pub fn required_string(
    directive: &Directive<'_, String>,
    directive_name: &'static str,
    argument: &'static str,
) -> Result<String, CompileError> {
    match find_argument(directive, argument, LiteralKind::String)? {
        Some(DirectiveValue::String(value)) => Ok(value),
        Some(other) => Err(CompileError::ArgumentKindMismatch {
            argument: argument.to_string(),
            expected: LiteralKind::String,
            actual: other.kind(),
        }),
        None => Err(CompileError::MissingArgument {
            directive: directive_name,
            argument,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphql_parser::query::{parse_query, Definition, Document, OperationDefinition};

    fn with_directive(
        source: &str,
        check: impl FnOnce(&Directive<'_, String>) -> anyhow::Result<()>,
    ) -> anyhow::Result<()> {
        let document: Document<'_, String> = parse_query(source)?;
        let directive = document.definitions.iter().find_map(|def| match def {
            Definition::Operation(OperationDefinition::Query(query)) => query.directives.first(),
            _ => None,
        });
        let directive = directive.ok_or_else(|| anyhow::anyhow!("no directive in {source}"))?;
        check(directive)
    }

    #[test]
    fn test_decodes_nested_literals() -> anyhow::Result<()> {
        let source = r#"query Q @tool(extraInputs: [{name: "a", type: "string", description: "d"}], flag: true) { a }"#;
        with_directive(source, |directive| {
            let inputs = find_argument(directive, "extraInputs", LiteralKind::List)?;
            let expected = DirectiveValue::List(vec![DirectiveValue::Object(BTreeMap::from([
                ("description".to_string(), DirectiveValue::String("d".to_string())),
                ("name".to_string(), DirectiveValue::String("a".to_string())),
                ("type".to_string(), DirectiveValue::String("string".to_string())),
            ]))]);
            assert_eq!(inputs, Some(expected));

            let flag = find_argument(directive, "flag", LiteralKind::Boolean)?;
            assert_eq!(flag, Some(DirectiveValue::Boolean(true)));
            Ok(())
        })
    }

    #[test]
    fn test_absent_argument_is_none() -> anyhow::Result<()> {
        with_directive(r#"query Q @tool(name: "x") { a }"#, |directive| {
            assert_eq!(find_argument(directive, "labels", LiteralKind::Object)?, None);
            Ok(())
        })
    }

    #[test]
    fn test_kind_mismatch_reports_argument() -> anyhow::Result<()> {
        with_directive(r#"query Q @tool(name: 42) { a }"#, |directive| {
            let result = find_argument(directive, "name", LiteralKind::String);
            assert!(matches!(
                result,
                Err(CompileError::ArgumentKindMismatch {
                    ref argument,
                    expected: LiteralKind::String,
                    actual: LiteralKind::Int,
                }) if argument == "name"
            ));
            Ok(())
        })
    }

    #[test]
    fn test_unsupported_literals_fail() -> anyhow::Result<()> {
        for (literal, kind) in [
            ("1.5", LiteralKind::Float),
            ("SOME_ENUM", LiteralKind::Enum),
            ("null", LiteralKind::Null),
            ("$var", LiteralKind::Variable),
        ] {
            let source = format!("query Q($var: ID) @tool(labels: [{literal}]) {{ a }}");
            with_directive(&source, |directive| {
                let result = find_argument(directive, "labels", LiteralKind::List);
                assert!(
                    matches!(result, Err(CompileError::UnsupportedLiteral { kind: k }) if k == kind),
                    "literal {literal} should be rejected"
                );
                Ok(())
            })?;
        }
        Ok(())
    }

    #[test]
    fn test_required_string_missing() -> anyhow::Result<()> {
        with_directive(r#"query Q @tool(description: "d") { a }"#, |directive| {
            let result = required_string(directive, "tool", "name");
            assert!(matches!(
                result,
                Err(CompileError::MissingArgument {
                    directive: "tool",
                    argument: "name"
                })
            ));
            Ok(())
        })
    }

    #[test]
    fn test_into_typed_shape_error() {
        let value = DirectiveValue::List(vec![DirectiveValue::String("nope".to_string())]);
        let result: Result<Vec<toolgraph_manifest::ExtraInput>, _> = value.into_typed("extraInputs");
        assert!(matches!(
            result,
            Err(CompileError::InvalidArgumentShape { ref argument, .. }) if argument == "extraInputs"
        ));
    }
}
