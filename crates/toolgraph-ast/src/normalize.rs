//! Canonical form of an operation document
//!
//! Two compiles of the same operation must print the same body, no matter
//! how fragments were ordered in the source or which compiler directives were
//! attached. The normalizer strips `@tool`/`@prefetch` and sorts the top-level
//! definitions: operations first, then fragments, each group by name.

use graphql_parser::query::{Definition, Directive, Document, OperationDefinition};

/// Directives consumed by the compiler and never persisted in a body
pub const COMPILER_DIRECTIVES: [&str; 2] = ["tool", "prefetch"];

/// Strip compiler directives and reorder definitions
pub fn normalize(mut document: Document<'_, String>) -> Document<'_, String> {
    for definition in &mut document.definitions {
        if let Definition::Operation(operation) = definition {
            if let Some(directives) = operation_directives_mut(operation) {
                directives.retain(|d| !COMPILER_DIRECTIVES.contains(&d.name.as_str()));
            }
        }
    }

    // Stable sort, so duplicate names keep source order
    document
        .definitions
        .sort_by(|a, b| sort_key(a).cmp(&sort_key(b)));
    document
}

/// Canonical text of a (normalized) document
pub fn print_document(document: &Document<'_, String>) -> String {
    document.to_string()
}

fn operation_directives_mut<'d, 'a>(
    operation: &'d mut OperationDefinition<'a, String>,
) -> Option<&'d mut Vec<Directive<'a, String>>> {
    match operation {
        OperationDefinition::SelectionSet(_) => None,
        OperationDefinition::Query(query) => Some(&mut query.directives),
        OperationDefinition::Mutation(mutation) => Some(&mut mutation.directives),
        OperationDefinition::Subscription(subscription) => Some(&mut subscription.directives),
    }
}

fn sort_key<'d>(definition: &'d Definition<'_, String>) -> (u8, &'d str) {
    match definition {
        Definition::Operation(operation) => (0, operation_name(operation).unwrap_or("")),
        Definition::Fragment(fragment) => (1, fragment.name.as_str()),
    }
}

/// Declared name of an operation, `None` for anonymous ones
pub fn operation_name<'d>(operation: &'d OperationDefinition<'_, String>) -> Option<&'d str> {
    match operation {
        OperationDefinition::SelectionSet(_) => None,
        OperationDefinition::Query(query) => query.name.as_deref(),
        OperationDefinition::Mutation(mutation) => mutation.name.as_deref(),
        OperationDefinition::Subscription(subscription) => subscription.name.as_deref(),
    }
}
