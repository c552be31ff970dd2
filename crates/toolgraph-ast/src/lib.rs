//! GraphQL operation compilation using ast-grep
//!
//! This crate turns application source into operation descriptors by:
//! 1. Locating `gql`/`graphql` literals in JavaScript/TypeScript with ast-grep
//! 2. Parsing each literal as a GraphQL document
//! 3. Validating it and decoding the `@tool`/`@prefetch` directives
//! 4. Normalizing and printing a canonical body, hashed into the operation id
//!
//! Results are cached per file so a rebuild only recompiles what changed.
pub mod descriptor;
pub mod directives;
pub mod errors;
pub mod extract;
pub mod normalize;
pub mod source_cache;

pub use descriptor::{build_descriptor, compile_document, content_id, named_type};
pub use directives::{decode_value, find_argument, DirectiveValue};
pub use errors::{CompileError, LiteralKind};
pub use extract::{
    has_document_marker, AstGrepExtractor, DocumentExtractor, EmbeddedDocument, TAG_IDENTIFIERS,
};
pub use normalize::{normalize, print_document, COMPILER_DIRECTIVES};
pub use source_cache::{CacheEntry, FileOutcome, IncludeFilter, ScanSummary, SourceCache};
