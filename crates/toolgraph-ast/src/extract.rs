//! Locating GraphQL documents embedded in application source
//!
//! Documents are written inline with one of two tags, either as a tagged
//! template or as a plain call:
//!
//! ```text
//! const PRODUCT = gql`query Product($id: ID!) { ... }`;
//! const CART = graphql(`query Cart { ... }`);
//! ```
//!
//! The compiler only depends on the [`DocumentExtractor`] trait; the default
//! [`AstGrepExtractor`] parses JavaScript/TypeScript with ast-grep so that
//! comments and unrelated strings never produce false matches.

use crate::errors::CompileError;
use ast_grep_core::matcher::KindMatcher;
use ast_grep_core::{AstGrep, Node};
use ast_grep_core::source::StrDoc;
use ast_grep_language::SupportLang;
use std::path::Path;
use tracing::debug;

/// Callee names recognized as GraphQL tags
pub const TAG_IDENTIFIERS: [&str; 2] = ["gql", "graphql"];

/// One GraphQL literal found in a source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedDocument {
    /// Literal content, quotes and template substitutions removed
    pub source: String,
    /// Byte offset of the literal in the file
    pub offset: usize,
}

/// Strategy that pulls embedded documents out of a file's text
pub trait DocumentExtractor {
    fn extract(&self, path: &Path, text: &str) -> Result<Vec<EmbeddedDocument>, CompileError>;
}

/// Cheap pre-check before any parsing happens
pub fn has_document_marker(text: &str) -> bool {
    TAG_IDENTIFIERS.iter().any(|tag| text.contains(tag))
}

/// ast-grep backed extractor for JavaScript and TypeScript sources
#[derive(Debug, Clone, Copy, Default)]
pub struct AstGrepExtractor;

impl AstGrepExtractor {
    /// Grammar for a file, by extension
    pub fn language_for(path: &Path) -> Option<SupportLang> {
        let extension = path.extension()?.to_str()?;
        match extension {
            "ts" | "mts" | "cts" => Some(SupportLang::TypeScript),
            "tsx" => Some(SupportLang::Tsx),
            "js" | "mjs" | "cjs" | "jsx" => Some(SupportLang::JavaScript),
            _ => None,
        }
    }

    fn literal_text(text: &str, literal: &Node<'_, StrDoc<SupportLang>>) -> Option<String> {
        let range = literal.range();
        match literal.kind().as_ref() {
            "template_string" => {
                // Skip the backticks and drop `${...}` substitutions
                let mut content = String::new();
                let mut cursor = range.start + 1;
                for child in literal.children() {
                    if child.kind() == "template_substitution" {
                        let sub = child.range();
                        content.push_str(&unescape(text.get(cursor..sub.start)?));
                        cursor = sub.end;
                    }
                }
                content.push_str(&unescape(text.get(cursor..range.end.checked_sub(1)?)?));
                Some(content)
            }
            "string" => text
                .get(range.start + 1..range.end.checked_sub(1)?)
                .map(unescape),
            _ => None,
        }
    }

    fn tagged_literal<'r>(
        call: &Node<'r, StrDoc<SupportLang>>,
    ) -> Option<Node<'r, StrDoc<SupportLang>>> {
        let callee = call.field("function")?;
        if callee.kind() != "identifier" || !TAG_IDENTIFIERS.contains(&callee.text().as_ref()) {
            return None;
        }

        let arguments = call.field("arguments")?;
        if arguments.kind() == "template_string" {
            return Some(arguments);
        }
        let literal = arguments
            .children()
            .find(|child| matches!(child.kind().as_ref(), "template_string" | "string"));
        literal
    }
}

/// Decode the escape sequences of a JavaScript string or template segment
///
/// Unknown escapes keep the escaped character; malformed numeric escapes
/// are kept verbatim so the GraphQL parser reports them.
fn unescape(raw: &str) -> String {
    if !raw.contains('\\') {
        return raw.to_string();
    }

    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let Some(escaped) = chars.next() else {
            out.push('\\');
            break;
        };
        match escaped {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{c}'),
            'v' => out.push('\u{b}'),
            '0' => out.push('\0'),
            // Line continuation
            '\n' => {}
            '\r' => {
                chars.next_if_eq(&'\n');
            }
            'x' => {
                let digits: String = chars.by_ref().take(2).collect();
                push_code_point(&mut out, &digits, "\\x");
            }
            'u' if chars.peek() == Some(&'{') => {
                chars.next();
                let digits: String = chars.by_ref().take_while(|&d| d != '}').collect();
                if !push_code_point(&mut out, &digits, "\\u{") {
                    out.push('}');
                }
            }
            'u' => {
                let digits: String = chars.by_ref().take(4).collect();
                push_code_point(&mut out, &digits, "\\u");
            }
            other => out.push(other),
        }
    }
    out
}

/// Push the decoded code point, or the escape as written when invalid
fn push_code_point(out: &mut String, digits: &str, prefix: &str) -> bool {
    match u32::from_str_radix(digits, 16).ok().and_then(char::from_u32) {
        Some(decoded) => {
            out.push(decoded);
            true
        }
        None => {
            out.push_str(prefix);
            out.push_str(digits);
            false
        }
    }
}

impl DocumentExtractor for AstGrepExtractor {
    fn extract(&self, path: &Path, text: &str) -> Result<Vec<EmbeddedDocument>, CompileError> {
        let Some(lang) = Self::language_for(path) else {
            debug!("No grammar for {:?}, skipping extraction", path);
            return Ok(Vec::new());
        };

        let grep = AstGrep::new(text, lang);
        let root = grep.root();

        let mut documents = Vec::new();
        for call in root.find_all(KindMatcher::new("call_expression", lang)) {
            let Some(literal) = Self::tagged_literal(&call) else {
                continue;
            };
            let source = Self::literal_text(text, &literal).ok_or_else(|| {
                CompileError::Extraction(format!(
                    "malformed GraphQL literal at byte {} in {}",
                    literal.range().start,
                    path.display()
                ))
            })?;
            documents.push(EmbeddedDocument {
                source,
                offset: literal.range().start,
            });
        }

        documents.sort_by_key(|doc| doc.offset);
        debug!("Extracted {} documents from {:?}", documents.len(), path);
        Ok(documents)
    }
}
