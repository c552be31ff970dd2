use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Kind of a GraphQL literal seen in a directive argument
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralKind {
    String,
    Boolean,
    List,
    Object,
    Int,
    Float,
    Enum,
    Null,
    Variable,
}

impl LiteralKind {
    pub fn as_str(self) -> &'static str {
        match self {
            LiteralKind::String => "string",
            LiteralKind::Boolean => "boolean",
            LiteralKind::List => "list",
            LiteralKind::Object => "object",
            LiteralKind::Int => "int",
            LiteralKind::Float => "float",
            LiteralKind::Enum => "enum",
            LiteralKind::Null => "null",
            LiteralKind::Variable => "variable",
        }
    }
}

impl fmt::Display for LiteralKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised while extracting and compiling operation documents
#[derive(Error, Debug)]
pub enum CompileError {
    #[error("Unsupported {kind} literal in directive argument; only strings, booleans, lists and objects are allowed")]
    UnsupportedLiteral { kind: LiteralKind },

    #[error("Argument `{argument}` must be a {expected}, found {actual}")]
    ArgumentKindMismatch {
        argument: String,
        expected: LiteralKind,
        actual: LiteralKind,
    },

    #[error("`@{directive}` is missing the required `{argument}` argument")]
    MissingArgument {
        directive: &'static str,
        argument: &'static str,
    },

    #[error("Tool name \"{0}\" must not contain whitespace")]
    InvalidToolName(String),

    #[error("Argument `{argument}` has an invalid shape: {message}")]
    InvalidArgumentShape { argument: String, message: String },

    #[error("Unsupported operation type `{0}`; only queries and mutations can be compiled")]
    UnsupportedOperationType(String),

    #[error("Anonymous operations cannot be added to the manifest; give the operation a name")]
    AnonymousOperation,

    #[error("Expected exactly one operation per document, found {0}")]
    OperationCount(usize),

    #[error("Failed to parse GraphQL document: {0}")]
    Parse(#[from] graphql_parser::query::ParseError),

    #[error("Failed to extract documents: {0}")]
    Extraction(String),

    #[error("Invalid include pattern `{pattern}`: {source}")]
    InvalidGlob {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{path}: {source}")]
    InFile {
        path: PathBuf,
        #[source]
        source: Box<CompileError>,
    },
}

impl CompileError {
    pub(crate) fn in_file(self, path: impl Into<PathBuf>) -> Self {
        CompileError::InFile {
            path: path.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, without file context
    pub fn root_cause(&self) -> &CompileError {
        match self {
            CompileError::InFile { source, .. } => source.root_cause(),
            other => other,
        }
    }
}
