//! Language-service interface.
//!
//! The service that actually computes candidates is an external collaborator.
//! This module defines the data it exchanges with the pipeline (candidates,
//! signatures, result sets, queries) and the [`CompletionService`] trait the
//! pipeline calls through.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::editor::ViewId;

/// Candidate kind tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CandidateKind {
    #[default]
    Word,
    Method,
    Function,
    Field,
    Variable,
    Class,
    Interface,
    Module,
    Property,
    Keyword,
    Constant,
    Struct,
    Namespace,
}

impl CandidateKind {
    /// Short display tag for the panel's kind column.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Word => "word",
            Self::Method => "method",
            Self::Function => "fn",
            Self::Field => "field",
            Self::Variable => "var",
            Self::Class => "class",
            Self::Interface => "iface",
            Self::Module => "mod",
            Self::Property => "prop",
            Self::Keyword => "kw",
            Self::Constant => "const",
            Self::Struct => "struct",
            Self::Namespace => "ns",
        }
    }
}

/// Where a candidate was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CandidateSource {
    /// Extracted from the buffer being edited.
    #[default]
    Buffer,
    /// From an external index (project symbols, stdlib, ...).
    External,
}

impl CandidateSource {
    /// Short display tag for the panel's source column.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buffer => "buf",
            Self::External => "ext",
        }
    }
}

/// Location where a candidate is defined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    /// Defining file.
    pub path: PathBuf,
    /// 1-indexed line.
    pub line: u32,
}

/// One completion entry. Read-only once received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    /// The symbol name, also the text inserted on commit (before wrapping).
    pub name: String,

    /// Kind tag.
    pub kind: CandidateKind,

    /// Originating source.
    pub source: CandidateSource,

    /// Defining location, when known.
    #[serde(default)]
    pub location: Option<SourceLocation>,

    /// Whether the candidate is a scope with nested members.
    #[serde(default)]
    pub is_scope: bool,

    /// Member names for scope candidates.
    #[serde(default)]
    pub members: Vec<String>,

    /// Documentation text, when known.
    #[serde(default)]
    pub doc: Option<String>,
}

impl Candidate {
    /// Creates a candidate with the required fields.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: CandidateKind, source: CandidateSource) -> Self {
        Self {
            name: name.into(),
            kind,
            source,
            location: None,
            is_scope: false,
            members: Vec::new(),
            doc: None,
        }
    }

    /// Sets the defining location.
    #[must_use]
    pub fn with_location(mut self, path: impl Into<PathBuf>, line: u32) -> Self {
        self.location = Some(SourceLocation {
            path: path.into(),
            line,
        });
        self
    }

    /// Marks the candidate as a scope with the given members.
    #[must_use]
    pub fn with_members(mut self, members: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.members = members.into_iter().map(Into::into).collect();
        self.is_scope = true;
        self
    }

    /// Sets the documentation text.
    #[must_use]
    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }
}

/// A calltip-like signature attached to a result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    /// Rendered signature text.
    pub label: String,
    /// Documentation, when known.
    #[serde(default)]
    pub doc: Option<String>,
}

impl Signature {
    /// Creates a signature.
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            doc: None,
        }
    }
}

/// The service's answer to one query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionSet {
    /// Identity of the symbol the candidates complete, when the service
    /// reports one. Used to update rather than replace an open panel.
    #[serde(default)]
    pub symbol: Option<String>,

    /// Ordered candidates.
    pub entries: Vec<Candidate>,

    /// Optional signature row.
    #[serde(default)]
    pub signature: Option<Signature>,

    /// Whether the result is a documentation block.
    #[serde(default)]
    pub docblock: bool,
}

impl CompletionSet {
    /// Creates a set from candidates alone.
    #[must_use]
    pub fn from_entries(entries: Vec<Candidate>) -> Self {
        Self {
            symbol: None,
            entries,
            signature: None,
            docblock: false,
        }
    }

    /// Sets the completed symbol identity.
    #[must_use]
    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = Some(symbol.into());
        self
    }

    /// Sets the signature.
    #[must_use]
    pub fn with_signature(mut self, signature: Signature) -> Self {
        self.signature = Some(signature);
        self
    }

    /// Strict non-emptiness: candidates, or a signature, or a documentation
    /// block while auto documentation is enabled.
    #[must_use]
    pub fn has_content(&self, auto_docblock: bool) -> bool {
        !self.entries.is_empty() || self.signature.is_some() || (self.docblock && auto_docblock)
    }
}

/// One completion request. Immutable once constructed.
#[derive(Debug, Clone)]
pub struct CompletionQuery {
    /// View the query was issued from.
    pub view: ViewId,
    /// Full buffer text at issue time.
    pub buffer: String,
    /// Cursor offset at issue time; the panel anchor.
    pub pos: usize,
    /// Line number at issue time.
    pub line: usize,
    /// Word already typed before the anchor, per the query character class.
    pub prefix: String,
    /// File backing the buffer, if any.
    pub path: Option<PathBuf>,
    /// Working-directory/project context path.
    pub context_path: Option<PathBuf>,
    /// Additional import/search paths.
    pub import_paths: Vec<PathBuf>,
    /// Effective language id.
    pub language: String,
    /// Result-size ceiling.
    pub limit: usize,
}

/// Language-service error type.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The service is not reachable or refused the request.
    #[error("completion service unavailable: {0}")]
    Unavailable(String),

    /// The service answered with something the pipeline cannot interpret.
    #[error("malformed completion result: {0}")]
    Malformed(String),

    /// I/O error talking to the service.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Boxed future returned by [`CompletionService::get_completions`].
pub type ServiceFuture =
    Pin<Box<dyn Future<Output = Result<CompletionSet, ServiceError>> + Send + 'static>>;

/// The asynchronous language-service interface.
///
/// Implementations may be backed by anything that can answer "what completes
/// at this position": a language server, an index, the buffer itself.
/// Failures are converted to empty results by the executor; implementations
/// should not panic.
pub trait CompletionService: Send + Sync {
    /// Identifier used in logs.
    fn id(&self) -> &str;

    /// Computes completions for `query`.
    fn get_completions(&self, query: &CompletionQuery) -> ServiceFuture;
}
