//! Buffer-words completion service.
//!
//! A bundled [`CompletionService`] that answers from the query itself:
//! identifier-like words extracted from the buffer text, merged with the
//! language's keyword list. The demo binary and the tests run against it;
//! real hosts plug in their own service.

use std::collections::BTreeSet;

use crate::service::{
    Candidate, CandidateKind, CandidateSource, CompletionQuery, CompletionService, CompletionSet,
    ServiceFuture,
};

/// Words shorter than this are never suggested.
const MIN_WORD_LENGTH: usize = 2;

/// Extraction stops after this many distinct words.
const MAX_BUFFER_WORDS: usize = 5000;

const RUST_KEYWORDS: &[&str] = &[
    "as", "async", "await", "break", "const", "continue", "crate", "dyn", "else", "enum", "extern",
    "false", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod", "move", "mut", "pub",
    "ref", "return", "self", "static", "struct", "super", "trait", "true", "type", "unsafe", "use",
    "where", "while",
];

const PYTHON_KEYWORDS: &[&str] = &[
    "and", "as", "assert", "async", "await", "break", "class", "continue", "def", "del", "elif",
    "else", "except", "finally", "for", "from", "global", "if", "import", "in", "is", "lambda",
    "None", "not", "or", "pass", "raise", "return", "True", "try", "while", "with", "yield",
];

const JS_KEYWORDS: &[&str] = &[
    "async", "await", "break", "case", "catch", "class", "const", "continue", "default", "delete",
    "do", "else", "export", "extends", "finally", "for", "function", "if", "import", "in",
    "instanceof", "let", "new", "return", "switch", "this", "throw", "try", "typeof", "var",
    "void", "while", "yield",
];

/// Completion service backed by the buffer's own words plus keywords.
#[derive(Debug, Default)]
pub struct BufferWordsService;

impl BufferWordsService {
    /// Creates the service.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn keywords(language: &str) -> &'static [&'static str] {
        match language {
            "rust" => RUST_KEYWORDS,
            "python" => PYTHON_KEYWORDS,
            "javascript" | "typescript" => JS_KEYWORDS,
            _ => &[],
        }
    }

    fn extract_words(buffer: &str) -> BTreeSet<String> {
        let mut words = BTreeSet::new();
        let mut word = String::new();

        for ch in buffer.chars() {
            if ch.is_alphanumeric() || ch == '_' {
                word.push(ch);
            } else if !word.is_empty() {
                if word.len() >= MIN_WORD_LENGTH && words.len() < MAX_BUFFER_WORDS {
                    words.insert(std::mem::take(&mut word));
                } else {
                    word.clear();
                }
            }
        }
        if word.len() >= MIN_WORD_LENGTH && words.len() < MAX_BUFFER_WORDS {
            words.insert(word);
        }

        words
    }

    fn collect(query: &CompletionQuery) -> CompletionSet {
        let prefix_lower = query.prefix.to_lowercase();
        let mut entries = Vec::new();

        for word in Self::extract_words(&query.buffer) {
            let lower = word.to_lowercase();
            // The word being typed matches itself; skip it.
            if lower == prefix_lower {
                continue;
            }
            if prefix_lower.is_empty() || lower.starts_with(&prefix_lower) {
                entries.push(Candidate::new(
                    word,
                    CandidateKind::Word,
                    CandidateSource::Buffer,
                ));
            }
        }

        for keyword in Self::keywords(&query.language) {
            let lower = keyword.to_lowercase();
            if lower == prefix_lower {
                continue;
            }
            if prefix_lower.is_empty() || lower.starts_with(&prefix_lower) {
                entries.push(Candidate::new(
                    *keyword,
                    CandidateKind::Keyword,
                    CandidateSource::External,
                ));
            }
        }

        entries.truncate(query.limit);

        let symbol = (!query.prefix.is_empty()).then(|| query.prefix.clone());
        CompletionSet {
            symbol,
            entries,
            signature: None,
            docblock: false,
        }
    }
}

impl CompletionService for BufferWordsService {
    fn id(&self) -> &str {
        "buffer-words"
    }

    fn get_completions(&self, query: &CompletionQuery) -> ServiceFuture {
        let set = Self::collect(query);
        Box::pin(async move { Ok(set) })
    }
}
