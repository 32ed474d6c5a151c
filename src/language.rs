//! Per-language completion metadata.
//!
//! Each language contributes a [`LanguageProfile`]: which characters form
//! words, which characters form the filter query, which characters suppress
//! triggering, and the prefix/suffix wrapping applied to committed candidates
//! of a given kind. Profiles live in a [`LanguageRegistry`] that can also
//! resolve the *effective* language of a buffer through content markers
//! (a buffer declared as HTML but starting with `<?php` completes as php).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::service::CandidateKind;

/// A character class: alphanumerics (optional) plus an explicit extra set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharClass {
    /// Extra member characters beyond the alphanumeric range.
    extra: String,
    /// Whether alphanumeric characters are members.
    alphanumeric: bool,
}

impl CharClass {
    /// Word-like class: alphanumerics plus `extra`.
    #[must_use]
    pub fn word(extra: impl Into<String>) -> Self {
        Self {
            extra: extra.into(),
            alphanumeric: true,
        }
    }

    /// Symbol-only class: exactly the characters in `extra`.
    #[must_use]
    pub fn symbols(extra: impl Into<String>) -> Self {
        Self {
            extra: extra.into(),
            alphanumeric: false,
        }
    }

    /// Returns whether `ch` is a member.
    #[must_use]
    pub fn contains(&self, ch: char) -> bool {
        (self.alphanumeric && ch.is_alphanumeric()) || self.extra.contains(ch)
    }

    /// Returns whether every character of `text` is a member.
    #[must_use]
    pub fn contains_all(&self, text: &str) -> bool {
        text.chars().all(|ch| self.contains(ch))
    }
}

/// Completion metadata for one language.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageProfile {
    /// Language identifier (e.g. "rust", "python").
    pub id: String,

    /// Characters that extend an in-progress word.
    pub word_chars: CharClass,

    /// Characters that form the panel's filter query. Falls back to
    /// `word_chars` when absent.
    #[serde(default)]
    pub query_chars: Option<CharClass>,

    /// Characters before the cursor that suppress triggering.
    #[serde(default)]
    pub trigger_blacklist: Option<CharClass>,

    /// Whether completion may trigger on an otherwise empty line.
    #[serde(default)]
    pub trigger_on_empty_line: bool,

    /// Per-kind prefix prepended to a committed candidate.
    #[serde(default)]
    pub kind_prefixes: HashMap<CandidateKind, String>,

    /// Per-kind mandatory suffix appended to a committed candidate.
    /// A candidate committed with a suffix immediately re-triggers a query.
    #[serde(default)]
    pub kind_suffixes: HashMap<CandidateKind, String>,

    /// Marker promoting this profile when found near the start of a buffer.
    #[serde(default)]
    pub content_marker: Option<String>,
}

impl LanguageProfile {
    /// Creates a profile with a word class and defaults for the rest.
    #[must_use]
    pub fn new(id: impl Into<String>, word_chars: CharClass) -> Self {
        Self {
            id: id.into(),
            word_chars,
            query_chars: None,
            trigger_blacklist: None,
            trigger_on_empty_line: false,
            kind_prefixes: HashMap::new(),
            kind_suffixes: HashMap::new(),
            content_marker: None,
        }
    }

    /// Sets the query character class.
    #[must_use]
    pub fn with_query_chars(mut self, class: CharClass) -> Self {
        self.query_chars = Some(class);
        self
    }

    /// Sets the trigger blacklist.
    #[must_use]
    pub fn with_trigger_blacklist(mut self, class: CharClass) -> Self {
        self.trigger_blacklist = Some(class);
        self
    }

    /// Allows triggering on empty lines.
    #[must_use]
    pub fn with_empty_line_trigger(mut self) -> Self {
        self.trigger_on_empty_line = true;
        self
    }

    /// Registers a commit prefix for a candidate kind.
    #[must_use]
    pub fn with_kind_prefix(mut self, kind: CandidateKind, prefix: impl Into<String>) -> Self {
        self.kind_prefixes.insert(kind, prefix.into());
        self
    }

    /// Registers a mandatory commit suffix for a candidate kind.
    #[must_use]
    pub fn with_kind_suffix(mut self, kind: CandidateKind, suffix: impl Into<String>) -> Self {
        self.kind_suffixes.insert(kind, suffix.into());
        self
    }

    /// Sets the content marker used for effective-language resolution.
    #[must_use]
    pub fn with_content_marker(mut self, marker: impl Into<String>) -> Self {
        self.content_marker = Some(marker.into());
        self
    }

    /// The class used to compute the panel's filter query.
    #[must_use]
    pub fn query_class(&self) -> &CharClass {
        self.query_chars.as_ref().unwrap_or(&self.word_chars)
    }

    /// Returns whether `ch` suppresses triggering.
    #[must_use]
    pub fn is_blacklisted(&self, ch: char) -> bool {
        self.trigger_blacklist
            .as_ref()
            .is_some_and(|class| class.contains(ch))
    }
}

/// How much of a buffer is scanned for content markers.
const MARKER_SCAN_CHARS: usize = 512;

/// Registry of language profiles with a plain-text fallback.
#[derive(Debug)]
pub struct LanguageRegistry {
    profiles: HashMap<String, LanguageProfile>,
    plain: LanguageProfile,
}

impl LanguageRegistry {
    /// Creates a registry preloaded with the built-in profiles.
    #[must_use]
    pub fn new() -> Self {
        let mut registry = Self {
            profiles: HashMap::new(),
            plain: LanguageProfile::new("text", CharClass::word("_")),
        };

        registry.register(
            LanguageProfile::new("rust", CharClass::word("_"))
                .with_query_chars(CharClass::word("_"))
                .with_kind_suffix(CandidateKind::Function, "(")
                .with_kind_suffix(CandidateKind::Method, "("),
        );
        registry.register(
            LanguageProfile::new("python", CharClass::word("_"))
                .with_kind_suffix(CandidateKind::Function, "(")
                .with_kind_suffix(CandidateKind::Method, "("),
        );
        registry.register(
            LanguageProfile::new("javascript", CharClass::word("_$"))
                .with_trigger_blacklist(CharClass::symbols("'\""))
                .with_kind_suffix(CandidateKind::Function, "("),
        );
        registry.register(
            LanguageProfile::new("php", CharClass::word("_$"))
                .with_kind_prefix(CandidateKind::Variable, "$")
                .with_kind_suffix(CandidateKind::Function, "(")
                .with_content_marker("<?php"),
        );

        registry
    }

    /// Registers (or replaces) a profile.
    pub fn register(&mut self, profile: LanguageProfile) {
        self.profiles.insert(profile.id.clone(), profile);
    }

    /// Looks up a profile by declared id, falling back to plain text.
    #[must_use]
    pub fn get(&self, id: &str) -> &LanguageProfile {
        self.profiles.get(id).unwrap_or(&self.plain)
    }

    /// Resolves the effective profile for a buffer: a profile whose content
    /// marker appears near the start of the buffer wins over the declared id.
    #[must_use]
    pub fn resolve<'a>(&'a self, declared: &str, buffer_head: &str) -> &'a LanguageProfile {
        let head: String = buffer_head.chars().take(MARKER_SCAN_CHARS).collect();
        for profile in self.profiles.values() {
            if profile.id == declared {
                continue;
            }
            if let Some(marker) = &profile.content_marker {
                if head.contains(marker.as_str()) {
                    return profile;
                }
            }
        }
        self.get(declared)
    }

    /// Merges profiles from a JSON overlay file (an array of profiles).
    pub fn load_overlays(&mut self, json: &str) -> Result<usize, serde_json::Error> {
        let overlays: Vec<LanguageProfile> = serde_json::from_str(json)?;
        let count = overlays.len();
        for profile in overlays {
            self.register(profile);
        }
        Ok(count)
    }

    /// Returns the number of registered profiles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// Returns whether the registry has no profiles.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

impl Default for LanguageRegistry {
    fn default() -> Self {
        Self::new()
    }
}
