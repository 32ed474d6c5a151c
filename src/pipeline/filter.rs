//! Staleness filtering.
//!
//! Every service reply crosses a suspension point before it comes back, so
//! the world it describes may no longer exist. These checks re-validate the
//! reply against the *current* generation, cursor, and typed text. They run
//! in order; the first failure discards the reply.

use crate::config::CompletionConfig;
use crate::language::LanguageProfile;
use crate::service::CompletionSet;

/// Why a reply was discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Discard {
    /// The reply's token is not the current generation.
    StaleToken,
    /// The set has no candidates, no signature, and no usable doc block.
    Empty,
    /// The cursor moved back past the query anchor.
    CursorBeforeAnchor,
    /// The cursor ran too far ahead of the query anchor.
    TooFar,
    /// The text between anchor and cursor is not a single word.
    GapNotWord,
}

/// Re-validates an arrived reply against the current editor state.
///
/// `gap` is the text between the query-origin offset and the current cursor
/// (empty when the cursor did not advance).
pub fn validate(
    set: &CompletionSet,
    token: u64,
    current_token: u64,
    origin: usize,
    current_cursor: usize,
    gap: &str,
    profile: &LanguageProfile,
    config: &CompletionConfig,
) -> Result<(), Discard> {
    if token != current_token {
        return Err(Discard::StaleToken);
    }

    if !set.has_content(config.auto_docblock) {
        return Err(Discard::Empty);
    }

    if current_cursor < origin {
        return Err(Discard::CursorBeforeAnchor);
    }

    if current_cursor - origin > config.max_distance {
        return Err(Discard::TooFar);
    }

    if current_cursor > origin && !profile.word_chars.contains_all(gap) {
        return Err(Discard::GapNotWord);
    }

    Ok(())
}
