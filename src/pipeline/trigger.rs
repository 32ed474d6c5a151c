//! Trigger detection.
//!
//! Turns one low-level edit event into a decision: ignore it, update the
//! open panel in place, dismiss the panel, or issue a new query. The rules
//! are ordered; the first one that applies wins.

use super::ActiveSession;
use crate::config::CompletionConfig;
use crate::editor::ViewId;
use crate::language::LanguageProfile;

/// Outcome of trigger detection for one edit event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerDecision {
    /// Nothing to do.
    Ignore,
    /// Refilter the open panel against the new typed prefix.
    UpdatePanel,
    /// Destroy the open panel.
    Dismiss,
    /// Issue a new query at the cursor.
    Query,
}

/// Identity and anchor of the currently open panel.
#[derive(Debug, Clone, Copy)]
pub struct PanelAnchor {
    /// View owning the panel.
    pub view: ViewId,
    /// Query-origin offset the panel filters from.
    pub anchor: usize,
}

/// Everything the detector needs to know about one edit event.
#[derive(Debug)]
pub struct TriggerContext<'a> {
    /// Inserted character, or `None` for a deletion.
    pub data: Option<char>,
    /// Cursor offset after the edit.
    pub cursor: usize,
    /// Line number of the cursor.
    pub line: usize,
    /// Line text from line start up to the cursor.
    pub line_before: &'a str,
    /// Character immediately before the cursor.
    pub char_before: Option<char>,
    /// View the event came from.
    pub view: ViewId,
    /// Word before the cursor per the query character class.
    pub typed_word: &'a str,
    /// Open panel, if any.
    pub panel: Option<PanelAnchor>,
    /// Whether a service request is currently outstanding.
    pub in_flight: bool,
    /// Whether the last accepted result was a signature/doc block.
    pub docblock_active: bool,
}

/// Applies the trigger rules in priority order.
pub fn decide(
    ctx: &TriggerContext<'_>,
    session: &ActiveSession,
    profile: &LanguageProfile,
    config: &CompletionConfig,
) -> TriggerDecision {
    // 1. Nothing open and not completing while typing: stay quiet. Manual
    //    invocation does not come through here at all.
    if ctx.panel.is_none() && !config.while_typing {
        return TriggerDecision::Ignore;
    }

    // 2. A panel is open: extend it while the user keeps typing the same
    //    word at or after its anchor, dismiss it for anything else.
    if let Some(panel) = ctx.panel {
        let extends_word = match ctx.data {
            Some(ch) => profile.word_chars.contains(ch),
            None => true, // deletion narrows the filter, the panel survives
        };
        if !ctx.line_before.trim().is_empty()
            && panel.view == ctx.view
            && ctx.cursor >= panel.anchor
            && extends_word
        {
            return TriggerDecision::UpdatePanel;
        }
        return TriggerDecision::Dismiss;
    }

    // 3. Empty line, and the language does not trigger there.
    if ctx.line_before.trim().is_empty() && !profile.trigger_on_empty_line {
        return TriggerDecision::Ignore;
    }

    // 4. A request for this (view, line) is already in flight and the user
    //    is still extending the word it was issued for.
    if ctx.in_flight
        && session.view == Some(ctx.view)
        && session.line == Some(ctx.line)
        && ctx.data.is_some_and(|ch| profile.word_chars.contains(ch))
        && ctx.typed_word.starts_with(session.typed.as_str())
        && ctx.typed_word.len() > session.typed.len()
    {
        return TriggerDecision::Ignore;
    }

    // 5. The character before the cursor suppresses completion, unless a
    //    signature/doc block is active and calltips trigger while typing.
    if let Some(ch) = ctx.char_before {
        if profile.is_blacklisted(ch) && !(ctx.docblock_active && config.calltip_while_typing) {
            return TriggerDecision::Ignore;
        }
    }

    // 6. Ask the service.
    TriggerDecision::Query
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::language::CharClass;

    fn profile() -> LanguageProfile {
        LanguageProfile::new("rust", CharClass::word("_"))
            .with_trigger_blacklist(CharClass::symbols("'\""))
    }

    fn config() -> CompletionConfig {
        CompletionConfig::default()
    }

    fn ctx<'a>(data: Option<char>, line_before: &'a str, typed: &'a str) -> TriggerContext<'a> {
        TriggerContext {
            data,
            cursor: line_before.chars().count(),
            line: 0,
            line_before,
            char_before: line_before.chars().last(),
            view: ViewId(1),
            typed_word: typed,
            panel: None,
            in_flight: false,
            docblock_active: false,
        }
    }

    #[test]
    fn test_while_typing_disabled_ignores_edits() {
        let mut config = config();
        config.while_typing = false;

        let decision = decide(&ctx(Some('o'), "fo", "fo"), &ActiveSession::default(), &profile(), &config);
        assert_eq!(decision, TriggerDecision::Ignore);
    }

    #[test]
    fn test_word_char_issues_query() {
        let decision = decide(&ctx(Some('o'), "fo", "fo"), &ActiveSession::default(), &profile(), &config());
        assert_eq!(decision, TriggerDecision::Query);
    }

    #[test]
    fn test_open_panel_updates_on_word_char() {
        let mut context = ctx(Some('o'), "foo", "foo");
        context.panel = Some(PanelAnchor {
            view: ViewId(1),
            anchor: 2,
        });

        let decision = decide(&context, &ActiveSession::default(), &profile(), &config());
        assert_eq!(decision, TriggerDecision::UpdatePanel);
    }

    #[test]
    fn test_open_panel_updates_on_deletion_at_anchor() {
        let mut context = ctx(None, "fo", "fo");
        context.panel = Some(PanelAnchor {
            view: ViewId(1),
            anchor: 2,
        });

        let decision = decide(&context, &ActiveSession::default(), &profile(), &config());
        assert_eq!(decision, TriggerDecision::UpdatePanel);
    }

    #[test]
    fn test_open_panel_dismissed_on_non_word_char() {
        let mut context = ctx(Some(';'), "foo;", "");
        context.panel = Some(PanelAnchor {
            view: ViewId(1),
            anchor: 2,
        });

        let decision = decide(&context, &ActiveSession::default(), &profile(), &config());
        assert_eq!(decision, TriggerDecision::Dismiss);
    }

    #[test]
    fn test_open_panel_dismissed_when_cursor_before_anchor() {
        let mut context = ctx(None, "f", "f");
        context.panel = Some(PanelAnchor {
            view: ViewId(1),
            anchor: 2,
        });

        let decision = decide(&context, &ActiveSession::default(), &profile(), &config());
        assert_eq!(decision, TriggerDecision::Dismiss);
    }

    #[test]
    fn test_open_panel_dismissed_for_other_view() {
        let mut context = ctx(Some('o'), "foo", "foo");
        context.panel = Some(PanelAnchor {
            view: ViewId(2),
            anchor: 0,
        });

        let decision = decide(&context, &ActiveSession::default(), &profile(), &config());
        assert_eq!(decision, TriggerDecision::Dismiss);
    }

    #[test]
    fn test_empty_line_ignored_by_default() {
        let decision = decide(&ctx(Some(' '), "   ", ""), &ActiveSession::default(), &profile(), &config());
        assert_eq!(decision, TriggerDecision::Ignore);
    }

    #[test]
    fn test_empty_line_allowed_when_profile_opts_in() {
        let profile = LanguageProfile::new("x", CharClass::word("_")).with_empty_line_trigger();
        let mut context = ctx(None, "", "");
        context.char_before = None;

        let decision = decide(&context, &ActiveSession::default(), &profile, &config());
        assert_eq!(decision, TriggerDecision::Query);
    }

    #[test]
    fn test_in_flight_extension_ignored() {
        let session = ActiveSession {
            view: Some(ViewId(1)),
            line: Some(0),
            typed: "fo".to_string(),
            token: 1,
        };
        let mut context = ctx(Some('o'), "foo", "foo");
        context.in_flight = true;

        let decision = decide(&context, &session, &profile(), &config());
        assert_eq!(decision, TriggerDecision::Ignore);
    }

    #[test]
    fn test_in_flight_other_line_still_queries() {
        let session = ActiveSession {
            view: Some(ViewId(1)),
            line: Some(3),
            typed: "fo".to_string(),
            token: 1,
        };
        let mut context = ctx(Some('o'), "foo", "foo");
        context.in_flight = true;

        let decision = decide(&context, &session, &profile(), &config());
        assert_eq!(decision, TriggerDecision::Query);
    }

    #[test]
    fn test_settled_request_does_not_block_retrigger() {
        let session = ActiveSession {
            view: Some(ViewId(1)),
            line: Some(0),
            typed: "fo".to_string(),
            token: 1,
        };
        let context = ctx(Some('o'), "foo", "foo");

        let decision = decide(&context, &session, &profile(), &config());
        assert_eq!(decision, TriggerDecision::Query);
    }

    #[test]
    fn test_blacklisted_char_ignored() {
        let decision = decide(&ctx(Some('"'), "s = \"", ""), &ActiveSession::default(), &profile(), &config());
        assert_eq!(decision, TriggerDecision::Ignore);
    }

    #[test]
    fn test_blacklist_bypassed_for_active_docblock_with_calltips() {
        let mut config = config();
        config.calltip_while_typing = true;
        let mut context = ctx(Some('"'), "s = \"", "");
        context.docblock_active = true;

        let decision = decide(&context, &ActiveSession::default(), &profile(), &config);
        assert_eq!(decision, TriggerDecision::Query);
    }
}
