//! Candidate panel state machine.
//!
//! The panel is pure state: it filters candidates against the typed prefix,
//! tracks selection, expands past the soft cap on demand, commits the
//! highlighted candidate into the editor, and dies exactly once. What it
//! looks like is described by [`PanelView`]; rendering that description into
//! an actual toolkit lives in [`widget`](crate::panel::widget).
//!
//! Lifecycle: `open → (update | key)* → destroyed`. At most one panel exists
//! per editor view; the pipeline destroys the old one before opening a new
//! one.

pub mod widget;

use thiserror::Error;

use crate::config::CompletionConfig;
use crate::editor::{self, EditorView, ViewId};
use crate::language::LanguageProfile;
use crate::service::{CandidateSource, CompletionSet};

/// Keyboard input the panel understands, toolkit-neutral.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelKey {
    /// Move selection up one row.
    Up,
    /// Move selection down one row.
    Down,
    /// Jump to the first row.
    JumpUp,
    /// Jump to the last row, expanding first if needed.
    JumpDown,
    /// First row.
    PageUp,
    /// Last row, expanding first if needed.
    PageDown,
    /// Commit the highlighted candidate (enter/tab).
    Commit,
    /// Destroy the panel (escape or an application cancel command).
    Cancel,
}

/// What a key press did to the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    /// Selection moved.
    Moved,
    /// The caller should run the commit against its editor.
    CommitRequested,
    /// The "show more" affordance was activated.
    Expanded,
    /// The panel destroyed itself.
    Dismissed,
    /// Key not applicable in the current state.
    Ignored,
}

/// Why a panel could not be opened.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum OpenError {
    /// Nothing to show: no candidate survives the filter and there is no
    /// signature row.
    #[error("no candidates remain after filtering and no signature")]
    Empty,
    /// Every candidate was filtered out of a hard-capped result; the true
    /// candidate set may be larger than what was returned.
    #[error("all candidates filtered out of a hard-capped result")]
    NeedsRequery,
}

/// What an in-place update did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Panel still open with refreshed rows.
    Kept,
    /// Panel kept, but the caller should issue a fresh query (hard-capped
    /// result filtered to nothing).
    NeedsRequery,
    /// Panel destroyed itself (nothing left to show).
    Destroyed,
}

/// Result of committing a candidate.
#[derive(Debug, Clone)]
pub struct CommitOutcome {
    /// Text actually inserted (after prefix/suffix wrapping).
    pub value: String,
    /// Whether a mandatory suffix was applied, requiring an immediate
    /// re-query at the new cursor.
    pub retrigger: bool,
}

/// Renderable description of the panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelView {
    /// Signature row text, when the result carries one.
    pub signature: Option<String>,
    /// Visible candidate rows.
    pub rows: Vec<RowView>,
    /// Whether a trailing "show more" affordance is present.
    pub show_more: bool,
    /// Selected index into `rows`.
    pub selected: usize,
    /// Origin detail for the selected candidate.
    pub detail: Option<String>,
}

/// One visible candidate row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowView {
    /// Candidate name.
    pub name: String,
    /// Kind tag.
    pub kind: &'static str,
    /// Source tag.
    pub source: &'static str,
}

type DestroyObserver = Box<dyn FnOnce() + Send>;

/// The candidate panel.
pub struct Panel {
    set: CompletionSet,
    anchor: usize,
    view: ViewId,
    token: u64,
    profile: LanguageProfile,
    soft_cap: usize,
    hard_cap: usize,
    show_matches: bool,
    /// Current filter text (the word typed since the anchor).
    query: String,
    /// Indices into `set.entries` currently shown.
    rows: Vec<usize>,
    /// Matches beyond the current cap exist.
    truncated: bool,
    expanded: bool,
    selected: usize,
    invoking: bool,
    destroyed: bool,
    observers: Vec<DestroyObserver>,
}

impl std::fmt::Debug for Panel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Panel")
            .field("anchor", &self.anchor)
            .field("view", &self.view)
            .field("token", &self.token)
            .field("query", &self.query)
            .field("rows", &self.rows.len())
            .field("selected", &self.selected)
            .field("expanded", &self.expanded)
            .field("destroyed", &self.destroyed)
            .finish()
    }
}

impl Panel {
    /// Opens a panel from a validated result.
    ///
    /// `typed` is the word entered since the anchor, used as the initial
    /// filter.
    pub fn open(
        set: CompletionSet,
        anchor: usize,
        view: ViewId,
        token: u64,
        typed: &str,
        profile: &LanguageProfile,
        config: &CompletionConfig,
    ) -> Result<Self, OpenError> {
        let mut panel = Self {
            set,
            anchor,
            view,
            token,
            profile: profile.clone(),
            soft_cap: config.max_results,
            hard_cap: config.max_results_hard,
            show_matches: config.show_matches,
            query: typed.to_string(),
            rows: Vec::new(),
            truncated: false,
            expanded: false,
            selected: 0,
            invoking: false,
            destroyed: false,
            observers: Vec::new(),
        };
        panel.refilter();

        if panel.rows.is_empty() {
            if panel.set.entries.len() >= panel.hard_cap {
                return Err(OpenError::NeedsRequery);
            }
            if panel.set.signature.is_none() {
                return Err(OpenError::Empty);
            }
        }

        Ok(panel)
    }

    /// Query-origin offset this panel filters from.
    #[must_use]
    pub fn anchor(&self) -> usize {
        self.anchor
    }

    /// View owning this panel.
    #[must_use]
    pub fn view_id(&self) -> ViewId {
        self.view
    }

    /// Generation token of the result being shown.
    #[must_use]
    pub fn token(&self) -> u64 {
        self.token
    }

    /// Symbol identity of the result being shown.
    #[must_use]
    pub fn symbol(&self) -> Option<&str> {
        self.set.symbol.as_deref()
    }

    /// Whether a commit is currently being applied.
    #[must_use]
    pub fn invoking(&self) -> bool {
        self.invoking
    }

    /// Whether destroy has run.
    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Number of visible candidate rows.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Whether the trailing "show more" affordance is shown.
    #[must_use]
    pub fn has_show_more(&self) -> bool {
        !self.expanded && self.truncated
    }

    fn refilter(&mut self) {
        let query = self.query.to_lowercase();
        let mut matched = Vec::new();

        for (index, candidate) in self.set.entries.iter().enumerate() {
            if !query.is_empty() {
                let name = candidate.name.to_lowercase();
                if !self.show_matches && name == query {
                    continue;
                }
                if !name.starts_with(&query) {
                    continue;
                }
            }
            matched.push(index);
        }

        let cap = if self.expanded {
            self.hard_cap
        } else {
            self.soft_cap
        };
        self.truncated = matched.len() > cap;
        matched.truncate(cap);
        self.rows = matched;

        if self.selected > self.rows.len().saturating_sub(1) {
            self.selected = 0;
        }
    }

    /// Re-renders against a new result and/or anchor. `typed` is the current
    /// word since the anchor.
    pub fn update(
        &mut self,
        new_set: Option<CompletionSet>,
        new_anchor: Option<usize>,
        typed: &str,
    ) -> UpdateOutcome {
        if let Some(set) = new_set {
            self.set = set;
        }
        if let Some(anchor) = new_anchor {
            self.anchor = anchor;
        }
        self.query = typed.to_string();
        self.selected = 0;
        self.refilter();

        if self.rows.is_empty() {
            // A hard-capped result filtered to nothing says nothing about
            // the real candidate set; ask again instead of giving up.
            if self.set.entries.len() >= self.hard_cap {
                return UpdateOutcome::NeedsRequery;
            }
            if self.set.signature.is_none() {
                self.destroy();
                return UpdateOutcome::Destroyed;
            }
        }

        UpdateOutcome::Kept
    }

    /// Activates the "show more" affordance: re-renders up to the hard cap
    /// and selects the first newly revealed row.
    pub fn expand(&mut self) {
        if self.expanded {
            return;
        }
        self.expanded = true;
        let first_new = self.rows.len();
        self.refilter();
        self.selected = first_new.min(self.rows.len().saturating_sub(1));
    }

    /// Handles one key press.
    pub fn handle_key(&mut self, key: PanelKey) -> KeyOutcome {
        if self.destroyed {
            return KeyOutcome::Ignored;
        }
        if key == PanelKey::Cancel {
            self.destroy();
            return KeyOutcome::Dismissed;
        }
        if self.rows.is_empty() {
            return KeyOutcome::Ignored;
        }

        match key {
            PanelKey::Up => {
                self.selected = self.selected.saturating_sub(1);
                KeyOutcome::Moved
            }
            PanelKey::Down => {
                if self.selected + 1 < self.rows.len() {
                    self.selected += 1;
                    KeyOutcome::Moved
                } else if self.has_show_more() {
                    self.expand();
                    KeyOutcome::Expanded
                } else {
                    KeyOutcome::Moved
                }
            }
            PanelKey::JumpUp | PanelKey::PageUp => {
                self.selected = 0;
                KeyOutcome::Moved
            }
            PanelKey::JumpDown | PanelKey::PageDown => {
                if self.has_show_more() {
                    self.expand();
                }
                self.selected = self.rows.len().saturating_sub(1);
                KeyOutcome::Moved
            }
            PanelKey::Commit => KeyOutcome::CommitRequested,
            PanelKey::Cancel => KeyOutcome::Dismissed,
        }
    }

    /// Commits the highlighted candidate: replaces the in-progress word with
    /// the candidate's value plus any registered kind wrapping, then
    /// destroys the panel.
    ///
    /// Returns `None` when there is nothing committable selected.
    pub fn commit<E: EditorView>(&mut self, view: &mut E) -> Option<CommitOutcome> {
        let index = *self.rows.get(self.selected)?;
        let candidate = self.set.entries.get(index)?.clone();

        let cursor = view.cursor();
        let (start, end) = editor::word_span(view, cursor, &self.profile.word_chars);
        if start < end {
            view.delete(start, end);
        }
        view.set_cursor(start);

        let mut value = candidate.name.clone();
        if let Some(prefix) = self.profile.kind_prefixes.get(&candidate.kind) {
            if !value.starts_with(prefix.as_str()) {
                value.insert_str(0, prefix);
            }
        }
        let mut retrigger = false;
        if let Some(suffix) = self.profile.kind_suffixes.get(&candidate.kind) {
            if !value.ends_with(suffix.as_str()) {
                value.push_str(suffix);
            }
            retrigger = true;
        }

        view.insert(start, &value);
        view.set_cursor(start + value.chars().count());

        if !retrigger {
            // Suppress the trigger the insertion itself is about to cause.
            self.invoking = true;
        }
        self.destroy();

        Some(CommitOutcome { value, retrigger })
    }

    /// Destroys the panel. Idempotent: pending observers fire exactly once
    /// each, and a second call is a no-op that still flushes observers
    /// registered since.
    pub fn destroy(&mut self) {
        self.destroyed = true;
        for observer in self.observers.drain(..) {
            observer();
        }
    }

    /// Registers a destroy observer. Fires immediately when the panel is
    /// already destroyed.
    pub fn on_destroy(&mut self, observer: impl FnOnce() + Send + 'static) {
        if self.destroyed {
            observer();
        } else {
            self.observers.push(Box::new(observer));
        }
    }

    /// Produces the renderable description of the current state.
    #[must_use]
    pub fn view(&self) -> PanelView {
        let rows = self
            .rows
            .iter()
            .filter_map(|&index| self.set.entries.get(index))
            .map(|candidate| RowView {
                name: candidate.name.clone(),
                kind: candidate.kind.as_str(),
                source: candidate.source.as_str(),
            })
            .collect();

        let detail = self
            .rows
            .get(self.selected)
            .and_then(|&index| self.set.entries.get(index))
            .map(|candidate| {
                let mut detail = match (&candidate.source, &candidate.location) {
                    (_, Some(location)) => {
                        format!("{}:{}", location.path.display(), location.line)
                    }
                    (CandidateSource::Buffer, None) => "buffer".to_string(),
                    (CandidateSource::External, None) => "external index".to_string(),
                };
                if candidate.is_scope {
                    detail.push_str(&format!(" ({} properties)", candidate.members.len()));
                }
                detail
            });

        PanelView {
            signature: self.set.signature.as_ref().map(|s| s.label.clone()),
            rows,
            show_more: self.has_show_more(),
            selected: self.selected,
            detail,
        }
    }
}
