//! The completion pipeline.
//!
//! One [`CompletionPipeline`] exists per editor view and owns everything the
//! components share: the active session, the scheduler and its generation
//! counter, and the single panel instance. Hosts push edit events in, pump
//! settled service replies out, and forward panel keys while a panel is
//! open.
//!
//! Event flow: edit event → [`trigger`] decision → [`scheduler`] (debounce,
//! generation token, service call) → reply channel → [`filter`] re-validation
//! → panel open/update/destroy.
//!
//! Everything between two suspension points runs on the caller's thread;
//! replies are applied only inside [`pump`](CompletionPipeline::pump) /
//! [`wait_reply`](CompletionPipeline::wait_reply), so shared state is never
//! mutated behind the caller's back.

pub mod debounce;
pub mod filter;
pub mod scheduler;
pub mod trigger;

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::debug;

use crate::config::CompletionConfig;
use crate::editor::{self, EditEvent, EditorView, ViewId};
use crate::language::{LanguageProfile, LanguageRegistry};
use crate::panel::{KeyOutcome, OpenError, Panel, PanelKey, PanelView, UpdateOutcome};
use crate::service::{CompletionQuery, CompletionService};

use filter::Discard;
use scheduler::{QueryScheduler, ServiceReply};
use trigger::{PanelAnchor, TriggerContext, TriggerDecision};

/// How many leading characters are scanned for language content markers.
const LANGUAGE_SNIFF_CHARS: usize = 512;

/// Mutable state shared across the trigger detector, scheduler, and filter
/// for the current user interaction.
#[derive(Debug, Clone, Default)]
pub struct ActiveSession {
    /// View the in-progress interaction belongs to.
    pub view: Option<ViewId>,
    /// Line the in-progress interaction is on.
    pub line: Option<usize>,
    /// Word the current query was issued for.
    pub typed: String,
    /// Most recently admitted generation token.
    pub token: u64,
}

impl ActiveSession {
    fn clear(&mut self) {
        self.view = None;
        self.line = None;
        self.typed.clear();
        self.token = 0;
    }
}

/// Per-view completion pipeline context.
pub struct CompletionPipeline {
    config: CompletionConfig,
    languages: LanguageRegistry,
    scheduler: QueryScheduler,
    reply_rx: mpsc::UnboundedReceiver<ServiceReply>,
    session: ActiveSession,
    panel: Option<Panel>,
    /// Suppresses the trigger caused by a commit's own insertion.
    invoking: bool,
    /// Whether the last accepted result was a signature/doc block.
    docblock_active: bool,
    /// (anchor, typed) of the last automatic hard-cap requery. A second
    /// zero-match round for the same spot gives up instead of looping.
    requeried: Option<(usize, String)>,
    context_path: Option<PathBuf>,
    import_paths: Vec<PathBuf>,
    running: bool,
}

impl CompletionPipeline {
    /// Creates a pipeline over `service`. Call [`start`](Self::start) before
    /// feeding events.
    #[must_use]
    pub fn new(
        config: CompletionConfig,
        languages: LanguageRegistry,
        service: Arc<dyn CompletionService>,
    ) -> Self {
        let (reply_tx, reply_rx) = mpsc::unbounded_channel();
        let scheduler = QueryScheduler::new(service, config.debounce, reply_tx);
        Self {
            config,
            languages,
            scheduler,
            reply_rx,
            session: ActiveSession::default(),
            panel: None,
            invoking: false,
            docblock_active: false,
            requeried: None,
            context_path: None,
            import_paths: Vec::new(),
            running: false,
        }
    }

    /// Starts processing events.
    pub fn start(&mut self) {
        self.running = true;
    }

    /// Stops processing events, drops pending work, and destroys the panel.
    pub fn stop(&mut self) {
        self.running = false;
        self.scheduler.cancel_pending();
        self.destroy_panel();
        self.session.clear();
    }

    /// Whether the pipeline is processing events.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Sets the project/workspace context path attached to queries.
    pub fn set_context_path(&mut self, path: Option<PathBuf>) {
        self.context_path = path;
    }

    /// Sets the import/search paths attached to queries.
    pub fn set_import_paths(&mut self, paths: Vec<PathBuf>) {
        self.import_paths = paths;
    }

    /// The open panel, if any.
    #[must_use]
    pub fn panel(&self) -> Option<&Panel> {
        self.panel.as_ref()
    }

    /// The open panel, mutably (e.g. to register destroy observers).
    pub fn panel_mut(&mut self) -> Option<&mut Panel> {
        self.panel.as_mut()
    }

    /// Renderable description of the open panel, if any.
    #[must_use]
    pub fn panel_view(&self) -> Option<PanelView> {
        self.panel.as_ref().map(Panel::view)
    }

    /// Number of service requests dispatched but not yet settled.
    #[must_use]
    pub fn outstanding(&self) -> usize {
        self.scheduler.outstanding()
    }

    /// The current session record.
    #[must_use]
    pub fn session(&self) -> &ActiveSession {
        &self.session
    }

    /// Dispatches one editor event.
    pub fn on_event<E: EditorView>(&mut self, view: &E, event: EditEvent) {
        match event {
            EditEvent::CharModified(data) => self.on_char_modified(view, data),
            EditEvent::PosChanged { offset, from_edit } => {
                self.on_pos_changed(view, offset, from_edit);
            }
        }
    }

    /// Handles a character inserted (`Some`) or deleted (`None`) at the
    /// cursor.
    pub fn on_char_modified<E: EditorView>(&mut self, view: &E, data: Option<char>) {
        if !self.running {
            return;
        }
        // The commit's own text change is not a user keystroke.
        if self.invoking {
            self.invoking = false;
            return;
        }
        if self.panel.as_ref().is_some_and(Panel::invoking) {
            return;
        }

        let cursor = view.cursor();
        let profile = self.effective_profile(view);
        let line = view.line_of(cursor);
        let line_before = editor::line_text_before(view, cursor);
        let typed_word = editor::word_before(view, cursor, profile.query_class());

        let ctx = TriggerContext {
            data,
            cursor,
            line,
            line_before: &line_before,
            char_before: editor::char_before(view, cursor),
            view: view.view_id(),
            typed_word: &typed_word,
            panel: self.panel.as_ref().map(|panel| PanelAnchor {
                view: panel.view_id(),
                anchor: panel.anchor(),
            }),
            in_flight: self.scheduler.outstanding() > 0,
            docblock_active: self.docblock_active,
        };

        match trigger::decide(&ctx, &self.session, &profile, &self.config) {
            TriggerDecision::Ignore => {}
            TriggerDecision::UpdatePanel => self.update_panel(view, &profile, &typed_word),
            TriggerDecision::Dismiss => self.destroy_panel(),
            TriggerDecision::Query => {
                self.requeried = None;
                self.issue_query(view, &profile);
            }
        }
    }

    /// Handles a cursor move. Moves not caused by an edit dismiss the panel.
    pub fn on_pos_changed<E: EditorView>(&mut self, view: &E, _offset: usize, from_edit: bool) {
        if !self.running {
            return;
        }
        if from_edit {
            return;
        }
        if self
            .panel
            .as_ref()
            .is_some_and(|panel| panel.view_id() == view.view_id())
        {
            self.destroy_panel();
        }
    }

    /// The panel's host lost keyboard focus.
    pub fn on_focus_lost(&mut self) {
        self.destroy_panel();
    }

    /// Explicitly invokes completion at the cursor, bypassing the
    /// while-typing gate.
    pub fn invoke<E: EditorView>(&mut self, view: &E) {
        if !self.running {
            return;
        }
        self.requeried = None;
        // An explicit command asks for a fresh answer, not a replay.
        self.scheduler.clear_cache();
        let profile = self.effective_profile(view);
        self.issue_query(view, &profile);
    }

    /// Forwards a key press to the open panel. Returns whether the key was
    /// consumed.
    pub fn handle_key<E: EditorView>(&mut self, view: &mut E, key: PanelKey) -> bool {
        let outcome = match self.panel.as_mut() {
            Some(panel) => panel.handle_key(key),
            None => return false,
        };

        match outcome {
            KeyOutcome::CommitRequested => {
                self.commit_selection(view);
                true
            }
            KeyOutcome::Dismissed => {
                self.panel = None;
                self.docblock_active = false;
                true
            }
            KeyOutcome::Moved | KeyOutcome::Expanded => true,
            KeyOutcome::Ignored => false,
        }
    }

    /// Applies every settled reply waiting in the channel. Returns how many
    /// were applied.
    pub fn pump<E: EditorView>(&mut self, view: &mut E) -> usize {
        let mut applied = 0;
        while let Ok(reply) = self.reply_rx.try_recv() {
            self.apply_reply(view, reply);
            applied += 1;
        }
        applied
    }

    /// Awaits the next settled reply and applies it. Returns false when the
    /// scheduler side of the channel is gone.
    pub async fn wait_reply<E: EditorView>(&mut self, view: &mut E) -> bool {
        match self.reply_rx.recv().await {
            Some(reply) => {
                self.apply_reply(view, reply);
                true
            }
            None => false,
        }
    }

    fn effective_profile<E: EditorView>(&self, view: &E) -> LanguageProfile {
        let head = view.text_range(0, LANGUAGE_SNIFF_CHARS);
        self.languages.resolve(view.language_id(), &head).clone()
    }

    fn issue_query<E: EditorView>(&mut self, view: &E, profile: &LanguageProfile) {
        let cursor = view.cursor();
        let line = view.line_of(cursor);
        let prefix = editor::word_before(view, cursor, profile.query_class());

        self.session.view = Some(view.view_id());
        self.session.line = Some(line);
        self.session.typed = prefix.clone();

        let context_path = self.context_path.clone().or_else(|| {
            view.path()
                .and_then(|path| path.parent().map(PathBuf::from))
        });

        let query = CompletionQuery {
            view: view.view_id(),
            buffer: view.text(),
            pos: cursor,
            line,
            prefix,
            path: view.path().map(PathBuf::from),
            context_path,
            import_paths: self.import_paths.clone(),
            language: profile.id.clone(),
            limit: self.config.max_results_hard,
        };
        self.scheduler.schedule(query);
    }

    fn update_panel<E: EditorView>(&mut self, view: &E, profile: &LanguageProfile, typed: &str) {
        let (outcome, anchor) = match self.panel.as_mut() {
            Some(panel) => (panel.update(None, None, typed), panel.anchor()),
            None => return,
        };
        match outcome {
            UpdateOutcome::Kept => {}
            UpdateOutcome::NeedsRequery => self.requery(view, profile, anchor, typed),
            UpdateOutcome::Destroyed => {
                self.panel = None;
                self.docblock_active = false;
            }
        }
    }

    /// Issues the automatic follow-up query for a hard-capped result that
    /// filtered to nothing. A repeat for the same (anchor, typed) spot is
    /// dropped: the service has nothing new to say about it.
    fn requery<E: EditorView>(
        &mut self,
        view: &E,
        profile: &LanguageProfile,
        anchor: usize,
        typed: &str,
    ) {
        if self
            .requeried
            .as_ref()
            .is_some_and(|(a, t)| *a == anchor && t == typed)
        {
            debug!(anchor, typed, "hard-cap requery already tried, giving up");
            return;
        }
        self.requeried = Some((anchor, typed.to_string()));
        // The cached answer is the one that just filtered to nothing.
        self.scheduler.clear_cache();
        self.issue_query(view, profile);
    }

    fn commit_selection<E: EditorView>(&mut self, view: &mut E) {
        let Some(outcome) = self.panel.as_mut().and_then(|panel| panel.commit(view)) else {
            return;
        };
        self.invoking = self.panel.as_ref().is_some_and(Panel::invoking);
        self.panel = None;
        self.docblock_active = false;
        self.session.typed.clear();

        if let Some(path) = view.path() {
            // The commit changed the buffer; cached results for it are gone.
            self.scheduler.invalidate_cache(path);
        }

        if outcome.retrigger {
            self.requeried = None;
            let profile = self.effective_profile(view);
            self.issue_query(view, &profile);
        }
    }

    fn apply_reply<E: EditorView>(&mut self, view: &mut E, reply: ServiceReply) {
        // Settlement bookkeeping runs whether or not the reply survives.
        self.session.typed.clear();
        self.session.token = self.scheduler.current_token();
        if self.scheduler.outstanding() == 0 && self.panel.is_none() {
            self.session.clear();
        }

        if !self.running {
            return;
        }
        if reply.view != view.view_id() {
            debug!(?reply.view, "reply for a different view, dropped");
            return;
        }

        let profile = self.effective_profile(view);
        let cursor = view.cursor();
        let gap = if cursor > reply.origin {
            view.text_range(reply.origin, cursor)
        } else {
            String::new()
        };

        match filter::validate(
            &reply.set,
            reply.token,
            self.scheduler.current_token(),
            reply.origin,
            cursor,
            &gap,
            &profile,
            &self.config,
        ) {
            Ok(()) => {}
            Err(Discard::Empty) => {
                debug!(token = reply.token, "empty result, closing panel");
                self.destroy_panel();
                return;
            }
            Err(reason) => {
                debug!(token = reply.token, ?reason, "stale result dropped");
                return;
            }
        }

        self.docblock_active = reply.set.docblock;
        let typed = editor::word_before(view, cursor, profile.query_class());

        let same_surface = self.panel.as_ref().is_some_and(|panel| {
            panel.symbol() == reply.set.symbol.as_deref() && panel.view_id() == reply.view
        });

        if same_surface {
            let outcome = match self.panel.as_mut() {
                Some(panel) => panel.update(Some(reply.set), Some(reply.origin), &typed),
                None => return,
            };
            match outcome {
                UpdateOutcome::Kept => {}
                UpdateOutcome::NeedsRequery => {
                    self.requery(view, &profile, reply.origin, &typed);
                }
                UpdateOutcome::Destroyed => {
                    self.panel = None;
                    self.docblock_active = false;
                }
            }
        } else {
            self.destroy_panel();
            match Panel::open(
                reply.set,
                reply.origin,
                reply.view,
                reply.token,
                &typed,
                &profile,
                &self.config,
            ) {
                Ok(panel) => self.panel = Some(panel),
                Err(OpenError::NeedsRequery) => self.requery(view, &profile, reply.origin, &typed),
                Err(OpenError::Empty) => {}
            }
        }
    }

    fn destroy_panel(&mut self) {
        if let Some(mut panel) = self.panel.take() {
            panel.destroy();
        }
        self.docblock_active = false;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::editor::ScratchBuffer;
    use crate::service::{
        Candidate, CandidateKind, CandidateSource, CompletionSet, ServiceFuture,
    };
    use std::time::Duration;

    struct FixedService {
        names: Vec<&'static str>,
    }

    impl CompletionService for FixedService {
        fn id(&self) -> &str {
            "fixed"
        }

        fn get_completions(&self, query: &CompletionQuery) -> ServiceFuture {
            let entries = self
                .names
                .iter()
                .map(|name| Candidate::new(*name, CandidateKind::Word, CandidateSource::Buffer))
                .collect();
            let symbol = (!query.prefix.is_empty()).then(|| query.prefix.clone());
            Box::pin(async move {
                Ok(CompletionSet {
                    symbol,
                    entries,
                    signature: None,
                    docblock: false,
                })
            })
        }
    }

    fn pipeline(names: Vec<&'static str>) -> CompletionPipeline {
        let config = CompletionConfig {
            debounce: Duration::from_millis(10),
            ..CompletionConfig::default()
        };
        let mut pipeline = CompletionPipeline::new(
            config,
            LanguageRegistry::new(),
            Arc::new(FixedService { names }),
        );
        pipeline.start();
        pipeline
    }

    fn type_str(pipeline: &mut CompletionPipeline, view: &mut ScratchBuffer, text: &str) {
        for ch in text.chars() {
            view.type_char(ch);
            pipeline.on_char_modified(view, Some(ch));
        }
    }

    #[tokio::test]
    async fn test_typing_opens_panel() {
        let mut view = ScratchBuffer::new(ViewId(1), "rust");
        let mut pipeline = pipeline(vec!["foo", "food"]);

        type_str(&mut pipeline, &mut view, "fo");
        assert!(pipeline.wait_reply(&mut view).await);

        let panel = pipeline.panel().unwrap();
        assert_eq!(panel.row_count(), 2);
        assert_eq!(panel.anchor(), 2);
    }

    #[tokio::test]
    async fn test_stopped_pipeline_ignores_events() {
        let mut view = ScratchBuffer::new(ViewId(1), "rust");
        let mut pipeline = pipeline(vec!["foo"]);
        pipeline.stop();

        type_str(&mut pipeline, &mut view, "fo");
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(pipeline.pump(&mut view), 0);
        assert!(pipeline.panel().is_none());
    }

    #[tokio::test]
    async fn test_invoke_bypasses_while_typing_gate() {
        let mut view = ScratchBuffer::from_text(ViewId(1), "rust", "fo");
        let config = CompletionConfig {
            while_typing: false,
            debounce: Duration::from_millis(10),
            ..CompletionConfig::default()
        };
        let mut pipeline = CompletionPipeline::new(
            config,
            LanguageRegistry::new(),
            Arc::new(FixedService {
                names: vec!["foo"],
            }),
        );
        pipeline.start();

        // Typing does nothing with while_typing off...
        pipeline.on_char_modified(&view, Some('o'));
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(pipeline.pump(&mut view), 0);

        // ...but the explicit command queries.
        pipeline.invoke(&view);
        assert!(pipeline.wait_reply(&mut view).await);
        assert!(pipeline.panel().is_some());
    }

    #[tokio::test]
    async fn test_cursor_move_destroys_panel() {
        let mut view = ScratchBuffer::new(ViewId(1), "rust");
        let mut pipeline = pipeline(vec!["foo"]);

        type_str(&mut pipeline, &mut view, "fo");
        pipeline.wait_reply(&mut view).await;
        assert!(pipeline.panel().is_some());

        view.set_cursor(0);
        pipeline.on_pos_changed(&view, 0, false);
        assert!(pipeline.panel().is_none());
    }

    #[tokio::test]
    async fn test_focus_loss_destroys_panel() {
        let mut view = ScratchBuffer::new(ViewId(1), "rust");
        let mut pipeline = pipeline(vec!["foo"]);

        type_str(&mut pipeline, &mut view, "fo");
        pipeline.wait_reply(&mut view).await;

        pipeline.on_focus_lost();
        assert!(pipeline.panel().is_none());
    }

    #[tokio::test]
    async fn test_reply_for_other_view_dropped() {
        let mut view = ScratchBuffer::new(ViewId(1), "rust");
        let mut pipeline = pipeline(vec!["foo"]);

        type_str(&mut pipeline, &mut view, "fo");

        // Apply the reply against a different view.
        let mut other = ScratchBuffer::from_text(ViewId(2), "rust", "fo");
        pipeline.wait_reply(&mut other).await;
        assert!(pipeline.panel().is_none());
    }

    #[tokio::test]
    async fn test_commit_sets_invoking_and_suppresses_next_trigger() {
        let mut view = ScratchBuffer::new(ViewId(1), "rust");
        let mut pipeline = pipeline(vec!["foobar"]);

        type_str(&mut pipeline, &mut view, "fo");
        pipeline.wait_reply(&mut view).await;
        assert!(pipeline.panel().is_some());

        assert!(pipeline.handle_key(&mut view, PanelKey::Commit));
        assert_eq!(view.text(), "foobar");
        assert!(pipeline.panel().is_none());

        // The insertion's own char notification is swallowed.
        pipeline.on_char_modified(&view, Some('r'));
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(pipeline.pump(&mut view), 0);
    }
}
