//! Autocomp
//!
//! An incremental code-completion pipeline: as the user types, it decides
//! whether to query a language service, debounces and generation-stamps the
//! asynchronous round-trip, discards replies that went stale in flight, and
//! drives a candidate panel through its open/update/destroy lifecycle.
//!
//! # Architecture
//!
//! - **Pipeline Module**: trigger detection, debounced scheduling with
//!   generation tokens, staleness filtering
//! - **Panel Module**: candidate panel state machine plus a ratatui adapter
//! - **Service Module**: the language-service trait and its data types
//! - **Editor Module**: the narrow editor-surface trait and a scratch buffer
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use autocomp::config::CompletionConfig;
//! use autocomp::editor::{ScratchBuffer, ViewId};
//! use autocomp::language::LanguageRegistry;
//! use autocomp::pipeline::CompletionPipeline;
//! use autocomp::words::BufferWordsService;
//!
//! # async fn run() {
//! let mut pipeline = CompletionPipeline::new(
//!     CompletionConfig::default(),
//!     LanguageRegistry::new(),
//!     Arc::new(BufferWordsService::new()),
//! );
//! pipeline.start();
//!
//! let mut view = ScratchBuffer::new(ViewId(1), "rust");
//! view.type_char('f');
//! pipeline.on_char_modified(&view, Some('f'));
//!
//! // In the event loop:
//! pipeline.pump(&mut view);
//! if let Some(panel) = pipeline.panel_view() {
//!     // render it
//! }
//! # }
//! ```

// Clippy configuration - allow common patterns
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::cast_possible_truncation)]

pub mod cache;
pub mod config;
pub mod editor;
pub mod language;
pub mod logging;
pub mod panel;
pub mod pipeline;
pub mod service;
pub mod words;

// Re-export main types
pub use config::{CompletionConfig, Config};
pub use editor::{EditEvent, EditorView, ScratchBuffer, ViewId};
pub use language::{CharClass, LanguageProfile, LanguageRegistry};
pub use panel::{Panel, PanelKey, PanelView};
pub use pipeline::CompletionPipeline;
pub use service::{
    Candidate, CandidateKind, CandidateSource, CompletionQuery, CompletionService, CompletionSet,
    Signature,
};
pub use words::BufferWordsService;
