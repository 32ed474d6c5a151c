//! Query scheduling and execution.
//!
//! `schedule` debounces triggers and coalesces overlapping calls so only the
//! most recent parameters run (throttle-to-latest). Each admitted query takes
//! the next generation token before the service call is dispatched; replies
//! carry the token back so the staleness filter can compare it against the
//! current generation. There is no network-level cancellation; a superseded
//! reply is simply never acted on.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::debounce::DebounceGate;
use crate::cache::{CacheKey, ResultCache};
use crate::editor::ViewId;
use crate::service::{CompletionQuery, CompletionService, CompletionSet};

/// One settled service call, delivered back to the pipeline's reply channel.
#[derive(Debug)]
pub struct ServiceReply {
    /// Generation token assigned at admission.
    pub token: u64,
    /// View the query was issued from.
    pub view: ViewId,
    /// Query-origin cursor offset (the panel anchor).
    pub origin: usize,
    /// The result; empty when the service failed.
    pub set: CompletionSet,
}

/// Debouncing, generation-stamping scheduler plus the async executor.
pub struct QueryScheduler {
    gate: Arc<DebounceGate>,
    pending: Arc<Mutex<Option<CompletionQuery>>>,
    generation: Arc<AtomicU64>,
    outstanding: Arc<AtomicUsize>,
    service: Arc<dyn CompletionService>,
    cache: Arc<Mutex<ResultCache>>,
    reply_tx: mpsc::UnboundedSender<ServiceReply>,
}

impl QueryScheduler {
    /// Creates a scheduler delivering replies to `reply_tx`.
    #[must_use]
    pub fn new(
        service: Arc<dyn CompletionService>,
        debounce: Duration,
        reply_tx: mpsc::UnboundedSender<ServiceReply>,
    ) -> Self {
        Self {
            gate: Arc::new(DebounceGate::new(debounce)),
            pending: Arc::new(Mutex::new(None)),
            generation: Arc::new(AtomicU64::new(0)),
            outstanding: Arc::new(AtomicUsize::new(0)),
            service,
            cache: Arc::new(Mutex::new(ResultCache::new())),
            reply_tx,
        }
    }

    /// Schedules `query`. Calls landing inside the quiet period replace the
    /// pending parameters; the single surviving waiter executes the latest.
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule(&self, query: CompletionQuery) {
        if let Ok(mut pending) = self.pending.lock() {
            *pending = Some(query);
        }
        let ticket = self.gate.arm();

        let gate = Arc::clone(&self.gate);
        let pending = Arc::clone(&self.pending);
        let generation = Arc::clone(&self.generation);
        let outstanding = Arc::clone(&self.outstanding);
        let service = Arc::clone(&self.service);
        let cache = Arc::clone(&self.cache);
        let reply_tx = self.reply_tx.clone();

        tokio::spawn(async move {
            if !gate.wait(ticket).await {
                return;
            }

            let query = match pending.lock() {
                Ok(mut slot) => slot.take(),
                Err(_) => None,
            };
            let Some(query) = query else {
                return;
            };

            let token = generation.fetch_add(1, Ordering::SeqCst) + 1;
            outstanding.fetch_add(1, Ordering::SeqCst);

            let key = CacheKey::for_query(&query);
            let cached = match cache.lock() {
                Ok(cache) => cache.get(&key).cloned(),
                Err(_) => None,
            };

            let set = match cached {
                Some(set) => {
                    debug!(token, service = service.id(), "completion served from cache");
                    set
                }
                None => match service.get_completions(&query).await {
                    Ok(set) => {
                        if let Ok(mut cache) = cache.lock() {
                            cache.insert(key, set.clone());
                        }
                        set
                    }
                    Err(err) => {
                        // Failure is indistinguishable from "no completions".
                        warn!(token, service = service.id(), %err, "completion request failed");
                        CompletionSet::default()
                    }
                },
            };

            outstanding.fetch_sub(1, Ordering::SeqCst);

            let reply = ServiceReply {
                token,
                view: query.view,
                origin: query.pos,
                set,
            };
            if reply_tx.send(reply).is_err() {
                debug!("completion reply channel closed");
            }
        });
    }

    /// Drops any pending (not yet admitted) trigger.
    pub fn cancel_pending(&self) {
        self.gate.cancel();
        if let Ok(mut pending) = self.pending.lock() {
            *pending = None;
        }
    }

    /// The most recently issued generation token.
    #[must_use]
    pub fn current_token(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Number of requests dispatched but not yet settled.
    #[must_use]
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::SeqCst)
    }

    /// Drops cached results for `path` (the buffer changed underneath them).
    pub fn invalidate_cache(&self, path: &std::path::Path) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.invalidate_file(path);
        }
    }

    /// Drops every cached result. Used when a repeat query must reach the
    /// service instead of replaying the answer that just proved useless.
    pub fn clear_cache(&self) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.clear();
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::service::{Candidate, CandidateKind, CandidateSource, ServiceError, ServiceFuture};
    use std::sync::atomic::AtomicUsize;

    struct CountingService {
        calls: AtomicUsize,
        fail: bool,
    }

    impl CountingService {
        fn new(fail: bool) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail,
            }
        }
    }

    impl CompletionService for CountingService {
        fn id(&self) -> &str {
            "counting"
        }

        fn get_completions(&self, _query: &CompletionQuery) -> ServiceFuture {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let fail = self.fail;
            Box::pin(async move {
                if fail {
                    Err(ServiceError::Unavailable("down".into()))
                } else {
                    Ok(CompletionSet::from_entries(vec![Candidate::new(
                        "foo",
                        CandidateKind::Word,
                        CandidateSource::Buffer,
                    )]))
                }
            })
        }
    }

    fn query(pos: usize, prefix: &str) -> CompletionQuery {
        CompletionQuery {
            view: ViewId(1),
            buffer: "foo".to_string(),
            pos,
            line: 0,
            prefix: prefix.to_string(),
            path: None,
            context_path: None,
            import_paths: Vec::new(),
            language: "rust".to_string(),
            limit: 100,
        }
    }

    #[tokio::test]
    async fn test_rapid_schedules_coalesce_to_one_call() {
        let service = Arc::new(CountingService::new(false));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let scheduler = QueryScheduler::new(
            Arc::clone(&service) as Arc<dyn CompletionService>,
            Duration::from_millis(20),
            tx,
        );

        scheduler.schedule(query(1, "f"));
        scheduler.schedule(query(2, "fo"));
        scheduler.schedule(query(3, "foo"));

        let reply = rx.recv().await.unwrap();
        assert_eq!(service.calls.load(Ordering::SeqCst), 1);
        // The surviving call used the latest parameters.
        assert_eq!(reply.origin, 3);
        assert_eq!(reply.token, 1);
    }

    #[tokio::test]
    async fn test_tokens_strictly_increase() {
        let service = Arc::new(CountingService::new(false));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let scheduler = QueryScheduler::new(
            service as Arc<dyn CompletionService>,
            Duration::from_millis(5),
            tx,
        );

        scheduler.schedule(query(1, "f"));
        let first = rx.recv().await.unwrap();
        scheduler.schedule(query(2, "fo"));
        let second = rx.recv().await.unwrap();

        assert!(second.token > first.token);
        assert_eq!(scheduler.current_token(), second.token);
    }

    #[tokio::test]
    async fn test_failure_becomes_empty_set() {
        let service = Arc::new(CountingService::new(true));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let scheduler = QueryScheduler::new(
            service as Arc<dyn CompletionService>,
            Duration::from_millis(5),
            tx,
        );

        scheduler.schedule(query(1, "f"));
        let reply = rx.recv().await.unwrap();
        assert!(reply.set.entries.is_empty());
        assert_eq!(scheduler.outstanding(), 0);
    }

    #[tokio::test]
    async fn test_cancel_pending_suppresses_dispatch() {
        let service = Arc::new(CountingService::new(false));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let scheduler = QueryScheduler::new(
            Arc::clone(&service) as Arc<dyn CompletionService>,
            Duration::from_millis(20),
            tx,
        );

        scheduler.schedule(query(1, "f"));
        scheduler.cancel_pending();

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(rx.try_recv().is_err());
        assert_eq!(service.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_identical_queries_hit_cache() {
        let service = Arc::new(CountingService::new(false));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let scheduler = QueryScheduler::new(
            Arc::clone(&service) as Arc<dyn CompletionService>,
            Duration::from_millis(5),
            tx,
        );

        scheduler.schedule(query(3, "foo"));
        let _ = rx.recv().await.unwrap();
        scheduler.schedule(query(3, "foo"));
        let second = rx.recv().await.unwrap();

        assert_eq!(service.calls.load(Ordering::SeqCst), 1);
        assert_eq!(second.set.entries.len(), 1);
        // Cache hits still get a fresh token.
        assert_eq!(second.token, 2);
    }
}
