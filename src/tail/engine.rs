//! Page-walk and tail loop.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use ddtail_protocol::ResponseStatus;
use tracing::{debug, info, warn};

use super::backoff::{BackoffConfig, BackoffScheduler};
use super::dedup::{DedupCache, DEFAULT_DEDUP_CAPACITY};
use super::{Sleeper, TailError, ThreadSleeper};
use crate::backend::{Fetcher, Page, TransportError};
use crate::config::TailConfig;
use crate::normalize::Normalizer;
use crate::query::QueryBuilder;
use crate::render::Renderer;

/// Engine tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Fixed pacing between pages of one walk.
    pub page_delay: Duration,
    pub backoff: BackoffConfig,
    pub dedup_capacity: usize,
    /// In follow mode, treat transient transport errors as an empty iteration.
    pub retry_transient_errors: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            page_delay: Duration::from_millis(200),
            backoff: BackoffConfig::default(),
            dedup_capacity: DEFAULT_DEDUP_CAPACITY,
            retry_transient_errors: true,
        }
    }
}

impl EngineConfig {
    pub fn from_tail(tail: &TailConfig) -> Self {
        Self {
            page_delay: tail.page_delay(),
            backoff: BackoffConfig::from_tail(tail),
            dedup_capacity: tail.dedup_capacity,
            retry_transient_errors: tail.retry_transient_errors,
        }
    }
}

/// Outcome of draining one query window.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalkSummary {
    /// Fetches issued.
    pub pages: usize,
    /// Entries decoded from all pages.
    pub fetched: usize,
    /// Entries written to the output.
    pub emitted: usize,
    /// Entries suppressed as already seen.
    pub duplicates: usize,
    /// Records the backend sent that could not be decoded.
    pub dropped: usize,
    /// Status of the last page.
    pub last_status: Option<ResponseStatus>,
}

/// Outcome of one follow-mode iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct IterationReport {
    pub walk: WalkSummary,
    /// Transient error that cut the walk short, if any.
    pub error: Option<TransportError>,
    /// Delay slept after the walk.
    pub slept: Duration,
    /// Delay that will be slept after the next walk.
    pub next_delay: Duration,
}

/// Running totals for a session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub iterations: u64,
    pub pages: u64,
    pub fetched: u64,
    pub emitted: u64,
    pub duplicates: u64,
    pub dropped: u64,
    pub retried_errors: u64,
}

impl SessionStats {
    fn absorb(&mut self, walk: &WalkSummary) {
        self.pages += walk.pages as u64;
        self.fetched += walk.fetched as u64;
        self.emitted += walk.emitted as u64;
        self.duplicates += walk.duplicates as u64;
        self.dropped += walk.dropped as u64;
    }
}

/// Drives fetch, order, dedup, normalize and render for one session.
///
/// The dedup cache and backoff state are owned here and only touched from
/// the calling thread.
pub struct TailEngine<F, S = ThreadSleeper> {
    fetcher: F,
    sleeper: S,
    builder: QueryBuilder,
    normalizer: Normalizer,
    renderer: Renderer,
    config: EngineConfig,
    dedup: DedupCache,
    backoff: BackoffScheduler,
    stats: SessionStats,
    stop: Option<Arc<AtomicBool>>,
}

impl<F: Fetcher> TailEngine<F, ThreadSleeper> {
    pub fn new(
        fetcher: F,
        builder: QueryBuilder,
        normalizer: Normalizer,
        renderer: Renderer,
        config: EngineConfig,
    ) -> Self {
        Self {
            fetcher,
            sleeper: ThreadSleeper,
            builder,
            normalizer,
            renderer,
            dedup: DedupCache::new(config.dedup_capacity),
            backoff: BackoffScheduler::new(config.backoff),
            config,
            stats: SessionStats::default(),
            stop: None,
        }
    }
}

impl<F: Fetcher, S: Sleeper> TailEngine<F, S> {
    /// Replace the sleeper (tests use a recording one).
    pub fn with_sleeper<S2: Sleeper>(self, sleeper: S2) -> TailEngine<F, S2> {
        TailEngine {
            fetcher: self.fetcher,
            sleeper,
            builder: self.builder,
            normalizer: self.normalizer,
            renderer: self.renderer,
            config: self.config,
            dedup: self.dedup,
            backoff: self.backoff,
            stats: self.stats,
            stop: self.stop,
        }
    }

    /// Flag checked before each follow-mode iteration.
    pub fn with_stop_flag(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = Some(stop);
        self
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn backoff(&self) -> &BackoffScheduler {
        &self.backoff
    }

    /// Drain every page of the current window, writing rendered entries.
    pub fn page_walk<W: Write>(&mut self, out: &mut W) -> Result<WalkSummary, TailError> {
        let mut summary = WalkSummary::default();
        let result = self.walk_into(out, &mut summary);
        self.stats.absorb(&summary);
        result.map(|()| summary)
    }

    fn walk_into<W: Write>(&mut self, out: &mut W, summary: &mut WalkSummary) -> Result<(), TailError> {
        let mut cursor: Option<String> = None;

        loop {
            let query = self.builder.build(cursor.as_deref());
            let page = self.fetcher.fetch(&query)?;
            summary.pages += 1;
            summary.last_status = Some(page.status);

            debug!(
                page = summary.pages,
                entries = page.entries.len(),
                status = %page.status,
                has_cursor = page.next_cursor.is_some(),
                "Fetched page"
            );

            if page.status.is_error() {
                return Err(TailError::Backend { query: query.query });
            }

            let status = page.status;
            let next_cursor = self.process_batch(page, out, summary)?;

            if status == ResponseStatus::Done {
                break;
            }
            match next_cursor {
                Some(next) => {
                    cursor = Some(next);
                    self.sleeper.sleep(self.config.page_delay);
                }
                None => break,
            }
        }

        Ok(())
    }

    /// Order, filter, normalize and render one page. Returns its cursor.
    fn process_batch<W: Write>(
        &mut self,
        page: Page,
        out: &mut W,
        summary: &mut WalkSummary,
    ) -> Result<Option<String>, TailError> {
        let Page {
            mut entries,
            next_cursor,
            dropped,
            ..
        } = page;

        summary.fetched += entries.len();
        summary.dropped += dropped;

        // Stable: equal timestamps keep backend order.
        entries.sort_by_key(|e| e.timestamp);

        for mut entry in entries {
            if !self.dedup.observe(&entry.id) {
                summary.duplicates += 1;
                continue;
            }

            self.normalizer.normalize(&mut entry);
            let rendered = self.renderer.render(&entry);
            writeln!(out, "{}", rendered.text)?;
            out.flush()?;
            summary.emitted += 1;
        }

        Ok(next_cursor)
    }

    /// Single-shot mode: one page-walk.
    pub fn run_once<W: Write>(&mut self, out: &mut W) -> Result<WalkSummary, TailError> {
        let summary = self.page_walk(out)?;
        info!(
            pages = summary.pages,
            emitted = summary.emitted,
            dropped = summary.dropped,
            "Search complete"
        );
        Ok(summary)
    }

    /// One follow-mode iteration: walk, sleep the current delay, then adjust
    /// the delay by whether anything was emitted.
    pub fn tail_iteration<W: Write>(&mut self, out: &mut W) -> Result<IterationReport, TailError> {
        let mut walk = WalkSummary::default();
        let result = self.walk_into(out, &mut walk);
        self.stats.absorb(&walk);
        self.stats.iterations += 1;

        let error = match result {
            Ok(()) => None,
            Err(TailError::Transport(e)) if self.config.retry_transient_errors && e.is_transient() => {
                warn!("{}; retrying in {:?}", e, self.backoff.current());
                self.stats.retried_errors += 1;
                Some(e)
            }
            Err(e) => return Err(e),
        };

        let slept = self.backoff.current();
        self.sleeper.sleep(slept);
        let next_delay = self.backoff.record(walk.emitted > 0);

        debug!(
            iteration = self.stats.iterations,
            emitted = walk.emitted,
            duplicates = walk.duplicates,
            next_delay_ms = next_delay.as_millis() as u64,
            "Tail iteration complete"
        );

        Ok(IterationReport {
            walk,
            error,
            slept,
            next_delay,
        })
    }

    /// Follow mode: iterate until the stop flag is raised or a fatal error.
    pub fn run_tail<W: Write>(&mut self, out: &mut W) -> Result<SessionStats, TailError> {
        info!(
            min_delay_ms = self.config.backoff.min.as_millis() as u64,
            max_delay_ms = self.config.backoff.max.as_millis() as u64,
            "Following logs"
        );

        while !self.is_stopped() {
            self.tail_iteration(out)?;
        }

        info!(
            iterations = self.stats.iterations,
            emitted = self.stats.emitted,
            "Tail stopped"
        );
        Ok(self.stats.clone())
    }

    fn is_stopped(&self) -> bool {
        self.stop
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FormatDefinition;
    use crate::mock::{message_log, FailureConfig, MockBackend, RecordingSleeper};
    use crate::query::{QueryOptions, TimeWindow};
    use crate::render::OutputMode;
    use std::io;

    const T1: &str = "2019-10-03T13:22:51.000Z";
    const T2: &str = "2019-10-03T13:22:52.000Z";
    const T3: &str = "2019-10-03T13:22:53.000Z";

    fn engine_with(
        backend: MockBackend,
        config: EngineConfig,
    ) -> (TailEngine<MockBackend, Arc<RecordingSleeper>>, Arc<RecordingSleeper>) {
        let renderer = Renderer::from_formats(
            OutputMode::Formatted,
            &[FormatDefinition::new("plain", "{{._message_text}}")],
        )
        .unwrap();
        let sleeper = Arc::new(RecordingSleeper::new());
        let engine = TailEngine::new(
            backend,
            QueryBuilder::new(QueryOptions::new(TimeWindow::Relative(60))),
            Normalizer::default(),
            renderer,
            config,
        )
        .with_sleeper(Arc::clone(&sleeper));
        (engine, sleeper)
    }

    fn engine(backend: MockBackend) -> (TailEngine<MockBackend, Arc<RecordingSleeper>>, Arc<RecordingSleeper>) {
        engine_with(backend, EngineConfig::default())
    }

    fn lines(out: Vec<u8>) -> Vec<String> {
        String::from_utf8(out).unwrap().lines().map(str::to_string).collect()
    }

    #[test]
    fn test_batch_emitted_oldest_first() {
        let backend = MockBackend::new().with_page(
            vec![
                message_log("c", T3, "three"),
                message_log("a", T1, "one"),
                message_log("b", T2, "two"),
            ],
            None,
            ResponseStatus::Done,
        );
        let (mut engine, _) = engine(backend);

        let mut out = Vec::new();
        let summary = engine.run_once(&mut out).unwrap();

        assert_eq!(lines(out), vec!["one", "two", "three"]);
        assert_eq!(summary.pages, 1);
        assert_eq!(summary.emitted, 3);
    }

    #[test]
    fn test_walk_follows_cursor_and_dedups() {
        let backend = MockBackend::new()
            .with_page(vec![message_log("a", T1, "one"), message_log("b", T2, "two")], Some("c1"), ResponseStatus::Ok)
            .with_page(vec![message_log("b", T2, "two"), message_log("c", T3, "three")], None, ResponseStatus::Done);
        let (mut engine, sleeper) = engine(backend.clone());

        let mut out = Vec::new();
        let summary = engine.page_walk(&mut out).unwrap();

        assert_eq!(lines(out), vec!["one", "two", "three"]);
        assert_eq!(summary.pages, 2);
        assert_eq!(summary.fetched, 4);
        assert_eq!(summary.duplicates, 1);
        assert_eq!(summary.last_status, Some(ResponseStatus::Done));
        assert_eq!(backend.cursors(), vec![None, Some("c1".to_string())]);
        assert_eq!(sleeper.sleeps(), vec![Duration::from_millis(200)]);
    }

    #[test]
    fn test_done_with_cursor_is_terminal() {
        let backend = MockBackend::new()
            .with_page(vec![message_log("a", T1, "one")], Some("c9"), ResponseStatus::Done)
            .with_page(vec![message_log("z", T3, "never")], None, ResponseStatus::Done);
        let (mut engine, _) = engine(backend.clone());

        let mut out = Vec::new();
        engine.page_walk(&mut out).unwrap();

        assert_eq!(lines(out), vec!["one"]);
        assert_eq!(backend.requests().len(), 1);
        assert_eq!(backend.remaining(), 1);
    }

    #[test]
    fn test_ok_without_cursor_ends_walk() {
        let backend = MockBackend::new().with_page(vec![message_log("a", T1, "one")], None, ResponseStatus::Ok);
        let (mut engine, sleeper) = engine(backend.clone());

        let summary = engine.page_walk(&mut Vec::new()).unwrap();
        assert_eq!(summary.pages, 1);
        assert_eq!(summary.last_status, Some(ResponseStatus::Ok));
        assert!(sleeper.sleeps().is_empty());
    }

    #[test]
    fn test_error_status_is_fatal() {
        let backend = MockBackend::new()
            .with_page(vec![message_log("a", T1, "one")], Some("c1"), ResponseStatus::Ok)
            .with_page(vec![message_log("b", T2, "two")], None, ResponseStatus::Error);
        let (mut engine, _) = engine(backend);

        let mut out = Vec::new();
        let err = engine.run_once(&mut out).unwrap_err();

        assert!(matches!(err, TailError::Backend { ref query } if query == "*"));
        assert_eq!(err.exit_code(), 30);
        assert_eq!(lines(out), vec!["one"]);
        assert_eq!(engine.stats().emitted, 1);
    }

    #[test]
    fn test_single_shot_transport_error_is_fatal() {
        let backend = MockBackend::new();
        backend.inject_failure(FailureConfig::status(503, "unavailable"));
        let (mut engine, _) = engine(backend);

        let err = engine.run_once(&mut Vec::new()).unwrap_err();
        assert!(matches!(err, TailError::Transport(_)));
        assert_eq!(err.exit_code(), 20);
    }

    #[test]
    fn test_tail_iteration_backoff() {
        let backend = MockBackend::new()
            .with_page(vec![], None, ResponseStatus::Done)
            .with_page(vec![], None, ResponseStatus::Done)
            .with_page(vec![message_log("a", T1, "one")], None, ResponseStatus::Done);
        let (mut engine, sleeper) = engine(backend);
        let mut out = Vec::new();

        let first = engine.tail_iteration(&mut out).unwrap();
        assert_eq!(first.slept, Duration::from_secs(1));
        assert_eq!(first.next_delay, Duration::from_secs(2));

        let second = engine.tail_iteration(&mut out).unwrap();
        assert_eq!(second.slept, Duration::from_secs(2));
        assert_eq!(second.next_delay, Duration::from_secs(4));

        let third = engine.tail_iteration(&mut out).unwrap();
        assert_eq!(third.walk.emitted, 1);
        assert_eq!(third.slept, Duration::from_secs(4));
        assert_eq!(third.next_delay, Duration::from_secs(1));

        assert_eq!(
            sleeper.sleeps(),
            vec![Duration::from_secs(1), Duration::from_secs(2), Duration::from_secs(4)]
        );
        assert_eq!(engine.stats().iterations, 3);
    }

    #[test]
    fn test_dedup_across_iterations() {
        let page = vec![message_log("a", T1, "one"), message_log("b", T2, "two")];
        let backend = MockBackend::new()
            .with_page(page.clone(), None, ResponseStatus::Done)
            .with_page(page, None, ResponseStatus::Done);
        let (mut engine, _) = engine(backend);
        let mut out = Vec::new();

        engine.tail_iteration(&mut out).unwrap();
        let second = engine.tail_iteration(&mut out).unwrap();

        assert_eq!(second.walk.emitted, 0);
        assert_eq!(second.walk.duplicates, 2);
        assert_eq!(second.next_delay, Duration::from_secs(2));
        assert_eq!(lines(out), vec!["one", "two"]);
    }

    #[test]
    fn test_transient_error_retried_in_tail() {
        let backend = MockBackend::new().with_page(vec![message_log("a", T1, "one")], None, ResponseStatus::Done);
        backend.inject_failure(FailureConfig::status(503, "unavailable").with_fail_count(1));
        let (mut engine, _) = engine(backend);
        let mut out = Vec::new();

        let failed = engine.tail_iteration(&mut out).unwrap();
        assert!(failed.error.is_some());
        assert_eq!(failed.walk.emitted, 0);
        assert_eq!(failed.next_delay, Duration::from_secs(2));

        let recovered = engine.tail_iteration(&mut out).unwrap();
        assert!(recovered.error.is_none());
        assert_eq!(recovered.walk.emitted, 1);
        assert_eq!(engine.stats().retried_errors, 1);
    }

    #[test]
    fn test_partial_walk_before_error_resets_backoff() {
        let backend = MockBackend::new()
            .with_page(vec![], None, ResponseStatus::Done)
            .with_page(vec![message_log("a", T1, "one")], Some("c1"), ResponseStatus::Ok);
        backend.inject_failure(FailureConfig::connect("https://logs.test").after_calls(2).with_fail_count(1));
        let (mut engine, _) = engine(backend);
        let mut out = Vec::new();

        assert_eq!(engine.tail_iteration(&mut out).unwrap().next_delay, Duration::from_secs(2));

        let partial = engine.tail_iteration(&mut out).unwrap();
        assert!(partial.error.is_some());
        assert_eq!(partial.walk.emitted, 1);
        assert_eq!(partial.next_delay, Duration::from_secs(1));
    }

    #[test]
    fn test_auth_error_fatal_in_tail() {
        let backend = MockBackend::new();
        backend.inject_failure(FailureConfig::status(403, "forbidden"));
        let (mut engine, sleeper) = engine(backend);

        let err = engine.tail_iteration(&mut Vec::new()).unwrap_err();
        assert!(matches!(err, TailError::Transport(TransportError::Auth { status: 403, .. })));
        assert!(sleeper.sleeps().is_empty());
    }

    #[test]
    fn test_retry_disabled_makes_transient_fatal() {
        let backend = MockBackend::new();
        backend.inject_failure(FailureConfig::status(503, "unavailable"));
        let config = EngineConfig {
            retry_transient_errors: false,
            ..EngineConfig::default()
        };
        let (mut engine, _) = engine_with(backend, config);

        assert!(engine.tail_iteration(&mut Vec::new()).is_err());
    }

    #[test]
    fn test_run_tail_until_stopped() {
        let flag = Arc::new(AtomicBool::new(false));
        let sleeper = RecordingSleeper::stop_after(3, Duration::from_secs(1), Arc::clone(&flag));
        let backend = MockBackend::new().with_page(vec![message_log("a", T1, "one")], None, ResponseStatus::Done);
        let (engine, _) = engine(backend);
        let mut engine = engine.with_sleeper(sleeper).with_stop_flag(flag);

        let mut out = Vec::new();
        let stats = engine.run_tail(&mut out).unwrap();

        assert_eq!(stats.iterations, 3);
        assert_eq!(stats.emitted, 1);
        assert_eq!(lines(out), vec!["one"]);
    }

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_output_failure() {
        let backend = MockBackend::new().with_page(vec![message_log("a", T1, "one")], None, ResponseStatus::Done);
        let (mut engine, _) = engine(backend);

        let err = engine.run_once(&mut ClosedPipe).unwrap_err();
        assert!(err.is_broken_pipe());
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_engine_config_from_tail() {
        let tail = TailConfig {
            min_delay_ms: 500,
            max_delay_ms: 8000,
            factor: 3.0,
            page_delay_ms: 50,
            dedup_capacity: 16,
            retry_transient_errors: false,
        };
        let config = EngineConfig::from_tail(&tail);

        assert_eq!(config.page_delay, Duration::from_millis(50));
        assert_eq!(config.backoff.min, Duration::from_millis(500));
        assert_eq!(config.backoff.factor, 3.0);
        assert_eq!(config.dedup_capacity, 16);
        assert!(!config.retry_transient_errors);
    }
}
