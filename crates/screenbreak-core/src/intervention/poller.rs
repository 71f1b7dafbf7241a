//! Recurring query against the usage-tracking service.
//!
//! The poller issues one query immediately and then one per interval,
//! measured by wall clock rather than by completion of the previous query.
//! Each query runs as its own task, so slow responses may overlap; the
//! outcome that settles last is what ends up in the store.
//!
//! A failed query changes nothing. It is logged at `warn` and the next tick
//! proceeds as usual (no backoff, no failure counter).

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::model::Intervention;
use super::store::InterventionStore;
use crate::error::Result;
use crate::recurring::RecurringTask;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(15);

/// What one successful query reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Required(Intervention),
    NotRequired,
}

/// Anything that can answer "is an intervention required right now?".
pub trait InterventionSource: Send + Sync + 'static {
    fn check_intervention(&self) -> impl Future<Output = Result<PollOutcome>> + Send;
}

/// How to treat a response that settles after a newer one was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseOrdering {
    /// Apply every response as it settles.
    #[default]
    LastApplied,
    /// Drop responses whose query was issued before the last applied one.
    DiscardStale,
}

/// Write a poll outcome into the store, unconditionally.
pub fn apply_outcome(store: &InterventionStore, outcome: PollOutcome) {
    match outcome {
        PollOutcome::Required(intervention) => {
            tracing::debug!(kind = %intervention.kind, "intervention required");
            store.set_intervention(Some(intervention));
        }
        PollOutcome::NotRequired => store.set_intervention(None),
    }
}

#[derive(Debug, Default)]
struct Sequencer {
    issued: AtomicU64,
    applied: Mutex<u64>,
}

impl Sequencer {
    fn next(&self) -> u64 {
        self.issued.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Check and write under one lock so two settling queries cannot
    /// interleave between the comparison and the store update.
    fn apply(
        &self,
        seq: u64,
        ordering: ResponseOrdering,
        store: &InterventionStore,
        outcome: PollOutcome,
    ) -> bool {
        let mut applied = self.applied.lock().unwrap_or_else(PoisonError::into_inner);
        if ordering == ResponseOrdering::DiscardStale && seq < *applied {
            tracing::debug!(seq, last_applied = *applied, "dropping stale poll response");
            return false;
        }
        *applied = (*applied).max(seq);
        apply_outcome(store, outcome);
        true
    }
}

/// Periodically queries an [`InterventionSource`] and feeds the store.
pub struct InterventionPoller<S> {
    source: Arc<S>,
    store: InterventionStore,
    interval: Duration,
    ordering: ResponseOrdering,
    sequencer: Arc<Sequencer>,
}

impl<S: InterventionSource> InterventionPoller<S> {
    pub fn new(source: Arc<S>, store: InterventionStore) -> Self {
        Self {
            source,
            store,
            interval: DEFAULT_POLL_INTERVAL,
            ordering: ResponseOrdering::default(),
            sequencer: Arc::new(Sequencer::default()),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_ordering(mut self, ordering: ResponseOrdering) -> Self {
        self.ordering = ordering;
        self
    }

    pub fn store(&self) -> &InterventionStore {
        &self.store
    }

    /// Query once and apply the result.
    ///
    /// Unlike the background loop, a failure is returned to the caller. The
    /// store is only written on success.
    pub async fn poll_once(&self) -> Result<PollOutcome> {
        let seq = self.sequencer.next();
        let outcome = self.source.check_intervention().await?;
        self.sequencer
            .apply(seq, self.ordering, &self.store, outcome.clone());
        Ok(outcome)
    }

    /// Start polling in the background: one query now, then one per interval.
    ///
    /// Stopping (or dropping) the returned handle ends the schedule and
    /// aborts any query still in flight before it can write to the store.
    pub fn start(self) -> RecurringTask {
        tracing::info!(
            interval_secs = self.interval.as_secs_f64(),
            ordering = ?self.ordering,
            "starting intervention poller"
        );
        RecurringTask::spawn("intervention-poller", move |cancel| self.run(cancel))
    }

    async fn run(self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut in_flight = JoinSet::new();

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    in_flight.spawn(poll_and_apply(
                        Arc::clone(&self.source),
                        self.store.clone(),
                        Arc::clone(&self.sequencer),
                        self.sequencer.next(),
                        self.ordering,
                        cancel.clone(),
                    ));
                }
                Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                    if let Err(e) = joined {
                        if e.is_panic() {
                            tracing::error!("intervention poll task panicked: {e}");
                        }
                    }
                }
            }
        }

        in_flight.abort_all();
        while in_flight.join_next().await.is_some() {}
        tracing::info!("intervention poller stopped");
    }
}

async fn poll_and_apply<S: InterventionSource>(
    source: Arc<S>,
    store: InterventionStore,
    sequencer: Arc<Sequencer>,
    seq: u64,
    ordering: ResponseOrdering,
    cancel: CancellationToken,
) {
    let result = tokio::select! {
        biased;
        _ = cancel.cancelled() => return,
        result = source.check_intervention() => result,
    };
    if cancel.is_cancelled() {
        return;
    }

    match result {
        Ok(outcome) => {
            sequencer.apply(seq, ordering, &store, outcome);
        }
        Err(e) => tracing::warn!(seq, "intervention poll failed, keeping current state: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use crate::intervention::model::{InterventionKind, UsageSnapshot};
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;

    /// Answers queries from a script of (latency, response) pairs.
    /// Once the script runs out, queries never settle.
    #[derive(Default)]
    struct ScriptedSource {
        script: Mutex<VecDeque<(Duration, Result<PollOutcome>)>>,
        calls: AtomicUsize,
    }

    impl ScriptedSource {
        fn push(&self, latency_ms: u64, response: Result<PollOutcome>) {
            self.script
                .lock()
                .unwrap()
                .push_back((Duration::from_millis(latency_ms), response));
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl InterventionSource for ScriptedSource {
        fn check_intervention(&self) -> impl Future<Output = Result<PollOutcome>> + Send {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self.script.lock().unwrap().pop_front();
            async move {
                match next {
                    Some((latency, response)) => {
                        tokio::time::sleep(latency).await;
                        response
                    }
                    None => std::future::pending().await,
                }
            }
        }
    }

    fn intervention(kind: InterventionKind, message: &str) -> Intervention {
        Intervention::new(
            kind,
            message,
            UsageSnapshot {
                current_session_minutes: 12,
                today_minutes: 40,
                daily_goal_minutes: 60,
            },
        )
    }

    fn required(kind: InterventionKind, message: &str) -> Result<PollOutcome> {
        Ok(PollOutcome::Required(intervention(kind, message)))
    }

    fn failure() -> Result<PollOutcome> {
        Err(CoreError::Custom("connection refused".into()))
    }

    fn poller(source: &Arc<ScriptedSource>, store: &InterventionStore) -> InterventionPoller<ScriptedSource> {
        InterventionPoller::new(Arc::clone(source), store.clone()).with_interval(Duration::from_secs(15))
    }

    async fn advance_secs(secs: u64) {
        tokio::time::sleep(Duration::from_secs(secs)).await;
    }

    #[tokio::test]
    async fn poll_once_applies_required_and_not_required() {
        let source = Arc::new(ScriptedSource::default());
        let store = InterventionStore::new();
        source.push(0, required(InterventionKind::Notification, "Time Check"));
        source.push(0, Ok(PollOutcome::NotRequired));
        let poller = poller(&source, &store);

        poller.poll_once().await.unwrap();
        assert_eq!(store.current().map(|i| i.message), Some("Time Check".to_string()));

        poller.poll_once().await.unwrap();
        assert!(store.current().is_none());
    }

    #[tokio::test]
    async fn poll_once_failure_leaves_state_untouched() {
        let source = Arc::new(ScriptedSource::default());
        let store = InterventionStore::new();
        source.push(0, required(InterventionKind::Overlay, "keep me"));
        source.push(0, failure());
        let poller = poller(&source, &store);

        poller.poll_once().await.unwrap();
        assert!(poller.poll_once().await.is_err());
        assert_eq!(store.current().map(|i| i.message), Some("keep me".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn queries_immediately_then_every_interval() {
        let source = Arc::new(ScriptedSource::default());
        let store = InterventionStore::new();
        for _ in 0..4 {
            source.push(0, Ok(PollOutcome::NotRequired));
        }
        let task = poller(&source, &store).start();

        advance_secs(1).await;
        assert_eq!(source.calls(), 1);
        advance_secs(16).await;
        assert_eq!(source.calls(), 2);
        advance_secs(30).await;
        assert_eq!(source.calls(), 4);

        task.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn no_queries_after_stop() {
        let source = Arc::new(ScriptedSource::default());
        let store = InterventionStore::new();
        source.push(0, Ok(PollOutcome::NotRequired));
        let task = poller(&source, &store).start();
        advance_secs(1).await;
        task.stop().await.unwrap();

        let calls = source.calls();
        advance_secs(120).await;
        assert_eq!(source.calls(), calls);
    }

    #[tokio::test(start_paused = true)]
    async fn failures_do_not_stop_the_schedule() {
        let source = Arc::new(ScriptedSource::default());
        let store = InterventionStore::new();
        source.push(0, required(InterventionKind::Notification, "before"));
        source.push(0, failure());
        source.push(0, failure());
        source.push(0, Ok(PollOutcome::NotRequired));
        let task = poller(&source, &store).start();

        advance_secs(1).await;
        assert!(store.current().is_some());
        advance_secs(30).await;
        // two failed polls later the intervention is still there
        assert_eq!(source.calls(), 3);
        assert_eq!(store.current().map(|i| i.message), Some("before".to_string()));
        advance_secs(15).await;
        assert!(store.current().is_none());

        task.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn slow_response_settling_last_wins() {
        let source = Arc::new(ScriptedSource::default());
        let store = InterventionStore::new();
        // issued at t=0, settles at t=20
        source.push(20_000, required(InterventionKind::Overlay, "slow"));
        // issued at t=15, settles at t=16
        source.push(1_000, Ok(PollOutcome::NotRequired));
        let task = poller(&source, &store).start();

        advance_secs(17).await;
        assert!(store.current().is_none());
        advance_secs(4).await;
        assert_eq!(store.current().map(|i| i.message), Some("slow".to_string()));

        task.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn not_required_settling_last_clears_newer_looking_payload() {
        let source = Arc::new(ScriptedSource::default());
        let store = InterventionStore::new();
        // issued at t=0, settles at t=25
        source.push(25_000, Ok(PollOutcome::NotRequired));
        // issued at t=15, settles at t=16
        source.push(1_000, required(InterventionKind::Notification, "fresh"));
        let task = poller(&source, &store).start();

        advance_secs(17).await;
        assert_eq!(store.current().map(|i| i.message), Some("fresh".to_string()));
        advance_secs(10).await;
        assert!(store.current().is_none());

        task.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn discard_stale_drops_out_of_order_response() {
        let source = Arc::new(ScriptedSource::default());
        let store = InterventionStore::new();
        source.push(20_000, required(InterventionKind::Overlay, "slow"));
        source.push(1_000, Ok(PollOutcome::NotRequired));
        let task = poller(&source, &store)
            .with_ordering(ResponseOrdering::DiscardStale)
            .start();

        advance_secs(21).await;
        assert!(store.current().is_none());

        task.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn in_flight_query_cannot_write_after_stop() {
        let source = Arc::new(ScriptedSource::default());
        let store = InterventionStore::new();
        source.push(10_000, required(InterventionKind::Overlay, "late"));
        let task = poller(&source, &store).start();

        advance_secs(1).await;
        assert_eq!(source.calls(), 1);
        task.stop().await.unwrap();

        advance_secs(30).await;
        assert!(store.current().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_response_may_overwrite_a_dismissal() {
        let source = Arc::new(ScriptedSource::default());
        let store = InterventionStore::new();
        source.push(0, required(InterventionKind::Notification, "first"));
        // issued at t=15, settles at t=20
        source.push(5_000, required(InterventionKind::Notification, "again"));
        let task = poller(&source, &store).start();

        advance_secs(16).await;
        assert_eq!(store.current().map(|i| i.message), Some("first".to_string()));
        store.dismiss();
        assert!(store.current().is_none());
        advance_secs(5).await;
        assert_eq!(store.current().map(|i| i.message), Some("again".to_string()));

        task.stop().await.unwrap();
    }
}
