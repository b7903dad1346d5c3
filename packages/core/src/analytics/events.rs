//! Engine event sink
//!
//! The engine never logs on its own. Everything worth observing is handed
//! to an [`EventSink`] passed in by the caller.

use crate::analytics::types::TrendMetric;

/// Observable moments of a single community run
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    RecentFetchStarted {
        community: String,
        fetch_limit: usize,
    },
    TopPostsUnavailable {
        community: String,
        reason: String,
    },
    /// The recent listing failed part way; aggregation continues with what was seen.
    SourceInterrupted {
        community: String,
        records_seen: usize,
        reason: String,
    },
    ScanFinished {
        community: String,
        records_seen: usize,
        /// `true` when the scan stopped on a record older than the previous week.
        reached_boundary: bool,
    },
    LatencySampleSkipped {
        community: String,
        permalink: String,
        reason: String,
    },
    TrendsUnavailable {
        community: String,
        skipped: Vec<TrendMetric>,
    },
    ReportAssembled {
        community: String,
        total_posts: u64,
        unanswered: u64,
        latency_samples: usize,
        latency_attempts: usize,
    },
}

/// Receiver for engine events
pub trait EventSink: Send + Sync {
    fn record(&self, event: &EngineEvent);
}

/// Sink that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn record(&self, _event: &EngineEvent) {}
}

impl<T: EventSink + ?Sized> EventSink for &T {
    fn record(&self, event: &EngineEvent) {
        (**self).record(event)
    }
}

impl<T: EventSink + ?Sized> EventSink for std::sync::Arc<T> {
    fn record(&self, event: &EngineEvent) {
        (**self).record(event)
    }
}

impl<A: EventSink, B: EventSink> EventSink for (A, B) {
    fn record(&self, event: &EngineEvent) {
        self.0.record(event);
        self.1.record(event);
    }
}
