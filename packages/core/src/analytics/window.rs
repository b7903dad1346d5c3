//! Windowed classification of the recent-posts listing.
//!
//! [`WeeklyTally`] is a single-pass accumulator: records are fed one at a
//! time, newest first, and the tally reports when the listing has moved past
//! the previous week so the caller can stop fetching.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};

use crate::analytics::{
    config::DetectorConfig,
    detector::{is_aging, is_rising, looks_like_question},
    trend::PeriodCounts,
    types::{MetricsSnapshot, PostRecord, PostSummary, UnansweredSummary},
};

/// The two rolling weeks anchored at `now`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekWindows {
    pub now: DateTime<Utc>,
    pub current_start: DateTime<Utc>,
    pub previous_start: DateTime<Utc>,
}

/// Where a record falls relative to [`WeekWindows`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowBucket {
    /// `[now - 7d, now]`
    Current,
    /// `[now - 14d, now - 7d)`
    Previous,
    /// Older than the previous week.
    Expired,
    /// Created after `now`.
    Future,
}

impl WeekWindows {
    pub fn anchored_at(now: DateTime<Utc>) -> Self {
        Self {
            now,
            current_start: now - Duration::days(7),
            previous_start: now - Duration::days(14),
        }
    }

    pub fn bucket(&self, created_at: DateTime<Utc>) -> WindowBucket {
        if created_at > self.now {
            WindowBucket::Future
        } else if created_at >= self.current_start {
            WindowBucket::Current
        } else if created_at >= self.previous_start {
            WindowBucket::Previous
        } else {
            WindowBucket::Expired
        }
    }
}

/// Caps applied to every list the tally produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListLimits {
    pub top_posts: usize,
    pub unanswered: usize,
    pub latency_attempts: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanFlow {
    Continue,
    Stop,
}

/// Accumulator threaded through the recent-posts scan
#[derive(Debug, Clone, PartialEq)]
pub struct WeeklyTally {
    windows: WeekWindows,
    limits: ListLimits,
    detectors: DetectorConfig,
    pub records_seen: usize,
    pub current: PeriodCounts,
    pub previous: PeriodCounts,
    pub post_type_mix: BTreeMap<String, u64>,
    pub flair_distribution: BTreeMap<String, u64>,
    pub unanswered: Vec<UnansweredSummary>,
    pub aging_unanswered: Vec<UnansweredSummary>,
    pub rising_posts: Vec<PostSummary>,
    /// Answered current-week posts selected for a latency lookup.
    pub latency_candidates: Vec<PostRecord>,
}

impl WeeklyTally {
    pub fn new(windows: WeekWindows, limits: ListLimits, detectors: DetectorConfig) -> Self {
        Self {
            windows,
            limits,
            detectors,
            records_seen: 0,
            current: PeriodCounts::default(),
            previous: PeriodCounts::default(),
            post_type_mix: BTreeMap::new(),
            flair_distribution: BTreeMap::new(),
            unanswered: Vec::new(),
            aging_unanswered: Vec::new(),
            rising_posts: Vec::new(),
            latency_candidates: Vec::new(),
        }
    }

    pub fn windows(&self) -> &WeekWindows {
        &self.windows
    }

    /// Fold one record into the tally.
    pub fn observe(&mut self, record: &PostRecord) -> ScanFlow {
        self.records_seen += 1;
        match self.windows.bucket(record.created_at) {
            WindowBucket::Current => self.observe_current(record),
            WindowBucket::Previous => {
                self.previous.total += 1;
                if record.is_unanswered() {
                    self.previous.unanswered += 1;
                }
            }
            WindowBucket::Future => {}
            WindowBucket::Expired => return ScanFlow::Stop,
        }
        ScanFlow::Continue
    }

    fn observe_current(&mut self, record: &PostRecord) {
        self.current.total += 1;
        *self
            .post_type_mix
            .entry(record.kind().as_str().to_string())
            .or_insert(0) += 1;
        *self
            .flair_distribution
            .entry(record.flair_label().to_string())
            .or_insert(0) += 1;

        let age_hours = record.age_hours(self.windows.now);

        if record.is_unanswered() {
            self.current.unanswered += 1;
            if self.unanswered.len() < self.limits.unanswered {
                let summary = UnansweredSummary {
                    title: record.title.clone(),
                    permalink: record.permalink.clone(),
                    question_like: looks_like_question(&record.title),
                };
                // Aging is a filter over the primary list, never a separate pick.
                if is_aging(age_hours, &self.detectors)
                    && self.aging_unanswered.len() < self.limits.unanswered
                {
                    self.aging_unanswered.push(summary.clone());
                }
                self.unanswered.push(summary);
            }
        } else if self.latency_candidates.len() < self.limits.latency_attempts {
            self.latency_candidates.push(record.clone());
        }

        if self.rising_posts.len() < self.limits.top_posts
            && is_rising(record.score, age_hours, &self.detectors)
        {
            self.rising_posts.push(PostSummary::from(record));
        }
    }

    /// Snapshot of the current week with the given latency median.
    pub fn snapshot(&self, median_latency_minutes: Option<f64>) -> MetricsSnapshot {
        MetricsSnapshot {
            total_posts: self.current.total,
            unanswered: self.current.unanswered,
            unanswered_rate: self.current.unanswered_rate(),
            median_latency_minutes,
            post_type_mix: self.post_type_mix.clone(),
            flair_distribution: self.flair_distribution.clone(),
        }
    }
}

/// Run the tally over an in-memory sequence, honouring early stop.
pub fn tally_records<'r, I>(records: I, tally: &mut WeeklyTally)
where
    I: IntoIterator<Item = &'r PostRecord>,
{
    for record in records {
        if tally.observe(record) == ScanFlow::Stop {
            break;
        }
    }
}
