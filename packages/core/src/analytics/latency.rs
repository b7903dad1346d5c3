//! Bounded-sample time-to-first-response estimator
//!
//! Each sample costs one comment lookup against the source, so the number
//! of attempts is capped no matter how many answered posts the week had.

use chrono::{DateTime, Utc};

use crate::analytics::{
    events::{EngineEvent, EventSink},
    provider::PostSource,
    types::PostRecord,
};

/// Outcome of one comment lookup
#[derive(Debug, Clone, PartialEq)]
pub enum SampleAttempt {
    Minutes(f64),
    Unavailable { reason: String },
}

/// Samples gathered for one community
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LatencyEstimate {
    pub samples: Vec<f64>,
    pub attempts: usize,
}

impl LatencyEstimate {
    pub fn median(&self) -> Option<f64> {
        median(&self.samples)
    }
}

/// Minutes between post creation and the first comment, clamped at zero.
pub fn minutes_to_first_response(
    post_created: DateTime<Utc>,
    first_comment: DateTime<Utc>,
) -> f64 {
    let seconds = (first_comment - post_created).num_milliseconds() as f64 / 1000.0;
    seconds.max(0.0) / 60.0
}

/// Statistical median; mean of the two middle values for even counts.
pub fn median(samples: &[f64]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    let mut sorted = samples.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

pub struct LatencyEstimator<'a> {
    source: &'a dyn PostSource,
    sink: &'a dyn EventSink,
    sample_cap: usize,
}

impl<'a> LatencyEstimator<'a> {
    pub fn new(source: &'a dyn PostSource, sink: &'a dyn EventSink, sample_cap: usize) -> Self {
        Self {
            source,
            sink,
            sample_cap,
        }
    }

    /// Look up one post's first comment.
    pub async fn sample(&self, post: &PostRecord) -> SampleAttempt {
        match self.source.fetch_first_comment_timestamp(post).await {
            Ok(Some(first_comment)) => {
                SampleAttempt::Minutes(minutes_to_first_response(post.created_at, first_comment))
            }
            Ok(None) => SampleAttempt::Unavailable {
                reason: "no comments returned".to_string(),
            },
            Err(err) => SampleAttempt::Unavailable {
                reason: err.to_string(),
            },
        }
    }

    /// Sample candidates in order, attempting at most `sample_cap` lookups.
    pub async fn estimate(&self, community: &str, candidates: &[PostRecord]) -> LatencyEstimate {
        let mut estimate = LatencyEstimate::default();

        for post in candidates.iter().take(self.sample_cap) {
            estimate.attempts += 1;
            match self.sample(post).await {
                SampleAttempt::Minutes(minutes) => estimate.samples.push(minutes),
                SampleAttempt::Unavailable { reason } => {
                    self.sink.record(&EngineEvent::LatencySampleSkipped {
                        community: community.to_string(),
                        permalink: post.permalink.clone(),
                        reason,
                    });
                }
            }
        }

        estimate
    }
}
