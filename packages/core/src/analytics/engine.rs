//! Weekly Aggregation Engine - builds one community's report from a post source

use chrono::{DateTime, Utc};
use futures::StreamExt;

use crate::analytics::{
    config::AnalyticsConfig,
    events::{EngineEvent, EventSink},
    latency::LatencyEstimator,
    provider::PostSource,
    trend::compare_weeks,
    types::*,
    window::{ListLimits, ScanFlow, WeekWindows, WeeklyTally},
};

/// Inputs for one community's report
#[derive(Debug, Clone)]
pub struct ReportRequest {
    pub community: String,
    pub top_posts_limit: usize,
    pub unanswered_limit: usize,
    pub sections: SectionConfig,
    /// Recent history for this community, newest first.
    pub history: Vec<HistoryEntry>,
}

impl ReportRequest {
    pub fn new(community: impl Into<String>, top_posts_limit: usize, unanswered_limit: usize) -> Self {
        Self {
            community: community.into(),
            top_posts_limit,
            unanswered_limit,
            sections: SectionConfig::default(),
            history: Vec::new(),
        }
    }

    pub fn with_sections(mut self, sections: SectionConfig) -> Self {
        self.sections = sections;
        self
    }

    pub fn with_history(mut self, history: Vec<HistoryEntry>) -> Self {
        self.history = history;
        self
    }
}

/// Aggregates a post source into weekly reports
pub struct WeeklyReportEngine<'a> {
    source: &'a dyn PostSource,
    sink: &'a dyn EventSink,
    config: AnalyticsConfig,
}

impl<'a> WeeklyReportEngine<'a> {
    pub fn new(source: &'a dyn PostSource, sink: &'a dyn EventSink, config: AnalyticsConfig) -> Self {
        Self {
            source,
            sink,
            config,
        }
    }

    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    /// Build the report for `request.community` as observed at `now`.
    ///
    /// Never fails: source errors degrade the affected metric and are
    /// reported to the sink.
    pub async fn compute_weekly_report(
        &self,
        request: ReportRequest,
        now: DateTime<Utc>,
    ) -> SubredditReport {
        let community = request.community.as_str();

        let top_posts = self.top_posts(community, request.top_posts_limit).await;
        let tally = self.scan_recent(&request, now).await;

        let estimator = LatencyEstimator::new(
            self.source,
            self.sink,
            self.config.latency.sample_cap,
        );
        let latency = estimator
            .estimate(community, &tally.latency_candidates)
            .await;

        let metrics = tally.snapshot(latency.median());
        let trends = compare_weeks(&tally.current, &tally.previous);
        if trends.is_empty() {
            self.sink.record(&EngineEvent::TrendsUnavailable {
                community: community.to_string(),
                skipped: vec![
                    TrendMetric::PostsWeekOverWeek,
                    TrendMetric::UnansweredRateWeekOverWeek,
                ],
            });
        }

        self.sink.record(&EngineEvent::ReportAssembled {
            community: community.to_string(),
            total_posts: metrics.total_posts,
            unanswered: metrics.unanswered,
            latency_samples: latency.samples.len(),
            latency_attempts: latency.attempts,
        });

        let mut history = request.history;
        history.truncate(self.config.history_limit);

        SubredditReport {
            community: request.community,
            generated_at: now,
            top_posts,
            rising_posts: tally.rising_posts,
            unanswered: tally.unanswered,
            aging_unanswered: tally.aging_unanswered,
            metrics,
            trends,
            history,
            sections: request.sections,
        }
    }

    async fn top_posts(&self, community: &str, limit: usize) -> Vec<PostSummary> {
        match self.source.fetch_top_of_week(community, limit).await {
            Ok(posts) => posts.iter().take(limit).map(PostSummary::from).collect(),
            Err(err) => {
                self.sink.record(&EngineEvent::TopPostsUnavailable {
                    community: community.to_string(),
                    reason: err.to_string(),
                });
                Vec::new()
            }
        }
    }

    /// Single streaming pass over the recent listing.
    async fn scan_recent(&self, request: &ReportRequest, now: DateTime<Utc>) -> WeeklyTally {
        let community = request.community.as_str();
        let fetch_limit = self
            .config
            .fetch
            .recent_limit(request.top_posts_limit, request.unanswered_limit);
        let limits = ListLimits {
            top_posts: request.top_posts_limit,
            unanswered: request.unanswered_limit,
            latency_attempts: self.config.latency.sample_cap,
        };
        let mut tally = WeeklyTally::new(
            WeekWindows::anchored_at(now),
            limits,
            self.config.detectors.clone(),
        );

        self.sink.record(&EngineEvent::RecentFetchStarted {
            community: community.to_string(),
            fetch_limit,
        });

        let mut recent = self.source.fetch_recent(community, fetch_limit);
        let mut reached_boundary = false;
        while let Some(item) = recent.next().await {
            match item {
                Ok(record) => {
                    if tally.observe(&record) == ScanFlow::Stop {
                        reached_boundary = true;
                        break;
                    }
                }
                Err(err) => {
                    self.sink.record(&EngineEvent::SourceInterrupted {
                        community: community.to_string(),
                        records_seen: tally.records_seen,
                        reason: err.to_string(),
                    });
                    break;
                }
            }
        }

        self.sink.record(&EngineEvent::ScanFinished {
            community: community.to_string(),
            records_seen: tally.records_seen,
            reached_boundary,
        });

        tally
    }
}
