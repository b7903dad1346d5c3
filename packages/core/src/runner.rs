//! Weekly run orchestration.
//!
//! Drives one pass over the requested communities: each community loads its
//! recent history, runs the aggregation engine, persists the result, and
//! then pauses if the upstream quota is running low, so the next community
//! starts with a fresh window.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::analytics::{
    AnalyticsConfig, EventSink, PostSource, ReportRequest, SubredditReport, WeeklyReportEngine,
};
use crate::config::CommunityConfig;
use crate::metrics::RunMetrics;
use crate::repository::HistoryRepository;
use crate::services::rate_limit::{maybe_backoff, BackoffPolicy};

/// Everything a run produced
#[derive(Debug, Default)]
pub struct RunOutcome {
    /// Community names in processing order.
    pub order: Vec<String>,
    pub reports: HashMap<String, SubredditReport>,
    pub backoff: Duration,
}

pub struct Runner<'a> {
    source: &'a dyn PostSource,
    sink: &'a dyn EventSink,
    repository: &'a HistoryRepository,
    analytics: AnalyticsConfig,
    backoff: BackoffPolicy,
    metrics: Option<&'a RunMetrics>,
}

impl<'a> Runner<'a> {
    pub fn new(
        source: &'a dyn PostSource,
        sink: &'a dyn EventSink,
        repository: &'a HistoryRepository,
    ) -> Self {
        Self {
            source,
            sink,
            repository,
            analytics: AnalyticsConfig::default(),
            backoff: BackoffPolicy::default(),
            metrics: None,
        }
    }

    pub fn with_analytics(mut self, analytics: AnalyticsConfig) -> Self {
        self.analytics = analytics;
        self
    }

    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_metrics(mut self, metrics: &'a RunMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Process `plans` strictly one after another.
    ///
    /// Storage failures are logged and never abort the run: a community
    /// whose history cannot be read is reported without history.
    pub async fn run_communities(&self, plans: &[CommunityConfig], now: DateTime<Utc>) -> RunOutcome {
        tracing::info!(
            "Weekly run started for {} communities (source: {})",
            plans.len(),
            self.source.source_name()
        );

        let mut outcome = RunOutcome::default();
        for plan in plans {
            let report = self.run_one(plan, now).await;
            outcome.order.push(plan.name.clone());
            outcome.reports.insert(plan.name.clone(), report);

            let paused = maybe_backoff(&self.backoff, self.source.rate_limit_status().await).await;
            if let Some(metrics) = self.metrics {
                metrics.record_backoff(paused.as_secs_f64());
            }
            outcome.backoff += paused;
        }

        tracing::info!("Weekly run finished");
        outcome
    }

    /// Execute a single community. Extracted for testability.
    async fn run_one(&self, plan: &CommunityConfig, now: DateTime<Utc>) -> SubredditReport {
        let history = match self
            .repository
            .recent_history(&plan.name, self.analytics.history_limit)
            .await
        {
            Ok(history) => history,
            Err(err) => {
                tracing::error!("Failed to load history for {}: {}", plan.name, err);
                Vec::new()
            }
        };

        let request = ReportRequest::new(plan.name.clone(), plan.top_posts_limit, plan.unanswered_limit)
            .with_sections(plan.include_sections)
            .with_history(history);

        let engine = WeeklyReportEngine::new(self.source, self.sink, self.analytics.clone());
        let report = engine.compute_weekly_report(request, now).await;

        if let Err(err) = self.repository.save_report(&report).await {
            tracing::error!("Failed to save report for {}: {}", plan.name, err);
        }
        let entry = report.history_entry(now.date_naive());
        if let Err(err) = self.repository.append_history(&entry).await {
            tracing::error!("Failed to append history for {}: {}", plan.name, err);
        }

        report
    }
}
