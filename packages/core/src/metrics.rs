//! Prometheus metrics registry for the community health bot.
//!
//! [`RunMetrics`] owns all registered metrics and the [`Registry`] they
//! belong to. Construct it once at startup, wrap in `Arc`, and hand it to
//! the engine as an [`EventSink`] so engine events become counters.
//!
//! Exposed at `GET /metrics` in Prometheus text exposition format and
//! written to `<output>/metrics.prom` at the end of each run for
//! node-exporter style textfile collection.

use std::io;
use std::path::Path;

use prometheus::{Counter, CounterVec, GaugeVec, Opts, Registry};

use crate::analytics::events::{EngineEvent, EventSink};

pub const TEXT_FORMAT: &str = "text/plain; version=0.0.4";

/// All run-level Prometheus metrics.
pub struct RunMetrics {
    /// Communities whose report was assembled.
    pub communities_total: Counter,
    /// Recent-listing records consumed by the scan.
    pub records_scanned_total: Counter,
    /// Latency lookups that produced a sample.
    pub latency_samples_total: Counter,
    /// Latency lookups that failed or found nothing.
    pub latency_skipped_total: Counter,
    /// Source failures, labelled by listing (`top` or `recent`).
    pub source_interruptions_total: CounterVec,
    /// Advisory rate-limit pauses taken between communities.
    pub backoffs_total: Counter,
    pub backoff_seconds_total: Counter,
    /// Webhook attempts, labelled by outcome.
    pub webhook_total: CounterVec,
    /// Posts seen this week, per community.
    pub weekly_posts: GaugeVec,
    /// Unanswered posts seen this week, per community.
    pub weekly_unanswered: GaugeVec,
    /// The registry that owns all of the above metrics.
    pub registry: Registry,
}

impl RunMetrics {
    /// Create and register all metrics.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let communities_total = Counter::with_opts(Opts::new(
            "community_health_bot_communities_total",
            "Communities whose weekly report was assembled",
        ))?;

        let records_scanned_total = Counter::with_opts(Opts::new(
            "community_health_bot_records_scanned_total",
            "Recent posts consumed by the weekly scan",
        ))?;

        let latency_samples_total = Counter::with_opts(Opts::new(
            "community_health_bot_latency_samples_total",
            "First-comment lookups that produced a latency sample",
        ))?;

        let latency_skipped_total = Counter::with_opts(Opts::new(
            "community_health_bot_latency_skipped_total",
            "First-comment lookups that failed or found no comment",
        ))?;

        let source_interruptions_total = CounterVec::new(
            Opts::new(
                "community_health_bot_source_interruptions_total",
                "Post source failures by listing",
            ),
            &["listing"],
        )?;

        let backoffs_total = Counter::with_opts(Opts::new(
            "community_health_bot_backoffs_total",
            "Rate-limit pauses taken between communities",
        ))?;

        let backoff_seconds_total = Counter::with_opts(Opts::new(
            "community_health_bot_backoff_seconds_total",
            "Seconds spent in rate-limit pauses",
        ))?;

        let webhook_total = CounterVec::new(
            Opts::new(
                "community_health_bot_webhook_total",
                "Webhook deliveries by outcome",
            ),
            &["outcome"],
        )?;

        let weekly_posts = GaugeVec::new(
            Opts::new(
                "community_health_bot_weekly_posts",
                "Posts created in the current week",
            ),
            &["community"],
        )?;

        let weekly_unanswered = GaugeVec::new(
            Opts::new(
                "community_health_bot_weekly_unanswered",
                "Zero-comment posts created in the current week",
            ),
            &["community"],
        )?;

        registry.register(Box::new(communities_total.clone()))?;
        registry.register(Box::new(records_scanned_total.clone()))?;
        registry.register(Box::new(latency_samples_total.clone()))?;
        registry.register(Box::new(latency_skipped_total.clone()))?;
        registry.register(Box::new(source_interruptions_total.clone()))?;
        registry.register(Box::new(backoffs_total.clone()))?;
        registry.register(Box::new(backoff_seconds_total.clone()))?;
        registry.register(Box::new(webhook_total.clone()))?;
        registry.register(Box::new(weekly_posts.clone()))?;
        registry.register(Box::new(weekly_unanswered.clone()))?;

        Ok(Self {
            communities_total,
            records_scanned_total,
            latency_samples_total,
            latency_skipped_total,
            source_interruptions_total,
            backoffs_total,
            backoff_seconds_total,
            webhook_total,
            weekly_posts,
            weekly_unanswered,
            registry,
        })
    }

    pub fn record_backoff(&self, seconds: f64) {
        if seconds > 0.0 {
            self.backoffs_total.inc();
            self.backoff_seconds_total.inc_by(seconds);
        }
    }

    pub fn record_webhook(&self, delivered: bool) {
        let outcome = if delivered { "delivered" } else { "failed" };
        self.webhook_total.with_label_values(&[outcome]).inc();
    }

    /// Render all metrics as Prometheus text format.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buf = Vec::new();
        encoder.encode(&metric_families, &mut buf)?;
        Ok(String::from_utf8(buf).unwrap_or_default())
    }

    /// Write the rendered metrics to `path`.
    pub fn write_textfile(&self, path: &Path) -> io::Result<()> {
        let body = self
            .render()
            .map_err(|err| io::Error::new(io::ErrorKind::Other, err))?;
        std::fs::write(path, body)
    }
}

impl EventSink for RunMetrics {
    fn record(&self, event: &EngineEvent) {
        match event {
            EngineEvent::TopPostsUnavailable { .. } => {
                self.source_interruptions_total.with_label_values(&["top"]).inc();
            }
            EngineEvent::SourceInterrupted { .. } => {
                self.source_interruptions_total.with_label_values(&["recent"]).inc();
            }
            EngineEvent::ScanFinished { records_seen, .. } => {
                self.records_scanned_total.inc_by(*records_seen as f64);
            }
            EngineEvent::LatencySampleSkipped { .. } => self.latency_skipped_total.inc(),
            EngineEvent::ReportAssembled {
                community,
                total_posts,
                unanswered,
                latency_samples,
                ..
            } => {
                self.communities_total.inc();
                self.latency_samples_total.inc_by(*latency_samples as f64);
                self.weekly_posts
                    .with_label_values(&[community.as_str()])
                    .set(*total_posts as f64);
                self.weekly_unanswered
                    .with_label_values(&[community.as_str()])
                    .set(*unanswered as f64);
            }
            EngineEvent::RecentFetchStarted { .. } | EngineEvent::TrendsUnavailable { .. } => {}
        }
    }
}
