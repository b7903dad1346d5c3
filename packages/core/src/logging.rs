use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use crate::analytics::events::{EngineEvent, EventSink};

/// Initialize structured logging for the application.
///
/// This must be called once at startup (in main.rs).
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    info!("Logging initialized");
}

/// Event sink that turns engine events into `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn record(&self, event: &EngineEvent) {
        match event {
            EngineEvent::RecentFetchStarted { community, fetch_limit } => {
                tracing::debug!(community = %community, fetch_limit, "Fetching recent posts");
            }
            EngineEvent::TopPostsUnavailable { community, reason } => {
                tracing::warn!(community = %community, "Top posts unavailable: {}", reason);
            }
            EngineEvent::SourceInterrupted { community, records_seen, reason } => {
                tracing::warn!(
                    community = %community,
                    records_seen,
                    "Recent listing interrupted, continuing with partial data: {}",
                    reason
                );
            }
            EngineEvent::ScanFinished { community, records_seen, reached_boundary } => {
                tracing::debug!(community = %community, records_seen, reached_boundary, "Scan finished");
            }
            EngineEvent::LatencySampleSkipped { community, permalink, reason } => {
                tracing::debug!(
                    community = %community,
                    permalink = %permalink,
                    "Latency sample skipped: {}",
                    reason
                );
            }
            EngineEvent::TrendsUnavailable { community, skipped } => {
                let skipped: Vec<&str> = skipped.iter().map(|metric| metric.as_str()).collect();
                tracing::info!(community = %community, skipped = ?skipped, "No prior-week data for trends");
            }
            EngineEvent::ReportAssembled {
                community,
                total_posts,
                unanswered,
                latency_samples,
                latency_attempts,
            } => {
                tracing::info!(
                    community = %community,
                    total_posts,
                    unanswered,
                    latency_samples,
                    latency_attempts,
                    "Weekly report assembled"
                );
            }
        }
    }
}
