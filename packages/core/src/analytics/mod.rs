//! Weekly Aggregation Engine
//!
//! Turns a community's recent posts into a [`SubredditReport`]: windowed
//! classification, bounded latency sampling, heuristic detectors and
//! week-over-week trends.

pub mod config;
pub mod detector;
pub mod engine;
pub mod error;
pub mod events;
pub mod history;
pub mod latency;
pub mod provider;
pub mod trend;
pub mod types;
pub mod window;


pub use config::AnalyticsConfig;
pub use engine::{ReportRequest, WeeklyReportEngine};
pub use error::ProviderError;
pub use events::{EngineEvent, EventSink, NullSink};
pub use provider::{PostSource, ProviderResult, RecentPosts, SummaryPublisher};
pub use types::*;
