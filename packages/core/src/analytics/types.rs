//! Core data types for the weekly aggregation engine

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Sentinel flair label used when a post carries no flair.
pub const NO_FLAIR: &str = "None";

/// Content flags reported by the post source.
///
/// Several flags can be set at once (a gallery is usually also a link),
/// so they are kept raw and resolved by [`PostKind::classify`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostFlags {
    pub is_poll: bool,
    pub is_gallery: bool,
    pub is_video: bool,
    pub is_self: bool,
}

/// A single post snapshot as observed at fetch time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostRecord {
    pub id: String,
    pub title: String,
    pub score: i64,
    pub comment_count: u64,
    pub created_at: DateTime<Utc>,
    pub permalink: String,
    pub flair: Option<String>,
    pub flags: PostFlags,
}

impl PostRecord {
    pub fn kind(&self) -> PostKind {
        PostKind::classify(&self.flags)
    }

    /// Flair label with the `"None"` sentinel substituted for missing flair.
    pub fn flair_label(&self) -> &str {
        match self.flair.as_deref() {
            Some(flair) if !flair.is_empty() => flair,
            _ => NO_FLAIR,
        }
    }

    pub fn is_unanswered(&self) -> bool {
        self.comment_count == 0
    }

    /// Age in fractional hours at `now`. Negative for posts dated in the future.
    pub fn age_hours(&self, now: DateTime<Utc>) -> f64 {
        (now - self.created_at).num_milliseconds() as f64 / 3_600_000.0
    }
}

/// Post content type
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostKind {
    #[serde(rename = "self")]
    SelfText,
    Link,
    Video,
    Gallery,
    Poll,
}

impl PostKind {
    /// Resolve flags with precedence poll > gallery > video > self > link.
    pub fn classify(flags: &PostFlags) -> Self {
        if flags.is_poll {
            PostKind::Poll
        } else if flags.is_gallery {
            PostKind::Gallery
        } else if flags.is_video {
            PostKind::Video
        } else if flags.is_self {
            PostKind::SelfText
        } else {
            PostKind::Link
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PostKind::SelfText => "self",
            PostKind::Link => "link",
            PostKind::Video => "video",
            PostKind::Gallery => "gallery",
            PostKind::Poll => "poll",
        }
    }
}

/// Display projection of a post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostSummary {
    pub title: String,
    pub score: i64,
    pub comments: u64,
    pub permalink: String,
}

impl From<&PostRecord> for PostSummary {
    fn from(record: &PostRecord) -> Self {
        Self {
            title: record.title.clone(),
            score: record.score,
            comments: record.comment_count,
            permalink: record.permalink.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnansweredSummary {
    pub title: String,
    pub permalink: String,
    pub question_like: bool,
}

/// Aggregate counters for one community over the current week
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub total_posts: u64,
    pub unanswered: u64,
    /// `unanswered / total_posts`, `0.0` when there were no posts.
    pub unanswered_rate: f64,
    pub median_latency_minutes: Option<f64>,
    pub post_type_mix: BTreeMap<String, u64>,
    pub flair_distribution: BTreeMap<String, u64>,
}

/// Identifier of a week-over-week comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendMetric {
    PostsWeekOverWeek,
    UnansweredRateWeekOverWeek,
}

impl TrendMetric {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendMetric::PostsWeekOverWeek => "posts_week_over_week",
            TrendMetric::UnansweredRateWeekOverWeek => "unanswered_rate_week_over_week",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trend {
    pub metric: TrendMetric,
    pub current: f64,
    pub previous: f64,
    pub delta: f64,
}

/// One persisted row per (date, community).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub date: NaiveDate,
    pub community: String,
    pub total_posts: u64,
    pub unanswered: u64,
    pub unanswered_rate: f64,
    pub median_latency_minutes: Option<f64>,
}

/// Per-community toggles for the rendered sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SectionConfig {
    pub stats: bool,
    pub trends: bool,
    pub top_posts: bool,
    pub unanswered: bool,
}

impl Default for SectionConfig {
    fn default() -> Self {
        Self {
            stats: true,
            trends: true,
            top_posts: true,
            unanswered: true,
        }
    }
}

/// Complete weekly report for a single community
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubredditReport {
    pub community: String,
    pub generated_at: DateTime<Utc>,
    pub top_posts: Vec<PostSummary>,
    pub rising_posts: Vec<PostSummary>,
    pub unanswered: Vec<UnansweredSummary>,
    pub aging_unanswered: Vec<UnansweredSummary>,
    pub metrics: MetricsSnapshot,
    pub trends: Vec<Trend>,
    pub history: Vec<HistoryEntry>,
    pub sections: SectionConfig,
}

impl SubredditReport {
    /// History row recording this report's metrics under `date`.
    pub fn history_entry(&self, date: NaiveDate) -> HistoryEntry {
        HistoryEntry {
            date,
            community: self.community.clone(),
            total_posts: self.metrics.total_posts,
            unanswered: self.metrics.unanswered,
            unanswered_rate: self.metrics.unanswered_rate,
            median_latency_minutes: self.metrics.median_latency_minutes,
        }
    }
}
