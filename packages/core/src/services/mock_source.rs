//! In-memory post source.
//!
//! Backs the `--mock` CLI mode and the test suites. Records are served in
//! the order they were added, so callers provide them newest first.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use futures::stream::{self, StreamExt};
use tokio::sync::Mutex;

use crate::analytics::{
    error::ProviderError,
    provider::{PostSource, ProviderResult, RecentPosts, SummaryPublisher},
    types::{PostFlags, PostRecord},
};
use crate::services::rate_limit::RateLimitStatus;

/// A summary accepted by [`MockPostSource::submit_summary`].
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub community: String,
    pub title: String,
    pub body: String,
}

#[derive(Debug, Default)]
pub struct MockPostSource {
    recent: Vec<PostRecord>,
    top: Vec<PostRecord>,
    first_comments: HashMap<String, DateTime<Utc>>,
    comment_errors: HashSet<String>,
    recent_error_after: Option<usize>,
    top_error: bool,
    rate_limit: Option<RateLimitStatus>,
    recent_pulled: AtomicUsize,
    comment_lookups: AtomicUsize,
    submissions: Mutex<Vec<Submission>>,
}

impl MockPostSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recent listing, newest first.
    pub fn with_recent(mut self, records: Vec<PostRecord>) -> Self {
        self.recent = records;
        self
    }

    pub fn with_top(mut self, records: Vec<PostRecord>) -> Self {
        self.top = records;
        self
    }

    pub fn with_first_comment(mut self, post_id: impl Into<String>, at: DateTime<Utc>) -> Self {
        self.first_comments.insert(post_id.into(), at);
        self
    }

    pub fn with_comment_error(mut self, post_id: impl Into<String>) -> Self {
        self.comment_errors.insert(post_id.into());
        self
    }

    /// Fail the recent listing after `count` records have been served.
    pub fn with_recent_error_after(mut self, count: usize) -> Self {
        self.recent_error_after = Some(count);
        self
    }

    pub fn with_top_error(mut self) -> Self {
        self.top_error = true;
        self
    }

    pub fn with_rate_limit(mut self, status: RateLimitStatus) -> Self {
        self.rate_limit = Some(status);
        self
    }

    /// Number of recent-listing items handed to consumers so far.
    pub fn recent_pulled(&self) -> usize {
        self.recent_pulled.load(Ordering::SeqCst)
    }

    /// Number of first-comment lookups performed so far.
    pub fn comment_lookups(&self) -> usize {
        self.comment_lookups.load(Ordering::SeqCst)
    }

    pub async fn submissions(&self) -> Vec<Submission> {
        self.submissions.lock().await.clone()
    }

    /// A deterministic two-week listing for offline runs.
    ///
    /// Roughly six posts a day across both weeks, a mix of kinds and
    /// flairs, every fourth post without comments.
    pub fn demo(community: &str, now: DateTime<Utc>) -> Self {
        let slug = community.trim_start_matches("r/");
        let flairs = [Some("Help"), None, Some("Discussion"), Some("Solved"), None];
        let mut source = Self::new();

        for i in 0..84u32 {
            let age = Duration::hours(1) + Duration::minutes(i64::from(i) * 235);
            let created_at = now - age;
            let comment_count = if i % 4 == 1 { 0 } else { u64::from(i % 7) + 1 };
            let title = match i % 5 {
                0 => format!("How do I configure thing #{i}?"),
                1 => format!("Weekly showcase #{i}"),
                2 => format!("Is crate #{i} still maintained"),
                3 => format!("Release notes #{i}"),
                _ => format!("Broken build #{i}"),
            };
            let id = format!("demo{i}");
            let record = PostRecord {
                id: id.clone(),
                title,
                score: i64::from((97 * i + 13) % 400),
                comment_count,
                created_at,
                permalink: format!("https://reddit.com/r/{slug}/comments/{id}"),
                flair: flairs[(i % 5) as usize].map(str::to_string),
                flags: PostFlags {
                    is_poll: i % 29 == 0,
                    is_gallery: i % 17 == 0,
                    is_video: i % 11 == 0,
                    is_self: i % 3 != 0,
                },
            };
            if comment_count > 0 {
                source
                    .first_comments
                    .insert(id, created_at + Duration::minutes(i64::from(i % 9) * 7 + 3));
            }
            source.recent.push(record);
        }

        let mut top = source.recent.clone();
        top.retain(|record| now - record.created_at <= Duration::days(7));
        top.sort_by(|a, b| b.score.cmp(&a.score));
        source.top = top;
        source
    }
}

#[async_trait]
impl PostSource for MockPostSource {
    async fn fetch_top_of_week(
        &self,
        _community: &str,
        limit: usize,
    ) -> ProviderResult<Vec<PostRecord>> {
        if self.top_error {
            return Err(ProviderError::ServiceUnavailable);
        }
        Ok(self.top.iter().take(limit).cloned().collect())
    }

    fn fetch_recent<'a>(&'a self, _community: &'a str, limit: usize) -> RecentPosts<'a> {
        let healthy = self.recent_error_after.unwrap_or(usize::MAX).min(limit);
        let records = self.recent.iter().take(healthy).cloned().map(Ok);
        let failure = self
            .recent_error_after
            .filter(|count| *count < limit)
            .map(|_| Err(ProviderError::ServiceUnavailable));

        stream::iter(records.chain(failure))
            .inspect(move |_| {
                self.recent_pulled.fetch_add(1, Ordering::SeqCst);
            })
            .boxed()
    }

    async fn fetch_first_comment_timestamp(
        &self,
        post: &PostRecord,
    ) -> ProviderResult<Option<DateTime<Utc>>> {
        self.comment_lookups.fetch_add(1, Ordering::SeqCst);
        if self.comment_errors.contains(&post.id) {
            return Err(ProviderError::network(format!(
                "comment lookup failed for {}",
                post.id
            )));
        }
        Ok(self.first_comments.get(&post.id).copied())
    }

    fn source_name(&self) -> &str {
        "mock"
    }

    async fn rate_limit_status(&self) -> Option<RateLimitStatus> {
        self.rate_limit
    }
}

#[async_trait]
impl SummaryPublisher for MockPostSource {
    async fn submit_summary(
        &self,
        community: &str,
        title: &str,
        body: &str,
    ) -> ProviderResult<String> {
        let mut submissions = self.submissions.lock().await;
        submissions.push(Submission {
            community: community.to_string(),
            title: title.to_string(),
            body: body.to_string(),
        });
        Ok(format!(
            "https://reddit.com/r/{}/comments/mock_summary_{}",
            community.trim_start_matches("r/"),
            submissions.len()
        ))
    }
}
