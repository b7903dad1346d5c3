//! Post Source Interface
//!
//! Abstraction over the community a report is built from, so the engine
//! never depends on a particular API client.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;

use crate::analytics::{error::ProviderError, types::PostRecord};
use crate::services::rate_limit::RateLimitStatus;

/// Result type for provider operations
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Lazy newest-first listing. Dropping it stops any further page fetches.
pub type RecentPosts<'a> = BoxStream<'a, ProviderResult<PostRecord>>;

/// Trait for post sources to keep the engine independent of the API client
#[async_trait]
pub trait PostSource: Send + Sync {
    /// Highest scoring posts of the past week, in the source's own order.
    async fn fetch_top_of_week(
        &self,
        community: &str,
        limit: usize,
    ) -> ProviderResult<Vec<PostRecord>>;

    /// Up to `limit` posts, newest first, fetched page by page on demand.
    ///
    /// An `Err` item ends the listing.
    fn fetch_recent<'a>(&'a self, community: &'a str, limit: usize) -> RecentPosts<'a>;

    /// Creation time of the earliest comment on `post`.
    ///
    /// `Ok(None)` is a legitimate answer: comments can be removed between
    /// the listing and the lookup.
    async fn fetch_first_comment_timestamp(
        &self,
        post: &PostRecord,
    ) -> ProviderResult<Option<DateTime<Utc>>>;

    /// Get the name of this source for logging/debugging
    fn source_name(&self) -> &str;

    /// Most recent upstream quota signal, when the source tracks one.
    async fn rate_limit_status(&self) -> Option<RateLimitStatus> {
        None
    }
}

/// Posts a rendered summary back to a community
#[async_trait]
pub trait SummaryPublisher: Send + Sync {
    /// Submit a text post and return its absolute permalink.
    async fn submit_summary(
        &self,
        community: &str,
        title: &str,
        body: &str,
    ) -> ProviderResult<String>;
}
