//! Reddit OAuth API client.
//!
//! Implements [`PostSource`] and [`SummaryPublisher`] on top of the
//! script-app password grant. Every response's quota headers are kept so
//! the runner can throttle between communities.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use rand::Rng;
use reqwest::{header::HeaderMap, Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;
use tokio::sync::Mutex;

use crate::analytics::{
    error::ProviderError,
    provider::{PostSource, ProviderResult, RecentPosts, SummaryPublisher},
    types::{PostFlags, PostRecord},
};
use crate::services::rate_limit::RateLimitStatus;

pub const DEFAULT_API_URL: &str = "https://oauth.reddit.com";
pub const DEFAULT_AUTH_URL: &str = "https://www.reddit.com";

/// Reddit refuses listing pages larger than this.
const MAX_PAGE_SIZE: usize = 100;
/// Refresh the token this long before Reddit says it expires.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);
const DEFAULT_TOKEN_LIFETIME_SECS: u64 = 3600;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Script-app credentials
#[derive(Clone)]
pub struct RedditCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    pub password: String,
    pub user_agent: String,
}

impl std::fmt::Debug for RedditCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedditCredentials")
            .field("client_id", &self.client_id)
            .field("username", &self.username)
            .field("user_agent", &self.user_agent)
            .finish_non_exhaustive()
    }
}

/// Retry schedule for idempotent requests
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Exponential delay before retry number `attempt` (1-based), with up to
    /// 50% random jitter added.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponential = self.base_delay * 2u32.saturating_pow(attempt.saturating_sub(1));
        let jitter_ms = self.base_delay.as_millis() as u64 / 2;
        let jitter = if jitter_ms == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=jitter_ms)
        };
        exponential + Duration::from_millis(jitter)
    }
}

/// Strip an optional `r/` or `/r/` prefix from a community name.
pub fn subreddit_slug(name: &str) -> &str {
    let trimmed = name.trim().trim_start_matches('/');
    trimmed.strip_prefix("r/").unwrap_or(trimmed)
}

pub struct RedditClient {
    api_url: String,
    auth_url: String,
    credentials: RedditCredentials,
    http: Client,
    retry: RetryPolicy,
    token: Mutex<Option<AccessToken>>,
    rate_limit: Mutex<Option<RateLimitStatus>>,
}

/// Bearer token plus the instant it should stop being used.
#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    expires_at: Instant,
}

impl AccessToken {
    /// `expires_in` is Reddit's reported lifetime; the margin is taken off it.
    fn new(value: String, expires_in: Duration) -> Self {
        Self {
            value,
            expires_at: Instant::now() + expires_in.saturating_sub(TOKEN_EXPIRY_MARGIN),
        }
    }

    fn is_valid(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_in: Option<u64>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    after: Option<String>,
    #[serde(default)]
    children: Vec<Thing>,
}

#[derive(Debug, Deserialize)]
struct Thing {
    kind: String,
    data: Value,
}

#[derive(Debug, Deserialize)]
struct RedditPost {
    id: String,
    title: String,
    #[serde(default)]
    score: i64,
    #[serde(default)]
    num_comments: u64,
    created_utc: f64,
    permalink: String,
    link_flair_text: Option<String>,
    #[serde(default)]
    is_self: bool,
    #[serde(default)]
    is_video: bool,
    is_gallery: Option<bool>,
    poll_data: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    json: SubmitBody,
}

#[derive(Debug, Deserialize)]
struct SubmitBody {
    #[serde(default)]
    errors: Vec<Value>,
    data: Option<SubmitData>,
}

#[derive(Debug, Deserialize)]
struct SubmitData {
    url: String,
}

/// One page of a listing, already converted to records
struct ListingPage {
    posts: Vec<PostRecord>,
    after: Option<String>,
}

/// Paging state for the lazy recent listing
struct PageCursor {
    after: Option<String>,
    buffered: VecDeque<PostRecord>,
    remaining: usize,
    exhausted: bool,
}

fn timestamp_from_epoch(seconds: f64) -> Option<DateTime<Utc>> {
    if !seconds.is_finite() {
        return None;
    }
    let whole = seconds.trunc() as i64;
    let nanos = (seconds.fract().abs() * 1e9) as u32;
    DateTime::from_timestamp(whole, nanos)
}

impl RedditPost {
    fn into_record(self) -> ProviderResult<PostRecord> {
        let created_at = timestamp_from_epoch(self.created_utc).ok_or_else(|| {
            ProviderError::format(format!("Invalid created_utc {} on {}", self.created_utc, self.id))
        })?;
        let is_poll = self.poll_data.as_ref().is_some_and(|data| !data.is_null());

        Ok(PostRecord {
            id: self.id,
            title: self.title,
            score: self.score,
            comment_count: self.num_comments,
            created_at,
            permalink: format!("https://reddit.com{}", self.permalink),
            flair: self.link_flair_text,
            flags: PostFlags {
                is_poll,
                is_gallery: self.is_gallery.unwrap_or(false),
                is_video: self.is_video,
                is_self: self.is_self,
            },
        })
    }
}

impl RedditClient {
    pub fn new(credentials: RedditCredentials) -> ProviderResult<Self> {
        Self::with_urls(credentials, DEFAULT_API_URL, DEFAULT_AUTH_URL)
    }

    /// Build a client against custom endpoints (used by tests and proxies).
    pub fn with_urls(
        credentials: RedditCredentials,
        api_url: impl Into<String>,
        auth_url: impl Into<String>,
    ) -> ProviderResult<Self> {
        let http = Client::builder()
            .user_agent(credentials.user_agent.clone())
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| ProviderError::network(format!("Failed to build HTTP client: {}", err)))?;

        Ok(Self {
            api_url: api_url.into().trim_end_matches('/').to_string(),
            auth_url: auth_url.into().trim_end_matches('/').to_string(),
            credentials,
            http,
            retry: RetryPolicy::default(),
            token: Mutex::new(None),
            rate_limit: Mutex::new(None),
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Cached bearer token, requesting a fresh one when expired.
    async fn access_token(&self) -> ProviderResult<String> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref().filter(|token| token.is_valid()) {
            return Ok(token.value.clone());
        }

        let url = format!("{}/api/v1/access_token", self.auth_url);
        let response = self
            .http
            .post(&url)
            .basic_auth(&self.credentials.client_id, Some(&self.credentials.client_secret))
            .form(&[
                ("grant_type", "password"),
                ("username", self.credentials.username.as_str()),
                ("password", self.credentials.password.as_str()),
            ])
            .send()
            .await
            .map_err(|err| ProviderError::network(format!("Token request failed: {}", err)))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ProviderError::auth(format!("Token endpoint returned HTTP {}", status)));
        }
        check_status(status)?;

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|err| ProviderError::format(format!("Failed to parse token response: {}", err)))?;
        let token = body.access_token.ok_or_else(|| {
            ProviderError::auth(body.error.unwrap_or_else(|| "missing access_token".to_string()))
        })?;

        let lifetime = Duration::from_secs(body.expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS));
        *cached = Some(AccessToken::new(token.clone(), lifetime));
        tracing::debug!("Obtained Reddit access token (expires in {}s)", lifetime.as_secs());

        Ok(token)
    }

    async fn record_rate_limit(&self, headers: &HeaderMap) {
        let status = RateLimitStatus::from_headers(headers);
        if !status.is_empty() {
            *self.rate_limit.lock().await = Some(status);
        }
    }

    async fn get_json_once<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> ProviderResult<T> {
        let token = self.access_token().await?;
        let url = format!("{}{}", self.api_url, path);

        let response = self
            .http
            .get(&url)
            .bearer_auth(token)
            .query(query)
            .send()
            .await
            .map_err(|err| ProviderError::network(format!("GET {} failed: {}", path, err)))?;

        self.record_rate_limit(response.headers()).await;

        if response.status() == StatusCode::UNAUTHORIZED {
            *self.token.lock().await = None;
        }
        check_status(response.status())?;

        response
            .json::<T>()
            .await
            .map_err(|err| ProviderError::format(format!("Failed to parse {}: {}", path, err)))
    }

    /// GET with retries on transient failures.
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> ProviderResult<T> {
        let mut attempt = 1;
        loop {
            match self.get_json_once(path, query).await {
                Err(err) if err.is_transient() && attempt < self.retry.max_attempts => {
                    let delay = self.retry.delay_for(attempt);
                    tracing::warn!(
                        "Reddit request {} failed (attempt {}): {} - retrying in {}ms",
                        path,
                        attempt,
                        err,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    async fn fetch_listing_page(
        &self,
        community: &str,
        sort: &str,
        limit: usize,
        after: Option<&str>,
        time_filter: Option<&str>,
    ) -> ProviderResult<ListingPage> {
        let path = format!("/r/{}/{}", subreddit_slug(community), sort);
        let mut query = vec![
            ("limit", limit.min(MAX_PAGE_SIZE).to_string()),
            ("raw_json", "1".to_string()),
        ];
        if let Some(after) = after {
            query.push(("after", after.to_string()));
        }
        if let Some(time_filter) = time_filter {
            query.push(("t", time_filter.to_string()));
        }

        let listing: Listing = self.get_json(&path, &query).await?;

        let mut posts = Vec::with_capacity(listing.data.children.len());
        for thing in listing.data.children {
            if thing.kind != "t3" {
                continue;
            }
            let converted = serde_json::from_value::<RedditPost>(thing.data)
                .map_err(|err| ProviderError::format(err.to_string()))
                .and_then(RedditPost::into_record);
            match converted {
                Ok(post) => posts.push(post),
                Err(err) => {
                    // Log the error but continue with the rest of the page
                    tracing::warn!("Skipping malformed post in {}: {}", path, err);
                }
            }
        }

        Ok(ListingPage {
            posts,
            after: listing.data.after,
        })
    }
}

fn check_status(status: StatusCode) -> ProviderResult<()> {
    if status.is_success() {
        Ok(())
    } else if status == StatusCode::TOO_MANY_REQUESTS {
        Err(ProviderError::RateLimitExceeded)
    } else if status.is_server_error() {
        Err(ProviderError::ServiceUnavailable)
    } else if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        Err(ProviderError::auth(format!("Reddit returned HTTP {}", status)))
    } else {
        Err(ProviderError::FormatError {
            message: format!("Reddit returned HTTP {}", status),
        })
    }
}

#[async_trait]
impl PostSource for RedditClient {
    async fn fetch_top_of_week(
        &self,
        community: &str,
        limit: usize,
    ) -> ProviderResult<Vec<PostRecord>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let page = self
            .fetch_listing_page(community, "top", limit, None, Some("week"))
            .await?;
        Ok(page.posts)
    }

    fn fetch_recent<'a>(&'a self, community: &'a str, limit: usize) -> RecentPosts<'a> {
        let cursor = PageCursor {
            after: None,
            buffered: VecDeque::new(),
            remaining: limit,
            exhausted: false,
        };

        stream::unfold(cursor, move |mut cursor| async move {
            loop {
                if cursor.remaining == 0 {
                    return None;
                }
                if let Some(post) = cursor.buffered.pop_front() {
                    cursor.remaining -= 1;
                    return Some((Ok(post), cursor));
                }
                if cursor.exhausted {
                    return None;
                }

                let page = self
                    .fetch_listing_page(
                        community,
                        "new",
                        cursor.remaining,
                        cursor.after.as_deref(),
                        None,
                    )
                    .await;
                match page {
                    Ok(page) => {
                        cursor.exhausted = page.after.is_none() || page.posts.is_empty();
                        cursor.after = page.after;
                        cursor.buffered.extend(page.posts);
                    }
                    Err(err) => {
                        cursor.exhausted = true;
                        return Some((Err(err), cursor));
                    }
                }
            }
        })
        .boxed()
    }

    async fn fetch_first_comment_timestamp(
        &self,
        post: &PostRecord,
    ) -> ProviderResult<Option<DateTime<Utc>>> {
        let path = format!("/comments/{}", post.id);
        let query = [
            ("sort", "old".to_string()),
            ("depth", "1".to_string()),
            ("limit", "100".to_string()),
            ("raw_json", "1".to_string()),
        ];
        let listings: Vec<Listing> = self.get_json(&path, &query).await?;

        // The first listing is the post itself, the second its comments.
        let first = listings
            .into_iter()
            .nth(1)
            .map(|comments| comments.data.children)
            .unwrap_or_default()
            .into_iter()
            .filter(|thing| thing.kind == "t1")
            .filter_map(|thing| thing.data.get("created_utc").and_then(Value::as_f64))
            .filter_map(timestamp_from_epoch)
            .min();

        Ok(first)
    }

    fn source_name(&self) -> &str {
        "reddit"
    }

    async fn rate_limit_status(&self) -> Option<RateLimitStatus> {
        *self.rate_limit.lock().await
    }
}

#[async_trait]
impl SummaryPublisher for RedditClient {
    async fn submit_summary(
        &self,
        community: &str,
        title: &str,
        body: &str,
    ) -> ProviderResult<String> {
        let token = self.access_token().await?;
        let url = format!("{}/api/submit", self.api_url);

        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .form(&[
                ("sr", subreddit_slug(community)),
                ("kind", "self"),
                ("title", title),
                ("text", body),
                ("api_type", "json"),
            ])
            .send()
            .await
            .map_err(|err| ProviderError::network(format!("Submit failed: {}", err)))?;

        self.record_rate_limit(response.headers()).await;
        check_status(response.status())?;

        let submitted: SubmitResponse = response
            .json()
            .await
            .map_err(|err| ProviderError::format(format!("Failed to parse submit response: {}", err)))?;

        if !submitted.json.errors.is_empty() {
            return Err(ProviderError::format(format!(
                "Reddit rejected submission: {}",
                Value::Array(submitted.json.errors)
            )));
        }

        let permalink = submitted
            .json
            .data
            .map(|data| data.url)
            .ok_or_else(|| ProviderError::format("Submit response missing url"))?;

        tracing::info!(community = %community, permalink = %permalink, "Submitted summary");
        Ok(permalink)
    }
}
