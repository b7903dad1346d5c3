use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::analytics::types::SectionConfig;
use crate::services::reddit::{subreddit_slug, RedditCredentials, DEFAULT_API_URL, DEFAULT_AUTH_URL};

pub const DEFAULT_OUTPUT_DIR: &str = "./output";
pub const DEFAULT_LIST_LIMIT: usize = 10;

const REQUIRED_VARS: &[&str] = &[
    "REDDIT_CLIENT_ID",
    "REDDIT_CLIENT_SECRET",
    "REDDIT_USERNAME",
    "REDDIT_PASSWORD",
    "USER_AGENT",
];

#[derive(Debug, Clone)]
pub struct Config {
    /// `None` only when running against the mock source without credentials.
    pub credentials: Option<RedditCredentials>,
    pub output_dir: PathBuf,
    pub webhook_url: Option<String>,
    pub database_url: String,
    pub reddit_api_url: String,
    pub reddit_auth_url: String,
}

impl Config {
    /// Read configuration from the process environment.
    ///
    /// With `allow_missing` the Reddit credentials may be absent (mock mode).
    pub fn from_env(allow_missing: bool) -> Result<Self, String> {
        Self::from_lookup(|key| env::var(key).ok(), allow_missing)
    }

    pub fn from_lookup<F>(lookup: F, allow_missing: bool) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let missing: Vec<&str> = REQUIRED_VARS
            .iter()
            .copied()
            .filter(|key| var(key).is_none())
            .collect();

        let credentials = if missing.is_empty() {
            let user_agent = var("USER_AGENT").unwrap_or_default();
            validate_user_agent(&user_agent)?;
            Some(RedditCredentials {
                client_id: var("REDDIT_CLIENT_ID").unwrap_or_default(),
                client_secret: var("REDDIT_CLIENT_SECRET").unwrap_or_default(),
                username: var("REDDIT_USERNAME").unwrap_or_default(),
                password: var("REDDIT_PASSWORD").unwrap_or_default(),
                user_agent,
            })
        } else if allow_missing {
            None
        } else {
            return Err(format!("Missing environment variables: {}", missing.join(", ")));
        };

        let output_dir = PathBuf::from(var("OUTPUT_DIR").unwrap_or_else(|| DEFAULT_OUTPUT_DIR.to_string()));
        let database_url = var("DATABASE_URL")
            .unwrap_or_else(|| format!("sqlite://{}", output_dir.join("history.db").display()));

        Ok(Self {
            credentials,
            webhook_url: var("WEBHOOK_URL"),
            database_url,
            reddit_api_url: var("REDDIT_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            reddit_auth_url: var("REDDIT_AUTH_URL").unwrap_or_else(|| DEFAULT_AUTH_URL.to_string()),
            output_dir,
        })
    }
}

/// Reject empty or placeholder user agents; Reddit throttles generic ones.
pub fn validate_user_agent(user_agent: &str) -> Result<(), String> {
    if user_agent.trim().is_empty() || user_agent.contains("your_bot_username") {
        return Err("USER_AGENT must be set to a descriptive value (no placeholders)".to_string());
    }
    Ok(())
}

fn default_list_limit() -> usize {
    DEFAULT_LIST_LIMIT
}

/// Per-community settings from the optional TOML file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CommunityConfig {
    pub name: String,
    #[serde(default = "default_list_limit")]
    pub top_posts_limit: usize,
    #[serde(default = "default_list_limit")]
    pub unanswered_limit: usize,
    #[serde(default)]
    pub include_sections: SectionConfig,
}

impl CommunityConfig {
    pub fn with_defaults(name: impl Into<String>, top_posts_limit: usize) -> Self {
        Self {
            name: name.into(),
            top_posts_limit,
            unanswered_limit: DEFAULT_LIST_LIMIT,
            include_sections: SectionConfig::default(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct CommunityFile {
    #[serde(default)]
    communities: Vec<CommunityConfig>,
}

/// Community settings keyed by slug, so `r/rust` and `rust` resolve alike.
#[derive(Debug, Clone, Default)]
pub struct CommunityConfigs {
    by_slug: HashMap<String, CommunityConfig>,
}

impl CommunityConfigs {
    pub fn parse(raw: &str) -> Result<Self, String> {
        let file: CommunityFile =
            toml::from_str(raw).map_err(|err| format!("Invalid community config: {}", err))?;

        let by_slug = file
            .communities
            .into_iter()
            .filter(|entry| !entry.name.trim().is_empty())
            .map(|entry| (subreddit_slug(&entry.name).to_lowercase(), entry))
            .collect();
        Ok(Self { by_slug })
    }

    pub fn load(path: &Path) -> Result<Self, String> {
        let raw = std::fs::read_to_string(path)
            .map_err(|err| format!("Config file not found: {} ({})", path.display(), err))?;
        Self::parse(&raw)
    }

    pub fn len(&self) -> usize {
        self.by_slug.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_slug.is_empty()
    }

    /// Settings for `name`, falling back to defaults with `fallback_limit`
    /// top posts when the file has no entry.
    pub fn resolve(&self, name: &str, fallback_limit: usize) -> CommunityConfig {
        let slug = subreddit_slug(name).to_lowercase();
        match self.by_slug.get(&slug) {
            Some(config) => CommunityConfig {
                name: name.to_string(),
                ..config.clone()
            },
            None => CommunityConfig::with_defaults(name, fallback_limit),
        }
    }
}
