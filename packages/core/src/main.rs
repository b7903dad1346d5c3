use std::sync::Arc;

use chrono::Utc;
use clap::Parser;
use dotenvy::dotenv;

use community_health_bot::{
    analytics::{PostSource, SummaryPublisher},
    api,
    cli::{Cli, Mode},
    config::{CommunityConfig, CommunityConfigs, Config},
    db,
    error::AppError,
    logging::{init_logging, TracingSink},
    metrics::RunMetrics,
    publish::webhook,
    report::{build_markdown, purge_older_than, write_output, DEFAULT_RETENTION_DAYS},
    repository::HistoryRepository,
    runner::Runner,
    services::{mock_source::MockPostSource, reddit::RedditClient},
};

const WEBHOOK_TITLE: &str = "Community Health Summary";
/// Characters of the summary handed to the webhook.
const WEBHOOK_CONTENT_CHARS: usize = 1500;

#[tokio::main]
async fn main() {
    dotenv().ok();
    init_logging();

    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        tracing::error!("{}", err);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), AppError> {
    let config = Config::from_env(cli.mock).map_err(AppError::Config)?;
    tracing::info!("Service started with config: {:?}", config);

    let community_configs = match &cli.config {
        Some(path) => CommunityConfigs::load(path).map_err(AppError::Config)?,
        None => CommunityConfigs::default(),
    };
    let plans: Vec<CommunityConfig> = cli
        .subreddits
        .iter()
        .map(|name| community_configs.resolve(name, cli.limit))
        .collect();

    std::fs::create_dir_all(&config.output_dir)?;
    let repository = HistoryRepository::new(db::create_pool(&config.database_url).await?);
    let metrics = Arc::new(RunMetrics::new()?);
    let now = Utc::now();

    let mock_source;
    let reddit_client;
    let (source, publisher): (&dyn PostSource, &dyn SummaryPublisher) = if cli.mock {
        tracing::info!("Using generated demo posts (--mock)");
        mock_source = MockPostSource::demo("demo", now);
        (&mock_source, &mock_source)
    } else {
        let credentials = config
            .credentials
            .clone()
            .ok_or_else(|| AppError::Config("Reddit credentials are required".to_string()))?;
        reddit_client =
            RedditClient::with_urls(credentials, &config.reddit_api_url, &config.reddit_auth_url)?;
        (&reddit_client, &reddit_client)
    };

    let sink = (TracingSink, metrics.clone());
    let outcome = Runner::new(source, &sink, &repository)
        .with_metrics(&metrics)
        .run_communities(&plans, now)
        .await;

    let run_date = now.date_naive();
    let markdown = build_markdown(&outcome.order, &outcome.reports, run_date);
    println!("{}", markdown);

    let out_path = write_output(&config.output_dir, &markdown, run_date)?;
    println!("\nSaved summary to {}", out_path.display());
    tracing::info!(
        output = %out_path.display(),
        subreddits = ?cli.subreddits,
        "Generated summary"
    );

    match purge_older_than(&config.output_dir, DEFAULT_RETENTION_DAYS) {
        Ok(0) => {}
        Ok(removed) => tracing::info!(removed, "Purged old summaries"),
        Err(err) => tracing::warn!("Failed to purge old summaries: {}", err),
    }

    if cli.mode == Mode::Post {
        let target = cli
            .post_to
            .as_deref()
            .ok_or_else(|| AppError::Config("--post-to is required in post mode".to_string()))?;
        let title = format!("Weekly community summary - {}", run_date);
        let permalink = publisher.submit_summary(target, &title, &markdown).await?;
        println!("Posted summary to {}", permalink);
    }

    if let Some(status) = source.rate_limit_status().await {
        tracing::info!(
            used = ?status.used,
            remaining = ?status.remaining,
            reset = ?status.reset_seconds,
            "Rate limit status"
        );
    }

    if config.webhook_url.is_some() {
        let excerpt: String = markdown.chars().take(WEBHOOK_CONTENT_CHARS).collect();
        let delivered = webhook::dispatch(
            &reqwest::Client::new(),
            config.webhook_url.as_deref(),
            WEBHOOK_TITLE,
            &excerpt,
        )
        .await;
        metrics.record_webhook(delivered);
    }

    if let Err(err) = metrics.write_textfile(&config.output_dir.join("metrics.prom")) {
        tracing::warn!("Failed to write metrics textfile: {}", err);
    }

    if let Some(addr) = cli.serve {
        api::serve(api::create_router(repository, metrics), addr).await?;
    }

    Ok(())
}
