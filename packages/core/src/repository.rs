//! Database repository for report history.
//!
//! All SQLite read/write logic lives here. The runner calls
//! [`HistoryRepository::recent_history`] before computing a community's
//! report, then [`HistoryRepository::save_report`] and
//! [`HistoryRepository::append_history`] once the report is assembled.
//! The dashboard API reads back through the same type.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};

use crate::analytics::history::recent_history_for;
use crate::analytics::types::{HistoryEntry, SubredditReport};

/// A report as persisted, with its row id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredReport {
    pub id: i64,
    pub community: String,
    pub generated_at: DateTime<Utc>,
    pub report: SubredditReport,
}

/// Repository for reading and writing history rows and reports.
#[derive(Clone)]
pub struct HistoryRepository {
    pool: SqlitePool,
}

fn decode_error(err: impl std::error::Error + Send + Sync + 'static) -> sqlx::Error {
    sqlx::Error::Decode(Box::new(err))
}

impl HistoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Append one history row. Dates are stored as `YYYY-MM-DD`.
    pub async fn append_history(&self, entry: &HistoryEntry) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO history_entries
             (run_date, community, total_posts, unanswered, unanswered_rate, median_latency_minutes)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(entry.date.format("%Y-%m-%d").to_string())
        .bind(&entry.community)
        .bind(entry.total_posts as i64)
        .bind(entry.unanswered as i64)
        .bind(entry.unanswered_rate)
        .bind(entry.median_latency_minutes)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// All rows, optionally for one community, oldest first in insertion order.
    pub async fn fetch_history(
        &self,
        community: Option<&str>,
    ) -> Result<Vec<HistoryEntry>, sqlx::Error> {
        let rows = match community {
            Some(community) => {
                sqlx::query(
                    "SELECT run_date, community, total_posts, unanswered, unanswered_rate,
                            median_latency_minutes
                     FROM history_entries
                     WHERE community = ?
                     ORDER BY id ASC",
                )
                .bind(community)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    "SELECT run_date, community, total_posts, unanswered, unanswered_rate,
                            median_latency_minutes
                     FROM history_entries
                     ORDER BY id ASC",
                )
                .fetch_all(&self.pool)
                .await?
            }
        };

        let entries = rows
            .into_iter()
            .filter_map(|row| {
                let run_date: String = row.try_get("run_date").ok()?;
                let community: String = row.try_get("community").ok()?;
                let total_posts: i64 = row.try_get("total_posts").ok()?;
                let unanswered: i64 = row.try_get("unanswered").ok()?;
                let unanswered_rate: f64 = row.try_get("unanswered_rate").ok()?;
                let median_latency_minutes: Option<f64> =
                    row.try_get("median_latency_minutes").ok()?;

                let date = NaiveDate::parse_from_str(&run_date, "%Y-%m-%d").ok()?;

                Some(HistoryEntry {
                    date,
                    community,
                    total_posts: total_posts.max(0) as u64,
                    unanswered: unanswered.max(0) as u64,
                    unanswered_rate,
                    median_latency_minutes,
                })
            })
            .collect();

        Ok(entries)
    }

    /// Most recent `limit` rows for `community`, newest first.
    pub async fn recent_history(
        &self,
        community: &str,
        limit: usize,
    ) -> Result<Vec<HistoryEntry>, sqlx::Error> {
        let entries = self.fetch_history(Some(community)).await?;
        Ok(recent_history_for(&entries, community, limit))
    }

    /// Persist a report as JSON. Returns the new row id.
    pub async fn save_report(&self, report: &SubredditReport) -> Result<i64, sqlx::Error> {
        let body = serde_json::to_string(report).map_err(decode_error)?;

        let result = sqlx::query(
            "INSERT INTO reports (community, generated_at, body) VALUES (?, ?, ?)",
        )
        .bind(&report.community)
        .bind(report.generated_at.to_rfc3339())
        .bind(body)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// The last report saved for `community`, if any.
    pub async fn latest_report(
        &self,
        community: &str,
    ) -> Result<Option<StoredReport>, sqlx::Error> {
        let row = sqlx::query(
            "SELECT id, community, generated_at, body
             FROM reports
             WHERE community = ?
             ORDER BY id DESC
             LIMIT 1",
        )
        .bind(community)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let id: i64 = row.try_get("id")?;
        let community: String = row.try_get("community")?;
        let generated_at: String = row.try_get("generated_at")?;
        let body: String = row.try_get("body")?;

        let generated_at = DateTime::parse_from_rfc3339(&generated_at)
            .map_err(decode_error)?
            .with_timezone(&Utc);
        let report: SubredditReport = serde_json::from_str(&body).map_err(decode_error)?;

        Ok(Some(StoredReport {
            id,
            community,
            generated_at,
            report,
        }))
    }

    /// Distinct communities that have at least one saved report.
    pub async fn list_communities(&self) -> Result<Vec<String>, sqlx::Error> {
        let rows = sqlx::query("SELECT DISTINCT community FROM reports ORDER BY community ASC")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|row| row.try_get::<String, _>("community").ok())
            .collect())
    }
}
