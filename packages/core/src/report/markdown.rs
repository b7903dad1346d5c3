//! Markdown rendering of weekly reports.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;

use crate::analytics::types::{
    HistoryEntry, PostSummary, SubredditReport, Trend, TrendMetric, UnansweredSummary,
};

/// Distribution entries shown per line.
const TOP_ITEMS: usize = 5;
/// History rows shown per community.
const HISTORY_ROWS: usize = 4;

fn fmt_percentage(rate: f64) -> String {
    format!("{:.1}%", rate * 100.0)
}

fn fmt_minutes(minutes: f64) -> String {
    format!("{:.1} min", minutes)
}

fn arrow(delta: f64) -> &'static str {
    if delta > 0.0 {
        "↑"
    } else if delta < 0.0 {
        "↓"
    } else {
        "→"
    }
}

/// `name (count), ...` for the largest entries, or `n/a` when empty.
fn fmt_top_items(items: &BTreeMap<String, u64>) -> String {
    if items.is_empty() {
        return "n/a".to_string();
    }
    let mut sorted: Vec<(&String, &u64)> = items.iter().collect();
    sorted.sort_by(|a, b| b.1.cmp(a.1));
    sorted
        .into_iter()
        .take(TOP_ITEMS)
        .map(|(name, count)| format!("{} ({})", name, count))
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_trend(trend: &Trend) -> String {
    match trend.metric {
        TrendMetric::PostsWeekOverWeek => format!(
            "- Posts WoW: {:.0} vs {:.0} ({} {:+.0})",
            trend.current,
            trend.previous,
            arrow(trend.delta),
            trend.delta
        ),
        TrendMetric::UnansweredRateWeekOverWeek => format!(
            "- Unanswered rate WoW: {} vs {} ({} {:+.1}%)",
            fmt_percentage(trend.current),
            fmt_percentage(trend.previous),
            arrow(trend.delta),
            trend.delta * 100.0
        ),
    }
}

fn format_trends(trends: &[Trend]) -> Vec<String> {
    if trends.is_empty() {
        return vec!["- No prior-week data".to_string()];
    }
    trends.iter().map(format_trend).collect()
}

fn format_history(history: &[HistoryEntry]) -> Vec<String> {
    if history.is_empty() {
        return vec!["- No history yet (will populate after runs)".to_string()];
    }
    let recent = &history[..history.len().min(HISTORY_ROWS)];
    let mut lines: Vec<String> = recent
        .iter()
        .map(|entry| {
            format!(
                "- {}: posts {}, unanswered rate {}",
                entry.date.format("%Y-%m-%d"),
                entry.total_posts,
                fmt_percentage(entry.unanswered_rate)
            )
        })
        .collect();

    if recent.len() > 1 {
        let average =
            recent.iter().map(|entry| entry.unanswered_rate).sum::<f64>() / recent.len() as f64;
        lines.push(format!(
            "- Avg unanswered rate last {} runs: {}",
            recent.len(),
            fmt_percentage(average)
        ));
    }
    lines
}

fn format_posts(posts: &[PostSummary], empty: &str) -> Vec<String> {
    if posts.is_empty() {
        return vec![empty.to_string()];
    }
    posts
        .iter()
        .map(|post| {
            format!(
                "- [{}]({}) | score: {} | comments: {}",
                post.title, post.permalink, post.score, post.comments
            )
        })
        .collect()
}

fn format_unanswered(posts: &[UnansweredSummary]) -> Vec<String> {
    if posts.is_empty() {
        return vec!["- None found".to_string()];
    }
    posts
        .iter()
        .map(|post| {
            let label = if post.question_like { " (question)" } else { "" };
            format!("- [{}]({}){}", post.title, post.permalink, label)
        })
        .collect()
}

fn render_community(lines: &mut Vec<String>, name: &str, report: &SubredditReport) {
    let metrics = &report.metrics;
    let sections = report.sections;

    lines.push(format!("\n## {}", name));

    if sections.stats {
        lines.push("### Stats".to_string());
        lines.push(format!("- Posts this week: {}", metrics.total_posts));
        let rate = if metrics.total_posts > 0 {
            fmt_percentage(metrics.unanswered_rate)
        } else {
            "n/a".to_string()
        };
        lines.push(format!("- Unanswered rate: {}", rate));
        let latency = metrics
            .median_latency_minutes
            .map(fmt_minutes)
            .unwrap_or_else(|| "n/a".to_string());
        lines.push(format!("- Median time to first comment: {}", latency));
        lines.push(format!("- Post type mix: {}", fmt_top_items(&metrics.post_type_mix)));
        lines.push(format!("- Top flairs: {}", fmt_top_items(&metrics.flair_distribution)));
    }

    if sections.trends {
        lines.push("### Trends vs previous week".to_string());
        lines.extend(format_trends(&report.trends));
        lines.push(String::new());
        lines.push("### Recent history (last runs)".to_string());
        lines.extend(format_history(&report.history));
    }

    if sections.top_posts {
        lines.push("### Top posts this week".to_string());
        lines.extend(format_posts(&report.top_posts, "- No data"));
        lines.push("### Rising posts (score velocity)".to_string());
        lines.extend(format_posts(&report.rising_posts, "- None detected"));
    }

    if sections.unanswered {
        lines.push("### Unanswered recent posts".to_string());
        lines.extend(format_unanswered(&report.unanswered));
        lines.push("### Aging unanswered (48-120h)".to_string());
        lines.extend(format_unanswered(&report.aging_unanswered));
    }
}

/// Render the summary document for `communities`, in the given order.
///
/// Communities without an entry in `reports` are skipped.
pub fn build_markdown(
    communities: &[String],
    reports: &HashMap<String, SubredditReport>,
    generated_on: NaiveDate,
) -> String {
    let mut lines = vec![
        "# Weekly Community Health Summary".to_string(),
        format!("_Generated on {}_", generated_on.format("%Y-%m-%d")),
    ];

    for name in communities {
        match reports.get(name) {
            Some(report) => render_community(&mut lines, name, report),
            None => tracing::warn!("No report computed for {}, omitting from summary", name),
        }
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    use crate::analytics::types::{MetricsSnapshot, SectionConfig};

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn history_entry(day: u32, rate: f64) -> HistoryEntry {
        HistoryEntry {
            date: date(day),
            community: "r/example".to_string(),
            total_posts: 10,
            unanswered: (rate * 10.0) as u64,
            unanswered_rate: rate,
            median_latency_minutes: Some(5.0),
        }
    }

    fn make_report() -> SubredditReport {
        SubredditReport {
            community: "r/example".to_string(),
            generated_at: Utc.with_ymd_and_hms(2024, 1, 8, 9, 0, 0).unwrap(),
            top_posts: vec![PostSummary {
                title: "t".to_string(),
                score: 10,
                comments: 5,
                permalink: "https://x".to_string(),
            }],
            rising_posts: Vec::new(),
            unanswered: vec![UnansweredSummary {
                title: "q".to_string(),
                permalink: "https://y".to_string(),
                question_like: false,
            }],
            aging_unanswered: vec![UnansweredSummary {
                title: "old q".to_string(),
                permalink: "https://z".to_string(),
                question_like: true,
            }],
            metrics: MetricsSnapshot {
                total_posts: 1,
                unanswered: 1,
                unanswered_rate: 1.0,
                median_latency_minutes: Some(5.0),
                post_type_mix: BTreeMap::from([("self".to_string(), 1)]),
                flair_distribution: BTreeMap::from([("None".to_string(), 1)]),
            },
            trends: vec![
                Trend {
                    metric: TrendMetric::PostsWeekOverWeek,
                    current: 1.0,
                    previous: 2.0,
                    delta: -1.0,
                },
                Trend {
                    metric: TrendMetric::UnansweredRateWeekOverWeek,
                    current: 1.0,
                    previous: 0.5,
                    delta: 0.5,
                },
            ],
            history: vec![history_entry(1, 1.0)],
            sections: SectionConfig::default(),
        }
    }

    fn render(report: SubredditReport) -> String {
        let name = report.community.clone();
        let reports = HashMap::from([(name.clone(), report)]);
        build_markdown(&[name], &reports, date(8))
    }

    #[test]
    fn build_markdown_renders_every_section() {
        let md = render(make_report());

        assert!(md.starts_with("# Weekly Community Health Summary\n_Generated on 2024-01-08_"));
        assert!(md.contains("\n\n## r/example\n### Stats"));
        assert!(md.contains("- Posts this week: 1"));
        assert!(md.contains("- Unanswered rate: 100.0%"));
        assert!(md.contains("- Median time to first comment: 5.0 min"));
        assert!(md.contains("- Post type mix: self (1)"));
        assert!(md.contains("- Top flairs: None (1)"));
        assert!(md.contains("- Posts WoW: 1 vs 2 (↓ -1)"));
        assert!(md.contains("- Unanswered rate WoW: 100.0% vs 50.0% (↑ +50.0%)"));
        assert!(md.contains("### Recent history (last runs)\n- 2024-01-01: posts 10, unanswered rate 100.0%"));
        assert!(md.contains("- [t](https://x) | score: 10 | comments: 5"));
        assert!(md.contains("### Rising posts (score velocity)\n- None detected"));
        assert!(md.contains("- [q](https://y)\n"));
        assert!(md.contains("- [old q](https://z) (question)"));
    }

    #[test]
    fn empty_report_uses_placeholders() {
        let mut report = make_report();
        report.top_posts.clear();
        report.unanswered.clear();
        report.aging_unanswered.clear();
        report.trends.clear();
        report.history.clear();
        report.metrics = MetricsSnapshot {
            total_posts: 0,
            unanswered: 0,
            unanswered_rate: 0.0,
            median_latency_minutes: None,
            post_type_mix: BTreeMap::new(),
            flair_distribution: BTreeMap::new(),
        };

        let md = render(report);

        assert!(md.contains("- Unanswered rate: n/a"));
        assert!(md.contains("- Median time to first comment: n/a"));
        assert!(md.contains("- Post type mix: n/a"));
        assert!(md.contains("- No prior-week data"));
        assert!(md.contains("- No history yet (will populate after runs)"));
        assert!(md.contains("### Top posts this week\n- No data"));
        assert!(md.contains("### Unanswered recent posts\n- None found"));
        assert!(md.contains("### Aging unanswered (48-120h)\n- None found"));
    }

    #[test]
    fn disabled_sections_are_omitted() {
        let mut report = make_report();
        report.sections = SectionConfig {
            stats: true,
            trends: false,
            top_posts: false,
            unanswered: true,
        };

        let md = render(report);

        assert!(md.contains("### Stats"));
        assert!(!md.contains("Trends vs previous week"));
        assert!(!md.contains("Recent history"));
        assert!(!md.contains("Top posts this week"));
        assert!(!md.contains("Rising posts"));
        assert!(md.contains("### Unanswered recent posts"));
    }

    #[test]
    fn flat_trend_uses_sideways_arrow() {
        let trend = Trend {
            metric: TrendMetric::PostsWeekOverWeek,
            current: 42.0,
            previous: 42.0,
            delta: 0.0,
        };
        assert_eq!(format_trend(&trend), "- Posts WoW: 42 vs 42 (→ +0)");
    }

    #[test]
    fn top_items_are_sorted_by_count_and_capped_at_five() {
        let items: BTreeMap<String, u64> = [("a", 1), ("b", 7), ("c", 3), ("d", 2), ("e", 9), ("f", 4)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();

        assert_eq!(fmt_top_items(&items), "e (9), b (7), f (4), c (3), d (2)");
    }

    #[test]
    fn history_shows_four_rows_and_their_average() {
        let history: Vec<HistoryEntry> = (1..=6)
            .rev()
            .map(|day| history_entry(day, day as f64 / 10.0))
            .collect();

        let lines = format_history(&history);

        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], "- 2024-01-06: posts 10, unanswered rate 60.0%");
        assert_eq!(lines[4], "- Avg unanswered rate last 4 runs: 45.0%");
    }

    #[test]
    fn single_history_row_has_no_average() {
        assert_eq!(format_history(&[history_entry(1, 0.2)]).len(), 1);
    }

    #[test]
    fn communities_keep_requested_order_and_skip_missing() {
        let mut first = make_report();
        first.community = "r/b".to_string();
        let mut second = make_report();
        second.community = "r/a".to_string();
        let reports = HashMap::from([
            ("r/b".to_string(), first),
            ("r/a".to_string(), second),
        ]);
        let order = vec!["r/b".to_string(), "r/missing".to_string(), "r/a".to_string()];

        let md = build_markdown(&order, &reports, date(8));

        let b = md.find("## r/b").unwrap();
        let a = md.find("## r/a").unwrap();
        assert!(b < a);
        assert!(!md.contains("r/missing"));
    }
}
