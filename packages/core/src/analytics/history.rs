//! Recent-history selection

use crate::analytics::types::HistoryEntry;

/// Rows for `community`, newest first, at most `limit` of them.
pub fn recent_history_for(
    entries: &[HistoryEntry],
    community: &str,
    limit: usize,
) -> Vec<HistoryEntry> {
    let mut filtered: Vec<HistoryEntry> = entries
        .iter()
        .filter(|entry| entry.community == community)
        .cloned()
        .collect();
    // Stable sort keeps insertion order for rows sharing a date.
    filtered.sort_by(|a, b| b.date.cmp(&a.date));
    filtered.truncate(limit);
    filtered
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn entry(community: &str, day: u32) -> HistoryEntry {
        HistoryEntry {
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            community: community.to_string(),
            total_posts: day as u64,
            unanswered: 1,
            unanswered_rate: 1.0 / day as f64,
            median_latency_minutes: None,
        }
    }

    #[test]
    fn filters_by_community_newest_first() {
        let entries = vec![
            entry("r/rust", 1),
            entry("r/golang", 2),
            entry("r/rust", 8),
            entry("r/rust", 15),
        ];

        let recent = recent_history_for(&entries, "r/rust", 6);

        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].total_posts, 15);
        assert_eq!(recent[2].total_posts, 1);
    }

    #[test]
    fn caps_the_number_of_rows() {
        let entries: Vec<_> = (1..=10).map(|day| entry("r/rust", day)).collect();

        let recent = recent_history_for(&entries, "r/rust", 6);

        assert_eq!(recent.len(), 6);
        assert_eq!(recent[0].total_posts, 10);
    }

    #[test]
    fn unknown_community_yields_nothing() {
        assert!(recent_history_for(&[entry("r/rust", 1)], "r/python", 6).is_empty());
    }
}
