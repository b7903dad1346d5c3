//! Week-over-week trend comparison

use serde::{Deserialize, Serialize};

use crate::analytics::types::{Trend, TrendMetric};

/// Post and zero-comment counts for one week
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodCounts {
    pub total: u64,
    pub unanswered: u64,
}

impl PeriodCounts {
    pub fn new(total: u64, unanswered: u64) -> Self {
        Self { total, unanswered }
    }

    /// `unanswered / total`, defined as `0.0` for an empty week.
    pub fn unanswered_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.unanswered as f64 / self.total as f64
        }
    }
}

/// Compare the current week against the previous one.
///
/// Returns both trends, or none at all when the previous week has no posts:
/// an empty previous week means "no history", not a 0% baseline.
pub fn compare_weeks(current: &PeriodCounts, previous: &PeriodCounts) -> Vec<Trend> {
    if previous.total == 0 {
        return Vec::new();
    }

    let posts = Trend {
        metric: TrendMetric::PostsWeekOverWeek,
        current: current.total as f64,
        previous: previous.total as f64,
        delta: current.total as f64 - previous.total as f64,
    };

    let current_rate = current.unanswered_rate();
    let previous_rate = previous.unanswered_rate();
    let unanswered_rate = Trend {
        metric: TrendMetric::UnansweredRateWeekOverWeek,
        current: current_rate,
        previous: previous_rate,
        delta: current_rate - previous_rate,
    };

    vec![posts, unanswered_rate]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_week_has_zero_rate() {
        assert_eq!(PeriodCounts::default().unanswered_rate(), 0.0);
    }

    #[test]
    fn no_trends_without_previous_posts() {
        let current = PeriodCounts::new(42, 5);
        assert!(compare_weeks(&current, &PeriodCounts::new(0, 0)).is_empty());
    }

    #[test]
    fn trends_are_emitted_as_a_pair() {
        let trends = compare_weeks(&PeriodCounts::new(0, 0), &PeriodCounts::new(3, 1));
        assert_eq!(trends.len(), 2);
        assert_eq!(trends[0].metric, TrendMetric::PostsWeekOverWeek);
        assert_eq!(trends[0].delta, -3.0);
        assert_eq!(trends[1].metric, TrendMetric::UnansweredRateWeekOverWeek);
        assert_eq!(trends[1].current, 0.0);
    }

    #[test]
    fn scenario_week_over_week_deltas() {
        let trends = compare_weeks(&PeriodCounts::new(42, 5), &PeriodCounts::new(38, 8));

        assert_eq!(trends.len(), 2);
        assert_eq!(trends[0].current, 42.0);
        assert_eq!(trends[0].previous, 38.0);
        assert_eq!(trends[0].delta, 4.0);

        let rate = &trends[1];
        assert!((rate.current - 5.0 / 42.0).abs() < 1e-12);
        assert!((rate.previous - 8.0 / 38.0).abs() < 1e-12);
        assert!((rate.delta - (-0.0915)).abs() < 1e-3);
    }
}
