//! Heuristic detectors: question-like titles, rising posts, aging unanswered posts.
//!
//! All three are approximations; none of them inspect post bodies.

use crate::analytics::config::DetectorConfig;

const INTERROGATIVES: &[&str] = &[
    "who", "what", "when", "where", "why", "how", "does", "is", "are", "can", "should",
];

/// Lexical question check: a literal `?` anywhere, or an interrogative prefix.
pub fn looks_like_question(title: &str) -> bool {
    if title.contains('?') {
        return true;
    }
    let lowered = title.to_lowercase();
    INTERROGATIVES.iter().any(|word| lowered.starts_with(word))
}

/// Score per hour of age. `None` for non-positive ages.
pub fn velocity(score: i64, age_hours: f64) -> Option<f64> {
    if age_hours > 0.0 {
        Some(score as f64 / age_hours)
    } else {
        None
    }
}

/// Fresh post (`0 < age <= rising_window_hours`) gaining score fast enough.
pub fn is_rising(score: i64, age_hours: f64, config: &DetectorConfig) -> bool {
    if age_hours > config.rising_window_hours {
        return false;
    }
    velocity(score, age_hours).is_some_and(|v| v >= config.rising_velocity)
}

/// Unanswered post inside the inclusive stale band.
pub fn is_aging(age_hours: f64, config: &DetectorConfig) -> bool {
    (config.aging_min_hours..=config.aging_max_hours).contains(&age_hours)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_mark_anywhere_is_question() {
        assert!(looks_like_question("Kernel panics after update?"));
        assert!(looks_like_question("Is this normal?"));
    }

    #[test]
    fn interrogative_prefix_is_case_insensitive() {
        assert!(looks_like_question("How do I fix this"));
        assert!(looks_like_question("WHY does my build fail"));
        assert!(looks_like_question("should I upgrade"));
    }

    #[test]
    fn plain_statement_is_not_question() {
        assert!(!looks_like_question("Broken install"));
        assert!(!looks_like_question("My setup, finally"));
    }

    #[test]
    fn prefix_match_is_not_word_bounded() {
        // "Island" starts with "is"; the heuristic accepts the false positive.
        assert!(looks_like_question("Island photos"));
    }

    #[test]
    fn velocity_rejects_zero_and_negative_age() {
        assert_eq!(velocity(100, 0.0), None);
        assert_eq!(velocity(100, -1.0), None);
        assert_eq!(velocity(100, 10.0), Some(10.0));
    }

    #[test]
    fn rising_threshold_and_window() {
        let config = DetectorConfig::default();
        assert!(is_rising(100, 10.0, &config));
        assert!(!is_rising(20, 10.0, &config));
        assert!(!is_rising(10_000, 0.0, &config));
        assert!(is_rising(240, 48.0, &config));
        assert!(!is_rising(10_000, 48.5, &config));
    }

    #[test]
    fn aging_band_is_inclusive() {
        let config = DetectorConfig::default();
        assert!(!is_aging(47.9, &config));
        assert!(is_aging(48.0, &config));
        assert!(is_aging(120.0, &config));
        assert!(!is_aging(120.1, &config));
    }
}
