//! Leitner box scheduling
//!
//! Five boxes with fixed review intervals. A correct answer promotes the
//! card one box (capped at box 5); an incorrect answer sends it back to
//! box 1, whatever box it was in.
//!
//! Intervals per box:
//! - Box 1: 1 day
//! - Box 2: 3 days
//! - Box 3: 7 days
//! - Box 4: 14 days
//! - Box 5: 30 days

use chrono::{DateTime, Duration, Utc};

use crate::models::MasteryState;

/// Lowest box level
pub const MIN_BOX_LEVEL: i32 = 1;

/// Highest box level; cards here count as mastered
pub const MAX_BOX_LEVEL: i32 = 5;

/// Review interval in days per box level, indexed by `level - 1`
const BOX_INTERVALS: [i64; 5] = [1, 3, 7, 14, 30];

/// Box level after a review
pub fn next_box_level(current: i32, correct: bool) -> i32 {
    if correct {
        (current + 1).min(MAX_BOX_LEVEL)
    } else {
        MIN_BOX_LEVEL
    }
}

/// Review interval in days for a box level
///
/// Levels outside 1..=5 are clamped into range.
pub fn interval_days(box_level: i32) -> i64 {
    let idx = box_level.clamp(MIN_BOX_LEVEL, MAX_BOX_LEVEL) - 1;
    BOX_INTERVALS[idx as usize]
}

/// Apply a review to a mastery state
///
/// Promotes or resets the box level, increments exactly one answer counter,
/// and schedules the next review relative to `now`. The interval depends
/// only on the resulting box level.
pub fn apply_review(state: &MasteryState, correct: bool, now: DateTime<Utc>) -> MasteryState {
    let box_level = next_box_level(state.box_level, correct);

    let mut next = state.clone();
    next.box_level = box_level;
    next.last_reviewed = Some(now);
    next.next_review = Some(now + Duration::days(interval_days(box_level)));
    if correct {
        next.correct_count += 1;
    } else {
        next.incorrect_count += 1;
    }
    next
}

/// Format an interval in days to a human-readable string
pub fn format_interval(days: i64) -> String {
    if days == 0 {
        "now".to_string()
    } else if days == 1 {
        "1d".to_string()
    } else if days < 7 {
        format!("{}d", days)
    } else if days < 30 {
        let weeks = days / 7;
        if weeks == 1 {
            "1w".to_string()
        } else {
            format!("{}w", weeks)
        }
    } else if days < 365 {
        let months = days / 30;
        if months == 1 {
            "1mo".to_string()
        } else {
            format!("{}mo", months)
        }
    } else {
        let years = days / 365;
        if years == 1 {
            "1y".to_string()
        } else {
            format!("{}y", years)
        }
    }
}
