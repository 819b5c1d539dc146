//! Streak tracking

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Daily streak after activity on `today`
///
/// Returns `(current, best)`. Repeat activity on the same day keeps the
/// streak, activity the day after extends it, anything else restarts at 1.
pub fn advance_daily_streak(
    current: i32,
    best: i32,
    last_activity: Option<DateTime<Utc>>,
    today: NaiveDate,
) -> (i32, i32) {
    let current = match last_activity.map(|d| d.date_naive()) {
        Some(last) if last == today => current.max(1),
        Some(last) if last.succ_opt() == Some(today) => current.saturating_add(1),
        _ => 1,
    };
    (current, best.max(current))
}

/// Streak derived from a set of activity timestamps
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreakSummary {
    pub current_streak: i32,
    pub longest_streak: i32,
    pub last_activity: Option<NaiveDate>,
}

/// Summarise activity days: consecutive days back from `today`, the longest
/// consecutive run, and the latest day
pub fn streak_from_activity(
    activity: impl IntoIterator<Item = DateTime<Utc>>,
    today: NaiveDate,
) -> StreakSummary {
    let days: BTreeSet<NaiveDate> = activity.into_iter().map(|d| d.date_naive()).collect();
    let Some(&last) = days.iter().next_back() else {
        return StreakSummary::default();
    };

    let mut current = 0;
    let mut cursor = today;
    while days.contains(&cursor) {
        current += 1;
        cursor -= Duration::days(1);
    }

    let mut longest = 0;
    let mut run = 0;
    let mut previous: Option<NaiveDate> = None;
    for &day in &days {
        run = match previous {
            Some(p) if p.succ_opt() == Some(day) => run + 1,
            _ => 1,
        };
        longest = longest.max(run);
        previous = Some(day);
    }

    StreakSummary {
        current_streak: current,
        longest_streak: longest,
        last_activity: Some(last),
    }
}

/// Success/failure counter for one streak kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakCounter {
    pub current: i32,
    pub best: i32,
}

impl StreakCounter {
    pub fn new(current: i32, best: i32) -> Self {
        Self { current, best }
    }

    pub fn record(&mut self, success: bool) {
        if success {
            self.current = self.current.saturating_add(1);
            self.best = self.best.max(self.current);
        } else {
            self.current = 0;
        }
    }
}
