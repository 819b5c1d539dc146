//! Level and rank curves
//!
//! Two progressions run side by side:
//! - `ExponentialCurve`: the student level, driven by `experience_points`.
//!   Each level costs `base_xp * multiplier^(level-1)` on top of the previous
//!   ones, so thresholds are cumulative.
//! - `RankTable`: ten named ranks keyed on total XP earned, used for titles
//!   and leaderboards.

use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_XP: i64 = 1000;
pub const DEFAULT_MULTIPLIER: f64 = 1.5;
pub const DEFAULT_MAX_LEVEL: i32 = 100;

/// Cumulative exponential level curve
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExponentialCurve {
    pub base_xp: i64,
    pub multiplier: f64,
    pub max_level: i32,
}

impl Default for ExponentialCurve {
    fn default() -> Self {
        Self {
            base_xp: DEFAULT_BASE_XP,
            multiplier: DEFAULT_MULTIPLIER,
            max_level: DEFAULT_MAX_LEVEL,
        }
    }
}

impl ExponentialCurve {
    pub fn new(base_xp: i64, multiplier: f64, max_level: i32) -> Self {
        Self {
            base_xp: base_xp.max(1),
            multiplier: if multiplier.is_finite() && multiplier >= 1.0 {
                multiplier
            } else {
                DEFAULT_MULTIPLIER
            },
            max_level: max_level.max(1),
        }
    }

    /// XP needed to go from `level` to `level + 1`
    pub fn level_cost(&self, level: i32) -> i64 {
        let exponent = (level.max(1) - 1) as f64;
        // `as` saturates on overflow and infinity
        (self.base_xp as f64 * self.multiplier.powf(exponent)).floor() as i64
    }

    /// Cumulative XP at which `level` starts
    pub fn xp_for_current_level(&self, level: i32) -> i64 {
        (1..level.max(1)).fold(0i64, |acc, l| acc.saturating_add(self.level_cost(l)))
    }

    /// Cumulative XP at which `level + 1` starts
    pub fn xp_for_next_level(&self, level: i32) -> i64 {
        self.xp_for_current_level(level)
            .saturating_add(self.level_cost(level))
    }

    /// Progress through the current level, 0..=100
    pub fn progress_percentage(&self, level: i32, xp: i64) -> f64 {
        let current = self.xp_for_current_level(level);
        let next = self.xp_for_next_level(level);
        let span = next.saturating_sub(current);
        if span <= 0 {
            return 100.0;
        }
        (xp.saturating_sub(current) as f64 / span as f64 * 100.0).clamp(0.0, 100.0)
    }

    pub fn can_level_up(&self, level: i32, xp: i64) -> bool {
        level < self.max_level && xp >= self.xp_for_next_level(level)
    }

    /// Level reached from `level` holding `xp`
    pub fn settle(&self, mut level: i32, xp: i64) -> i32 {
        while self.can_level_up(level, xp) {
            level += 1;
        }
        level
    }

    pub fn level_info(&self, level: i32, xp: i64) -> LevelInfo {
        LevelInfo {
            level,
            experience_points: xp,
            xp_for_current_level: self.xp_for_current_level(level),
            xp_for_next_level: self.xp_for_next_level(level),
            progress_percentage: round2(self.progress_percentage(level, xp)),
            can_level_up: self.can_level_up(level, xp),
            is_max_level: level >= self.max_level,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelInfo {
    pub level: i32,
    pub experience_points: i64,
    pub xp_for_current_level: i64,
    pub xp_for_next_level: i64,
    pub progress_percentage: f64,
    pub can_level_up: bool,
    pub is_max_level: bool,
}

// ============================================================================
// Rank table
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rank {
    pub rank: i32,
    pub xp_required: i64,
    pub title: &'static str,
    pub color: &'static str,
}

#[rustfmt::skip]
pub const RANKS: [Rank; 10] = [
    Rank { rank: 1, xp_required: 0, title: "Новичок", color: "#8B4513" },
    Rank { rank: 2, xp_required: 100, title: "Ученик", color: "#228B22" },
    Rank { rank: 3, xp_required: 250, title: "Студент", color: "#4169E1" },
    Rank { rank: 4, xp_required: 500, title: "Исследователь", color: "#9932CC" },
    Rank { rank: 5, xp_required: 1000, title: "Знаток", color: "#FF4500" },
    Rank { rank: 6, xp_required: 2000, title: "Эксперт", color: "#DC143C" },
    Rank { rank: 7, xp_required: 4000, title: "Мастер", color: "#B8860B" },
    Rank { rank: 8, xp_required: 8000, title: "Гуру", color: "#800080" },
    Rank { rank: 9, xp_required: 15000, title: "Легенда", color: "#FFD700" },
    Rank { rank: 10, xp_required: 25000, title: "Гроссмейстер", color: "#FF69B4" },
];

const BEYOND_TOP_TITLE: &str = "Легендарный Мастер";

/// Progress towards the next rank
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankProgress {
    pub current_rank: i32,
    pub next_rank: Option<i32>,
    pub xp_needed: i64,
    pub progress_percent: f64,
}

/// Fixed rank table over total XP earned
#[derive(Debug, Clone, Copy, Default)]
pub struct RankTable;

impl RankTable {
    pub fn rank_for(&self, total_xp: i64) -> i32 {
        RANKS
            .iter()
            .rev()
            .find(|r| total_xp >= r.xp_required)
            .map_or(1, |r| r.rank)
    }

    pub fn get(&self, rank: i32) -> Option<&'static Rank> {
        RANKS.iter().find(|r| r.rank == rank)
    }

    pub fn title(&self, rank: i32) -> &'static str {
        self.get(rank).map_or(BEYOND_TOP_TITLE, |r| r.title)
    }

    pub fn next_rank_progress(&self, total_xp: i64) -> RankProgress {
        let current = self.rank_for(total_xp);
        let (Some(this), Some(next)) = (self.get(current), self.get(current + 1)) else {
            return RankProgress {
                current_rank: current,
                next_rank: None,
                xp_needed: 0,
                progress_percent: 100.0,
            };
        };

        let span = (next.xp_required - this.xp_required) as f64;
        let progress = (total_xp - this.xp_required) as f64 / span * 100.0;
        RankProgress {
            current_rank: current,
            next_rank: Some(next.rank),
            xp_needed: next.xp_required - total_xp,
            progress_percent: round2(progress.clamp(0.0, 100.0)),
        }
    }
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
