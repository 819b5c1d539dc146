//! Repit Common - Shared types and error codes
//!
//! This crate provides the foundational types used across all Repit components:
//! - Error types and error codes
//! - Wire enums shared by gamification, analytics and the service client

pub mod error;
pub mod macros;

pub use error::{ErrorCode, RepitError};

/// Prefix for all versioned REST endpoints
pub const API_PREFIX: &str = "/api/v1";

/// Default page size for list endpoints
pub const DEFAULT_PAGE_SIZE: u64 = 50;

/// Largest page size a caller may request
pub const MAX_PAGE_SIZE: u64 = 100;

string_enum! {
    /// Actions that earn experience points
    pub enum XpAction {
        LessonCompleted => "lesson_completed",
        HomeworkSubmitted => "homework_submitted",
        HomeworkPerfect => "homework_perfect",
        MaterialStudied => "material_studied",
        DailyStreak => "daily_streak",
        WeekStreak => "week_streak",
        MonthStreak => "month_streak",
        FirstLesson => "first_lesson",
        AchievementUnlocked => "achievement_unlocked",
        CompetitionWin => "competition_win",
        CompetitionParticipate => "competition_participate",
    }
}

impl XpAction {
    /// Actions that may be awarded only once per lesson or homework
    pub fn is_deduplicated(self) -> bool {
        matches!(self, XpAction::LessonCompleted | XpAction::HomeworkSubmitted)
    }

    /// Actions that count as learning activity for streaks
    pub fn is_learning_activity(self) -> bool {
        matches!(self, XpAction::LessonCompleted | XpAction::HomeworkSubmitted)
    }
}

string_enum! {
    /// Achievement category
    pub enum AchievementType {
        Lesson => "lesson",
        Homework => "homework",
        Streak => "streak",
        StudyTime => "study_time",
        PerfectScore => "perfect_score",
        Milestone => "milestone",
        Social => "social",
        Special => "special",
    }
}

string_enum! {
    /// Achievement rarity
    pub enum AchievementRarity {
        Common => "common",
        Rare => "rare",
        Epic => "epic",
        Legendary => "legendary",
    }
}

string_enum! {
    /// Badge rarity, one step finer than achievement rarity
    pub enum BadgeRarity {
        Common => "common",
        Uncommon => "uncommon",
        Rare => "rare",
        Epic => "epic",
        Legendary => "legendary",
    }
}

string_enum! {
    /// Leaderboard aggregation window
    pub enum LeaderboardPeriod {
        AllTime => "all_time",
        Week => "week",
        Month => "month",
    }
}

impl LeaderboardPeriod {
    /// Window length in days, `None` for all time
    pub fn days(self) -> Option<i64> {
        match self {
            LeaderboardPeriod::AllTime => None,
            LeaderboardPeriod::Week => Some(7),
            LeaderboardPeriod::Month => Some(30),
        }
    }
}

string_enum! {
    /// Lesson outcome recorded for analytics
    pub enum LessonStatus {
        Completed => "completed",
        Cancelled => "cancelled",
        Missed => "missed",
        Rescheduled => "rescheduled",
    }
}

string_enum! {
    /// Student attendance for a lesson
    pub enum AttendanceStatus {
        Present => "present",
        Absent => "absent",
        Late => "late",
    }
}

string_enum! {
    /// Lesson kind, weights the XP a completed lesson is worth
    pub enum LessonKind {
        Regular => "regular",
        Practice => "practice",
        Test => "test",
        Exam => "exam",
    }
}

impl LessonKind {
    pub fn xp_multiplier(self) -> f64 {
        match self {
            LessonKind::Regular => 1.0,
            LessonKind::Practice => 1.2,
            LessonKind::Test => 1.5,
            LessonKind::Exam => 2.0,
        }
    }
}

string_enum! {
    /// Per-activity streak counters kept alongside the daily streak
    pub enum StreakKind {
        Study => "study",
        Homework => "homework",
        Perfect => "perfect",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_xp_action_round_trip_names() {
        assert_eq!(XpAction::LessonCompleted.as_str(), "lesson_completed");
        assert_eq!(
            XpAction::from_str("competition_win"),
            Ok(XpAction::CompetitionWin)
        );
        assert!(XpAction::from_str("teleport").is_err());
        assert_eq!(XpAction::ALL.len(), 11);
    }

    #[test]
    fn test_xp_action_deduplicated() {
        assert!(XpAction::LessonCompleted.is_deduplicated());
        assert!(XpAction::HomeworkSubmitted.is_deduplicated());
        assert!(!XpAction::MaterialStudied.is_deduplicated());
    }

    #[test]
    fn test_achievement_enums_display() {
        assert_eq!(AchievementType::StudyTime.to_string(), "study_time");
        assert_eq!(AchievementRarity::Legendary.to_string(), "legendary");
        assert_eq!(AchievementType::ALL.len(), 8);
        assert_eq!(AchievementRarity::ALL.len(), 4);
        assert_eq!(BadgeRarity::ALL.len(), 5);
    }

    #[test]
    fn test_serde_uses_wire_names() {
        let json = serde_json::to_string(&AchievementType::PerfectScore).unwrap();
        assert_eq!(json, "\"perfect_score\"");
        let period: LeaderboardPeriod = serde_json::from_str("\"all_time\"").unwrap();
        assert_eq!(period, LeaderboardPeriod::AllTime);
    }

    #[test]
    fn test_leaderboard_period_days() {
        assert_eq!(LeaderboardPeriod::AllTime.days(), None);
        assert_eq!(LeaderboardPeriod::Week.days(), Some(7));
        assert_eq!(LeaderboardPeriod::Month.days(), Some(30));
    }

    #[test]
    fn test_lesson_kind_multiplier() {
        assert_eq!(LessonKind::Regular.xp_multiplier(), 1.0);
        assert_eq!(LessonKind::Exam.xp_multiplier(), 2.0);
        assert_eq!(LessonKind::from_str("practice"), Ok(LessonKind::Practice));
    }
}
