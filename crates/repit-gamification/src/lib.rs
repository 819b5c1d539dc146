//! Repit Gamification - XP, levels and rewards
//!
//! This crate provides:
//! - Exponential leveling curve and rank table
//! - XP reward table and milestone thresholds
//! - Daily and per-kind streak tracking
//! - Student profile service with dashboard and activity hooks
//! - Learning goals and study sessions feeding the study time counter
//! - Achievement catalogue and unlock checks
//! - XP ledger, badges, leaderboards and challenges

pub mod achievement;
pub mod challenge;
pub mod gamification;
pub mod leveling;
pub mod progress;
pub mod rewards;
pub mod streak;
pub mod student;

// Re-export commonly used types
pub use achievement::{
    AchievementService, AchievementStats, AchievementUnlocked, EarnedAchievement, criteria_met,
    default_achievements,
};
pub use challenge::{ChallengeProgress, ChallengeReward, ChallengeService, challenge_progress};
pub use gamification::{
    BadgeAward, DEFAULT_LEADERBOARD_LIMIT, EarnedBadge, GamificationProfile, GamificationService,
    LeaderboardEntry, XpAward, XpAwardRequest, XpGranted, default_badges,
};
pub use leveling::{ExponentialCurve, LevelInfo, RANKS, Rank, RankProgress, RankTable};
pub use progress::{
    DEFAULT_SUMMARY_DAYS, GoalProgress, GoalUpdate, MAX_SESSION_MINUTES, ProgressService,
    SessionRecorded, StudySummary, study_summary,
};
pub use rewards::{homework_xp, is_perfect, lesson_xp, xp_reward};
pub use streak::{StreakCounter, StreakSummary, advance_daily_streak, streak_from_activity};
pub use student::{
    ActivityOutcome, LevelUp, StatsDelta, StudentDashboard, StudentService, StudentSummary,
    XpGrant,
};
