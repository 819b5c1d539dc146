//! XP reward table and milestone thresholds

use repit_common::{LessonKind, XpAction};

/// Default XP granted for an action
pub fn xp_reward(action: XpAction) -> i64 {
    match action {
        XpAction::LessonCompleted => 50,
        XpAction::HomeworkSubmitted => 30,
        XpAction::HomeworkPerfect => 50,
        XpAction::MaterialStudied => 10,
        XpAction::DailyStreak => 20,
        XpAction::WeekStreak => 100,
        XpAction::MonthStreak => 500,
        XpAction::FirstLesson => 25,
        XpAction::AchievementUnlocked => 100,
        XpAction::CompetitionWin => 200,
        XpAction::CompetitionParticipate => 50,
    }
}

/// Total XP thresholds that grant an `xp_N` badge
pub const XP_MILESTONES: [i64; 7] = [100, 500, 1000, 2500, 5000, 10000, 25000];

/// Rank thresholds that grant a `level_N` badge
pub const LEVEL_MILESTONES: [i32; 4] = [2, 5, 8, 10];

/// XP granted directly by a lesson-completed event
pub const LESSON_EVENT_XP: i64 = 100;

/// Homework score counted as perfect
pub const PERFECT_SCORE: f64 = 90.0;

/// Bonus XP per level gained, reported with a level-up
pub const LEVEL_BONUS_XP: i64 = 50;

const BASE_LESSON_XP: f64 = 100.0;
const MIN_LESSON_XP: i64 = 50;

/// XP for a completed lesson of `kind` graded `score` (0-100)
pub fn lesson_xp(kind: LessonKind, score: Option<f64>) -> i64 {
    let score_multiplier = match score {
        Some(s) if s >= 90.0 => 1.5,
        Some(s) if s >= 75.0 => 1.2,
        _ => 1.0,
    };
    let xp = (BASE_LESSON_XP * kind.xp_multiplier() * score_multiplier).floor() as i64;
    xp.max(MIN_LESSON_XP)
}

/// XP for a submitted homework graded `score` (0-100)
pub fn homework_xp(score: Option<f64>) -> i64 {
    let bonus = match score {
        Some(s) if s >= 90.0 => 100,
        Some(s) if s >= 75.0 => 50,
        _ => 0,
    };
    50 + bonus
}

/// Homework XP for the student-service event endpoint
pub fn homework_event_xp(score: Option<f64>) -> i64 {
    if is_perfect(score) { 150 } else { 50 }
}

pub fn is_perfect(score: Option<f64>) -> bool {
    score.is_some_and(|s| s >= PERFECT_SCORE)
}
