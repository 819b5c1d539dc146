//! Request and response bodies for the REST API
//!
//! Incoming bodies are validated with `validator` before they reach a
//! service; the conversions below produce the service-layer drafts.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use repit_analytics::TrendPeriod;
use repit_common::{
    AchievementRarity, AchievementType, DEFAULT_PAGE_SIZE, LeaderboardPeriod, MAX_PAGE_SIZE,
    XpAction,
};
use repit_gamification::{
    AchievementUnlocked, ActivityOutcome, DEFAULT_SUMMARY_DAYS, MAX_SESSION_MINUTES, RankProgress,
    StatsDelta, XpAwardRequest, XpGrant,
};
use repit_persistence::{
    AchievementPatch, LessonQuery, NewAchievement, NewChallenge, NewLearningGoal, NewStudent,
    NewStudySession, StudentPatch, StudentSearchFilters,
};

/// Upper bound for a single counter increment
pub const MAX_COUNTER_DELTA: i64 = 10_000;

/// Upper bound for study time added in one update (one hundred days)
pub const MAX_STUDY_MINUTES_DELTA: i64 = 144_000;

pub const MAX_XP_REWARD: i64 = 100_000;

pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

// ============================================================================
// Students
// ============================================================================

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateStudentRequest {
    #[validate(range(min = 1))]
    pub user_id: i64,
    #[validate(length(min = 1, max = 100))]
    pub display_name: Option<String>,
    #[validate(length(max = 1000))]
    pub bio: Option<String>,
    #[validate(url)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub is_premium: bool,
}

impl From<CreateStudentRequest> for NewStudent {
    fn from(req: CreateStudentRequest) -> Self {
        NewStudent {
            user_id: req.user_id,
            display_name: req.display_name,
            bio: req.bio,
            avatar_url: req.avatar_url,
            is_premium: req.is_premium,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateStudentRequest {
    #[validate(length(min = 1, max = 100))]
    pub display_name: Option<String>,
    #[validate(length(max = 1000))]
    pub bio: Option<String>,
    #[validate(url)]
    pub avatar_url: Option<String>,
    pub is_active: Option<bool>,
    pub is_premium: Option<bool>,
}

impl From<UpdateStudentRequest> for StudentPatch {
    fn from(req: UpdateStudentRequest) -> Self {
        StudentPatch {
            display_name: req.display_name,
            bio: req.bio,
            avatar_url: req.avatar_url,
            is_active: req.is_active,
            is_premium: req.is_premium,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct StudentSearchQuery {
    #[validate(range(min = 1))]
    pub level_min: Option<i32>,
    #[validate(range(min = 1))]
    pub level_max: Option<i32>,
    pub is_premium: Option<bool>,
    pub is_active: Option<bool>,
    pub has_streak: Option<bool>,
    #[validate(range(min = 1, max = MAX_PAGE_SIZE))]
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl StudentSearchQuery {
    pub fn filters(&self) -> StudentSearchFilters {
        StudentSearchFilters {
            level_min: self.level_min,
            level_max: self.level_max,
            is_premium: self.is_premium,
            is_active: self.is_active,
            has_streak: self.has_streak,
        }
    }

    pub fn limit(&self) -> u64 {
        self.limit.unwrap_or(DEFAULT_PAGE_SIZE)
    }

    pub fn offset(&self) -> u64 {
        self.offset.unwrap_or(0)
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ExperienceRequest {
    #[validate(range(min = -100_000, max = 100_000))]
    pub amount: i64,
    #[validate(length(max = 255))]
    pub reason: Option<String>,
    #[validate(length(max = 64))]
    pub category: Option<String>,
}

impl From<ExperienceRequest> for XpGrant {
    fn from(req: ExperienceRequest) -> Self {
        XpGrant {
            amount: req.amount,
            reason: req.reason,
            category: req.category,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct HomeworkEvent {
    #[validate(range(min = 0.0, max = 100.0))]
    pub score: Option<f64>,
}

/// Counter increments for `PATCH /students/{id}/stats`
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateStatsRequest {
    #[validate(range(min = 0, max = MAX_COUNTER_DELTA))]
    pub lessons_completed: Option<i64>,
    #[validate(range(min = 0, max = MAX_COUNTER_DELTA))]
    pub homework_submitted: Option<i64>,
    #[validate(range(min = 0, max = MAX_COUNTER_DELTA))]
    pub homework_perfect: Option<i64>,
    #[validate(range(min = 0, max = MAX_COUNTER_DELTA))]
    pub materials_studied: Option<i64>,
    #[validate(range(min = 0, max = MAX_STUDY_MINUTES_DELTA))]
    pub study_time_minutes: Option<i64>,
    pub last_activity_date: Option<DateTime<Utc>>,
}

impl From<UpdateStatsRequest> for StatsDelta {
    fn from(req: UpdateStatsRequest) -> Self {
        StatsDelta {
            lessons_completed: req.lessons_completed,
            homework_submitted: req.homework_submitted,
            homework_perfect: req.homework_perfect,
            materials_studied: req.materials_studied,
            study_time_minutes: req.study_time_minutes,
            last_activity_date: req.last_activity_date,
        }
    }
}

/// Activity hook result with the achievements it unlocked
#[derive(Debug, Clone, Serialize)]
pub struct ActivityResponse {
    #[serde(flatten)]
    pub outcome: ActivityOutcome,
    pub achievements_unlocked: Vec<AchievementUnlocked>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Deleted {
    pub deleted: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Seeded {
    pub created: usize,
}

// ============================================================================
// Learning goals and study sessions
// ============================================================================

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct GoalRequest {
    #[validate(length(min = 1, max = 200), custom(function = "not_blank"))]
    pub title: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(length(max = 100))]
    pub category: Option<String>,
    #[validate(range(exclusive_min = 0.0, max = 1_000_000.0))]
    pub target_value: f64,
    #[validate(length(min = 1, max = 50))]
    pub unit: Option<String>,
    pub target_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default = "default_true")]
    pub reminder_enabled: bool,
}

impl From<GoalRequest> for NewLearningGoal {
    fn from(req: GoalRequest) -> Self {
        NewLearningGoal {
            title: req.title.trim().to_string(),
            description: req.description,
            category: req.category,
            target_value: req.target_value,
            unit: req.unit.unwrap_or_else(|| "items".to_string()),
            target_date: req.target_date,
            is_public: req.is_public,
            reminder_enabled: req.reminder_enabled,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct GoalProgressRequest {
    #[validate(range(min = 0.0))]
    pub value: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GoalListQuery {
    #[serde(default)]
    pub active_only: bool,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct StudySessionRequest {
    #[validate(length(min = 1, max = 100))]
    pub subject: Option<String>,
    #[validate(length(min = 1, max = 50), custom(function = "not_blank"))]
    pub activity_type: String,
    #[validate(length(max = 100))]
    pub activity_id: Option<String>,
    /// Defaults to the time the request arrives
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    #[validate(range(min = 0, max = MAX_SESSION_MINUTES))]
    pub duration_minutes: Option<i64>,
    #[validate(range(min = 0.0, max = 100.0))]
    pub focus_score: Option<f64>,
    #[validate(range(min = 0.0, max = 100.0))]
    pub productivity_score: Option<f64>,
    #[validate(range(min = 0.0, max = 100.0))]
    pub satisfaction_score: Option<f64>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

impl From<StudySessionRequest> for NewStudySession {
    fn from(req: StudySessionRequest) -> Self {
        NewStudySession {
            subject: req.subject,
            activity_type: req.activity_type,
            activity_id: req.activity_id,
            started_at: req.started_at.unwrap_or_else(Utc::now),
            ended_at: req.ended_at,
            duration_minutes: req.duration_minutes,
            focus_score: req.focus_score,
            productivity_score: req.productivity_score,
            satisfaction_score: req.satisfaction_score,
            notes: req.notes,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct SessionsQuery {
    #[validate(range(min = 1, max = 365))]
    pub days: Option<i64>,
}

impl SessionsQuery {
    pub fn days(&self) -> i64 {
        self.days.unwrap_or(DEFAULT_SUMMARY_DAYS)
    }
}

// ============================================================================
// Achievements
// ============================================================================

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AchievementRequest {
    #[validate(length(min = 1, max = 100), custom(function = "not_blank"))]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 1000))]
    pub description: String,
    #[validate(url)]
    pub icon_url: Option<String>,
    #[validate(url)]
    pub badge_url: Option<String>,
    pub achievement_type: AchievementType,
    pub rarity: Option<AchievementRarity>,
    #[serde(default)]
    #[validate(range(min = 0, max = MAX_XP_REWARD))]
    pub xp_reward: i64,
    #[serde(default)]
    pub criteria: BTreeMap<String, i64>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_hidden: bool,
    #[serde(default)]
    pub is_repeatable: bool,
    #[serde(default)]
    pub sort_order: i32,
}

impl From<AchievementRequest> for NewAchievement {
    fn from(req: AchievementRequest) -> Self {
        NewAchievement {
            name: req.name,
            description: req.description,
            icon_url: req.icon_url,
            badge_url: req.badge_url,
            achievement_type: req.achievement_type,
            rarity: req.rarity.unwrap_or(AchievementRarity::Common),
            xp_reward: req.xp_reward,
            criteria: req.criteria,
            is_active: req.is_active,
            is_hidden: req.is_hidden,
            is_repeatable: req.is_repeatable,
            sort_order: req.sort_order,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateAchievementRequest {
    #[validate(length(min = 1, max = 100), custom(function = "not_blank"))]
    pub name: Option<String>,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    #[validate(url)]
    pub icon_url: Option<String>,
    #[validate(url)]
    pub badge_url: Option<String>,
    pub achievement_type: Option<AchievementType>,
    pub rarity: Option<AchievementRarity>,
    #[validate(range(min = 0, max = MAX_XP_REWARD))]
    pub xp_reward: Option<i64>,
    pub criteria: Option<BTreeMap<String, i64>>,
    pub is_active: Option<bool>,
    pub is_hidden: Option<bool>,
    pub is_repeatable: Option<bool>,
    pub sort_order: Option<i32>,
}

impl From<UpdateAchievementRequest> for AchievementPatch {
    fn from(req: UpdateAchievementRequest) -> Self {
        AchievementPatch {
            name: req.name,
            description: req.description,
            icon_url: req.icon_url,
            badge_url: req.badge_url,
            achievement_type: req.achievement_type,
            rarity: req.rarity,
            xp_reward: req.xp_reward,
            criteria: req.criteria,
            is_active: req.is_active,
            is_hidden: req.is_hidden,
            is_repeatable: req.is_repeatable,
            sort_order: req.sort_order,
        }
    }
}

// ============================================================================
// Gamification
// ============================================================================

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AwardXpBody {
    pub action: XpAction,
    #[validate(range(min = 1, max = 100_000))]
    pub amount: Option<i64>,
    pub lesson_id: Option<i64>,
    pub homework_id: Option<i64>,
    #[validate(length(max = 255))]
    pub description: Option<String>,
}

impl From<AwardXpBody> for XpAwardRequest {
    fn from(body: AwardXpBody) -> Self {
        XpAwardRequest {
            action: body.action,
            amount: body.amount,
            lesson_id: body.lesson_id,
            homework_id: body.homework_id,
            description: body.description,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AwardBadgeBody {
    #[validate(length(min = 1, max = 64))]
    pub code: String,
    #[validate(length(max = 255))]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StreakOutcome {
    pub success: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct LeaderboardQuery {
    pub period: Option<LeaderboardPeriod>,
    #[validate(range(min = 1, max = 100))]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LevelProgressQuery {
    #[validate(range(min = 0))]
    pub xp: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LevelProgressView {
    pub total_xp: i64,
    pub rank_title: String,
    #[serde(flatten)]
    pub progress: RankProgress,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ChallengeRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[serde(default)]
    #[validate(length(max = 2000))]
    pub description: String,
    #[validate(length(min = 1, max = 64))]
    pub challenge_type: String,
    #[validate(length(min = 1, max = 64))]
    pub target_metric: String,
    #[validate(range(min = 1))]
    pub target_value: i64,
    #[serde(default)]
    #[validate(range(min = 0, max = 100_000))]
    pub xp_reward: i64,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[validate(range(min = 1))]
    pub max_participants: Option<i64>,
}

impl From<ChallengeRequest> for NewChallenge {
    fn from(req: ChallengeRequest) -> Self {
        NewChallenge {
            title: req.title,
            description: req.description,
            challenge_type: req.challenge_type,
            target_metric: req.target_metric,
            target_value: req.target_value,
            xp_reward: req.xp_reward,
            start_date: req.start_date,
            end_date: req.end_date,
            max_participants: req.max_participants,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Participant {
    pub student_id: i64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ProgressUpdate {
    pub student_id: i64,
    #[validate(range(min = 0))]
    pub value: i64,
}

// ============================================================================
// Analytics
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PeriodQuery {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProgressQuery {
    pub subject: Option<String>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub format: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrendsQuery {
    pub period: Option<TrendPeriod>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LessonReportQuery {
    pub format: Option<String>,
    pub title: Option<String>,
    pub student_id: Option<i64>,
    pub tutor_id: Option<i64>,
    pub subject: Option<String>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl LessonReportQuery {
    pub fn lesson_query(&self) -> LessonQuery {
        LessonQuery {
            student_id: self.student_id,
            tutor_id: self.tutor_id,
            subject: self.subject.clone(),
            start: self.start,
            end: self.end,
        }
    }
}
