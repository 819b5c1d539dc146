//! Domain model types for the persistence abstraction layer
//!
//! These types are used as return values from the persistence traits,
//! decoupled from specific storage backends.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use repit_common::{
    AchievementRarity, AchievementType, AttendanceStatus, BadgeRarity, LessonStatus, StreakKind,
    XpAction,
};

// ============================================================================
// Students
// ============================================================================

/// Gamified student profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentProfile {
    pub id: i64,
    pub user_id: i64,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub level: i32,
    pub experience_points: i64,
    pub total_xp_earned: i64,
    pub lessons_completed: i64,
    pub homework_submitted: i64,
    pub homework_perfect: i64,
    pub materials_studied: i64,
    pub study_time_minutes: i64,
    pub current_streak: i32,
    pub best_streak: i32,
    pub last_activity_date: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub is_premium: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StudentProfile {
    /// Fresh level-1 profile for a new user
    pub fn new(id: i64, draft: &NewStudent, now: DateTime<Utc>) -> Self {
        Self {
            id,
            user_id: draft.user_id,
            display_name: draft.display_name.clone(),
            bio: draft.bio.clone(),
            avatar_url: draft.avatar_url.clone(),
            level: 1,
            experience_points: 0,
            total_xp_earned: 0,
            lessons_completed: 0,
            homework_submitted: 0,
            homework_perfect: 0,
            materials_studied: 0,
            study_time_minutes: 0,
            current_streak: 0,
            best_streak: 0,
            last_activity_date: None,
            is_active: true,
            is_premium: draft.is_premium,
            created_at: now,
            updated_at: now,
        }
    }

    /// Numeric metric by field name, used by achievement criteria
    pub fn metric(&self, field: &str) -> Option<i64> {
        let value = match field {
            "level" => self.level as i64,
            "experience_points" => self.experience_points,
            "total_xp_earned" => self.total_xp_earned,
            "lessons_completed" => self.lessons_completed,
            "homework_submitted" => self.homework_submitted,
            "homework_perfect" => self.homework_perfect,
            "materials_studied" => self.materials_studied,
            "study_time_minutes" => self.study_time_minutes,
            "current_streak" => self.current_streak as i64,
            "best_streak" => self.best_streak as i64,
            _ => return None,
        };
        Some(value)
    }

    /// Label shown on leaderboards
    pub fn label(&self) -> String {
        self.display_name
            .clone()
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| format!("Student {}", self.id))
    }
}

/// Payload for creating a student profile
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewStudent {
    pub user_id: i64,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub is_premium: bool,
}

/// Partial update of the editable profile fields
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StudentPatch {
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub is_active: Option<bool>,
    pub is_premium: Option<bool>,
}

impl StudentPatch {
    pub fn apply(&self, student: &mut StudentProfile) {
        if let Some(name) = &self.display_name {
            student.display_name = Some(name.clone());
        }
        if let Some(bio) = &self.bio {
            student.bio = Some(bio.clone());
        }
        if let Some(avatar) = &self.avatar_url {
            student.avatar_url = Some(avatar.clone());
        }
        if let Some(active) = self.is_active {
            student.is_active = active;
        }
        if let Some(premium) = self.is_premium {
            student.is_premium = premium;
        }
    }
}

/// Student search filters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StudentSearchFilters {
    pub level_min: Option<i32>,
    pub level_max: Option<i32>,
    pub is_premium: Option<bool>,
    pub is_active: Option<bool>,
    pub has_streak: Option<bool>,
}

impl StudentSearchFilters {
    pub fn matches(&self, student: &StudentProfile) -> bool {
        self.level_min.is_none_or(|min| student.level >= min)
            && self.level_max.is_none_or(|max| student.level <= max)
            && self.is_premium.is_none_or(|p| student.is_premium == p)
            && self.is_active.is_none_or(|a| student.is_active == a)
            && self
                .has_streak
                .is_none_or(|s| (student.current_streak > 0) == s)
    }
}

// ============================================================================
// Achievements
// ============================================================================

/// Achievement definition with unlock criteria
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Achievement {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub icon_url: Option<String>,
    pub badge_url: Option<String>,
    pub achievement_type: AchievementType,
    pub rarity: AchievementRarity,
    pub xp_reward: i64,
    /// Student metric name to minimum value
    pub criteria: BTreeMap<String, i64>,
    pub is_active: bool,
    pub is_hidden: bool,
    pub is_repeatable: bool,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload for creating an achievement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAchievement {
    pub name: String,
    pub description: String,
    pub icon_url: Option<String>,
    pub badge_url: Option<String>,
    pub achievement_type: AchievementType,
    #[serde(default = "default_achievement_rarity")]
    pub rarity: AchievementRarity,
    #[serde(default)]
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

fn default_achievement_rarity() -> AchievementRarity {
    AchievementRarity::Common
}

fn default_true() -> bool {
    true
}

/// Partial update of an achievement
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AchievementPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub icon_url: Option<String>,
    pub badge_url: Option<String>,
    pub achievement_type: Option<AchievementType>,
    pub rarity: Option<AchievementRarity>,
    pub xp_reward: Option<i64>,
    pub criteria: Option<BTreeMap<String, i64>>,
    pub is_active: Option<bool>,
    pub is_hidden: Option<bool>,
    pub is_repeatable: Option<bool>,
    pub sort_order: Option<i32>,
}

impl AchievementPatch {
    pub fn apply(&self, achievement: &mut Achievement) {
        if let Some(v) = &self.name {
            achievement.name = v.clone();
        }
        if let Some(v) = &self.description {
            achievement.description = v.clone();
        }
        if let Some(v) = &self.icon_url {
            achievement.icon_url = Some(v.clone());
        }
        if let Some(v) = &self.badge_url {
            achievement.badge_url = Some(v.clone());
        }
        if let Some(v) = self.achievement_type {
            achievement.achievement_type = v;
        }
        if let Some(v) = self.rarity {
            achievement.rarity = v;
        }
        if let Some(v) = self.xp_reward {
            achievement.xp_reward = v;
        }
        if let Some(v) = &self.criteria {
            achievement.criteria = v.clone();
        }
        if let Some(v) = self.is_active {
            achievement.is_active = v;
        }
        if let Some(v) = self.is_hidden {
            achievement.is_hidden = v;
        }
        if let Some(v) = self.is_repeatable {
            achievement.is_repeatable = v;
        }
        if let Some(v) = self.sort_order {
            achievement.sort_order = v;
        }
    }
}

/// Achievement list filters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AchievementFilters {
    pub achievement_type: Option<AchievementType>,
    pub rarity: Option<AchievementRarity>,
    pub is_active: Option<bool>,
    pub is_hidden: Option<bool>,
    pub is_repeatable: Option<bool>,
}

impl AchievementFilters {
    pub fn active() -> Self {
        Self {
            is_active: Some(true),
            ..Default::default()
        }
    }

    pub fn matches(&self, achievement: &Achievement) -> bool {
        self.achievement_type
            .is_none_or(|t| achievement.achievement_type == t)
            && self.rarity.is_none_or(|r| achievement.rarity == r)
            && self.is_active.is_none_or(|a| achievement.is_active == a)
            && self.is_hidden.is_none_or(|h| achievement.is_hidden == h)
            && self
                .is_repeatable
                .is_none_or(|r| achievement.is_repeatable == r)
    }
}

/// An achievement earned by a student
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentAchievement {
    pub id: i64,
    pub student_id: i64,
    pub achievement_id: i64,
    pub earned_at: DateTime<Utc>,
    pub progress_data: Option<serde_json::Value>,
    pub is_showcased: bool,
}

// ============================================================================
// Badges and XP
// ============================================================================

/// Collectible badge, addressed by a stable code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Badge {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub rarity: BadgeRarity,
    pub category: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBadge {
    pub code: String,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub rarity: BadgeRarity,
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentBadge {
    pub id: i64,
    pub student_id: i64,
    pub badge_id: i64,
    pub earned_at: DateTime<Utc>,
    pub reason: Option<String>,
}

/// Ledger entry for granted experience points
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XpTransaction {
    pub id: i64,
    pub student_id: i64,
    pub action: XpAction,
    pub amount: i64,
    pub lesson_id: Option<i64>,
    pub homework_id: Option<i64>,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewXpTransaction {
    pub student_id: i64,
    pub action: XpAction,
    pub amount: i64,
    pub lesson_id: Option<i64>,
    pub homework_id: Option<i64>,
    pub description: String,
}

/// Per-kind streak counter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreakRecord {
    pub student_id: i64,
    pub kind: StreakKind,
    pub current: i32,
    pub best: i32,
    pub updated_at: DateTime<Utc>,
}

// ============================================================================
// Challenges
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Challenge {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub challenge_type: String,
    pub target_metric: String,
    pub target_value: i64,
    pub xp_reward: i64,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub is_active: bool,
    pub max_participants: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl Challenge {
    pub fn is_ongoing(&self, now: DateTime<Utc>) -> bool {
        self.start_date <= now && now <= self.end_date
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewChallenge {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub challenge_type: String,
    pub target_metric: String,
    pub target_value: i64,
    #[serde(default)]
    pub xp_reward: i64,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub max_participants: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChallengeParticipation {
    pub id: i64,
    pub challenge_id: i64,
    pub student_id: i64,
    pub current_value: i64,
    pub is_completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub reward_claimed: bool,
    pub joined_at: DateTime<Utc>,
}

// ============================================================================
// Learning goals and study sessions
// ============================================================================

fn default_unit() -> String {
    "items".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningGoal {
    pub id: i64,
    pub student_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub target_value: f64,
    pub current_value: f64,
    pub unit: String,
    pub target_date: Option<DateTime<Utc>>,
    pub is_completed: bool,
    pub is_active: bool,
    pub is_public: bool,
    pub reminder_enabled: bool,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl LearningGoal {
    pub fn new(id: i64, student_id: i64, draft: &NewLearningGoal, now: DateTime<Utc>) -> Self {
        Self {
            id,
            student_id,
            title: draft.title.clone(),
            description: draft.description.clone(),
            category: draft.category.clone(),
            target_value: draft.target_value,
            current_value: 0.0,
            unit: draft.unit.clone(),
            target_date: draft.target_date,
            is_completed: false,
            is_active: true,
            is_public: draft.is_public,
            reminder_enabled: draft.reminder_enabled,
            created_at: now,
            completed_at: None,
        }
    }

    /// Share of the target reached, 0..=100
    pub fn progress_percentage(&self) -> f64 {
        if self.target_value <= 0.0 {
            return 0.0;
        }
        (self.current_value / self.target_value * 100.0).clamp(0.0, 100.0)
    }

    /// Record the current value; `true` when this update completed the goal
    ///
    /// A completed goal stays completed even if the value later drops.
    pub fn update_progress(&mut self, value: f64, now: DateTime<Utc>) -> bool {
        self.current_value = value;
        if self.is_completed || value < self.target_value {
            return false;
        }
        self.is_completed = true;
        self.completed_at = Some(now);
        true
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewLearningGoal {
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub target_value: f64,
    #[serde(default = "default_unit")]
    pub unit: String,
    pub target_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default = "default_true")]
    pub reminder_enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudySession {
    pub id: i64,
    pub student_id: i64,
    pub subject: Option<String>,
    /// `lesson`, `homework`, `self_study` and the like
    pub activity_type: String,
    pub activity_id: Option<String>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub duration_minutes: i64,
    /// 0..=100
    pub focus_score: Option<f64>,
    pub productivity_score: Option<f64>,
    pub satisfaction_score: Option<f64>,
    pub notes: Option<String>,
}

impl StudySession {
    pub fn new(id: i64, student_id: i64, draft: &NewStudySession) -> Self {
        Self {
            id,
            student_id,
            subject: draft.subject.clone(),
            activity_type: draft.activity_type.clone(),
            activity_id: draft.activity_id.clone(),
            started_at: draft.started_at,
            ended_at: draft.ended_at,
            duration_minutes: draft.resolved_duration(),
            focus_score: draft.focus_score,
            productivity_score: draft.productivity_score,
            satisfaction_score: draft.satisfaction_score,
            notes: draft.notes.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewStudySession {
    pub subject: Option<String>,
    pub activity_type: String,
    pub activity_id: Option<String>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    /// Overrides the span between `started_at` and `ended_at`
    pub duration_minutes: Option<i64>,
    pub focus_score: Option<f64>,
    pub productivity_score: Option<f64>,
    pub satisfaction_score: Option<f64>,
    pub notes: Option<String>,
}

impl NewStudySession {
    /// Explicit duration, else whole minutes between start and end, never negative
    pub fn resolved_duration(&self) -> i64 {
        self.duration_minutes
            .or_else(|| {
                self.ended_at
                    .map(|end| (end - self.started_at).num_minutes())
            })
            .unwrap_or(0)
            .max(0)
    }
}

// ============================================================================
// Lesson analytics
// ============================================================================

/// Recorded lesson outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonRecord {
    pub id: i64,
    pub lesson_id: i64,
    pub tutor_id: i64,
    pub student_id: i64,
    pub date: DateTime<Utc>,
    pub subject: String,
    pub duration_minutes: i64,
    pub planned_duration: i64,
    pub status: LessonStatus,
    pub attendance_status: AttendanceStatus,
    /// Share of the lesson plan covered, 0.0..=1.0
    pub completion_rate: f64,
    pub tutor_rating: Option<f64>,
    pub student_rating: Option<f64>,
    pub parent_rating: Option<f64>,
    pub difficulty_rating: Option<f64>,
    pub engagement_score: Option<f64>,
    pub punctuality_score: Option<f64>,
    pub student_questions: i64,
    pub was_rescheduled: bool,
    pub technical_issues: Vec<String>,
    pub learning_objectives_met: Vec<String>,
    pub topics_covered: Vec<String>,
    /// Whether the homework set in the previous lesson was done
    pub homework_completion_previous: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewLessonRecord {
    pub lesson_id: i64,
    pub tutor_id: i64,
    pub student_id: i64,
    pub date: DateTime<Utc>,
    pub subject: String,
    pub duration_minutes: i64,
    pub planned_duration: i64,
    pub status: LessonStatus,
    pub attendance_status: AttendanceStatus,
    #[serde(default)]
    pub completion_rate: f64,
    pub tutor_rating: Option<f64>,
    pub student_rating: Option<f64>,
    pub parent_rating: Option<f64>,
    pub difficulty_rating: Option<f64>,
    pub engagement_score: Option<f64>,
    pub punctuality_score: Option<f64>,
    #[serde(default)]
    pub student_questions: i64,
    #[serde(default)]
    pub was_rescheduled: bool,
    #[serde(default)]
    pub technical_issues: Vec<String>,
    #[serde(default)]
    pub learning_objectives_met: Vec<String>,
    #[serde(default)]
    pub topics_covered: Vec<String>,
    pub homework_completion_previous: Option<bool>,
}

impl LessonRecord {
    pub fn from_new(id: i64, draft: NewLessonRecord) -> Self {
        Self {
            id,
            lesson_id: draft.lesson_id,
            tutor_id: draft.tutor_id,
            student_id: draft.student_id,
            date: draft.date,
            subject: draft.subject,
            duration_minutes: draft.duration_minutes,
            planned_duration: draft.planned_duration,
            status: draft.status,
            attendance_status: draft.attendance_status,
            completion_rate: draft.completion_rate.clamp(0.0, 1.0),
            tutor_rating: draft.tutor_rating,
            student_rating: draft.student_rating,
            parent_rating: draft.parent_rating,
            difficulty_rating: draft.difficulty_rating,
            engagement_score: draft.engagement_score,
            punctuality_score: draft.punctuality_score,
            student_questions: draft.student_questions,
            was_rescheduled: draft.was_rescheduled,
            technical_issues: draft.technical_issues,
            learning_objectives_met: draft.learning_objectives_met,
            topics_covered: draft.topics_covered,
            homework_completion_previous: draft.homework_completion_previous,
        }
    }
}

/// Lesson record lookup, all filters optional
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LessonQuery {
    pub student_id: Option<i64>,
    pub tutor_id: Option<i64>,
    pub subject: Option<String>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl LessonQuery {
    pub fn matches(&self, record: &LessonRecord) -> bool {
        self.student_id.is_none_or(|id| record.student_id == id)
            && self.tutor_id.is_none_or(|id| record.tutor_id == id)
            && self
                .subject
                .as_deref()
                .is_none_or(|s| record.subject == s)
            && self.start.is_none_or(|start| record.date >= start)
            && self.end.is_none_or(|end| record.date <= end)
    }
}

// ============================================================================
// Paging and storage
// ============================================================================

/// Generic paginated result
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Page<T> {
    pub total_count: u64,
    pub page_number: u64,
    pub pages_available: u64,
    pub page_items: Vec<T>,
}

impl<T> Page<T> {
    pub fn new(total_count: u64, page_number: u64, page_size: u64, page_items: Vec<T>) -> Self {
        Self {
            total_count,
            page_number,
            pages_available: if page_size > 0 {
                total_count.div_ceil(page_size)
            } else {
                0
            },
            page_items,
        }
    }

    /// Page built from an offset/limit window
    pub fn from_window(total_count: u64, offset: u64, limit: u64, page_items: Vec<T>) -> Self {
        let page_number = if limit > 0 { offset / limit + 1 } else { 1 };
        Self::new(total_count, page_number, limit, page_items)
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            total_count: self.total_count,
            page_number: self.page_number,
            pages_available: self.pages_available,
            page_items: self.page_items.into_iter().map(f).collect(),
        }
    }
}

/// Storage mode for the persistence layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageMode {
    /// External database (MySQL/PostgreSQL via SeaORM)
    ExternalDb,
    /// In-process store, single node, no external DB
    Embedded,
}

impl std::fmt::Display for StorageMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageMode::ExternalDb => write!(f, "external_db"),
            StorageMode::Embedded => write!(f, "embedded"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn student() -> StudentProfile {
        let draft = NewStudent {
            user_id: 10,
            display_name: Some("Ann".to_string()),
            ..Default::default()
        };
        StudentProfile::new(1, &draft, Utc::now())
    }

    #[test]
    fn test_new_student_defaults() {
        let s = student();
        assert_eq!(s.level, 1);
        assert_eq!(s.experience_points, 0);
        assert!(s.is_active);
        assert!(s.last_activity_date.is_none());
    }

    #[test]
    fn test_metric_lookup() {
        let mut s = student();
        s.lessons_completed = 12;
        s.current_streak = 3;
        assert_eq!(s.metric("lessons_completed"), Some(12));
        assert_eq!(s.metric("current_streak"), Some(3));
        assert_eq!(s.metric("level"), Some(1));
        assert_eq!(s.metric("favourite_colour"), None);
    }

    #[test]
    fn test_search_filters() {
        let mut s = student();
        s.level = 5;
        let filters = StudentSearchFilters {
            level_min: Some(3),
            level_max: Some(6),
            has_streak: Some(false),
            ..Default::default()
        };
        assert!(filters.matches(&s));

        s.current_streak = 2;
        assert!(!filters.matches(&s));
    }

    #[test]
    fn test_patch_only_touches_set_fields() {
        let mut s = student();
        let patch = StudentPatch {
            bio: Some("hello".to_string()),
            ..Default::default()
        };
        patch.apply(&mut s);
        assert_eq!(s.bio.as_deref(), Some("hello"));
        assert_eq!(s.display_name.as_deref(), Some("Ann"));
    }

    #[test]
    fn test_page_from_window() {
        let page = Page::from_window(95, 50, 50, vec![1, 2, 3]);
        assert_eq!(page.page_number, 2);
        assert_eq!(page.pages_available, 2);
        assert_eq!(page.total_count, 95);

        let empty: Page<i32> = Page::new(0, 1, 0, vec![]);
        assert_eq!(empty.pages_available, 0);
    }

    #[test]
    fn test_storage_mode_display() {
        assert_eq!(StorageMode::ExternalDb.to_string(), "external_db");
        assert_eq!(StorageMode::Embedded.to_string(), "embedded");
    }

    #[test]
    fn test_goal_progress_completes_once() {
        let draft: NewLearningGoal =
            serde_json::from_str(r#"{"title": "Read 10 books", "target_value": 10}"#).unwrap();
        assert_eq!(draft.unit, "items");
        assert!(draft.reminder_enabled);

        let created = Utc::now();
        let mut goal = LearningGoal::new(1, 7, &draft, created);
        assert_eq!(goal.progress_percentage(), 0.0);

        assert!(!goal.update_progress(4.0, created));
        assert_eq!(goal.progress_percentage(), 40.0);

        let done_at = created + chrono::Duration::days(3);
        assert!(goal.update_progress(12.0, done_at));
        assert_eq!(goal.progress_percentage(), 100.0);
        assert_eq!(goal.completed_at, Some(done_at));

        assert!(!goal.update_progress(15.0, done_at + chrono::Duration::days(1)));
        assert_eq!(goal.completed_at, Some(done_at));
    }

    #[test]
    fn test_session_duration_resolution() {
        let start = Utc::now();
        let mut draft = NewStudySession {
            subject: None,
            activity_type: "self_study".to_string(),
            activity_id: None,
            started_at: start,
            ended_at: Some(start + chrono::Duration::seconds(45 * 60 + 30)),
            duration_minutes: None,
            focus_score: None,
            productivity_score: None,
            satisfaction_score: None,
            notes: None,
        };
        assert_eq!(draft.resolved_duration(), 45);

        draft.ended_at = Some(start - chrono::Duration::minutes(5));
        assert_eq!(draft.resolved_duration(), 0);

        draft.duration_minutes = Some(20);
        assert_eq!(draft.resolved_duration(), 20);
    }
}
