// Student profile service
// Profile CRUD, experience and leveling, stat counters and dashboard

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use repit_common::{AchievementRarity, MAX_PAGE_SIZE, RepitError};
use repit_persistence::{
    AchievementFilters, NewStudent, Page, PersistenceService, StudentPatch, StudentProfile,
    StudentSearchFilters,
};

use crate::leveling::{ExponentialCurve, LevelInfo};
use crate::rewards::{LESSON_EVENT_XP, LEVEL_BONUS_XP, homework_event_xp, is_perfect};
use crate::streak::advance_daily_streak;

/// Experience grant request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct XpGrant {
    pub amount: i64,
    pub reason: Option<String>,
    pub category: Option<String>,
}

impl XpGrant {
    pub fn new(amount: i64, reason: &str, category: &str) -> Self {
        Self {
            amount,
            reason: Some(reason.to_string()),
            category: Some(category.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelRewards {
    pub level_bonus_xp: i64,
}

/// Reported when a grant moves a student up one or more levels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelUp {
    pub old_level: i32,
    pub new_level: i32,
    pub xp_gained: i64,
    pub achievements_unlocked: Vec<String>,
    pub rewards: LevelRewards,
}

/// Counter increments applied by a stats update
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatsDelta {
    pub lessons_completed: Option<i64>,
    pub homework_submitted: Option<i64>,
    pub homework_perfect: Option<i64>,
    pub materials_studied: Option<i64>,
    pub study_time_minutes: Option<i64>,
    /// Explicit activity time; skips the daily streak update when set
    pub last_activity_date: Option<DateTime<Utc>>,
}

/// Counters never drop below zero and saturate instead of overflowing
fn bump(counter: &mut i64, delta: Option<i64>) {
    *counter = counter.saturating_add(delta.unwrap_or(0)).max(0);
}

impl StatsDelta {
    pub(crate) fn apply(&self, student: &mut StudentProfile) {
        bump(&mut student.lessons_completed, self.lessons_completed);
        bump(&mut student.homework_submitted, self.homework_submitted);
        bump(&mut student.homework_perfect, self.homework_perfect);
        bump(&mut student.materials_studied, self.materials_studied);
        bump(&mut student.study_time_minutes, self.study_time_minutes);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentSummary {
    pub id: i64,
    pub user_id: i64,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub level: i32,
    pub experience_points: i64,
    pub current_streak: i32,
    pub is_premium: bool,
}

impl From<StudentProfile> for StudentSummary {
    fn from(s: StudentProfile) -> Self {
        Self {
            id: s.id,
            user_id: s.user_id,
            display_name: s.display_name,
            avatar_url: s.avatar_url,
            level: s.level,
            experience_points: s.experience_points,
            current_streak: s.current_streak,
            is_premium: s.is_premium,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentAchievement {
    pub achievement_id: i64,
    pub name: String,
    pub rarity: AchievementRarity,
    pub earned_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AchievementOverview {
    pub total_available: u64,
    pub earned: u64,
    pub recent: Vec<RecentAchievement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningStatistics {
    pub total_lessons: i64,
    pub total_homework: i64,
    pub perfect_homework: i64,
    pub materials_studied: i64,
    pub study_time_hours: f64,
    pub current_streak: i32,
    pub best_streak: i32,
    pub level: i32,
    pub experience_points: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentDashboard {
    pub student: StudentProfile,
    pub level_info: LevelInfo,
    pub achievements: AchievementOverview,
    pub learning_statistics: LearningStatistics,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityOutcome {
    pub xp_earned: i64,
    pub level_up: Option<LevelUp>,
}

const RECENT_LIMIT: usize = 5;

/// Add `amount` XP and settle the level
///
/// Negative amounts reduce the spendable balance but never the lifetime total.
pub(crate) fn apply_experience(
    curve: &ExponentialCurve,
    student: &mut StudentProfile,
    amount: i64,
) -> Option<LevelUp> {
    let old_level = student.level;
    student.experience_points = student.experience_points.saturating_add(amount);
    student.total_xp_earned = student.total_xp_earned.saturating_add(amount.max(0));
    student.level = curve.settle(student.level, student.experience_points);
    student.last_activity_date = Some(Utc::now());

    (student.level > old_level).then(|| LevelUp {
        old_level,
        new_level: student.level,
        xp_gained: amount,
        achievements_unlocked: ((old_level + 1)..=student.level)
            .map(|level| format!("Reached level {}", level))
            .collect(),
        rewards: LevelRewards {
            level_bonus_xp: (student.level - old_level) as i64 * LEVEL_BONUS_XP,
        },
    })
}

/// Student profile service
pub struct StudentService {
    persistence: Arc<dyn PersistenceService>,
    curve: ExponentialCurve,
}

impl StudentService {
    pub fn new(persistence: Arc<dyn PersistenceService>, curve: ExponentialCurve) -> Self {
        Self { persistence, curve }
    }

    pub fn curve(&self) -> &ExponentialCurve {
        &self.curve
    }

    pub async fn create_student(&self, draft: &NewStudent) -> anyhow::Result<StudentProfile> {
        let student = self.persistence.student_create(draft).await?;
        info!(student_id = student.id, user_id = student.user_id, "Student profile created");
        Ok(student)
    }

    pub async fn get_student(&self, student_id: i64) -> anyhow::Result<Option<StudentProfile>> {
        self.persistence.student_find_by_id(student_id).await
    }

    pub async fn get_student_by_user_id(
        &self,
        user_id: i64,
    ) -> anyhow::Result<Option<StudentProfile>> {
        self.persistence.student_find_by_user_id(user_id).await
    }

    async fn require(&self, student_id: i64) -> anyhow::Result<StudentProfile> {
        self.persistence
            .student_find_by_id(student_id)
            .await?
            .ok_or_else(|| RepitError::StudentNotExist(student_id).into())
    }

    pub async fn update_student(
        &self,
        student_id: i64,
        patch: &StudentPatch,
    ) -> anyhow::Result<Option<StudentProfile>> {
        let Some(mut student) = self.persistence.student_find_by_id(student_id).await? else {
            return Ok(None);
        };
        patch.apply(&mut student);
        Ok(Some(self.persistence.student_save(&student).await?))
    }

    pub async fn delete_student(&self, student_id: i64) -> anyhow::Result<bool> {
        let deleted = self.persistence.student_delete(student_id).await?;
        if deleted {
            info!(student_id, "Student profile deleted");
        }
        Ok(deleted)
    }

    pub async fn search_students(
        &self,
        filters: &StudentSearchFilters,
        limit: u64,
        offset: u64,
    ) -> anyhow::Result<Page<StudentSummary>> {
        let limit = limit.clamp(1, MAX_PAGE_SIZE);
        let page = self
            .persistence
            .student_search(filters, limit, offset)
            .await?;
        Ok(page.map(StudentSummary::from))
    }

    /// Grant experience; `None` when the level did not change
    pub async fn add_experience(
        &self,
        student_id: i64,
        grant: &XpGrant,
    ) -> anyhow::Result<Option<LevelUp>> {
        let mut student = self.require(student_id).await?;
        let level_up = apply_experience(&self.curve, &mut student, grant.amount);
        self.persistence.student_save(&student).await?;

        if grant.amount > 0 {
            metrics::counter!("repit_xp_awarded_total", "source" => "student")
                .increment(grant.amount as u64);
        }
        debug!(
            student_id,
            amount = grant.amount,
            reason = grant.reason.as_deref().unwrap_or(""),
            category = grant.category.as_deref().unwrap_or(""),
            "Experience added"
        );
        if let Some(up) = &level_up {
            metrics::counter!("repit_level_ups_total").increment(1);
            info!(
                student_id,
                old_level = up.old_level,
                new_level = up.new_level,
                "Student leveled up"
            );
        }
        Ok(level_up)
    }

    /// Re-evaluate the level without granting XP
    pub async fn trigger_level_check(&self, student_id: i64) -> anyhow::Result<Option<LevelUp>> {
        self.add_experience(student_id, &XpGrant::new(0, "Level check", "system"))
            .await
    }

    pub async fn level_info(&self, student_id: i64) -> anyhow::Result<Option<LevelInfo>> {
        Ok(self
            .get_student(student_id)
            .await?
            .map(|s| self.curve.level_info(s.level, s.experience_points)))
    }

    /// Add counter deltas and advance the daily streak; `false` if missing
    pub async fn update_student_stats(
        &self,
        student_id: i64,
        delta: &StatsDelta,
    ) -> anyhow::Result<bool> {
        let Some(mut student) = self.persistence.student_find_by_id(student_id).await? else {
            return Ok(false);
        };

        delta.apply(&mut student);
        match delta.last_activity_date {
            Some(at) => student.last_activity_date = Some(at),
            None => {
                let now = Utc::now();
                let (current, best) = advance_daily_streak(
                    student.current_streak,
                    student.best_streak,
                    student.last_activity_date,
                    now.date_naive(),
                );
                student.current_streak = current;
                student.best_streak = best;
                student.last_activity_date = Some(now);
            }
        }

        self.persistence.student_save(&student).await?;
        Ok(true)
    }

    pub async fn get_dashboard(&self, student_id: i64) -> anyhow::Result<Option<StudentDashboard>> {
        let Some(student) = self.persistence.student_find_by_id(student_id).await? else {
            return Ok(None);
        };

        let visible = AchievementFilters {
            is_active: Some(true),
            is_hidden: Some(false),
            ..Default::default()
        };
        let total_available = self.persistence.achievement_find(&visible).await?.len() as u64;
        let earned = self
            .persistence
            .student_achievement_find_by_student(student_id)
            .await?;

        let mut recent = Vec::with_capacity(RECENT_LIMIT);
        for sa in earned.iter().take(RECENT_LIMIT) {
            if let Some(a) = self
                .persistence
                .achievement_find_by_id(sa.achievement_id)
                .await?
            {
                recent.push(RecentAchievement {
                    achievement_id: a.id,
                    name: a.name,
                    rarity: a.rarity,
                    earned_at: sa.earned_at,
                });
            }
        }

        let learning_statistics = LearningStatistics {
            total_lessons: student.lessons_completed,
            total_homework: student.homework_submitted,
            perfect_homework: student.homework_perfect,
            materials_studied: student.materials_studied,
            study_time_hours: (student.study_time_minutes as f64 / 60.0 * 10.0).round() / 10.0,
            current_streak: student.current_streak,
            best_streak: student.best_streak,
            level: student.level,
            experience_points: student.experience_points,
        };

        Ok(Some(StudentDashboard {
            level_info: self
                .curve
                .level_info(student.level, student.experience_points),
            achievements: AchievementOverview {
                total_available,
                earned: earned.len() as u64,
                recent,
            },
            learning_statistics,
            student,
        }))
    }

    /// Lesson completed: count it and grant the lesson XP
    pub async fn on_lesson_completed(&self, student_id: i64) -> anyhow::Result<ActivityOutcome> {
        let delta = StatsDelta {
            lessons_completed: Some(1),
            ..Default::default()
        };
        if !self.update_student_stats(student_id, &delta).await? {
            return Err(RepitError::StudentNotExist(student_id).into());
        }

        let level_up = self
            .add_experience(
                student_id,
                &XpGrant::new(LESSON_EVENT_XP, "Lesson completed", "lesson"),
            )
            .await?;
        Ok(ActivityOutcome {
            xp_earned: LESSON_EVENT_XP,
            level_up,
        })
    }

    /// Homework submitted: count it, flag perfect scores and grant XP
    pub async fn on_homework_submitted(
        &self,
        student_id: i64,
        score: Option<f64>,
    ) -> anyhow::Result<ActivityOutcome> {
        let delta = StatsDelta {
            homework_submitted: Some(1),
            homework_perfect: is_perfect(score).then_some(1),
            ..Default::default()
        };
        if !self.update_student_stats(student_id, &delta).await? {
            return Err(RepitError::StudentNotExist(student_id).into());
        }

        let xp = homework_event_xp(score);
        let level_up = self
            .add_experience(
                student_id,
                &XpGrant::new(xp, "Homework submitted", "homework"),
            )
            .await?;
        Ok(ActivityOutcome {
            xp_earned: xp,
            level_up,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use repit_persistence::EmbeddedPersistService;

    fn service() -> StudentService {
        StudentService::new(
            Arc::new(EmbeddedPersistService::new()),
            ExponentialCurve::default(),
        )
    }

    async fn create(svc: &StudentService, user_id: i64) -> StudentProfile {
        svc.create_student(&NewStudent {
            user_id,
            display_name: Some("Student".to_string()),
            ..Default::default()
        })
        .await
        .unwrap()
    }

    #[test]
    fn test_apply_experience_levels_up_repeatedly() {
        let curve = ExponentialCurve::default();
        let draft = NewStudent {
            user_id: 1,
            ..Default::default()
        };
        let mut student = StudentProfile::new(1, &draft, Utc::now());

        let up = apply_experience(&curve, &mut student, 2600).unwrap();
        assert_eq!(up.old_level, 1);
        assert_eq!(up.new_level, 3);
        assert_eq!(
            up.achievements_unlocked,
            vec!["Reached level 2", "Reached level 3"]
        );
        assert_eq!(up.rewards.level_bonus_xp, 100);
        assert_eq!(student.total_xp_earned, 2600);
    }

    #[test]
    fn test_apply_negative_experience_keeps_lifetime_total() {
        let curve = ExponentialCurve::default();
        let draft = NewStudent::default();
        let mut student = StudentProfile::new(1, &draft, Utc::now());
        student.experience_points = 300;
        student.total_xp_earned = 300;

        assert!(apply_experience(&curve, &mut student, -100).is_none());
        assert_eq!(student.experience_points, 200);
        assert_eq!(student.total_xp_earned, 300);
        assert_eq!(student.level, 1);
    }

    #[tokio::test]
    async fn test_add_experience_persists() {
        let svc = service();
        let s = create(&svc, 1).await;

        let none = svc
            .add_experience(s.id, &XpGrant::new(999, "test", "test"))
            .await
            .unwrap();
        assert!(none.is_none());

        let up = svc
            .add_experience(s.id, &XpGrant::new(1, "test", "test"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(up.new_level, 2);

        let stored = svc.get_student(s.id).await.unwrap().unwrap();
        assert_eq!(stored.level, 2);
        assert_eq!(stored.experience_points, 1000);
        assert!(stored.last_activity_date.is_some());
    }

    #[tokio::test]
    async fn test_add_experience_missing_student() {
        let svc = service();
        let err = svc
            .add_experience(404, &XpGrant::new(10, "x", "y"))
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RepitError>(),
            Some(RepitError::StudentNotExist(404))
        ));
    }

    #[tokio::test]
    async fn test_update_stats_and_streak() {
        let svc = service();
        let s = create(&svc, 1).await;

        let delta = StatsDelta {
            lessons_completed: Some(2),
            study_time_minutes: Some(90),
            ..Default::default()
        };
        assert!(svc.update_student_stats(s.id, &delta).await.unwrap());
        let stored = svc.get_student(s.id).await.unwrap().unwrap();
        assert_eq!(stored.lessons_completed, 2);
        assert_eq!(stored.study_time_minutes, 90);
        assert_eq!(stored.current_streak, 1);

        // second activity on the same day keeps the streak
        assert!(svc.update_student_stats(s.id, &delta).await.unwrap());
        let stored = svc.get_student(s.id).await.unwrap().unwrap();
        assert_eq!(stored.current_streak, 1);
        assert_eq!(stored.lessons_completed, 4);

        assert!(!svc.update_student_stats(999, &delta).await.unwrap());
    }

    #[tokio::test]
    async fn test_stats_counters_stay_in_range() {
        let svc = service();
        let s = create(&svc, 1).await;

        let negative = StatsDelta {
            lessons_completed: Some(-5),
            ..Default::default()
        };
        svc.update_student_stats(s.id, &negative).await.unwrap();
        let stored = svc.get_student(s.id).await.unwrap().unwrap();
        assert_eq!(stored.lessons_completed, 0);

        let huge = StatsDelta {
            study_time_minutes: Some(i64::MAX),
            ..Default::default()
        };
        svc.update_student_stats(s.id, &huge).await.unwrap();
        svc.update_student_stats(s.id, &huge).await.unwrap();
        let stored = svc.get_student(s.id).await.unwrap().unwrap();
        assert_eq!(stored.study_time_minutes, i64::MAX);
    }

    #[tokio::test]
    async fn test_explicit_activity_date_skips_streak() {
        let svc = service();
        let s = create(&svc, 1).await;
        let yesterday = Utc::now() - Duration::days(1);

        let delta = StatsDelta {
            last_activity_date: Some(yesterday),
            ..Default::default()
        };
        svc.update_student_stats(s.id, &delta).await.unwrap();
        let stored = svc.get_student(s.id).await.unwrap().unwrap();
        assert_eq!(stored.current_streak, 0);
        assert_eq!(stored.last_activity_date, Some(yesterday));
    }

    #[tokio::test]
    async fn test_homework_event() {
        let svc = service();
        let s = create(&svc, 1).await;

        let outcome = svc.on_homework_submitted(s.id, Some(95.0)).await.unwrap();
        assert_eq!(outcome.xp_earned, 150);
        assert!(outcome.level_up.is_none());

        let outcome = svc.on_homework_submitted(s.id, Some(60.0)).await.unwrap();
        assert_eq!(outcome.xp_earned, 50);

        let stored = svc.get_student(s.id).await.unwrap().unwrap();
        assert_eq!(stored.homework_submitted, 2);
        assert_eq!(stored.homework_perfect, 1);
        assert_eq!(stored.experience_points, 200);
    }

    #[tokio::test]
    async fn test_lesson_events_reach_level_two() {
        let svc = service();
        let s = create(&svc, 1).await;

        for _ in 0..9 {
            let outcome = svc.on_lesson_completed(s.id).await.unwrap();
            assert!(outcome.level_up.is_none());
        }
        let outcome = svc.on_lesson_completed(s.id).await.unwrap();
        assert_eq!(outcome.level_up.unwrap().new_level, 2);

        assert!(svc.on_lesson_completed(999).await.is_err());
    }

    #[tokio::test]
    async fn test_dashboard() {
        let svc = service();
        let s = create(&svc, 1).await;
        svc.update_student_stats(
            s.id,
            &StatsDelta {
                study_time_minutes: Some(125),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let dashboard = svc.get_dashboard(s.id).await.unwrap().unwrap();
        assert_eq!(dashboard.learning_statistics.study_time_hours, 2.1);
        assert_eq!(dashboard.achievements.earned, 0);
        assert_eq!(dashboard.level_info.xp_for_next_level, 1000);

        assert!(svc.get_dashboard(999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_search_clamps_limit() {
        let svc = service();
        for user_id in 0..3 {
            create(&svc, user_id).await;
        }
        let page = svc
            .search_students(&StudentSearchFilters::default(), 1000, 0)
            .await
            .unwrap();
        assert_eq!(page.page_items.len(), 3);
        assert_eq!(page.total_count, 3);
    }
}
