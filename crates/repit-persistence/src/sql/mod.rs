//! SQL-based persistence backend (MySQL/PostgreSQL via SeaORM)
//!
//! Implements the persistence traits with direct SeaORM queries. Enum columns
//! are stored as their wire names, map-like columns as JSON.

use std::collections::HashMap;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    prelude::Expr,
    sea_query::{Alias, Func, OnConflict, SimpleExpr},
    *,
};

use repit_common::{RepitError, StreakKind, XpAction};

use crate::entity::{
    achievements, badges, challenge_participations, challenges, learning_goals, lesson_records,
    streak_records, student_achievements, student_badges, students, study_sessions,
    xp_transactions,
};
use crate::model::*;
use crate::traits::*;

/// Per-student XP sums since `since`, aggregated in the database
///
/// SUM over BIGINT yields DECIMAL/NUMERIC, so the total is cast back to a
/// 64-bit integer.
fn xp_totals_query(backend: DbBackend, since: DateTime<Utc>) -> Select<xp_transactions::Entity> {
    let integer = match backend {
        DbBackend::MySql => "SIGNED",
        _ => "BIGINT",
    };
    xp_transactions::Entity::find()
        .select_only()
        .column(xp_transactions::Column::StudentId)
        .column_as(
            SimpleExpr::from(Func::cast_as(
                Expr::col((xp_transactions::Entity, xp_transactions::Column::Amount)).sum(),
                Alias::new(integer),
            )),
            "total",
        )
        .filter(xp_transactions::Column::CreatedAt.gte(since))
        .group_by(xp_transactions::Column::StudentId)
}

/// External database persistence service
///
/// Wraps a SeaORM `DatabaseConnection` and implements all persistence traits
/// by direct database queries.
pub struct ExternalDbPersistService {
    db: DatabaseConnection,
}

impl ExternalDbPersistService {
    /// Create a new ExternalDbPersistService with the given database connection
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Get a reference to the underlying database connection
    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}

fn parse_enum<T: FromStr<Err = String>>(value: &str) -> anyhow::Result<T> {
    T::from_str(value).map_err(|e| anyhow::anyhow!(e))
}

fn json_strings(value: serde_json::Value) -> Vec<String> {
    serde_json::from_value(value).unwrap_or_default()
}

// ============================================================================
// Row conversions
// ============================================================================

impl From<students::Model> for StudentProfile {
    fn from(m: students::Model) -> Self {
        Self {
            id: m.id,
            user_id: m.user_id,
            display_name: m.display_name,
            bio: m.bio,
            avatar_url: m.avatar_url,
            level: m.level,
            experience_points: m.experience_points,
            total_xp_earned: m.total_xp_earned,
            lessons_completed: m.lessons_completed,
            homework_submitted: m.homework_submitted,
            homework_perfect: m.homework_perfect,
            materials_studied: m.materials_studied,
            study_time_minutes: m.study_time_minutes,
            current_streak: m.current_streak,
            best_streak: m.best_streak,
            last_activity_date: m.last_activity_date,
            is_active: m.is_active,
            is_premium: m.is_premium,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

impl TryFrom<achievements::Model> for Achievement {
    type Error = anyhow::Error;

    fn try_from(m: achievements::Model) -> anyhow::Result<Self> {
        Ok(Self {
            id: m.id,
            name: m.name,
            description: m.description,
            icon_url: m.icon_url,
            badge_url: m.badge_url,
            achievement_type: parse_enum(&m.achievement_type)?,
            rarity: parse_enum(&m.rarity)?,
            xp_reward: m.xp_reward,
            criteria: serde_json::from_value(m.criteria)?,
            is_active: m.is_active,
            is_hidden: m.is_hidden,
            is_repeatable: m.is_repeatable,
            sort_order: m.sort_order,
            created_at: m.created_at,
            updated_at: m.updated_at,
        })
    }
}

impl From<student_achievements::Model> for StudentAchievement {
    fn from(m: student_achievements::Model) -> Self {
        Self {
            id: m.id,
            student_id: m.student_id,
            achievement_id: m.achievement_id,
            earned_at: m.earned_at,
            progress_data: m.progress_data,
            is_showcased: m.is_showcased,
        }
    }
}

impl TryFrom<badges::Model> for Badge {
    type Error = anyhow::Error;

    fn try_from(m: badges::Model) -> anyhow::Result<Self> {
        Ok(Self {
            id: m.id,
            code: m.code,
            name: m.name,
            description: m.description,
            icon: m.icon,
            rarity: parse_enum(&m.rarity)?,
            category: m.category,
            created_at: m.created_at,
        })
    }
}

impl From<student_badges::Model> for StudentBadge {
    fn from(m: student_badges::Model) -> Self {
        Self {
            id: m.id,
            student_id: m.student_id,
            badge_id: m.badge_id,
            earned_at: m.earned_at,
            reason: m.reason,
        }
    }
}

impl TryFrom<xp_transactions::Model> for XpTransaction {
    type Error = anyhow::Error;

    fn try_from(m: xp_transactions::Model) -> anyhow::Result<Self> {
        Ok(Self {
            id: m.id,
            student_id: m.student_id,
            action: parse_enum(&m.action)?,
            amount: m.amount,
            lesson_id: m.lesson_id,
            homework_id: m.homework_id,
            description: m.description,
            created_at: m.created_at,
        })
    }
}

impl From<challenges::Model> for Challenge {
    fn from(m: challenges::Model) -> Self {
        Self {
            id: m.id,
            title: m.title,
            description: m.description,
            challenge_type: m.challenge_type,
            target_metric: m.target_metric,
            target_value: m.target_value,
            xp_reward: m.xp_reward,
            start_date: m.start_date,
            end_date: m.end_date,
            is_active: m.is_active,
            max_participants: m.max_participants,
            created_at: m.created_at,
        }
    }
}

impl From<challenge_participations::Model> for ChallengeParticipation {
    fn from(m: challenge_participations::Model) -> Self {
        Self {
            id: m.id,
            challenge_id: m.challenge_id,
            student_id: m.student_id,
            current_value: m.current_value,
            is_completed: m.is_completed,
            completed_at: m.completed_at,
            reward_claimed: m.reward_claimed,
            joined_at: m.joined_at,
        }
    }
}

impl From<learning_goals::Model> for LearningGoal {
    fn from(m: learning_goals::Model) -> Self {
        Self {
            id: m.id,
            student_id: m.student_id,
            title: m.title,
            description: m.description,
            category: m.category,
            target_value: m.target_value,
            current_value: m.current_value,
            unit: m.unit,
            target_date: m.target_date,
            is_completed: m.is_completed,
            is_active: m.is_active,
            is_public: m.is_public,
            reminder_enabled: m.reminder_enabled,
            created_at: m.created_at,
            completed_at: m.completed_at,
        }
    }
}

impl From<study_sessions::Model> for StudySession {
    fn from(m: study_sessions::Model) -> Self {
        Self {
            id: m.id,
            student_id: m.student_id,
            subject: m.subject,
            activity_type: m.activity_type,
            activity_id: m.activity_id,
            started_at: m.started_at,
            ended_at: m.ended_at,
            duration_minutes: m.duration_minutes,
            focus_score: m.focus_score,
            productivity_score: m.productivity_score,
            satisfaction_score: m.satisfaction_score,
            notes: m.notes,
        }
    }
}

impl TryFrom<lesson_records::Model> for LessonRecord {
    type Error = anyhow::Error;

    fn try_from(m: lesson_records::Model) -> anyhow::Result<Self> {
        Ok(Self {
            id: m.id,
            lesson_id: m.lesson_id,
            tutor_id: m.tutor_id,
            student_id: m.student_id,
            date: m.date,
            subject: m.subject,
            duration_minutes: m.duration_minutes,
            planned_duration: m.planned_duration,
            status: parse_enum(&m.status)?,
            attendance_status: parse_enum(&m.attendance_status)?,
            completion_rate: m.completion_rate,
            tutor_rating: m.tutor_rating,
            student_rating: m.student_rating,
            parent_rating: m.parent_rating,
            difficulty_rating: m.difficulty_rating,
            engagement_score: m.engagement_score,
            punctuality_score: m.punctuality_score,
            student_questions: m.student_questions,
            was_rescheduled: m.was_rescheduled,
            technical_issues: json_strings(m.technical_issues),
            learning_objectives_met: json_strings(m.learning_objectives_met),
            topics_covered: json_strings(m.topics_covered),
            homework_completion_previous: m.homework_completion_previous,
        })
    }
}

// ============================================================================
// PersistenceService implementation
// ============================================================================

#[async_trait]
impl PersistenceService for ExternalDbPersistService {
    fn storage_mode(&self) -> StorageMode {
        StorageMode::ExternalDb
    }

    async fn health_check(&self) -> anyhow::Result<()> {
        students::Entity::find()
            .select_only()
            .column_as(Expr::cust("1"), "health")
            .into_tuple::<i32>()
            .one(&self.db)
            .await?;
        Ok(())
    }
}

// ============================================================================
// StudentPersistence implementation
// ============================================================================

#[async_trait]
impl StudentPersistence for ExternalDbPersistService {
    async fn student_create(&self, draft: &NewStudent) -> anyhow::Result<StudentProfile> {
        if self.student_find_by_user_id(draft.user_id).await?.is_some() {
            return Err(RepitError::StudentAlreadyExist(draft.user_id).into());
        }

        let now = Utc::now();
        let entity = students::ActiveModel {
            user_id: Set(draft.user_id),
            display_name: Set(draft.display_name.clone()),
            bio: Set(draft.bio.clone()),
            avatar_url: Set(draft.avatar_url.clone()),
            level: Set(1),
            experience_points: Set(0),
            total_xp_earned: Set(0),
            lessons_completed: Set(0),
            homework_submitted: Set(0),
            homework_perfect: Set(0),
            materials_studied: Set(0),
            study_time_minutes: Set(0),
            current_streak: Set(0),
            best_streak: Set(0),
            last_activity_date: Set(None),
            is_active: Set(true),
            is_premium: Set(draft.is_premium),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        Ok(entity.insert(&self.db).await?.into())
    }

    async fn student_find_by_id(&self, id: i64) -> anyhow::Result<Option<StudentProfile>> {
        Ok(students::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .map(Into::into))
    }

    async fn student_find_by_user_id(
        &self,
        user_id: i64,
    ) -> anyhow::Result<Option<StudentProfile>> {
        Ok(students::Entity::find()
            .filter(students::Column::UserId.eq(user_id))
            .one(&self.db)
            .await?
            .map(Into::into))
    }

    async fn student_save(&self, student: &StudentProfile) -> anyhow::Result<StudentProfile> {
        let entity = students::ActiveModel {
            id: Unchanged(student.id),
            user_id: Set(student.user_id),
            display_name: Set(student.display_name.clone()),
            bio: Set(student.bio.clone()),
            avatar_url: Set(student.avatar_url.clone()),
            level: Set(student.level),
            experience_points: Set(student.experience_points),
            total_xp_earned: Set(student.total_xp_earned),
            lessons_completed: Set(student.lessons_completed),
            homework_submitted: Set(student.homework_submitted),
            homework_perfect: Set(student.homework_perfect),
            materials_studied: Set(student.materials_studied),
            study_time_minutes: Set(student.study_time_minutes),
            current_streak: Set(student.current_streak),
            best_streak: Set(student.best_streak),
            last_activity_date: Set(student.last_activity_date),
            is_active: Set(student.is_active),
            is_premium: Set(student.is_premium),
            created_at: Unchanged(student.created_at),
            updated_at: Set(Utc::now()),
        };

        match entity.update(&self.db).await {
            Ok(model) => Ok(model.into()),
            Err(DbErr::RecordNotUpdated) => Err(RepitError::StudentNotExist(student.id).into()),
            Err(e) => Err(e.into()),
        }
    }

    async fn student_delete(&self, id: i64) -> anyhow::Result<bool> {
        let txn = self.db.begin().await?;

        student_achievements::Entity::delete_many()
            .filter(student_achievements::Column::StudentId.eq(id))
            .exec(&txn)
            .await?;
        student_badges::Entity::delete_many()
            .filter(student_badges::Column::StudentId.eq(id))
            .exec(&txn)
            .await?;
        xp_transactions::Entity::delete_many()
            .filter(xp_transactions::Column::StudentId.eq(id))
            .exec(&txn)
            .await?;
        streak_records::Entity::delete_many()
            .filter(streak_records::Column::StudentId.eq(id))
            .exec(&txn)
            .await?;
        challenge_participations::Entity::delete_many()
            .filter(challenge_participations::Column::StudentId.eq(id))
            .exec(&txn)
            .await?;
        learning_goals::Entity::delete_many()
            .filter(learning_goals::Column::StudentId.eq(id))
            .exec(&txn)
            .await?;
        study_sessions::Entity::delete_many()
            .filter(study_sessions::Column::StudentId.eq(id))
            .exec(&txn)
            .await?;
        let result = students::Entity::delete_by_id(id).exec(&txn).await?;

        txn.commit().await?;
        Ok(result.rows_affected > 0)
    }

    async fn student_search(
        &self,
        filters: &StudentSearchFilters,
        limit: u64,
        offset: u64,
    ) -> anyhow::Result<Page<StudentProfile>> {
        let query = students::Entity::find()
            .apply_if(filters.level_min, |q, v| {
                q.filter(students::Column::Level.gte(v))
            })
            .apply_if(filters.level_max, |q, v| {
                q.filter(students::Column::Level.lte(v))
            })
            .apply_if(filters.is_premium, |q, v| {
                q.filter(students::Column::IsPremium.eq(v))
            })
            .apply_if(filters.is_active, |q, v| {
                q.filter(students::Column::IsActive.eq(v))
            })
            .apply_if(filters.has_streak, |q, v| {
                if v {
                    q.filter(students::Column::CurrentStreak.gt(0))
                } else {
                    q.filter(students::Column::CurrentStreak.eq(0))
                }
            });

        let total = query.clone().count(&self.db).await?;
        let items = query
            .order_by_desc(students::Column::Level)
            .order_by_asc(students::Column::Id)
            .offset(offset)
            .limit(limit)
            .all(&self.db)
            .await?
            .into_iter()
            .map(Into::into)
            .collect();

        Ok(Page::from_window(total, offset, limit, items))
    }

    async fn student_find_all(&self) -> anyhow::Result<Vec<StudentProfile>> {
        Ok(students::Entity::find()
            .order_by_asc(students::Column::Id)
            .all(&self.db)
            .await?
            .into_iter()
            .map(Into::into)
            .collect())
    }
}

// ============================================================================
// AchievementPersistence implementation
// ============================================================================

#[async_trait]
impl AchievementPersistence for ExternalDbPersistService {
    async fn achievement_create(&self, draft: &NewAchievement) -> anyhow::Result<Achievement> {
        let now = Utc::now();
        let entity = achievements::ActiveModel {
            name: Set(draft.name.clone()),
            description: Set(draft.description.clone()),
            icon_url: Set(draft.icon_url.clone()),
            badge_url: Set(draft.badge_url.clone()),
            achievement_type: Set(draft.achievement_type.as_str().to_string()),
            rarity: Set(draft.rarity.as_str().to_string()),
            xp_reward: Set(draft.xp_reward),
            criteria: Set(serde_json::to_value(&draft.criteria)?),
            is_active: Set(draft.is_active),
            is_hidden: Set(draft.is_hidden),
            is_repeatable: Set(draft.is_repeatable),
            sort_order: Set(draft.sort_order),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        entity.insert(&self.db).await?.try_into()
    }

    async fn achievement_find_by_id(&self, id: i64) -> anyhow::Result<Option<Achievement>> {
        achievements::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .map(TryInto::try_into)
            .transpose()
    }

    async fn achievement_find(
        &self,
        filters: &AchievementFilters,
    ) -> anyhow::Result<Vec<Achievement>> {
        achievements::Entity::find()
            .apply_if(filters.achievement_type, |q, v| {
                q.filter(achievements::Column::AchievementType.eq(v.as_str()))
            })
            .apply_if(filters.rarity, |q, v| {
                q.filter(achievements::Column::Rarity.eq(v.as_str()))
            })
            .apply_if(filters.is_active, |q, v| {
                q.filter(achievements::Column::IsActive.eq(v))
            })
            .apply_if(filters.is_hidden, |q, v| {
                q.filter(achievements::Column::IsHidden.eq(v))
            })
            .apply_if(filters.is_repeatable, |q, v| {
                q.filter(achievements::Column::IsRepeatable.eq(v))
            })
            .order_by_asc(achievements::Column::SortOrder)
            .order_by_asc(achievements::Column::Name)
            .all(&self.db)
            .await?
            .into_iter()
            .map(TryInto::try_into)
            .collect()
    }

    async fn achievement_save(&self, achievement: &Achievement) -> anyhow::Result<Achievement> {
        let entity = achievements::ActiveModel {
            id: Unchanged(achievement.id),
            name: Set(achievement.name.clone()),
            description: Set(achievement.description.clone()),
            icon_url: Set(achievement.icon_url.clone()),
            badge_url: Set(achievement.badge_url.clone()),
            achievement_type: Set(achievement.achievement_type.as_str().to_string()),
            rarity: Set(achievement.rarity.as_str().to_string()),
            xp_reward: Set(achievement.xp_reward),
            criteria: Set(serde_json::to_value(&achievement.criteria)?),
            is_active: Set(achievement.is_active),
            is_hidden: Set(achievement.is_hidden),
            is_repeatable: Set(achievement.is_repeatable),
            sort_order: Set(achievement.sort_order),
            created_at: Unchanged(achievement.created_at),
            updated_at: Set(Utc::now()),
        };

        match entity.update(&self.db).await {
            Ok(model) => model.try_into(),
            Err(DbErr::RecordNotUpdated) => {
                Err(RepitError::AchievementNotExist(achievement.id).into())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn achievement_delete(&self, id: i64) -> anyhow::Result<bool> {
        let txn = self.db.begin().await?;

        student_achievements::Entity::delete_many()
            .filter(student_achievements::Column::AchievementId.eq(id))
            .exec(&txn)
            .await?;
        let result = achievements::Entity::delete_by_id(id).exec(&txn).await?;

        txn.commit().await?;
        Ok(result.rows_affected > 0)
    }

    async fn achievement_count(&self) -> anyhow::Result<u64> {
        Ok(achievements::Entity::find().count(&self.db).await?)
    }

    async fn student_achievement_create(
        &self,
        student_id: i64,
        achievement_id: i64,
        progress_data: Option<serde_json::Value>,
    ) -> anyhow::Result<StudentAchievement> {
        let entity = student_achievements::ActiveModel {
            student_id: Set(student_id),
            achievement_id: Set(achievement_id),
            earned_at: Set(Utc::now()),
            progress_data: Set(progress_data),
            is_showcased: Set(false),
            ..Default::default()
        };

        Ok(entity.insert(&self.db).await?.into())
    }

    async fn student_achievement_find_by_student(
        &self,
        student_id: i64,
    ) -> anyhow::Result<Vec<StudentAchievement>> {
        Ok(student_achievements::Entity::find()
            .filter(student_achievements::Column::StudentId.eq(student_id))
            .order_by_desc(student_achievements::Column::EarnedAt)
            .order_by_desc(student_achievements::Column::Id)
            .all(&self.db)
            .await?
            .into_iter()
            .map(Into::into)
            .collect())
    }
}

// ============================================================================
// GamificationPersistence implementation
// ============================================================================

#[async_trait]
impl GamificationPersistence for ExternalDbPersistService {
    async fn xp_transaction_create(
        &self,
        draft: &NewXpTransaction,
    ) -> anyhow::Result<XpTransaction> {
        let entity = xp_transactions::ActiveModel {
            student_id: Set(draft.student_id),
            action: Set(draft.action.as_str().to_string()),
            amount: Set(draft.amount),
            lesson_id: Set(draft.lesson_id),
            homework_id: Set(draft.homework_id),
            description: Set(draft.description.clone()),
            created_at: Set(Utc::now()),
            ..Default::default()
        };

        entity.insert(&self.db).await?.try_into()
    }

    async fn xp_transaction_exists(
        &self,
        student_id: i64,
        action: XpAction,
        lesson_id: Option<i64>,
        homework_id: Option<i64>,
    ) -> anyhow::Result<bool> {
        let count = xp_transactions::Entity::find()
            .filter(xp_transactions::Column::StudentId.eq(student_id))
            .filter(xp_transactions::Column::Action.eq(action.as_str()))
            .apply_if(lesson_id, |q, v| {
                q.filter(xp_transactions::Column::LessonId.eq(v))
            })
            .apply_if(homework_id, |q, v| {
                q.filter(xp_transactions::Column::HomeworkId.eq(v))
            })
            .count(&self.db)
            .await?;
        Ok(count > 0)
    }

    async fn xp_transaction_find(
        &self,
        student_id: i64,
        since: Option<DateTime<Utc>>,
        actions: &[XpAction],
    ) -> anyhow::Result<Vec<XpTransaction>> {
        let action_names: Vec<&str> = actions.iter().map(|a| a.as_str()).collect();
        xp_transactions::Entity::find()
            .filter(xp_transactions::Column::StudentId.eq(student_id))
            .apply_if(since, |q, v| {
                q.filter(xp_transactions::Column::CreatedAt.gte(v))
            })
            .apply_if((!action_names.is_empty()).then_some(action_names), |q, v| {
                q.filter(xp_transactions::Column::Action.is_in(v))
            })
            .order_by_asc(xp_transactions::Column::CreatedAt)
            .order_by_asc(xp_transactions::Column::Id)
            .all(&self.db)
            .await?
            .into_iter()
            .map(TryInto::try_into)
            .collect()
    }

    async fn xp_transaction_totals_since(
        &self,
        since: DateTime<Utc>,
    ) -> anyhow::Result<HashMap<i64, i64>> {
        let rows: Vec<(i64, i64)> = xp_totals_query(self.db.get_database_backend(), since)
            .into_tuple()
            .all(&self.db)
            .await?;

        Ok(rows.into_iter().collect())
    }

    async fn badge_create(&self, draft: &NewBadge) -> anyhow::Result<Badge> {
        let entity = badges::ActiveModel {
            code: Set(draft.code.clone()),
            name: Set(draft.name.clone()),
            description: Set(draft.description.clone()),
            icon: Set(draft.icon.clone()),
            rarity: Set(draft.rarity.as_str().to_string()),
            category: Set(draft.category.clone()),
            created_at: Set(Utc::now()),
            ..Default::default()
        };

        entity.insert(&self.db).await?.try_into()
    }

    async fn badge_find_by_code(&self, code: &str) -> anyhow::Result<Option<Badge>> {
        badges::Entity::find()
            .filter(badges::Column::Code.eq(code))
            .one(&self.db)
            .await?
            .map(TryInto::try_into)
            .transpose()
    }

    async fn badge_find_all(&self) -> anyhow::Result<Vec<Badge>> {
        badges::Entity::find()
            .order_by_asc(badges::Column::Id)
            .all(&self.db)
            .await?
            .into_iter()
            .map(TryInto::try_into)
            .collect()
    }

    async fn student_badge_create(
        &self,
        student_id: i64,
        badge_id: i64,
        reason: Option<String>,
    ) -> anyhow::Result<StudentBadge> {
        let entity = student_badges::ActiveModel {
            student_id: Set(student_id),
            badge_id: Set(badge_id),
            earned_at: Set(Utc::now()),
            reason: Set(reason),
            ..Default::default()
        };

        Ok(entity.insert(&self.db).await?.into())
    }

    async fn student_badge_exists(&self, student_id: i64, badge_id: i64) -> anyhow::Result<bool> {
        let count = student_badges::Entity::find()
            .filter(student_badges::Column::StudentId.eq(student_id))
            .filter(student_badges::Column::BadgeId.eq(badge_id))
            .count(&self.db)
            .await?;
        Ok(count > 0)
    }

    async fn student_badge_find_by_student(
        &self,
        student_id: i64,
    ) -> anyhow::Result<Vec<StudentBadge>> {
        Ok(student_badges::Entity::find()
            .filter(student_badges::Column::StudentId.eq(student_id))
            .order_by_desc(student_badges::Column::EarnedAt)
            .order_by_desc(student_badges::Column::Id)
            .all(&self.db)
            .await?
            .into_iter()
            .map(Into::into)
            .collect())
    }

    async fn streak_find(
        &self,
        student_id: i64,
        kind: StreakKind,
    ) -> anyhow::Result<Option<StreakRecord>> {
        Ok(streak_records::Entity::find()
            .filter(streak_records::Column::StudentId.eq(student_id))
            .filter(streak_records::Column::Kind.eq(kind.as_str()))
            .one(&self.db)
            .await?
            .map(|m| StreakRecord {
                student_id: m.student_id,
                kind,
                current: m.current,
                best: m.best,
                updated_at: m.updated_at,
            }))
    }

    async fn streak_save(&self, record: &StreakRecord) -> anyhow::Result<()> {
        let entity = streak_records::ActiveModel {
            student_id: Set(record.student_id),
            kind: Set(record.kind.as_str().to_string()),
            current: Set(record.current),
            best: Set(record.best),
            updated_at: Set(record.updated_at),
        };

        streak_records::Entity::insert(entity)
            .on_conflict(
                OnConflict::columns([
                    streak_records::Column::StudentId,
                    streak_records::Column::Kind,
                ])
                .update_columns([
                    streak_records::Column::Current,
                    streak_records::Column::Best,
                    streak_records::Column::UpdatedAt,
                ])
                .to_owned(),
            )
            .exec(&self.db)
            .await?;
        Ok(())
    }

    async fn challenge_create(&self, draft: &NewChallenge) -> anyhow::Result<Challenge> {
        let entity = challenges::ActiveModel {
            title: Set(draft.title.clone()),
            description: Set(draft.description.clone()),
            challenge_type: Set(draft.challenge_type.clone()),
            target_metric: Set(draft.target_metric.clone()),
            target_value: Set(draft.target_value),
            xp_reward: Set(draft.xp_reward),
            start_date: Set(draft.start_date),
            end_date: Set(draft.end_date),
            is_active: Set(true),
            max_participants: Set(draft.max_participants),
            created_at: Set(Utc::now()),
            ..Default::default()
        };

        Ok(entity.insert(&self.db).await?.into())
    }

    async fn challenge_find_by_id(&self, id: i64) -> anyhow::Result<Option<Challenge>> {
        Ok(challenges::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .map(Into::into))
    }

    async fn challenge_find_active(&self) -> anyhow::Result<Vec<Challenge>> {
        Ok(challenges::Entity::find()
            .filter(challenges::Column::IsActive.eq(true))
            .order_by_asc(challenges::Column::EndDate)
            .all(&self.db)
            .await?
            .into_iter()
            .map(Into::into)
            .collect())
    }

    async fn participation_find(
        &self,
        challenge_id: i64,
        student_id: i64,
    ) -> anyhow::Result<Option<ChallengeParticipation>> {
        Ok(challenge_participations::Entity::find()
            .filter(challenge_participations::Column::ChallengeId.eq(challenge_id))
            .filter(challenge_participations::Column::StudentId.eq(student_id))
            .one(&self.db)
            .await?
            .map(Into::into))
    }

    async fn participation_count(&self, challenge_id: i64) -> anyhow::Result<u64> {
        Ok(challenge_participations::Entity::find()
            .filter(challenge_participations::Column::ChallengeId.eq(challenge_id))
            .count(&self.db)
            .await?)
    }

    async fn participation_create(
        &self,
        challenge_id: i64,
        student_id: i64,
    ) -> anyhow::Result<ChallengeParticipation> {
        let entity = challenge_participations::ActiveModel {
            challenge_id: Set(challenge_id),
            student_id: Set(student_id),
            current_value: Set(0),
            is_completed: Set(false),
            completed_at: Set(None),
            reward_claimed: Set(false),
            joined_at: Set(Utc::now()),
            ..Default::default()
        };

        Ok(entity.insert(&self.db).await?.into())
    }

    async fn participation_save(
        &self,
        participation: &ChallengeParticipation,
    ) -> anyhow::Result<ChallengeParticipation> {
        let entity = challenge_participations::ActiveModel {
            id: Unchanged(participation.id),
            challenge_id: Unchanged(participation.challenge_id),
            student_id: Unchanged(participation.student_id),
            current_value: Set(participation.current_value),
            is_completed: Set(participation.is_completed),
            completed_at: Set(participation.completed_at),
            reward_claimed: Set(participation.reward_claimed),
            joined_at: Unchanged(participation.joined_at),
        };

        Ok(entity.update(&self.db).await?.into())
    }
}

// ============================================================================
// LessonPersistence implementation
// ============================================================================

#[async_trait]
impl LessonPersistence for ExternalDbPersistService {
    async fn lesson_record_create(&self, draft: NewLessonRecord) -> anyhow::Result<LessonRecord> {
        let entity = lesson_records::ActiveModel {
            lesson_id: Set(draft.lesson_id),
            tutor_id: Set(draft.tutor_id),
            student_id: Set(draft.student_id),
            date: Set(draft.date),
            subject: Set(draft.subject),
            duration_minutes: Set(draft.duration_minutes),
            planned_duration: Set(draft.planned_duration),
            status: Set(draft.status.as_str().to_string()),
            attendance_status: Set(draft.attendance_status.as_str().to_string()),
            completion_rate: Set(draft.completion_rate.clamp(0.0, 1.0)),
            tutor_rating: Set(draft.tutor_rating),
            student_rating: Set(draft.student_rating),
            parent_rating: Set(draft.parent_rating),
            difficulty_rating: Set(draft.difficulty_rating),
            engagement_score: Set(draft.engagement_score),
            punctuality_score: Set(draft.punctuality_score),
            student_questions: Set(draft.student_questions),
            was_rescheduled: Set(draft.was_rescheduled),
            technical_issues: Set(serde_json::to_value(&draft.technical_issues)?),
            learning_objectives_met: Set(serde_json::to_value(&draft.learning_objectives_met)?),
            topics_covered: Set(serde_json::to_value(&draft.topics_covered)?),
            homework_completion_previous: Set(draft.homework_completion_previous),
            ..Default::default()
        };

        entity.insert(&self.db).await?.try_into()
    }

    async fn lesson_record_find(&self, query: &LessonQuery) -> anyhow::Result<Vec<LessonRecord>> {
        lesson_records::Entity::find()
            .apply_if(query.student_id, |q, v| {
                q.filter(lesson_records::Column::StudentId.eq(v))
            })
            .apply_if(query.tutor_id, |q, v| {
                q.filter(lesson_records::Column::TutorId.eq(v))
            })
            .apply_if(query.subject.clone(), |q, v| {
                q.filter(lesson_records::Column::Subject.eq(v))
            })
            .apply_if(query.start, |q, v| {
                q.filter(lesson_records::Column::Date.gte(v))
            })
            .apply_if(query.end, |q, v| {
                q.filter(lesson_records::Column::Date.lte(v))
            })
            .order_by_asc(lesson_records::Column::Date)
            .order_by_asc(lesson_records::Column::Id)
            .all(&self.db)
            .await?
            .into_iter()
            .map(TryInto::try_into)
            .collect()
    }
}

// ============================================================================
// ProgressPersistence implementation
// ============================================================================

#[async_trait]
impl ProgressPersistence for ExternalDbPersistService {
    async fn goal_create(
        &self,
        student_id: i64,
        draft: &NewLearningGoal,
    ) -> anyhow::Result<LearningGoal> {
        let entity = learning_goals::ActiveModel {
            student_id: Set(student_id),
            title: Set(draft.title.clone()),
            description: Set(draft.description.clone()),
            category: Set(draft.category.clone()),
            target_value: Set(draft.target_value),
            current_value: Set(0.0),
            unit: Set(draft.unit.clone()),
            target_date: Set(draft.target_date),
            is_completed: Set(false),
            is_active: Set(true),
            is_public: Set(draft.is_public),
            reminder_enabled: Set(draft.reminder_enabled),
            created_at: Set(Utc::now()),
            completed_at: Set(None),
            ..Default::default()
        };

        Ok(entity.insert(&self.db).await?.into())
    }

    async fn goal_find_by_id(&self, id: i64) -> anyhow::Result<Option<LearningGoal>> {
        Ok(learning_goals::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .map(Into::into))
    }

    async fn goal_find_by_student(
        &self,
        student_id: i64,
        active_only: bool,
    ) -> anyhow::Result<Vec<LearningGoal>> {
        Ok(learning_goals::Entity::find()
            .filter(learning_goals::Column::StudentId.eq(student_id))
            .apply_if(active_only.then_some(true), |q, v| {
                q.filter(learning_goals::Column::IsActive.eq(v))
            })
            .order_by_asc(learning_goals::Column::CreatedAt)
            .order_by_asc(learning_goals::Column::Id)
            .all(&self.db)
            .await?
            .into_iter()
            .map(Into::into)
            .collect())
    }

    async fn goal_save(&self, goal: &LearningGoal) -> anyhow::Result<LearningGoal> {
        let entity = learning_goals::ActiveModel {
            id: Unchanged(goal.id),
            student_id: Unchanged(goal.student_id),
            title: Set(goal.title.clone()),
            description: Set(goal.description.clone()),
            category: Set(goal.category.clone()),
            target_value: Set(goal.target_value),
            current_value: Set(goal.current_value),
            unit: Set(goal.unit.clone()),
            target_date: Set(goal.target_date),
            is_completed: Set(goal.is_completed),
            is_active: Set(goal.is_active),
            is_public: Set(goal.is_public),
            reminder_enabled: Set(goal.reminder_enabled),
            created_at: Unchanged(goal.created_at),
            completed_at: Set(goal.completed_at),
        };

        match entity.update(&self.db).await {
            Ok(model) => Ok(model.into()),
            Err(DbErr::RecordNotUpdated) => Err(RepitError::GoalNotExist(goal.id).into()),
            Err(e) => Err(e.into()),
        }
    }

    async fn study_session_create(
        &self,
        student_id: i64,
        draft: &NewStudySession,
    ) -> anyhow::Result<StudySession> {
        let entity = study_sessions::ActiveModel {
            student_id: Set(student_id),
            subject: Set(draft.subject.clone()),
            activity_type: Set(draft.activity_type.clone()),
            activity_id: Set(draft.activity_id.clone()),
            started_at: Set(draft.started_at),
            ended_at: Set(draft.ended_at),
            duration_minutes: Set(draft.resolved_duration()),
            focus_score: Set(draft.focus_score),
            productivity_score: Set(draft.productivity_score),
            satisfaction_score: Set(draft.satisfaction_score),
            notes: Set(draft.notes.clone()),
            ..Default::default()
        };

        Ok(entity.insert(&self.db).await?.into())
    }

    async fn study_session_find(
        &self,
        student_id: i64,
        since: Option<DateTime<Utc>>,
    ) -> anyhow::Result<Vec<StudySession>> {
        Ok(study_sessions::Entity::find()
            .filter(study_sessions::Column::StudentId.eq(student_id))
            .apply_if(since, |q, v| {
                q.filter(study_sessions::Column::StartedAt.gte(v))
            })
            .order_by_asc(study_sessions::Column::StartedAt)
            .order_by_asc(study_sessions::Column::Id)
            .all(&self.db)
            .await?
            .into_iter()
            .map(Into::into)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xp_totals_are_summed_in_the_database() {
        let since = Utc::now();
        let postgres = xp_totals_query(DbBackend::Postgres, since)
            .build(DbBackend::Postgres)
            .to_string();
        assert!(postgres.contains(r#"CAST(SUM("xp_transactions"."amount") AS BIGINT)"#));
        assert!(postgres.contains(r#"GROUP BY "xp_transactions"."student_id""#));

        let mysql = xp_totals_query(DbBackend::MySql, since)
            .build(DbBackend::MySql)
            .to_string();
        assert!(mysql.contains("CAST(SUM(`xp_transactions`.`amount`) AS SIGNED)"));
        assert!(mysql.contains("GROUP BY `xp_transactions`.`student_id`"));
    }
}
