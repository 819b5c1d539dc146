// Embedded persistence backend
// Keeps every table in process memory for single-node runs and tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;

use repit_common::{RepitError, StreakKind, XpAction};

use crate::model::*;
use crate::traits::*;

/// Monotonic id generator, starting at 1
#[derive(Debug, Default)]
struct Sequence(AtomicI64);

impl Sequence {
    fn next(&self) -> i64 {
        self.0.fetch_add(1, Ordering::Relaxed) + 1
    }
}

/// Standalone embedded persistence
///
/// Tables are `DashMap`s keyed by id. Operations that must check and insert
/// atomically (unique user id, unique badge code) serialize on `write_lock`.
#[derive(Default)]
pub struct EmbeddedPersistService {
    write_lock: Mutex<()>,

    students: DashMap<i64, StudentProfile>,
    student_seq: Sequence,

    achievements: DashMap<i64, Achievement>,
    achievement_seq: Sequence,
    student_achievements: DashMap<i64, StudentAchievement>,
    student_achievement_seq: Sequence,

    badges: DashMap<i64, Badge>,
    badge_seq: Sequence,
    student_badges: DashMap<i64, StudentBadge>,
    student_badge_seq: Sequence,

    xp_transactions: DashMap<i64, XpTransaction>,
    xp_seq: Sequence,

    streaks: DashMap<(i64, StreakKind), StreakRecord>,

    challenges: DashMap<i64, Challenge>,
    challenge_seq: Sequence,
    participations: DashMap<i64, ChallengeParticipation>,
    participation_seq: Sequence,

    lessons: DashMap<i64, LessonRecord>,
    lesson_seq: Sequence,

    goals: DashMap<i64, LearningGoal>,
    goal_seq: Sequence,
    sessions: DashMap<i64, StudySession>,
    session_seq: Sequence,
}

impl EmbeddedPersistService {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PersistenceService for EmbeddedPersistService {
    fn storage_mode(&self) -> StorageMode {
        StorageMode::Embedded
    }

    async fn health_check(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

// ============================================================================
// StudentPersistence implementation
// ============================================================================

#[async_trait]
impl StudentPersistence for EmbeddedPersistService {
    async fn student_create(&self, draft: &NewStudent) -> anyhow::Result<StudentProfile> {
        let _guard = self.write_lock.lock();
        if self.students.iter().any(|s| s.user_id == draft.user_id) {
            return Err(RepitError::StudentAlreadyExist(draft.user_id).into());
        }
        let student = StudentProfile::new(self.student_seq.next(), draft, Utc::now());
        self.students.insert(student.id, student.clone());
        Ok(student)
    }

    async fn student_find_by_id(&self, id: i64) -> anyhow::Result<Option<StudentProfile>> {
        Ok(self.students.get(&id).map(|s| s.clone()))
    }

    async fn student_find_by_user_id(
        &self,
        user_id: i64,
    ) -> anyhow::Result<Option<StudentProfile>> {
        Ok(self
            .students
            .iter()
            .find(|s| s.user_id == user_id)
            .map(|s| s.clone()))
    }

    async fn student_save(&self, student: &StudentProfile) -> anyhow::Result<StudentProfile> {
        let mut stored = student.clone();
        stored.updated_at = Utc::now();
        match self.students.get_mut(&student.id) {
            Some(mut entry) => {
                *entry = stored.clone();
                Ok(stored)
            }
            None => Err(RepitError::StudentNotExist(student.id).into()),
        }
    }

    async fn student_delete(&self, id: i64) -> anyhow::Result<bool> {
        let removed = self.students.remove(&id).is_some();
        if removed {
            self.student_achievements.retain(|_, sa| sa.student_id != id);
            self.student_badges.retain(|_, sb| sb.student_id != id);
            self.xp_transactions.retain(|_, tx| tx.student_id != id);
            self.streaks.retain(|(student_id, _), _| *student_id != id);
            self.participations.retain(|_, p| p.student_id != id);
            self.goals.retain(|_, g| g.student_id != id);
            self.sessions.retain(|_, s| s.student_id != id);
        }
        Ok(removed)
    }

    async fn student_search(
        &self,
        filters: &StudentSearchFilters,
        limit: u64,
        offset: u64,
    ) -> anyhow::Result<Page<StudentProfile>> {
        let mut matched: Vec<StudentProfile> = self
            .students
            .iter()
            .filter(|s| filters.matches(s))
            .map(|s| s.clone())
            .collect();
        matched.sort_by(|a, b| b.level.cmp(&a.level).then(a.id.cmp(&b.id)));

        let total = matched.len() as u64;
        let items = matched
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();
        Ok(Page::from_window(total, offset, limit, items))
    }

    async fn student_find_all(&self) -> anyhow::Result<Vec<StudentProfile>> {
        let mut all: Vec<StudentProfile> = self.students.iter().map(|s| s.clone()).collect();
        all.sort_by_key(|s| s.id);
        Ok(all)
    }
}

// ============================================================================
// AchievementPersistence implementation
// ============================================================================

#[async_trait]
impl AchievementPersistence for EmbeddedPersistService {
    async fn achievement_create(&self, draft: &NewAchievement) -> anyhow::Result<Achievement> {
        let now = Utc::now();
        let achievement = Achievement {
            id: self.achievement_seq.next(),
            name: draft.name.clone(),
            description: draft.description.clone(),
            icon_url: draft.icon_url.clone(),
            badge_url: draft.badge_url.clone(),
            achievement_type: draft.achievement_type,
            rarity: draft.rarity,
            xp_reward: draft.xp_reward,
            criteria: draft.criteria.clone(),
            is_active: draft.is_active,
            is_hidden: draft.is_hidden,
            is_repeatable: draft.is_repeatable,
            sort_order: draft.sort_order,
            created_at: now,
            updated_at: now,
        };
        self.achievements
            .insert(achievement.id, achievement.clone());
        Ok(achievement)
    }

    async fn achievement_find_by_id(&self, id: i64) -> anyhow::Result<Option<Achievement>> {
        Ok(self.achievements.get(&id).map(|a| a.clone()))
    }

    async fn achievement_find(
        &self,
        filters: &AchievementFilters,
    ) -> anyhow::Result<Vec<Achievement>> {
        let mut matched: Vec<Achievement> = self
            .achievements
            .iter()
            .filter(|a| filters.matches(a))
            .map(|a| a.clone())
            .collect();
        matched.sort_by(|a, b| {
            a.sort_order
                .cmp(&b.sort_order)
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(matched)
    }

    async fn achievement_save(&self, achievement: &Achievement) -> anyhow::Result<Achievement> {
        let mut stored = achievement.clone();
        stored.updated_at = Utc::now();
        match self.achievements.get_mut(&achievement.id) {
            Some(mut entry) => {
                *entry = stored.clone();
                Ok(stored)
            }
            None => Err(RepitError::AchievementNotExist(achievement.id).into()),
        }
    }

    async fn achievement_delete(&self, id: i64) -> anyhow::Result<bool> {
        let removed = self.achievements.remove(&id).is_some();
        if removed {
            self.student_achievements
                .retain(|_, sa| sa.achievement_id != id);
        }
        Ok(removed)
    }

    async fn achievement_count(&self) -> anyhow::Result<u64> {
        Ok(self.achievements.len() as u64)
    }

    async fn student_achievement_create(
        &self,
        student_id: i64,
        achievement_id: i64,
        progress_data: Option<serde_json::Value>,
    ) -> anyhow::Result<StudentAchievement> {
        let earned = StudentAchievement {
            id: self.student_achievement_seq.next(),
            student_id,
            achievement_id,
            earned_at: Utc::now(),
            progress_data,
            is_showcased: false,
        };
        self.student_achievements.insert(earned.id, earned.clone());
        Ok(earned)
    }

    async fn student_achievement_find_by_student(
        &self,
        student_id: i64,
    ) -> anyhow::Result<Vec<StudentAchievement>> {
        let mut earned: Vec<StudentAchievement> = self
            .student_achievements
            .iter()
            .filter(|sa| sa.student_id == student_id)
            .map(|sa| sa.clone())
            .collect();
        earned.sort_by(|a, b| b.earned_at.cmp(&a.earned_at).then(b.id.cmp(&a.id)));
        Ok(earned)
    }
}

// ============================================================================
// GamificationPersistence implementation
// ============================================================================

#[async_trait]
impl GamificationPersistence for EmbeddedPersistService {
    async fn xp_transaction_create(
        &self,
        draft: &NewXpTransaction,
    ) -> anyhow::Result<XpTransaction> {
        let tx = XpTransaction {
            id: self.xp_seq.next(),
            student_id: draft.student_id,
            action: draft.action,
            amount: draft.amount,
            lesson_id: draft.lesson_id,
            homework_id: draft.homework_id,
            description: draft.description.clone(),
            created_at: Utc::now(),
        };
        self.xp_transactions.insert(tx.id, tx.clone());
        Ok(tx)
    }

    async fn xp_transaction_exists(
        &self,
        student_id: i64,
        action: XpAction,
        lesson_id: Option<i64>,
        homework_id: Option<i64>,
    ) -> anyhow::Result<bool> {
        Ok(self.xp_transactions.iter().any(|tx| {
            tx.student_id == student_id
                && tx.action == action
                && lesson_id.is_none_or(|id| tx.lesson_id == Some(id))
                && homework_id.is_none_or(|id| tx.homework_id == Some(id))
        }))
    }

    async fn xp_transaction_find(
        &self,
        student_id: i64,
        since: Option<DateTime<Utc>>,
        actions: &[XpAction],
    ) -> anyhow::Result<Vec<XpTransaction>> {
        let mut found: Vec<XpTransaction> = self
            .xp_transactions
            .iter()
            .filter(|tx| {
                tx.student_id == student_id
                    && since.is_none_or(|s| tx.created_at >= s)
                    && (actions.is_empty() || actions.contains(&tx.action))
            })
            .map(|tx| tx.clone())
            .collect();
        found.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(found)
    }

    async fn xp_transaction_totals_since(
        &self,
        since: DateTime<Utc>,
    ) -> anyhow::Result<HashMap<i64, i64>> {
        let mut totals = HashMap::new();
        for tx in self.xp_transactions.iter().filter(|tx| tx.created_at >= since) {
            *totals.entry(tx.student_id).or_insert(0) += tx.amount;
        }
        Ok(totals)
    }

    async fn badge_create(&self, draft: &NewBadge) -> anyhow::Result<Badge> {
        let _guard = self.write_lock.lock();
        if self.badges.iter().any(|b| b.code == draft.code) {
            anyhow::bail!("badge code '{}' already exists", draft.code);
        }
        let badge = Badge {
            id: self.badge_seq.next(),
            code: draft.code.clone(),
            name: draft.name.clone(),
            description: draft.description.clone(),
            icon: draft.icon.clone(),
            rarity: draft.rarity,
            category: draft.category.clone(),
            created_at: Utc::now(),
        };
        self.badges.insert(badge.id, badge.clone());
        Ok(badge)
    }

    async fn badge_find_by_code(&self, code: &str) -> anyhow::Result<Option<Badge>> {
        Ok(self
            .badges
            .iter()
            .find(|b| b.code == code)
            .map(|b| b.clone()))
    }

    async fn badge_find_all(&self) -> anyhow::Result<Vec<Badge>> {
        let mut all: Vec<Badge> = self.badges.iter().map(|b| b.clone()).collect();
        all.sort_by_key(|b| b.id);
        Ok(all)
    }

    async fn student_badge_create(
        &self,
        student_id: i64,
        badge_id: i64,
        reason: Option<String>,
    ) -> anyhow::Result<StudentBadge> {
        let earned = StudentBadge {
            id: self.student_badge_seq.next(),
            student_id,
            badge_id,
            earned_at: Utc::now(),
            reason,
        };
        self.student_badges.insert(earned.id, earned.clone());
        Ok(earned)
    }

    async fn student_badge_exists(&self, student_id: i64, badge_id: i64) -> anyhow::Result<bool> {
        Ok(self
            .student_badges
            .iter()
            .any(|sb| sb.student_id == student_id && sb.badge_id == badge_id))
    }

    async fn student_badge_find_by_student(
        &self,
        student_id: i64,
    ) -> anyhow::Result<Vec<StudentBadge>> {
        let mut earned: Vec<StudentBadge> = self
            .student_badges
            .iter()
            .filter(|sb| sb.student_id == student_id)
            .map(|sb| sb.clone())
            .collect();
        earned.sort_by(|a, b| b.earned_at.cmp(&a.earned_at).then(b.id.cmp(&a.id)));
        Ok(earned)
    }

    async fn streak_find(
        &self,
        student_id: i64,
        kind: StreakKind,
    ) -> anyhow::Result<Option<StreakRecord>> {
        Ok(self.streaks.get(&(student_id, kind)).map(|r| r.clone()))
    }

    async fn streak_save(&self, record: &StreakRecord) -> anyhow::Result<()> {
        self.streaks
            .insert((record.student_id, record.kind), record.clone());
        Ok(())
    }

    async fn challenge_create(&self, draft: &NewChallenge) -> anyhow::Result<Challenge> {
        let challenge = Challenge {
            id: self.challenge_seq.next(),
            title: draft.title.clone(),
            description: draft.description.clone(),
            challenge_type: draft.challenge_type.clone(),
            target_metric: draft.target_metric.clone(),
            target_value: draft.target_value,
            xp_reward: draft.xp_reward,
            start_date: draft.start_date,
            end_date: draft.end_date,
            is_active: true,
            max_participants: draft.max_participants,
            created_at: Utc::now(),
        };
        self.challenges.insert(challenge.id, challenge.clone());
        Ok(challenge)
    }

    async fn challenge_find_by_id(&self, id: i64) -> anyhow::Result<Option<Challenge>> {
        Ok(self.challenges.get(&id).map(|c| c.clone()))
    }

    async fn challenge_find_active(&self) -> anyhow::Result<Vec<Challenge>> {
        let mut active: Vec<Challenge> = self
            .challenges
            .iter()
            .filter(|c| c.is_active)
            .map(|c| c.clone())
            .collect();
        active.sort_by_key(|c| c.end_date);
        Ok(active)
    }

    async fn participation_find(
        &self,
        challenge_id: i64,
        student_id: i64,
    ) -> anyhow::Result<Option<ChallengeParticipation>> {
        Ok(self
            .participations
            .iter()
            .find(|p| p.challenge_id == challenge_id && p.student_id == student_id)
            .map(|p| p.clone()))
    }

    async fn participation_count(&self, challenge_id: i64) -> anyhow::Result<u64> {
        Ok(self
            .participations
            .iter()
            .filter(|p| p.challenge_id == challenge_id)
            .count() as u64)
    }

    async fn participation_create(
        &self,
        challenge_id: i64,
        student_id: i64,
    ) -> anyhow::Result<ChallengeParticipation> {
        let participation = ChallengeParticipation {
            id: self.participation_seq.next(),
            challenge_id,
            student_id,
            current_value: 0,
            is_completed: false,
            completed_at: None,
            reward_claimed: false,
            joined_at: Utc::now(),
        };
        self.participations
            .insert(participation.id, participation.clone());
        Ok(participation)
    }

    async fn participation_save(
        &self,
        participation: &ChallengeParticipation,
    ) -> anyhow::Result<ChallengeParticipation> {
        self.participations
            .insert(participation.id, participation.clone());
        Ok(participation.clone())
    }
}

// ============================================================================
// LessonPersistence implementation
// ============================================================================

#[async_trait]
impl LessonPersistence for EmbeddedPersistService {
    async fn lesson_record_create(&self, draft: NewLessonRecord) -> anyhow::Result<LessonRecord> {
        let record = LessonRecord::from_new(self.lesson_seq.next(), draft);
        self.lessons.insert(record.id, record.clone());
        Ok(record)
    }

    async fn lesson_record_find(&self, query: &LessonQuery) -> anyhow::Result<Vec<LessonRecord>> {
        let mut found: Vec<LessonRecord> = self
            .lessons
            .iter()
            .filter(|r| query.matches(r))
            .map(|r| r.clone())
            .collect();
        found.sort_by(|a, b| a.date.cmp(&b.date).then(a.id.cmp(&b.id)));
        Ok(found)
    }
}

// ============================================================================
// ProgressPersistence implementation
// ============================================================================

#[async_trait]
impl ProgressPersistence for EmbeddedPersistService {
    async fn goal_create(
        &self,
        student_id: i64,
        draft: &NewLearningGoal,
    ) -> anyhow::Result<LearningGoal> {
        let goal = LearningGoal::new(self.goal_seq.next(), student_id, draft, Utc::now());
        self.goals.insert(goal.id, goal.clone());
        Ok(goal)
    }

    async fn goal_find_by_id(&self, id: i64) -> anyhow::Result<Option<LearningGoal>> {
        Ok(self.goals.get(&id).map(|g| g.clone()))
    }

    async fn goal_find_by_student(
        &self,
        student_id: i64,
        active_only: bool,
    ) -> anyhow::Result<Vec<LearningGoal>> {
        let mut goals: Vec<LearningGoal> = self
            .goals
            .iter()
            .filter(|g| g.student_id == student_id && (!active_only || g.is_active))
            .map(|g| g.clone())
            .collect();
        goals.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(goals)
    }

    async fn goal_save(&self, goal: &LearningGoal) -> anyhow::Result<LearningGoal> {
        match self.goals.get_mut(&goal.id) {
            Some(mut entry) => {
                *entry = goal.clone();
                Ok(goal.clone())
            }
            None => Err(RepitError::GoalNotExist(goal.id).into()),
        }
    }

    async fn study_session_create(
        &self,
        student_id: i64,
        draft: &NewStudySession,
    ) -> anyhow::Result<StudySession> {
        let session = StudySession::new(self.session_seq.next(), student_id, draft);
        self.sessions.insert(session.id, session.clone());
        Ok(session)
    }

    async fn study_session_find(
        &self,
        student_id: i64,
        since: Option<DateTime<Utc>>,
    ) -> anyhow::Result<Vec<StudySession>> {
        let mut found: Vec<StudySession> = self
            .sessions
            .iter()
            .filter(|s| s.student_id == student_id && since.is_none_or(|t| s.started_at >= t))
            .map(|s| s.clone())
            .collect();
        found.sort_by(|a, b| a.started_at.cmp(&b.started_at).then(a.id.cmp(&b.id)));
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use repit_common::{AchievementRarity, AchievementType, AttendanceStatus, LessonStatus};

    fn new_student(user_id: i64) -> NewStudent {
        NewStudent {
            user_id,
            display_name: Some(format!("user-{}", user_id)),
            ..Default::default()
        }
    }

    // ==================== Student Tests ====================

    #[tokio::test]
    async fn test_student_create_and_find() {
        let svc = EmbeddedPersistService::new();
        let created = svc.student_create(&new_student(100)).await.unwrap();
        assert_eq!(created.id, 1);

        let by_id = svc.student_find_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(by_id.user_id, 100);

        let by_user = svc.student_find_by_user_id(100).await.unwrap().unwrap();
        assert_eq!(by_user.id, created.id);

        assert!(svc.student_find_by_user_id(999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_student_duplicate_user_rejected() {
        let svc = EmbeddedPersistService::new();
        svc.student_create(&new_student(7)).await.unwrap();
        let err = svc.student_create(&new_student(7)).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RepitError>(),
            Some(RepitError::StudentAlreadyExist(7))
        ));
    }

    #[tokio::test]
    async fn test_student_search_orders_by_level() {
        let svc = EmbeddedPersistService::new();
        for (user_id, level) in [(1, 3), (2, 7), (3, 5)] {
            let mut s = svc.student_create(&new_student(user_id)).await.unwrap();
            s.level = level;
            svc.student_save(&s).await.unwrap();
        }

        let page = svc
            .student_search(&StudentSearchFilters::default(), 2, 0)
            .await
            .unwrap();
        assert_eq!(page.total_count, 3);
        let levels: Vec<i32> = page.page_items.iter().map(|s| s.level).collect();
        assert_eq!(levels, vec![7, 5]);

        let filtered = StudentSearchFilters {
            level_max: Some(5),
            ..Default::default()
        };
        let page = svc.student_search(&filtered, 50, 0).await.unwrap();
        assert_eq!(page.total_count, 2);
    }

    #[tokio::test]
    async fn test_student_delete_cascades() {
        let svc = EmbeddedPersistService::new();
        let s = svc.student_create(&new_student(1)).await.unwrap();
        svc.xp_transaction_create(&NewXpTransaction {
            student_id: s.id,
            action: XpAction::MaterialStudied,
            amount: 10,
            lesson_id: None,
            homework_id: None,
            description: "read".to_string(),
        })
        .await
        .unwrap();

        assert!(svc.student_delete(s.id).await.unwrap());
        assert!(!svc.student_delete(s.id).await.unwrap());
        assert!(
            svc.xp_transaction_find(s.id, None, &[])
                .await
                .unwrap()
                .is_empty()
        );
    }

    // ==================== Achievement Tests ====================

    fn new_achievement(name: &str, sort_order: i32) -> NewAchievement {
        NewAchievement {
            name: name.to_string(),
            description: String::new(),
            icon_url: None,
            badge_url: None,
            achievement_type: AchievementType::Lesson,
            rarity: AchievementRarity::Common,
            xp_reward: 10,
            criteria: Default::default(),
            is_active: true,
            is_hidden: false,
            is_repeatable: false,
            sort_order,
        }
    }

    #[tokio::test]
    async fn test_achievement_ordering_and_cascade() {
        let svc = EmbeddedPersistService::new();
        let b = svc.achievement_create(&new_achievement("B", 1)).await.unwrap();
        svc.achievement_create(&new_achievement("A", 1)).await.unwrap();
        svc.achievement_create(&new_achievement("C", 0)).await.unwrap();

        let names: Vec<String> = svc
            .achievement_find(&AchievementFilters::default())
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.name)
            .collect();
        assert_eq!(names, vec!["C", "A", "B"]);

        svc.student_achievement_create(1, b.id, None).await.unwrap();
        assert!(svc.achievement_delete(b.id).await.unwrap());
        assert!(
            svc.student_achievement_find_by_student(1)
                .await
                .unwrap()
                .is_empty()
        );
        assert_eq!(svc.achievement_count().await.unwrap(), 2);
    }

    // ==================== XP Ledger Tests ====================

    #[tokio::test]
    async fn test_xp_transaction_exists_matches_ids() {
        let svc = EmbeddedPersistService::new();
        svc.xp_transaction_create(&NewXpTransaction {
            student_id: 1,
            action: XpAction::LessonCompleted,
            amount: 50,
            lesson_id: Some(11),
            homework_id: None,
            description: String::new(),
        })
        .await
        .unwrap();

        assert!(
            svc.xp_transaction_exists(1, XpAction::LessonCompleted, Some(11), None)
                .await
                .unwrap()
        );
        assert!(
            !svc.xp_transaction_exists(1, XpAction::LessonCompleted, Some(12), None)
                .await
                .unwrap()
        );
        assert!(
            svc.xp_transaction_exists(1, XpAction::LessonCompleted, None, None)
                .await
                .unwrap()
        );
        assert!(
            !svc.xp_transaction_exists(2, XpAction::LessonCompleted, None, None)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_badge_code_unique() {
        let svc = EmbeddedPersistService::new();
        let draft = NewBadge {
            code: "xp_100".to_string(),
            name: "First hundred".to_string(),
            description: String::new(),
            icon: "🏆".to_string(),
            rarity: repit_common::BadgeRarity::Common,
            category: "xp".to_string(),
        };
        svc.badge_create(&draft).await.unwrap();
        assert!(svc.badge_create(&draft).await.is_err());
        assert!(svc.badge_find_by_code("xp_100").await.unwrap().is_some());
    }

    // ==================== Lesson Tests ====================

    #[tokio::test]
    async fn test_lesson_query_filters() {
        let svc = EmbeddedPersistService::new();
        for (student_id, subject) in [(1, "math"), (1, "physics"), (2, "math")] {
            svc.lesson_record_create(NewLessonRecord {
                lesson_id: 1,
                tutor_id: 9,
                student_id,
                date: Utc::now(),
                subject: subject.to_string(),
                duration_minutes: 60,
                planned_duration: 60,
                status: LessonStatus::Completed,
                attendance_status: AttendanceStatus::Present,
                completion_rate: 1.5,
                tutor_rating: None,
                student_rating: None,
                parent_rating: None,
                difficulty_rating: None,
                engagement_score: None,
                punctuality_score: None,
                student_questions: 0,
                was_rescheduled: false,
                technical_issues: vec![],
                learning_objectives_met: vec![],
                topics_covered: vec![],
                homework_completion_previous: None,
            })
            .await
            .unwrap();
        }

        let query = LessonQuery {
            student_id: Some(1),
            subject: Some("math".to_string()),
            ..Default::default()
        };
        let found = svc.lesson_record_find(&query).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].completion_rate, 1.0);
    }

    // ==================== Progress Tests ====================

    fn session_at(started_at: DateTime<Utc>, minutes: i64) -> NewStudySession {
        NewStudySession {
            subject: Some("math".to_string()),
            activity_type: "self_study".to_string(),
            activity_id: None,
            started_at,
            ended_at: None,
            duration_minutes: Some(minutes),
            focus_score: None,
            productivity_score: None,
            satisfaction_score: None,
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_goals_filter_and_save() {
        let svc = EmbeddedPersistService::new();
        let draft = NewLearningGoal {
            title: "Solve 50 problems".to_string(),
            description: None,
            category: Some("math".to_string()),
            target_value: 50.0,
            unit: "problems".to_string(),
            target_date: None,
            is_public: false,
            reminder_enabled: true,
        };
        let first = svc.goal_create(1, &draft).await.unwrap();
        let mut second = svc.goal_create(1, &draft).await.unwrap();
        svc.goal_create(2, &draft).await.unwrap();

        second.is_active = false;
        svc.goal_save(&second).await.unwrap();

        let all = svc.goal_find_by_student(1, false).await.unwrap();
        assert_eq!(all.len(), 2);
        let active = svc.goal_find_by_student(1, true).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, first.id);

        let mut ghost = first.clone();
        ghost.id = 99;
        let err = svc.goal_save(&ghost).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RepitError>(),
            Some(RepitError::GoalNotExist(99))
        ));
    }

    #[tokio::test]
    async fn test_sessions_since_and_cascade() {
        let svc = EmbeddedPersistService::new();
        let student = svc.student_create(&new_student(300)).await.unwrap();
        let now = Utc::now();
        svc.study_session_create(student.id, &session_at(now - chrono::Duration::days(40), 30))
            .await
            .unwrap();
        svc.study_session_create(student.id, &session_at(now - chrono::Duration::days(2), 45))
            .await
            .unwrap();

        let recent = svc
            .study_session_find(student.id, Some(now - chrono::Duration::days(30)))
            .await
            .unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].duration_minutes, 45);
        assert_eq!(svc.study_session_find(student.id, None).await.unwrap().len(), 2);

        svc.goal_create(
            student.id,
            &NewLearningGoal {
                title: "Finish course".to_string(),
                description: None,
                category: None,
                target_value: 1.0,
                unit: "courses".to_string(),
                target_date: None,
                is_public: false,
                reminder_enabled: false,
            },
        )
        .await
        .unwrap();

        assert!(svc.student_delete(student.id).await.unwrap());
        assert!(svc.study_session_find(student.id, None).await.unwrap().is_empty());
        assert!(svc.goal_find_by_student(student.id, false).await.unwrap().is_empty());
    }
}
