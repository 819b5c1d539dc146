// Achievement service
// Catalogue management, criteria evaluation and unlock bookkeeping

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use repit_common::{AchievementRarity, AchievementType};
use repit_persistence::{
    Achievement, AchievementFilters, AchievementPatch, NewAchievement, PersistenceService,
    StudentAchievement, StudentProfile,
};

use crate::leveling::round2;

/// Result of a single unlock
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AchievementUnlocked {
    pub achievement: Achievement,
    pub student_achievement: StudentAchievement,
    pub xp_earned: i64,
    pub is_new_unlock: bool,
}

/// Earned achievement joined with its definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EarnedAchievement {
    #[serde(flatten)]
    pub student_achievement: StudentAchievement,
    pub achievement: Achievement,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AchievementStats {
    pub total_achievements: u64,
    pub earned_achievements: u64,
    pub completion_percentage: f64,
    pub by_rarity: BTreeMap<AchievementRarity, u64>,
    pub by_type: BTreeMap<AchievementType, u64>,
    pub recent_unlocks: Vec<EarnedAchievement>,
}

/// Whether `student` meets every criterion; unknown metrics never match
pub fn criteria_met(student: &StudentProfile, criteria: &BTreeMap<String, i64>) -> bool {
    criteria.iter().all(|(field, target)| match student.metric(field) {
        Some(value) => value >= *target,
        None => {
            warn!(field = %field, "Unknown achievement criteria field");
            false
        }
    })
}

#[allow(clippy::too_many_arguments)]
fn starter(
    name: &str,
    description: &str,
    icon: &str,
    achievement_type: AchievementType,
    rarity: AchievementRarity,
    xp_reward: i64,
    field: &str,
    target: i64,
    sort_order: i32,
) -> NewAchievement {
    NewAchievement {
        name: name.to_string(),
        description: description.to_string(),
        icon_url: Some(format!("/icons/{}.png", icon)),
        badge_url: None,
        achievement_type,
        rarity,
        xp_reward,
        criteria: BTreeMap::from([(field.to_string(), target)]),
        is_active: true,
        is_hidden: false,
        is_repeatable: false,
        sort_order,
    }
}

/// Starter achievement catalogue
#[rustfmt::skip]
pub fn default_achievements() -> Vec<NewAchievement> {
    use AchievementRarity::*;
    use AchievementType::*;

    vec![
        starter("Первый шаг", "Завершите первый урок", "first_step", Lesson, Common, 50, "lessons_completed", 1, 1),
        starter("Ученик", "Завершите 10 уроков", "student", Lesson, Common, 100, "lessons_completed", 10, 2),
        starter("Знаток", "Завершите 50 уроков", "expert", Lesson, Rare, 300, "lessons_completed", 50, 3),
        starter("Мастер", "Завершите 100 уроков", "master", Lesson, Epic, 500, "lessons_completed", 100, 4),
        starter("Исполнительный", "Сдайте первое домашнее задание", "diligent", Homework, Common, 30, "homework_submitted", 1, 10),
        starter("Перфекционист", "Получите 10 идеальных оценок за домашние задания", "perfectionist", PerfectScore, Rare, 250, "homework_perfect", 10, 11),
        starter("Постоянство", "Занимайтесь 7 дней подряд", "consistency", Streak, Common, 150, "current_streak", 7, 20),
        starter("Железная дисциплина", "Занимайтесь 30 дней подряд", "iron_discipline", Streak, Epic, 600, "current_streak", 30, 21),
        starter("Активный ученик", "Проведите 50 часов за обучением", "active_learner", StudyTime, Rare, 400, "study_time_minutes", 3000, 30),
        starter("Новичок", "Достигните 5 уровня", "novice", Milestone, Common, 200, "level", 5, 40),
        starter("Продвинутый", "Достигните 10 уровня", "advanced", Milestone, Rare, 400, "level", 10, 41),
        starter("Эксперт", "Достигните 25 уровня", "expert_level", Milestone, Epic, 800, "level", 25, 42),
        starter("Легенда", "Достигните 50 уровня", "legend", Milestone, Legendary, 1500, "level", 50, 43),
    ]
}

/// Achievement catalogue and unlock service
pub struct AchievementService {
    persistence: Arc<dyn PersistenceService>,
}

impl AchievementService {
    pub fn new(persistence: Arc<dyn PersistenceService>) -> Self {
        Self { persistence }
    }

    pub async fn create_achievement(&self, draft: &NewAchievement) -> anyhow::Result<Achievement> {
        let achievement = self.persistence.achievement_create(draft).await?;
        info!(achievement_id = achievement.id, name = %achievement.name, "Achievement created");
        Ok(achievement)
    }

    pub async fn get_achievement(&self, id: i64) -> anyhow::Result<Option<Achievement>> {
        self.persistence.achievement_find_by_id(id).await
    }

    pub async fn list_achievements(
        &self,
        filters: &AchievementFilters,
    ) -> anyhow::Result<Vec<Achievement>> {
        self.persistence.achievement_find(filters).await
    }

    pub async fn update_achievement(
        &self,
        id: i64,
        patch: &AchievementPatch,
    ) -> anyhow::Result<Option<Achievement>> {
        let Some(mut achievement) = self.persistence.achievement_find_by_id(id).await? else {
            return Ok(None);
        };
        patch.apply(&mut achievement);
        Ok(Some(self.persistence.achievement_save(&achievement).await?))
    }

    pub async fn delete_achievement(&self, id: i64) -> anyhow::Result<bool> {
        self.persistence.achievement_delete(id).await
    }

    /// Seed the starter catalogue into an empty store; returns how many were added
    pub async fn initialize_default_achievements(&self) -> anyhow::Result<usize> {
        if self.persistence.achievement_count().await? > 0 {
            return Ok(0);
        }
        let defaults = default_achievements();
        for draft in &defaults {
            self.persistence.achievement_create(draft).await?;
        }
        info!(count = defaults.len(), "Default achievements initialized");
        Ok(defaults.len())
    }

    /// Unlock every active achievement the student now qualifies for
    pub async fn check_achievements_for_student(
        &self,
        student_id: i64,
    ) -> anyhow::Result<Vec<AchievementUnlocked>> {
        let Some(mut student) = self.persistence.student_find_by_id(student_id).await? else {
            return Ok(Vec::new());
        };

        let earned: HashSet<i64> = self
            .persistence
            .student_achievement_find_by_student(student_id)
            .await?
            .into_iter()
            .map(|sa| sa.achievement_id)
            .collect();

        let candidates = self
            .persistence
            .achievement_find(&AchievementFilters::active())
            .await?;

        let mut unlocked = Vec::new();
        for achievement in candidates {
            let already = earned.contains(&achievement.id);
            if already && !achievement.is_repeatable {
                continue;
            }
            if !criteria_met(&student, &achievement.criteria) {
                continue;
            }

            let progress = serde_json::to_value(&achievement.criteria).ok();
            let student_achievement = self
                .persistence
                .student_achievement_create(student_id, achievement.id, progress)
                .await?;

            let reward = achievement.xp_reward.max(0);
            if reward > 0 {
                student.experience_points = student.experience_points.saturating_add(reward);
                student.total_xp_earned = student.total_xp_earned.saturating_add(reward);
            }

            metrics::counter!("repit_achievements_unlocked_total", "rarity" => achievement.rarity.as_str())
                .increment(1);
            info!(
                student_id,
                achievement_id = achievement.id,
                name = %achievement.name,
                xp = reward,
                "Achievement unlocked"
            );

            unlocked.push(AchievementUnlocked {
                xp_earned: reward,
                is_new_unlock: !already,
                achievement,
                student_achievement,
            });
        }

        if !unlocked.is_empty() {
            self.persistence.student_save(&student).await?;
        }
        Ok(unlocked)
    }

    pub async fn get_student_achievements(
        &self,
        student_id: i64,
    ) -> anyhow::Result<Vec<EarnedAchievement>> {
        let earned = self
            .persistence
            .student_achievement_find_by_student(student_id)
            .await?;
        let catalogue: HashMap<i64, Achievement> = self
            .persistence
            .achievement_find(&AchievementFilters::default())
            .await?
            .into_iter()
            .map(|a| (a.id, a))
            .collect();

        Ok(earned
            .into_iter()
            .filter_map(|sa| {
                catalogue
                    .get(&sa.achievement_id)
                    .cloned()
                    .map(|achievement| EarnedAchievement {
                        student_achievement: sa,
                        achievement,
                    })
            })
            .collect())
    }

    pub async fn get_achievement_stats(&self, student_id: i64) -> anyhow::Result<AchievementStats> {
        let visible = AchievementFilters {
            is_active: Some(true),
            is_hidden: Some(false),
            ..Default::default()
        };
        let total = self.persistence.achievement_find(&visible).await?.len() as u64;
        let earned = self.get_student_achievements(student_id).await?;
        let earned_count = earned.len() as u64;

        let mut by_rarity: BTreeMap<AchievementRarity, u64> =
            AchievementRarity::ALL.iter().map(|r| (*r, 0)).collect();
        let mut by_type: BTreeMap<AchievementType, u64> =
            AchievementType::ALL.iter().map(|t| (*t, 0)).collect();
        for e in &earned {
            *by_rarity.entry(e.achievement.rarity).or_insert(0) += 1;
            *by_type.entry(e.achievement.achievement_type).or_insert(0) += 1;
        }

        let completion_percentage = if total > 0 {
            round2(earned_count as f64 / total as f64 * 100.0)
        } else {
            0.0
        };

        Ok(AchievementStats {
            total_achievements: total,
            earned_achievements: earned_count,
            completion_percentage,
            by_rarity,
            by_type,
            recent_unlocks: earned.into_iter().take(5).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use repit_persistence::{EmbeddedPersistService, NewStudent};

    fn setup() -> (AchievementService, Arc<dyn PersistenceService>) {
        let persistence: Arc<dyn PersistenceService> = Arc::new(EmbeddedPersistService::new());
        (AchievementService::new(persistence.clone()), persistence)
    }

    async fn student_with(
        persistence: &Arc<dyn PersistenceService>,
        edit: impl FnOnce(&mut StudentProfile),
    ) -> StudentProfile {
        let mut s = persistence
            .student_create(&NewStudent {
                user_id: 1,
                ..Default::default()
            })
            .await
            .unwrap();
        edit(&mut s);
        persistence.student_save(&s).await.unwrap()
    }

    #[test]
    fn test_default_catalogue() {
        let defaults = default_achievements();
        assert_eq!(defaults.len(), 13);
        assert!(defaults.iter().all(|a| a.criteria.len() == 1));
        let legend = defaults.iter().find(|a| a.name == "Легенда").unwrap();
        assert_eq!(legend.rarity, AchievementRarity::Legendary);
        assert_eq!(legend.xp_reward, 1500);
        assert_eq!(legend.criteria.get("level"), Some(&50));
    }

    #[test]
    fn test_criteria_unknown_field_fails() {
        let draft = NewStudent::default();
        let s = StudentProfile::new(1, &draft, chrono::Utc::now());
        let criteria = BTreeMap::from([("karma".to_string(), 0)]);
        assert!(!criteria_met(&s, &criteria));
        assert!(criteria_met(&s, &BTreeMap::new()));
    }

    #[tokio::test]
    async fn test_initialize_defaults_is_idempotent() {
        let (svc, _) = setup();
        assert_eq!(svc.initialize_default_achievements().await.unwrap(), 13);
        assert_eq!(svc.initialize_default_achievements().await.unwrap(), 0);
        let all = svc
            .list_achievements(&AchievementFilters::default())
            .await
            .unwrap();
        assert_eq!(all.len(), 13);
        assert_eq!(all[0].name, "Первый шаг");
    }

    #[tokio::test]
    async fn test_check_unlocks_and_grants_xp() {
        let (svc, persistence) = setup();
        svc.initialize_default_achievements().await.unwrap();
        let s = student_with(&persistence, |s| {
            s.lessons_completed = 10;
            s.homework_submitted = 1;
        })
        .await;

        let unlocked = svc.check_achievements_for_student(s.id).await.unwrap();
        let names: Vec<&str> = unlocked
            .iter()
            .map(|u| u.achievement.name.as_str())
            .collect();
        assert_eq!(names, vec!["Первый шаг", "Ученик", "Исполнительный"]);
        assert!(unlocked.iter().all(|u| u.is_new_unlock));

        let stored = persistence.student_find_by_id(s.id).await.unwrap().unwrap();
        assert_eq!(stored.experience_points, 180);
        assert_eq!(stored.total_xp_earned, 180);

        // nothing new on a second pass
        assert!(
            svc.check_achievements_for_student(s.id)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_repeatable_achievement_unlocks_again() {
        let (svc, persistence) = setup();
        let mut draft = default_achievements().remove(0);
        draft.is_repeatable = true;
        svc.create_achievement(&draft).await.unwrap();
        let s = student_with(&persistence, |s| s.lessons_completed = 1).await;

        let first = svc.check_achievements_for_student(s.id).await.unwrap();
        assert!(first[0].is_new_unlock);
        let second = svc.check_achievements_for_student(s.id).await.unwrap();
        assert_eq!(second.len(), 1);
        assert!(!second[0].is_new_unlock);
    }

    #[tokio::test]
    async fn test_negative_reward_is_not_deducted() {
        let (svc, persistence) = setup();
        let mut draft = default_achievements().remove(0);
        draft.xp_reward = -300;
        svc.create_achievement(&draft).await.unwrap();
        let s = student_with(&persistence, |s| {
            s.lessons_completed = 1;
            s.experience_points = 40;
        })
        .await;

        let unlocked = svc.check_achievements_for_student(s.id).await.unwrap();
        assert_eq!(unlocked.len(), 1);
        assert_eq!(unlocked[0].xp_earned, 0);
        let stored = persistence.student_find_by_id(s.id).await.unwrap().unwrap();
        assert_eq!(stored.experience_points, 40);
    }

    #[tokio::test]
    async fn test_check_missing_student() {
        let (svc, _) = setup();
        svc.initialize_default_achievements().await.unwrap();
        assert!(
            svc.check_achievements_for_student(42)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_inactive_achievement_skipped() {
        let (svc, persistence) = setup();
        let mut draft = default_achievements().remove(0);
        draft.is_active = false;
        svc.create_achievement(&draft).await.unwrap();
        let s = student_with(&persistence, |s| s.lessons_completed = 5).await;
        assert!(
            svc.check_achievements_for_student(s.id)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_stats() {
        let (svc, persistence) = setup();
        svc.initialize_default_achievements().await.unwrap();
        let mut hidden = default_achievements().remove(0);
        hidden.name = "Secret".to_string();
        hidden.is_hidden = true;
        svc.create_achievement(&hidden).await.unwrap();

        let s = student_with(&persistence, |s| s.current_streak = 7).await;
        svc.check_achievements_for_student(s.id).await.unwrap();

        let stats = svc.get_achievement_stats(s.id).await.unwrap();
        assert_eq!(stats.total_achievements, 13);
        assert_eq!(stats.earned_achievements, 1);
        assert_eq!(stats.completion_percentage, 7.69);
        assert_eq!(stats.by_rarity[&AchievementRarity::Common], 1);
        assert_eq!(stats.by_rarity[&AchievementRarity::Epic], 0);
        assert_eq!(stats.by_type[&AchievementType::Streak], 1);
        assert_eq!(stats.recent_unlocks.len(), 1);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let (svc, _) = setup();
        let created = svc
            .create_achievement(&default_achievements().remove(0))
            .await
            .unwrap();

        let patch = AchievementPatch {
            xp_reward: Some(75),
            ..Default::default()
        };
        let updated = svc
            .update_achievement(created.id, &patch)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.xp_reward, 75);
        assert_eq!(updated.name, created.name);

        assert!(svc.update_achievement(999, &patch).await.unwrap().is_none());
        assert!(svc.delete_achievement(created.id).await.unwrap());
        assert!(svc.get_achievement(created.id).await.unwrap().is_none());
    }
}
