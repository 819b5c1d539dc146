//! Achievement persistence trait

use async_trait::async_trait;

use crate::model::{Achievement, AchievementFilters, NewAchievement, StudentAchievement};

/// Achievement catalogue and unlock persistence operations
#[async_trait]
pub trait AchievementPersistence: Send + Sync {
    async fn achievement_create(&self, draft: &NewAchievement) -> anyhow::Result<Achievement>;

    async fn achievement_find_by_id(&self, id: i64) -> anyhow::Result<Option<Achievement>>;

    /// Filtered list ordered by `sort_order`, then name
    async fn achievement_find(
        &self,
        filters: &AchievementFilters,
    ) -> anyhow::Result<Vec<Achievement>>;

    async fn achievement_save(&self, achievement: &Achievement) -> anyhow::Result<Achievement>;

    /// Delete an achievement and every unlock of it
    async fn achievement_delete(&self, id: i64) -> anyhow::Result<bool>;

    async fn achievement_count(&self) -> anyhow::Result<u64>;

    async fn student_achievement_create(
        &self,
        student_id: i64,
        achievement_id: i64,
        progress_data: Option<serde_json::Value>,
    ) -> anyhow::Result<StudentAchievement>;

    /// Unlocks for a student, newest first
    async fn student_achievement_find_by_student(
        &self,
        student_id: i64,
    ) -> anyhow::Result<Vec<StudentAchievement>>;
}
