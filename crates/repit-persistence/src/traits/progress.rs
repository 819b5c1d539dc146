//! Learning goal and study session persistence trait

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::model::{LearningGoal, NewLearningGoal, NewStudySession, StudySession};

#[async_trait]
pub trait ProgressPersistence: Send + Sync {
    async fn goal_create(
        &self,
        student_id: i64,
        draft: &NewLearningGoal,
    ) -> anyhow::Result<LearningGoal>;

    async fn goal_find_by_id(&self, id: i64) -> anyhow::Result<Option<LearningGoal>>;

    /// Goals of one student, oldest first
    async fn goal_find_by_student(
        &self,
        student_id: i64,
        active_only: bool,
    ) -> anyhow::Result<Vec<LearningGoal>>;

    async fn goal_save(&self, goal: &LearningGoal) -> anyhow::Result<LearningGoal>;

    async fn study_session_create(
        &self,
        student_id: i64,
        draft: &NewStudySession,
    ) -> anyhow::Result<StudySession>;

    /// Sessions started at or after `since`, oldest first
    async fn study_session_find(
        &self,
        student_id: i64,
        since: Option<DateTime<Utc>>,
    ) -> anyhow::Result<Vec<StudySession>>;
}
