//! Lesson analytics persistence trait

use async_trait::async_trait;

use crate::model::{LessonQuery, LessonRecord, NewLessonRecord};

#[async_trait]
pub trait LessonPersistence: Send + Sync {
    async fn lesson_record_create(&self, draft: NewLessonRecord) -> anyhow::Result<LessonRecord>;

    /// Matching records ordered by lesson date
    async fn lesson_record_find(&self, query: &LessonQuery) -> anyhow::Result<Vec<LessonRecord>>;
}
