//! Student persistence trait
//!
//! Defines the interface for student profile storage operations.

use async_trait::async_trait;

use crate::model::{NewStudent, Page, StudentProfile, StudentSearchFilters};

/// Student profile persistence operations
#[async_trait]
pub trait StudentPersistence: Send + Sync {
    /// Create a profile, failing with `StudentAlreadyExist` on a taken user id
    async fn student_create(&self, draft: &NewStudent) -> anyhow::Result<StudentProfile>;

    async fn student_find_by_id(&self, id: i64) -> anyhow::Result<Option<StudentProfile>>;

    async fn student_find_by_user_id(&self, user_id: i64)
    -> anyhow::Result<Option<StudentProfile>>;

    /// Overwrite a stored profile, stamping `updated_at`
    async fn student_save(&self, student: &StudentProfile) -> anyhow::Result<StudentProfile>;

    /// Delete a profile together with everything it earned
    async fn student_delete(&self, id: i64) -> anyhow::Result<bool>;

    /// Filtered search ordered by level, highest first
    async fn student_search(
        &self,
        filters: &StudentSearchFilters,
        limit: u64,
        offset: u64,
    ) -> anyhow::Result<Page<StudentProfile>>;

    async fn student_find_all(&self) -> anyhow::Result<Vec<StudentProfile>>;
}
