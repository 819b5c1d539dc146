//! Gamification persistence trait
//!
//! XP ledger, badges, per-kind streak counters and challenges.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use repit_common::{StreakKind, XpAction};

use crate::model::{
    Badge, Challenge, ChallengeParticipation, NewBadge, NewChallenge, NewXpTransaction,
    StreakRecord, StudentBadge, XpTransaction,
};

#[async_trait]
pub trait GamificationPersistence: Send + Sync {
    // ---- XP ledger ----

    async fn xp_transaction_create(&self, draft: &NewXpTransaction)
    -> anyhow::Result<XpTransaction>;

    /// Whether a matching transaction exists; `None` ids match any value
    async fn xp_transaction_exists(
        &self,
        student_id: i64,
        action: XpAction,
        lesson_id: Option<i64>,
        homework_id: Option<i64>,
    ) -> anyhow::Result<bool>;

    /// Transactions of a student, oldest first; empty `actions` matches all
    async fn xp_transaction_find(
        &self,
        student_id: i64,
        since: Option<DateTime<Utc>>,
        actions: &[XpAction],
    ) -> anyhow::Result<Vec<XpTransaction>>;

    /// XP per student granted at or after `since`
    async fn xp_transaction_totals_since(
        &self,
        since: DateTime<Utc>,
    ) -> anyhow::Result<HashMap<i64, i64>>;

    // ---- Badges ----

    async fn badge_create(&self, draft: &NewBadge) -> anyhow::Result<Badge>;

    async fn badge_find_by_code(&self, code: &str) -> anyhow::Result<Option<Badge>>;

    async fn badge_find_all(&self) -> anyhow::Result<Vec<Badge>>;

    async fn student_badge_create(
        &self,
        student_id: i64,
        badge_id: i64,
        reason: Option<String>,
    ) -> anyhow::Result<StudentBadge>;

    async fn student_badge_exists(&self, student_id: i64, badge_id: i64) -> anyhow::Result<bool>;

    async fn student_badge_find_by_student(
        &self,
        student_id: i64,
    ) -> anyhow::Result<Vec<StudentBadge>>;

    // ---- Streak counters ----

    async fn streak_find(
        &self,
        student_id: i64,
        kind: StreakKind,
    ) -> anyhow::Result<Option<StreakRecord>>;

    async fn streak_save(&self, record: &StreakRecord) -> anyhow::Result<()>;

    // ---- Challenges ----

    async fn challenge_create(&self, draft: &NewChallenge) -> anyhow::Result<Challenge>;

    async fn challenge_find_by_id(&self, id: i64) -> anyhow::Result<Option<Challenge>>;

    async fn challenge_find_active(&self) -> anyhow::Result<Vec<Challenge>>;

    async fn participation_find(
        &self,
        challenge_id: i64,
        student_id: i64,
    ) -> anyhow::Result<Option<ChallengeParticipation>>;

    async fn participation_count(&self, challenge_id: i64) -> anyhow::Result<u64>;

    async fn participation_create(
        &self,
        challenge_id: i64,
        student_id: i64,
    ) -> anyhow::Result<ChallengeParticipation>;

    async fn participation_save(
        &self,
        participation: &ChallengeParticipation,
    ) -> anyhow::Result<ChallengeParticipation>;
}
