// Gamification service
// XP ledger awards, badges, milestone settlement, leaderboards and streaks

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use repit_common::{BadgeRarity, LeaderboardPeriod, RepitError, StreakKind, XpAction};
use repit_persistence::{
    Badge, NewBadge, NewXpTransaction, PersistenceService, StreakRecord, StudentProfile,
    XpTransaction,
};

use crate::leveling::{ExponentialCurve, LevelInfo, RankProgress, RankTable};
use crate::rewards::{LEVEL_MILESTONES, XP_MILESTONES, xp_reward};
use crate::streak::{StreakCounter, StreakSummary, streak_from_activity};
use crate::student::{LevelUp, apply_experience};

/// Window scanned when deriving a streak from the XP ledger
const STREAK_WINDOW_DAYS: i64 = 30;

pub const DEFAULT_LEADERBOARD_LIMIT: usize = 50;

/// XP award request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XpAwardRequest {
    pub action: XpAction,
    /// Overrides the reward table when positive
    pub amount: Option<i64>,
    pub lesson_id: Option<i64>,
    pub homework_id: Option<i64>,
    pub description: Option<String>,
}

impl XpAwardRequest {
    pub fn for_action(action: XpAction) -> Self {
        Self {
            action,
            amount: None,
            lesson_id: None,
            homework_id: None,
            description: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XpGranted {
    pub xp_awarded: i64,
    pub total_xp: i64,
    pub old_rank: i32,
    pub new_rank: i32,
    pub rank_up: bool,
    pub rank_title: String,
    pub level_up: Option<LevelUp>,
    pub badges_awarded: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum XpAward {
    Granted(XpGranted),
    Rejected { reason: String },
}

impl XpAward {
    fn rejected(reason: &str) -> Self {
        XpAward::Rejected {
            reason: reason.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BadgeAward {
    Awarded {
        badge: Badge,
        xp_awarded: i64,
        badges_awarded: Vec<String>,
    },
    Rejected {
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EarnedBadge {
    pub badge: Badge,
    pub earned_at: DateTime<Utc>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub position: usize,
    pub student_id: i64,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub xp: i64,
    pub level: i32,
    pub rank: i32,
    pub rank_title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GamificationProfile {
    pub student_id: i64,
    pub total_xp: i64,
    pub level_info: LevelInfo,
    pub rank: RankProgress,
    pub rank_title: String,
    pub badges: Vec<EarnedBadge>,
    pub streak: StreakSummary,
    pub recent_transactions: Vec<XpTransaction>,
}

fn badge(code: &str, name: &str, description: &str, icon: &str, rarity: BadgeRarity, category: &str) -> NewBadge {
    NewBadge {
        code: code.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        icon: icon.to_string(),
        rarity,
        category: category.to_string(),
    }
}

/// Starter badge set
pub fn default_badges() -> Vec<NewBadge> {
    use BadgeRarity::*;

    vec![
        badge("xp_100", "Первая сотня", "Заработайте 100 XP", "🏆", Common, "xp"),
        badge("xp_1000", "Тысячник", "Заработайте 1000 XP", "🥉", Uncommon, "xp"),
        badge("xp_10000", "Десять тысяч", "Заработайте 10000 XP", "🥈", Rare, "xp"),
        badge("level_5", "Знаток", "Достигните 5 уровня", "⭐", Uncommon, "level"),
        badge("level_10", "Мастер", "Достигните 10 уровня", "👑", Legendary, "level"),
        badge("streak_7", "Неделя подряд", "Занимайтесь 7 дней подряд", "🔥", Uncommon, "streak"),
        badge("streak_30", "Месячный марафон", "Занимайтесь 30 дней подряд", "🏃‍♂️", Epic, "streak"),
        badge("first_lesson", "Первый шаг", "Завершите первый урок", "👶", Common, "special"),
        badge("perfect_homework", "Идеалист", "Получите идеальную оценку за домашнее задание", "💯", Uncommon, "homework"),
    ]
}

/// Badge codes a student qualifies for by XP and rank
fn milestone_codes(total_xp: i64, rank: i32) -> Vec<String> {
    XP_MILESTONES
        .iter()
        .filter(|m| total_xp >= **m)
        .map(|m| format!("xp_{}", m))
        .chain(
            LEVEL_MILESTONES
                .iter()
                .filter(|l| rank >= **l)
                .map(|l| format!("level_{}", l)),
        )
        .collect()
}

/// XP, badge, leaderboard and streak service
pub struct GamificationService {
    persistence: Arc<dyn PersistenceService>,
    curve: ExponentialCurve,
    ranks: RankTable,
}

impl GamificationService {
    pub fn new(persistence: Arc<dyn PersistenceService>, curve: ExponentialCurve) -> Self {
        Self {
            persistence,
            curve,
            ranks: RankTable,
        }
    }

    pub fn ranks(&self) -> &RankTable {
        &self.ranks
    }

    async fn require(&self, student_id: i64) -> anyhow::Result<StudentProfile> {
        self.persistence
            .student_find_by_id(student_id)
            .await?
            .ok_or_else(|| RepitError::StudentNotExist(student_id).into())
    }

    /// Write a ledger entry and apply its XP to the student
    async fn credit(
        &self,
        student: &mut StudentProfile,
        draft: NewXpTransaction,
    ) -> anyhow::Result<Option<LevelUp>> {
        self.persistence.xp_transaction_create(&draft).await?;
        let level_up = apply_experience(&self.curve, student, draft.amount);
        *student = self.persistence.student_save(student).await?;
        metrics::counter!("repit_xp_awarded_total", "source" => draft.action.as_str())
            .increment(draft.amount.max(0) as u64);
        if level_up.is_some() {
            metrics::counter!("repit_level_ups_total").increment(1);
        }
        Ok(level_up)
    }

    /// Award XP for an action, then settle milestone badges
    pub async fn award_xp(
        &self,
        student_id: i64,
        request: &XpAwardRequest,
    ) -> anyhow::Result<XpAward> {
        let mut student = self.require(student_id).await?;

        let amount = request
            .amount
            .filter(|a| *a > 0)
            .unwrap_or_else(|| xp_reward(request.action));
        if amount <= 0 {
            warn!(action = %request.action, "No XP reward defined");
            return Ok(XpAward::rejected("No XP reward defined"));
        }

        if request.action.is_deduplicated()
            && self
                .persistence
                .xp_transaction_exists(
                    student_id,
                    request.action,
                    request.lesson_id,
                    request.homework_id,
                )
                .await?
        {
            info!(student_id, action = %request.action, "XP already awarded");
            return Ok(XpAward::rejected("Already awarded"));
        }

        let old_rank = self.ranks.rank_for(student.total_xp_earned);
        let draft = NewXpTransaction {
            student_id,
            action: request.action,
            amount,
            lesson_id: request.lesson_id,
            homework_id: request.homework_id,
            description: request
                .description
                .clone()
                .unwrap_or_else(|| format!("XP за {}", request.action)),
        };
        let level_up = self.credit(&mut student, draft).await?;
        let badges_awarded = self.settle_milestones(student_id).await?;

        let total_xp = self.require(student_id).await?.total_xp_earned;
        let new_rank = self.ranks.rank_for(total_xp);
        if new_rank > old_rank {
            info!(student_id, old_rank, new_rank, "Student reached a new rank");
        }

        Ok(XpAward::Granted(XpGranted {
            xp_awarded: amount,
            total_xp,
            old_rank,
            new_rank,
            rank_up: new_rank > old_rank,
            rank_title: self.ranks.title(new_rank).to_string(),
            level_up,
            badges_awarded,
        }))
    }

    /// Grant a badge if it exists and is not yet owned, with its XP bonus
    async fn grant_badge(
        &self,
        student_id: i64,
        code: &str,
        reason: Option<String>,
    ) -> anyhow::Result<Result<Badge, &'static str>> {
        let Some(badge) = self.persistence.badge_find_by_code(code).await? else {
            return Ok(Err("Badge not found"));
        };
        if self
            .persistence
            .student_badge_exists(student_id, badge.id)
            .await?
        {
            return Ok(Err("Badge already awarded"));
        }

        self.persistence
            .student_badge_create(student_id, badge.id, reason)
            .await?;

        let mut student = self.require(student_id).await?;
        let draft = NewXpTransaction {
            student_id,
            action: XpAction::AchievementUnlocked,
            amount: xp_reward(XpAction::AchievementUnlocked),
            lesson_id: None,
            homework_id: None,
            description: format!("Получен значок: {}", badge.name),
        };
        self.credit(&mut student, draft).await?;

        metrics::counter!("repit_badges_awarded_total", "rarity" => badge.rarity.as_str())
            .increment(1);
        info!(student_id, badge = %badge.code, "Badge awarded");
        Ok(Ok(badge))
    }

    /// Award milestone badges until none are left to award
    ///
    /// Badge bonuses add XP, which can cross the next milestone, so the check
    /// repeats until a pass awards nothing.
    async fn settle_milestones(&self, student_id: i64) -> anyhow::Result<Vec<String>> {
        let mut awarded = Vec::new();
        loop {
            let student = self.require(student_id).await?;
            let rank = self.ranks.rank_for(student.total_xp_earned);

            let mut progressed = false;
            for code in milestone_codes(student.total_xp_earned, rank) {
                let reason = Some(format!("Milestone {}", code));
                if self.grant_badge(student_id, &code, reason).await?.is_ok() {
                    awarded.push(code);
                    progressed = true;
                }
            }
            if !progressed {
                return Ok(awarded);
            }
        }
    }

    pub async fn award_badge(
        &self,
        student_id: i64,
        code: &str,
        reason: Option<String>,
    ) -> anyhow::Result<BadgeAward> {
        self.require(student_id).await?;
        match self.grant_badge(student_id, code, reason).await? {
            Ok(badge) => {
                let badges_awarded = self.settle_milestones(student_id).await?;
                Ok(BadgeAward::Awarded {
                    badge,
                    xp_awarded: xp_reward(XpAction::AchievementUnlocked),
                    badges_awarded,
                })
            }
            Err(reason) => Ok(BadgeAward::Rejected {
                reason: reason.to_string(),
            }),
        }
    }

    pub async fn get_student_badges(&self, student_id: i64) -> anyhow::Result<Vec<EarnedBadge>> {
        let catalogue: HashMap<i64, Badge> = self
            .persistence
            .badge_find_all()
            .await?
            .into_iter()
            .map(|b| (b.id, b))
            .collect();

        Ok(self
            .persistence
            .student_badge_find_by_student(student_id)
            .await?
            .into_iter()
            .filter_map(|sb| {
                catalogue.get(&sb.badge_id).cloned().map(|badge| EarnedBadge {
                    badge,
                    earned_at: sb.earned_at,
                    reason: sb.reason,
                })
            })
            .collect())
    }

    /// Insert missing starter badges; returns how many were added
    pub async fn initialize_default_badges(&self) -> anyhow::Result<usize> {
        let mut created = 0;
        for draft in default_badges() {
            if self
                .persistence
                .badge_find_by_code(&draft.code)
                .await?
                .is_none()
            {
                self.persistence.badge_create(&draft).await?;
                created += 1;
            }
        }
        if created > 0 {
            info!(count = created, "Default badges initialized");
        }
        Ok(created)
    }

    pub async fn get_leaderboard(
        &self,
        period: LeaderboardPeriod,
        limit: Option<usize>,
    ) -> anyhow::Result<Vec<LeaderboardEntry>> {
        let limit = limit.unwrap_or(DEFAULT_LEADERBOARD_LIMIT);
        let students = self.persistence.student_find_all().await?;

        let mut scored: Vec<(i64, StudentProfile)> = match period.days() {
            None => students
                .into_iter()
                .map(|s| (s.total_xp_earned, s))
                .collect(),
            Some(days) => {
                let since = Utc::now() - Duration::days(days);
                let totals = self.persistence.xp_transaction_totals_since(since).await?;
                students
                    .into_iter()
                    .map(|s| (totals.get(&s.id).copied().unwrap_or(0), s))
                    .collect()
            }
        };
        scored.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.id.cmp(&b.1.id)));

        Ok(scored
            .into_iter()
            .take(limit)
            .enumerate()
            .map(|(index, (xp, student))| {
                let rank = self.ranks.rank_for(xp);
                LeaderboardEntry {
                    position: index + 1,
                    student_id: student.id,
                    display_name: student.label(),
                    avatar_url: student.avatar_url.clone(),
                    xp,
                    level: student.level,
                    rank,
                    rank_title: self.ranks.title(rank).to_string(),
                }
            })
            .collect())
    }

    /// Learning streak derived from lesson and homework XP over the last 30 days
    pub async fn calculate_streak(&self, student_id: i64) -> anyhow::Result<StreakSummary> {
        let now = Utc::now();
        let since = now - Duration::days(STREAK_WINDOW_DAYS);
        let activity = self
            .persistence
            .xp_transaction_find(
                student_id,
                Some(since),
                &[XpAction::LessonCompleted, XpAction::HomeworkSubmitted],
            )
            .await?;
        Ok(streak_from_activity(
            activity.into_iter().map(|tx| tx.created_at),
            now.date_naive(),
        ))
    }

    /// Record a success or failure on a per-kind streak counter
    pub async fn record_streak(
        &self,
        student_id: i64,
        kind: StreakKind,
        success: bool,
    ) -> anyhow::Result<StreakCounter> {
        self.require(student_id).await?;
        let mut counter = self
            .persistence
            .streak_find(student_id, kind)
            .await?
            .map(|r| StreakCounter::new(r.current, r.best))
            .unwrap_or_default();
        counter.record(success);

        self.persistence
            .streak_save(&StreakRecord {
                student_id,
                kind,
                current: counter.current,
                best: counter.best,
                updated_at: Utc::now(),
            })
            .await?;
        debug!(student_id, kind = %kind, current = counter.current, "Streak recorded");
        Ok(counter)
    }

    pub async fn get_profile(&self, student_id: i64) -> anyhow::Result<Option<GamificationProfile>> {
        let Some(student) = self.persistence.student_find_by_id(student_id).await? else {
            return Ok(None);
        };

        let rank = self.ranks.next_rank_progress(student.total_xp_earned);
        let mut recent = self
            .persistence
            .xp_transaction_find(student_id, None, &[])
            .await?;
        recent.reverse();
        recent.truncate(10);

        Ok(Some(GamificationProfile {
            student_id,
            total_xp: student.total_xp_earned,
            level_info: self
                .curve
                .level_info(student.level, student.experience_points),
            rank_title: self.ranks.title(rank.current_rank).to_string(),
            rank,
            badges: self.get_student_badges(student_id).await?,
            streak: self.calculate_streak(student_id).await?,
            recent_transactions: recent,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use repit_persistence::{EmbeddedPersistService, NewStudent};

    async fn setup() -> (GamificationService, Arc<dyn PersistenceService>) {
        let persistence: Arc<dyn PersistenceService> = Arc::new(EmbeddedPersistService::new());
        let svc = GamificationService::new(persistence.clone(), ExponentialCurve::default());
        svc.initialize_default_badges().await.unwrap();
        (svc, persistence)
    }

    async fn student(persistence: &Arc<dyn PersistenceService>, user_id: i64) -> StudentProfile {
        persistence
            .student_create(&NewStudent {
                user_id,
                display_name: Some(format!("S{}", user_id)),
                ..Default::default()
            })
            .await
            .unwrap()
    }

    fn granted(award: XpAward) -> XpGranted {
        match award {
            XpAward::Granted(g) => g,
            XpAward::Rejected { reason } => panic!("unexpected rejection: {}", reason),
        }
    }

    #[test]
    fn test_milestone_codes() {
        assert!(milestone_codes(99, 1).is_empty());
        assert_eq!(milestone_codes(100, 2), vec!["xp_100", "level_2"]);
        assert_eq!(
            milestone_codes(1000, 5),
            vec!["xp_100", "xp_500", "xp_1000", "level_2", "level_5"]
        );
    }

    #[tokio::test]
    async fn test_default_badges_idempotent() {
        let (svc, persistence) = setup().await;
        assert_eq!(svc.initialize_default_badges().await.unwrap(), 0);
        assert_eq!(persistence.badge_find_all().await.unwrap().len(), 9);
    }

    #[tokio::test]
    async fn test_award_xp_uses_reward_table() {
        let (svc, persistence) = setup().await;
        let s = student(&persistence, 1).await;

        let g = granted(
            svc.award_xp(s.id, &XpAwardRequest::for_action(XpAction::MaterialStudied))
                .await
                .unwrap(),
        );
        assert_eq!(g.xp_awarded, 10);
        assert_eq!(g.total_xp, 10);
        assert_eq!(g.new_rank, 1);
        assert!(!g.rank_up);
        assert_eq!(g.rank_title, "Новичок");
        assert!(g.badges_awarded.is_empty());
    }

    #[tokio::test]
    async fn test_award_xp_deduplicates_lessons() {
        let (svc, persistence) = setup().await;
        let s = student(&persistence, 1).await;
        let mut request = XpAwardRequest::for_action(XpAction::LessonCompleted);
        request.lesson_id = Some(5);

        granted(svc.award_xp(s.id, &request).await.unwrap());
        assert_eq!(
            svc.award_xp(s.id, &request).await.unwrap(),
            XpAward::Rejected {
                reason: "Already awarded".to_string()
            }
        );

        request.lesson_id = Some(6);
        granted(svc.award_xp(s.id, &request).await.unwrap());
    }

    #[tokio::test]
    async fn test_award_xp_settles_milestones_iteratively() {
        let (svc, persistence) = setup().await;
        let s = student(&persistence, 1).await;

        let mut request = XpAwardRequest::for_action(XpAction::CompetitionWin);
        request.amount = Some(400);
        let g = granted(svc.award_xp(s.id, &request).await.unwrap());

        // 400 XP crosses xp_100 and rank 2; each badge adds 100 XP
        // reaching 600, which crosses xp_500 on the next pass
        assert!(g.rank_up);
        assert_eq!(g.old_rank, 1);
        assert_eq!(g.new_rank, 4);
        assert_eq!(g.badges_awarded, vec!["xp_100", "level_2", "xp_500"]);
        assert_eq!(g.total_xp, 700);

        let badges = svc.get_student_badges(s.id).await.unwrap();
        assert_eq!(badges.len(), 3);
    }

    #[tokio::test]
    async fn test_award_xp_missing_student() {
        let (svc, _) = setup().await;
        let err = svc
            .award_xp(77, &XpAwardRequest::for_action(XpAction::FirstLesson))
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RepitError>(),
            Some(RepitError::StudentNotExist(77))
        ));
    }

    #[tokio::test]
    async fn test_award_badge() {
        let (svc, persistence) = setup().await;
        let s = student(&persistence, 1).await;

        match svc
            .award_badge(s.id, "first_lesson", Some("welcome".to_string()))
            .await
            .unwrap()
        {
            BadgeAward::Awarded {
                badge,
                xp_awarded,
                badges_awarded,
            } => {
                assert_eq!(badge.code, "first_lesson");
                assert_eq!(xp_awarded, 100);
                assert_eq!(badges_awarded, vec!["xp_100", "level_2"]);
            }
            other => panic!("unexpected: {:?}", other),
        }

        assert_eq!(
            svc.award_badge(s.id, "first_lesson", None).await.unwrap(),
            BadgeAward::Rejected {
                reason: "Badge already awarded".to_string()
            }
        );
        assert_eq!(
            svc.award_badge(s.id, "nope", None).await.unwrap(),
            BadgeAward::Rejected {
                reason: "Badge not found".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_leaderboards() {
        let (svc, persistence) = setup().await;
        let a = student(&persistence, 1).await;
        let b = student(&persistence, 2).await;
        let mut c = student(&persistence, 3).await;

        // c has lifetime XP but nothing recent
        c.total_xp_earned = 5000;
        persistence.student_save(&c).await.unwrap();

        let mut request = XpAwardRequest::for_action(XpAction::MaterialStudied);
        request.amount = Some(50);
        svc.award_xp(a.id, &request).await.unwrap();
        request.amount = Some(80);
        svc.award_xp(b.id, &request).await.unwrap();

        let all_time = svc
            .get_leaderboard(LeaderboardPeriod::AllTime, None)
            .await
            .unwrap();
        let order: Vec<i64> = all_time.iter().map(|e| e.student_id).collect();
        assert_eq!(order, vec![c.id, b.id, a.id]);
        assert_eq!(all_time[0].position, 1);
        assert_eq!(all_time[0].rank_title, "Эксперт");

        let weekly = svc
            .get_leaderboard(LeaderboardPeriod::Week, Some(2))
            .await
            .unwrap();
        assert_eq!(weekly.len(), 2);
        assert_eq!(weekly[0].student_id, b.id);
        assert_eq!(weekly[0].xp, 80);
        assert_eq!(weekly[1].student_id, a.id);
    }

    #[tokio::test]
    async fn test_calculate_streak_from_ledger() {
        let (svc, persistence) = setup().await;
        let s = student(&persistence, 1).await;
        assert_eq!(
            svc.calculate_streak(s.id).await.unwrap(),
            StreakSummary::default()
        );

        let mut request = XpAwardRequest::for_action(XpAction::HomeworkSubmitted);
        request.homework_id = Some(1);
        svc.award_xp(s.id, &request).await.unwrap();

        let streak = svc.calculate_streak(s.id).await.unwrap();
        assert_eq!(streak.current_streak, 1);
        assert_eq!(streak.longest_streak, 1);
        assert_eq!(streak.last_activity, Some(Utc::now().date_naive()));
    }

    #[tokio::test]
    async fn test_record_streak() {
        let (svc, persistence) = setup().await;
        let s = student(&persistence, 1).await;

        svc.record_streak(s.id, StreakKind::Homework, true)
            .await
            .unwrap();
        let counter = svc
            .record_streak(s.id, StreakKind::Homework, true)
            .await
            .unwrap();
        assert_eq!(counter, StreakCounter::new(2, 2));

        let counter = svc
            .record_streak(s.id, StreakKind::Homework, false)
            .await
            .unwrap();
        assert_eq!(counter, StreakCounter::new(0, 2));

        let other = svc
            .record_streak(s.id, StreakKind::Perfect, true)
            .await
            .unwrap();
        assert_eq!(other, StreakCounter::new(1, 1));
    }

    #[tokio::test]
    async fn test_profile() {
        let (svc, persistence) = setup().await;
        let s = student(&persistence, 1).await;
        svc.award_badge(s.id, "first_lesson", None).await.unwrap();

        let profile = svc.get_profile(s.id).await.unwrap().unwrap();
        assert_eq!(profile.total_xp, 300);
        assert_eq!(profile.rank.current_rank, 3);
        assert_eq!(profile.badges.len(), 3);
        assert_eq!(profile.recent_transactions.len(), 3);
        assert!(svc.get_profile(404).await.unwrap().is_none());
    }
}
