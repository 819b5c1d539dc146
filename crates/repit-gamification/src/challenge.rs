// Time-boxed challenges: joining, progress tracking and reward claims

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use repit_common::{RepitError, XpAction};
use repit_persistence::{Challenge, ChallengeParticipation, NewChallenge, PersistenceService};

use crate::gamification::{GamificationService, XpAward, XpAwardRequest};
use crate::leveling::round2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChallengeProgress {
    pub participation: ChallengeParticipation,
    pub progress_percent: f64,
    /// Set when this update completed the challenge
    pub just_completed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChallengeReward {
    pub participation: ChallengeParticipation,
    pub xp_awarded: i64,
    pub badges_awarded: Vec<String>,
}

/// Percentage of `target` reached by `value`, capped at 100
pub fn challenge_progress(value: i64, target: i64) -> f64 {
    if target <= 0 {
        return 0.0;
    }
    round2((value as f64 / target as f64 * 100.0).min(100.0))
}

pub struct ChallengeService {
    persistence: Arc<dyn PersistenceService>,
    gamification: Arc<GamificationService>,
}

impl ChallengeService {
    pub fn new(
        persistence: Arc<dyn PersistenceService>,
        gamification: Arc<GamificationService>,
    ) -> Self {
        Self {
            persistence,
            gamification,
        }
    }

    pub async fn create_challenge(&self, draft: &NewChallenge) -> anyhow::Result<Challenge> {
        if draft.title.trim().is_empty() {
            return Err(RepitError::IllegalArgument("title must not be empty".to_string()).into());
        }
        if draft.end_date < draft.start_date {
            return Err(RepitError::IllegalArgument(
                "end_date must not precede start_date".to_string(),
            )
            .into());
        }

        let challenge = self.persistence.challenge_create(draft).await?;
        info!(challenge_id = challenge.id, title = %challenge.title, "Challenge created");
        Ok(challenge)
    }

    pub async fn get_challenge(&self, challenge_id: i64) -> anyhow::Result<Option<Challenge>> {
        self.persistence.challenge_find_by_id(challenge_id).await
    }

    /// Active challenges whose window contains now
    pub async fn list_active_challenges(&self) -> anyhow::Result<Vec<Challenge>> {
        let now = Utc::now();
        Ok(self
            .persistence
            .challenge_find_active()
            .await?
            .into_iter()
            .filter(|c| c.is_ongoing(now))
            .collect())
    }

    async fn require_challenge(&self, challenge_id: i64) -> anyhow::Result<Challenge> {
        self.persistence
            .challenge_find_by_id(challenge_id)
            .await?
            .ok_or_else(|| RepitError::ChallengeNotExist(challenge_id).into())
    }

    async fn require_participation(
        &self,
        challenge_id: i64,
        student_id: i64,
    ) -> anyhow::Result<ChallengeParticipation> {
        self.persistence
            .participation_find(challenge_id, student_id)
            .await?
            .ok_or_else(|| {
                RepitError::IllegalArgument(format!(
                    "student {} has not joined challenge {}",
                    student_id, challenge_id
                ))
                .into()
            })
    }

    /// Join a challenge; joining again returns the existing participation
    pub async fn join_challenge(
        &self,
        challenge_id: i64,
        student_id: i64,
    ) -> anyhow::Result<ChallengeParticipation> {
        let challenge = self.require_challenge(challenge_id).await?;
        if self
            .persistence
            .student_find_by_id(student_id)
            .await?
            .is_none()
        {
            return Err(RepitError::StudentNotExist(student_id).into());
        }

        if let Some(existing) = self
            .persistence
            .participation_find(challenge_id, student_id)
            .await?
        {
            return Ok(existing);
        }

        if !challenge.is_active {
            return Err(RepitError::ChallengeClosed(challenge_id, "inactive".to_string()).into());
        }
        if !challenge.is_ongoing(Utc::now()) {
            return Err(
                RepitError::ChallengeClosed(challenge_id, "not running".to_string()).into(),
            );
        }
        if let Some(max) = challenge.max_participants {
            let joined = self.persistence.participation_count(challenge_id).await?;
            if joined as i64 >= max {
                return Err(RepitError::ChallengeClosed(challenge_id, "full".to_string()).into());
            }
        }

        let participation = self
            .persistence
            .participation_create(challenge_id, student_id)
            .await?;
        info!(challenge_id, student_id, "Student joined challenge");
        Ok(participation)
    }

    /// Set the participant's current value for the challenge metric
    pub async fn update_challenge_progress(
        &self,
        challenge_id: i64,
        student_id: i64,
        value: i64,
    ) -> anyhow::Result<ChallengeProgress> {
        let challenge = self.require_challenge(challenge_id).await?;
        let mut participation = self.require_participation(challenge_id, student_id).await?;

        participation.current_value = value;
        let just_completed = !participation.is_completed && value >= challenge.target_value;
        if just_completed {
            participation.is_completed = true;
            participation.completed_at = Some(Utc::now());
            info!(challenge_id, student_id, "Challenge completed");
        }
        let participation = self.persistence.participation_save(&participation).await?;

        Ok(ChallengeProgress {
            progress_percent: challenge_progress(value, challenge.target_value),
            participation,
            just_completed,
        })
    }

    /// Grant the challenge XP for a completed participation, once
    pub async fn claim_challenge_reward(
        &self,
        challenge_id: i64,
        student_id: i64,
    ) -> anyhow::Result<ChallengeReward> {
        let challenge = self.require_challenge(challenge_id).await?;
        let mut participation = self.require_participation(challenge_id, student_id).await?;

        if !participation.is_completed {
            return Err(RepitError::IllegalArgument("challenge is not completed".to_string()).into());
        }
        if participation.reward_claimed {
            return Err(RepitError::IllegalArgument("reward already claimed".to_string()).into());
        }

        participation.reward_claimed = true;
        let participation = self.persistence.participation_save(&participation).await?;

        let mut xp_awarded = 0;
        let mut badges_awarded = Vec::new();
        if challenge.xp_reward > 0 {
            let request = XpAwardRequest {
                action: XpAction::CompetitionWin,
                amount: Some(challenge.xp_reward),
                lesson_id: None,
                homework_id: None,
                description: Some(format!("Вызов выполнен: {}", challenge.title)),
            };
            if let XpAward::Granted(granted) =
                self.gamification.award_xp(student_id, &request).await?
            {
                xp_awarded = granted.xp_awarded;
                badges_awarded = granted.badges_awarded;
            }
        }

        info!(challenge_id, student_id, xp_awarded, "Challenge reward claimed");
        Ok(ChallengeReward {
            participation,
            xp_awarded,
            badges_awarded,
        })
    }
}
