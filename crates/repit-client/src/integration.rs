// Bot-facing student integration
// Resolves platform users to student profiles and degrades gracefully when
// the student service is unreachable.

use std::collections::BTreeMap;
use std::future::Future;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use repit_common::{AchievementRarity, LessonKind, StreakKind};
use repit_gamification::{
    EarnedAchievement, LevelUp, StatsDelta, StudentDashboard, XpGrant, homework_xp, is_perfect,
    lesson_xp,
};
use repit_persistence::{NewStudent, StudentProfile};

use crate::error::{ClientError, Result};
use crate::student::StudentServiceClient;

const RECENT_ACHIEVEMENTS: usize = 5;

/// Run `primary`; on an unavailable service or an API error, run `fallback` instead
pub async fn with_fallback<T, P, F, Fut>(primary: P, fallback: F) -> Result<T>
where
    P: Future<Output = Result<T>>,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    match primary.await {
        Err(e) if e.is_recoverable() => {
            warn!("Primary call failed, using fallback: {}", e);
            fallback().await
        }
        other => other,
    }
}

/// Level-1 placeholder used while the student service is down
pub fn default_profile(user_id: i64) -> StudentProfile {
    StudentProfile::new(
        0,
        &NewStudent {
            user_id,
            display_name: Some(format!("User {}", user_id)),
            ..Default::default()
        },
        Utc::now(),
    )
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XpResult {
    pub student_id: i64,
    pub xp_added: i64,
    pub level_up: Option<LevelUp>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakUpdate {
    pub current_streak: i32,
    pub best_streak: i32,
    pub is_new_best: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AchievementDigest {
    pub total: usize,
    pub recent: Vec<EarnedAchievement>,
    pub by_rarity: BTreeMap<AchievementRarity, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardView {
    pub profile: StudentProfile,
    pub achievements: AchievementDigest,
    /// Full service dashboard, absent when it could not be loaded
    pub details: Option<StudentDashboard>,
}

/// Count achievements per rarity; every rarity appears, zero included
pub fn group_by_rarity(achievements: &[EarnedAchievement]) -> BTreeMap<AchievementRarity, usize> {
    let mut counts: BTreeMap<AchievementRarity, usize> =
        AchievementRarity::ALL.iter().map(|&r| (r, 0)).collect();
    for earned in achievements {
        *counts.entry(earned.achievement.rarity).or_default() += 1;
    }
    counts
}

pub struct StudentIntegration {
    client: StudentServiceClient,
    fallback_enabled: bool,
}

impl StudentIntegration {
    pub fn new(client: StudentServiceClient, fallback_enabled: bool) -> Self {
        Self {
            client,
            fallback_enabled,
        }
    }

    pub fn client(&self) -> &StudentServiceClient {
        &self.client
    }

    /// Existing profile for `user_id`, creating one on first contact
    pub async fn get_or_create_profile(&self, user_id: i64) -> Result<StudentProfile> {
        let resolved = async {
            if let Some(profile) = self.client.get_student_by_user(user_id).await? {
                return Ok(profile);
            }
            let profile = self
                .client
                .create_student(&NewStudent {
                    user_id,
                    display_name: Some(format!("User {}", user_id)),
                    ..Default::default()
                })
                .await?;
            info!(user_id, student_id = profile.id, "Student profile created");
            Ok::<_, ClientError>(profile)
        };

        match resolved.await {
            Ok(profile) => Ok(profile),
            Err(e) if self.fallback_enabled => {
                warn!(user_id, "Using default profile: {}", e);
                Ok(default_profile(user_id))
            }
            Err(e) => Err(e),
        }
    }

    /// Grant XP to the user's profile; `None` when anything fails
    pub async fn add_experience_points(
        &self,
        user_id: i64,
        amount: i64,
        reason: &str,
        category: &str,
    ) -> Option<XpResult> {
        let outcome = async {
            let profile = self.client.get_student_by_user(user_id).await?;
            let Some(profile) = profile else {
                return Ok(None);
            };
            let level_up = self
                .client
                .add_experience(profile.id, &XpGrant::new(amount, reason, category))
                .await?;
            Ok::<_, ClientError>(Some(XpResult {
                student_id: profile.id,
                xp_added: amount,
                level_up,
            }))
        };

        match outcome.await {
            Ok(result) => result,
            Err(e) => {
                error!(user_id, amount, "Failed to add experience: {}", e);
                None
            }
        }
    }

    async fn bump_stats(&self, student_id: i64, delta: &StatsDelta) {
        if let Err(e) = self.client.update_stats(student_id, delta).await {
            warn!(student_id, "Failed to update stats: {}", e);
        }
    }

    pub async fn record_lesson_completion(
        &self,
        user_id: i64,
        kind: LessonKind,
        score: Option<f64>,
    ) -> Option<XpResult> {
        let xp = lesson_xp(kind, score);
        let result = self
            .add_experience_points(user_id, xp, "Lesson completed", "lesson")
            .await?;
        self.bump_stats(
            result.student_id,
            &StatsDelta {
                lessons_completed: Some(1),
                ..Default::default()
            },
        )
        .await;
        Some(result)
    }

    pub async fn record_homework_submission(
        &self,
        user_id: i64,
        score: Option<f64>,
    ) -> Option<XpResult> {
        let xp = homework_xp(score);
        let result = self
            .add_experience_points(user_id, xp, "Homework submitted", "homework")
            .await?;
        self.bump_stats(
            result.student_id,
            &StatsDelta {
                homework_submitted: Some(1),
                homework_perfect: is_perfect(score).then_some(1),
                ..Default::default()
            },
        )
        .await;
        Some(result)
    }

    /// Record a study day outcome; zeros when the service cannot be reached
    pub async fn update_study_streak(&self, user_id: i64, success: bool) -> StreakUpdate {
        let outcome = async {
            let profile = self.get_or_create_profile(user_id).await?;
            self.client
                .record_streak(profile.id, StreakKind::Study, success)
                .await
        };

        match outcome.await {
            Ok(counter) => StreakUpdate {
                current_streak: counter.current,
                best_streak: counter.best,
                is_new_best: success && counter.current > 0 && counter.current == counter.best,
            },
            Err(e) => {
                error!(user_id, "Failed to update study streak: {}", e);
                StreakUpdate::default()
            }
        }
    }

    /// Profile plus achievement digest; `None` when the service is unreachable
    pub async fn dashboard(&self, user_id: i64) -> Option<DashboardView> {
        let profile = match self.get_or_create_profile(user_id).await {
            Ok(profile) => profile,
            Err(e) => {
                error!(user_id, "Failed to load dashboard: {}", e);
                return None;
            }
        };

        let achievements = if profile.id > 0 {
            with_fallback(self.client.get_student_achievements(profile.id), || async {
                Ok(Vec::new())
            })
            .await
            .unwrap_or_default()
        } else {
            Vec::new()
        };
        let details = if profile.id > 0 {
            self.client.get_dashboard(profile.id).await.ok().flatten()
        } else {
            None
        };

        Some(DashboardView {
            achievements: AchievementDigest {
                total: achievements.len(),
                by_rarity: group_by_rarity(&achievements),
                recent: achievements.into_iter().take(RECENT_ACHIEVEMENTS).collect(),
            },
            profile,
            details,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_with_fallback() {
        let value = with_fallback(async { Ok(1) }, || async { Ok(2) }).await;
        assert_eq!(value.unwrap(), 1);

        let value = with_fallback(
            async { Err(ClientError::ServiceUnavailable("student".to_string())) },
            || async { Ok(2) },
        )
        .await;
        assert_eq!(value.unwrap(), 2);

        let value: Result<i32> = with_fallback(
            async { Err(ClientError::NotFound("x".to_string())) },
            || async { Ok(2) },
        )
        .await;
        assert!(matches!(value, Err(ClientError::NotFound(_))));
    }

    #[test]
    fn test_default_profile() {
        let profile = default_profile(42);
        assert_eq!(profile.user_id, 42);
        assert_eq!(profile.level, 1);
        assert_eq!(profile.experience_points, 0);
        assert_eq!(profile.display_name.as_deref(), Some("User 42"));
    }

    #[test]
    fn test_group_by_rarity_empty() {
        let counts = group_by_rarity(&[]);
        assert_eq!(counts.len(), 4);
        assert!(counts.values().all(|&c| c == 0));
    }
}
