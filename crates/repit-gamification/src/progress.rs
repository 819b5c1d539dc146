// Learning progress service
// Learning goals and study sessions; session time rolls into the student's stats

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use repit_common::RepitError;
use repit_persistence::{
    LearningGoal, NewLearningGoal, NewStudySession, PersistenceService, StudySession,
};

use crate::leveling::ExponentialCurve;
use crate::student::{StatsDelta, StudentService};

pub const DEFAULT_SUMMARY_DAYS: i64 = 30;
/// Longest single session accepted, one day
pub const MAX_SESSION_MINUTES: i64 = 24 * 60;
const GENERAL_SUBJECT: &str = "general";

/// A goal with its completion share
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalProgress {
    #[serde(flatten)]
    pub goal: LearningGoal,
    pub progress_percentage: f64,
}

impl From<LearningGoal> for GoalProgress {
    fn from(goal: LearningGoal) -> Self {
        Self {
            progress_percentage: round2(goal.progress_percentage()),
            goal,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalUpdate {
    pub goal: GoalProgress,
    /// Set only by the update that reached the target
    pub just_completed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecorded {
    pub session: StudySession,
    pub study_time_minutes: i64,
    pub current_streak: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StudySummary {
    pub period_days: i64,
    pub total_sessions: usize,
    pub total_minutes: i64,
    pub average_session_minutes: f64,
    pub active_days: usize,
    pub sessions_per_week: f64,
    pub average_focus: Option<f64>,
    pub minutes_by_subject: BTreeMap<String, i64>,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Aggregate sessions already restricted to the last `days` days
pub fn study_summary(sessions: &[StudySession], days: i64) -> StudySummary {
    let days = days.max(1);
    let total_minutes = sessions
        .iter()
        .fold(0i64, |sum, s| sum.saturating_add(s.duration_minutes));
    let active_days: BTreeSet<_> = sessions.iter().map(|s| s.started_at.date_naive()).collect();
    let focus: Vec<f64> = sessions.iter().filter_map(|s| s.focus_score).collect();

    let mut minutes_by_subject = BTreeMap::new();
    for session in sessions {
        let subject = session.subject.as_deref().unwrap_or(GENERAL_SUBJECT);
        *minutes_by_subject.entry(subject.to_string()).or_insert(0i64) += session.duration_minutes;
    }

    StudySummary {
        period_days: days,
        total_sessions: sessions.len(),
        total_minutes,
        average_session_minutes: if sessions.is_empty() {
            0.0
        } else {
            round2(total_minutes as f64 / sessions.len() as f64)
        },
        active_days: active_days.len(),
        sessions_per_week: round2(sessions.len() as f64 * 7.0 / days as f64),
        average_focus: (!focus.is_empty())
            .then(|| round2(focus.iter().sum::<f64>() / focus.len() as f64)),
        minutes_by_subject,
    }
}

fn check_score(name: &str, value: Option<f64>) -> Result<(), RepitError> {
    match value {
        Some(v) if !(0.0..=100.0).contains(&v) => Err(RepitError::IllegalArgument(format!(
            "{} must be within 0..=100, got {}",
            name, v
        ))),
        _ => Ok(()),
    }
}

pub struct ProgressService {
    persistence: Arc<dyn PersistenceService>,
    students: StudentService,
}

impl ProgressService {
    pub fn new(persistence: Arc<dyn PersistenceService>, curve: ExponentialCurve) -> Self {
        Self {
            students: StudentService::new(persistence.clone(), curve),
            persistence,
        }
    }

    async fn require_student(&self, student_id: i64) -> anyhow::Result<()> {
        match self.students.get_student(student_id).await? {
            Some(_) => Ok(()),
            None => Err(RepitError::StudentNotExist(student_id).into()),
        }
    }

    pub async fn create_goal(
        &self,
        student_id: i64,
        draft: &NewLearningGoal,
    ) -> anyhow::Result<GoalProgress> {
        if draft.title.trim().is_empty() {
            return Err(
                RepitError::IllegalArgument("goal title must not be blank".to_string()).into(),
            );
        }
        if !draft.target_value.is_finite() || draft.target_value <= 0.0 {
            return Err(RepitError::IllegalArgument(format!(
                "target_value must be positive, got {}",
                draft.target_value
            ))
            .into());
        }
        self.require_student(student_id).await?;

        let goal = self.persistence.goal_create(student_id, draft).await?;
        info!(student_id, goal_id = goal.id, title = %goal.title, "Learning goal created");
        Ok(goal.into())
    }

    pub async fn list_goals(
        &self,
        student_id: i64,
        active_only: bool,
    ) -> anyhow::Result<Vec<GoalProgress>> {
        self.require_student(student_id).await?;
        Ok(self
            .persistence
            .goal_find_by_student(student_id, active_only)
            .await?
            .into_iter()
            .map(GoalProgress::from)
            .collect())
    }

    /// Set a goal's current value; goals of other students count as missing
    pub async fn update_goal_progress(
        &self,
        student_id: i64,
        goal_id: i64,
        value: f64,
    ) -> anyhow::Result<GoalUpdate> {
        if !value.is_finite() || value < 0.0 {
            return Err(RepitError::IllegalArgument(format!(
                "progress value must not be negative, got {}",
                value
            ))
            .into());
        }
        let mut goal = self
            .persistence
            .goal_find_by_id(goal_id)
            .await?
            .filter(|g| g.student_id == student_id)
            .ok_or(RepitError::GoalNotExist(goal_id))?;

        let just_completed = goal.update_progress(value, Utc::now());
        let goal = self.persistence.goal_save(&goal).await?;
        if just_completed {
            metrics::counter!("repit_goals_completed_total").increment(1);
            info!(student_id, goal_id, "Learning goal completed");
        }
        Ok(GoalUpdate {
            goal: goal.into(),
            just_completed,
        })
    }

    /// Store a session and add its minutes to the student's study time
    pub async fn record_session(
        &self,
        student_id: i64,
        draft: &NewStudySession,
    ) -> anyhow::Result<SessionRecorded> {
        if draft.activity_type.trim().is_empty() {
            return Err(
                RepitError::IllegalArgument("activity_type must not be blank".to_string()).into(),
            );
        }
        if draft.duration_minutes.is_some_and(|m| m < 0) {
            return Err(
                RepitError::IllegalArgument("duration must not be negative".to_string()).into(),
            );
        }
        if draft.resolved_duration() > MAX_SESSION_MINUTES {
            return Err(RepitError::IllegalArgument(format!(
                "a session may last at most {} minutes",
                MAX_SESSION_MINUTES
            ))
            .into());
        }
        check_score("focus_score", draft.focus_score)?;
        check_score("productivity_score", draft.productivity_score)?;
        check_score("satisfaction_score", draft.satisfaction_score)?;
        self.require_student(student_id).await?;

        let session = self
            .persistence
            .study_session_create(student_id, draft)
            .await?;
        let delta = StatsDelta {
            study_time_minutes: Some(session.duration_minutes),
            ..Default::default()
        };
        if !self.students.update_student_stats(student_id, &delta).await? {
            return Err(RepitError::StudentNotExist(student_id).into());
        }
        let student = self
            .students
            .get_student(student_id)
            .await?
            .ok_or(RepitError::StudentNotExist(student_id))?;

        metrics::counter!("repit_study_minutes_total").increment(session.duration_minutes as u64);
        debug!(
            student_id,
            session_id = session.id,
            minutes = session.duration_minutes,
            activity = %session.activity_type,
            "Study session recorded"
        );
        Ok(SessionRecorded {
            session,
            study_time_minutes: student.study_time_minutes,
            current_streak: student.current_streak,
        })
    }

    /// Sessions from the last `days` days, oldest first
    pub async fn recent_sessions(
        &self,
        student_id: i64,
        days: i64,
    ) -> anyhow::Result<Vec<StudySession>> {
        self.require_student(student_id).await?;
        let since = Utc::now() - Duration::days(days.max(1));
        self.persistence
            .study_session_find(student_id, Some(since))
            .await
    }

    pub async fn study_summary(&self, student_id: i64, days: i64) -> anyhow::Result<StudySummary> {
        let sessions = self.recent_sessions(student_id, days).await?;
        Ok(study_summary(&sessions, days))
    }
}
