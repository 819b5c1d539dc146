// Analytics service
// Loads lesson records through the persistence layer and aggregates them

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use repit_common::RepitError;
use repit_persistence::{LessonQuery, LessonRecord, NewLessonRecord, PersistenceService};

use crate::model::{
    CurriculumEffectiveness, LessonSummary, LessonTrends, StudentProgress, TrendPeriod,
    TutorPerformance,
};
use crate::report::{RenderedReport, ReportDocument, ReportFormat, ReportRenderer, describe_period};
use crate::stats;

fn check_rating(name: &str, value: Option<f64>) -> Result<(), RepitError> {
    match value {
        Some(v) if !(0.0..=5.0).contains(&v) => Err(RepitError::IllegalArgument(format!(
            "{} must be within 0..=5, got {}",
            name, v
        ))),
        _ => Ok(()),
    }
}

pub struct AnalyticsService {
    persistence: Arc<dyn PersistenceService>,
    renderer: ReportRenderer,
}

impl AnalyticsService {
    pub fn new(persistence: Arc<dyn PersistenceService>) -> Self {
        Self {
            persistence,
            renderer: ReportRenderer::new(),
        }
    }

    pub fn with_renderer(mut self, renderer: ReportRenderer) -> Self {
        self.renderer = renderer;
        self
    }

    /// Store a lesson outcome after validating its scores
    pub async fn record_lesson(&self, draft: NewLessonRecord) -> anyhow::Result<LessonRecord> {
        if draft.duration_minutes < 0 || draft.planned_duration < 0 {
            return Err(
                RepitError::IllegalArgument("durations must not be negative".to_string()).into(),
            );
        }
        check_rating("tutor_rating", draft.tutor_rating)?;
        check_rating("student_rating", draft.student_rating)?;
        check_rating("parent_rating", draft.parent_rating)?;
        check_rating("difficulty_rating", draft.difficulty_rating)?;
        check_rating("engagement_score", draft.engagement_score)?;
        check_rating("punctuality_score", draft.punctuality_score)?;

        let record = self.persistence.lesson_record_create(draft).await?;
        debug!(
            lesson_id = record.lesson_id,
            tutor_id = record.tutor_id,
            student_id = record.student_id,
            "Lesson record stored"
        );
        Ok(record)
    }

    pub async fn lesson_summary(&self, query: &LessonQuery) -> anyhow::Result<LessonSummary> {
        let lessons = self.persistence.lesson_record_find(query).await?;
        Ok(stats::lesson_summary(&lessons))
    }

    pub async fn tutor_performance(
        &self,
        tutor_id: i64,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> anyhow::Result<Option<TutorPerformance>> {
        let query = LessonQuery {
            tutor_id: Some(tutor_id),
            start,
            end,
            ..Default::default()
        };
        let lessons = self.persistence.lesson_record_find(&query).await?;
        Ok(stats::tutor_performance(tutor_id, &lessons))
    }

    pub async fn student_progress(
        &self,
        student_id: i64,
        subject: Option<String>,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> anyhow::Result<Option<StudentProgress>> {
        let query = LessonQuery {
            student_id: Some(student_id),
            subject,
            start,
            end,
            ..Default::default()
        };
        let lessons = self.persistence.lesson_record_find(&query).await?;
        Ok(stats::student_progress(
            student_id,
            query.subject.as_deref(),
            &lessons,
        ))
    }

    /// Curriculum view over every lesson in the window, optionally one subject
    pub async fn curriculum_effectiveness(
        &self,
        subject: Option<String>,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> anyhow::Result<Option<CurriculumEffectiveness>> {
        let query = LessonQuery {
            subject,
            start,
            end,
            ..Default::default()
        };
        let lessons = self.persistence.lesson_record_find(&query).await?;
        debug!(
            subject = ?query.subject,
            lessons = lessons.len(),
            "Analyzing curriculum effectiveness"
        );
        Ok(stats::curriculum_effectiveness(
            query.subject.as_deref(),
            &lessons,
        ))
    }

    /// Bucketed lesson trends; the window defaults to the period's look-back
    pub async fn lesson_trends(
        &self,
        period: TrendPeriod,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> anyhow::Result<LessonTrends> {
        let end = end.unwrap_or_else(Utc::now);
        let start = start.unwrap_or(end - Duration::days(period.default_window_days()));
        let query = LessonQuery {
            start: Some(start),
            end: Some(end),
            ..Default::default()
        };
        let lessons = self.persistence.lesson_record_find(&query).await?;
        Ok(stats::lesson_trends(period, &lessons))
    }

    pub async fn lesson_report(
        &self,
        query: &LessonQuery,
        title: Option<&str>,
        format: ReportFormat,
    ) -> anyhow::Result<RenderedReport> {
        let summary = self.lesson_summary(query).await?;
        let doc = ReportDocument::lesson_report(
            title.unwrap_or("Lesson Report"),
            describe_period(query.start, query.end),
            &summary,
        )?;
        let report = self.renderer.render(&doc, format)?;
        info!(report_id = %report.report_id, format = %format, "Lesson report generated");
        Ok(report)
    }

    /// `None` when the student has no lessons in range
    pub async fn progress_report(
        &self,
        student_id: i64,
        subject: Option<String>,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        format: ReportFormat,
    ) -> anyhow::Result<Option<RenderedReport>> {
        let Some(progress) = self.student_progress(student_id, subject, start, end).await? else {
            return Ok(None);
        };
        let doc = ReportDocument::progress_report(&progress, describe_period(start, end))?;
        let report = self.renderer.render(&doc, format)?;
        info!(report_id = %report.report_id, student_id, format = %format, "Progress report generated");
        Ok(Some(report))
    }
}
