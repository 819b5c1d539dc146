// Typed client for the analytics endpoints

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use reqwest::Method;
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE, HeaderMap};
use serde::de::DeserializeOwned;
use tracing::debug;

use repit_analytics::{
    CurriculumEffectiveness, LessonSummary, ReportFormat, StudentProgress, TutorPerformance,
};

use crate::error::{ClientError, Result};
use crate::http::ServiceHttpClient;
use crate::student::unwrap_envelope;

pub const ANALYTICS_SERVICE: &str = "analytics";

/// Whose lessons a statistics request covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LessonScope {
    Student(i64),
    Tutor(i64),
    Everyone,
}

/// A report file as served by the analytics service
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadedReport {
    pub report_id: Option<String>,
    pub content_type: String,
    pub filename: Option<String>,
    pub body: Vec<u8>,
}

impl DownloadedReport {
    fn from_parts(headers: &HeaderMap, body: Vec<u8>) -> Self {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        Self {
            report_id: header("x-report-id"),
            content_type: header(CONTENT_TYPE.as_str())
                .unwrap_or_else(|| "application/octet-stream".to_string()),
            filename: header(CONTENT_DISPOSITION.as_str())
                .as_deref()
                .and_then(attachment_filename),
            body,
        }
    }
}

/// `attachment; filename="a.html"` -> `a.html`
fn attachment_filename(disposition: &str) -> Option<String> {
    disposition
        .split(';')
        .filter_map(|part| part.trim().strip_prefix("filename="))
        .map(|name| name.trim_matches('"').to_string())
        .find(|name| !name.is_empty())
}

fn window(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Vec<(&'static str, String)> {
    let mut query = Vec::new();
    if let Some(start) = start {
        query.push(("start", start.to_rfc3339()));
    }
    if let Some(end) = end {
        query.push(("end", end.to_rfc3339()));
    }
    query
}

/// Chat-friendly rendering of a lesson summary
pub fn statistics_message(summary: &LessonSummary, days: i64) -> String {
    if summary.total_lessons == 0 {
        return format!("📊 No lessons in the last {} days", days);
    }
    let completion = summary.completed_lessons as f64 / summary.total_lessons as f64 * 100.0;
    let mut message = format!("📊 Statistics for the last {} days\n\n", days);
    message.push_str(&format!("• Total lessons: {}\n", summary.total_lessons));
    message.push_str(&format!("• Completed: {}\n", summary.completed_lessons));
    message.push_str(&format!("• Cancelled: {}\n", summary.cancelled_lessons));
    message.push_str(&format!("• Completion: {:.1}%\n", completion));
    message.push_str(&format!("• Study time: {} min\n", summary.total_study_time));
    if let Some(top) = summary.top_subjects.first() {
        message.push_str(&format!("• Top subject: {} ({})\n", top.subject, top.count));
    }
    message
}

pub struct AnalyticsServiceClient {
    http: Arc<ServiceHttpClient>,
}

impl AnalyticsServiceClient {
    pub fn new(http: Arc<ServiceHttpClient>) -> Self {
        Self { http }
    }

    pub fn http(&self) -> &ServiceHttpClient {
        &self.http
    }

    /// GET an enveloped payload; a 404 becomes `None`
    async fn fetch<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> Result<Option<T>> {
        match self
            .http
            .request(Method::GET, ANALYTICS_SERVICE, endpoint, query, None, None)
            .await
        {
            Ok(value) => unwrap_envelope(value),
            Err(ClientError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Lesson summary over the last `days` days
    pub async fn lesson_statistics(&self, scope: LessonScope, days: i64) -> Result<LessonSummary> {
        let end = Utc::now();
        let mut query = window(Some(end - Duration::days(days)), Some(end));
        match scope {
            LessonScope::Student(id) => query.push(("student_id", id.to_string())),
            LessonScope::Tutor(id) => query.push(("tutor_id", id.to_string())),
            LessonScope::Everyone => {}
        }
        debug!(?scope, days, "Requesting lesson statistics");
        self.fetch("/analytics/lessons/summary", &query)
            .await?
            .ok_or_else(|| ClientError::Other(anyhow::anyhow!("empty lesson summary")))
    }

    pub async fn student_progress(
        &self,
        student_id: i64,
        subject: Option<&str>,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Option<StudentProgress>> {
        let mut query = window(start, end);
        if let Some(subject) = subject {
            query.push(("subject", subject.to_string()));
        }
        self.fetch(&format!("/analytics/students/{}/progress", student_id), &query)
            .await
    }

    pub async fn tutor_performance(
        &self,
        tutor_id: i64,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Option<TutorPerformance>> {
        self.fetch(
            &format!("/analytics/tutors/{}/performance", tutor_id),
            &window(start, end),
        )
        .await
    }

    pub async fn curriculum_effectiveness(
        &self,
        subject: Option<&str>,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Option<CurriculumEffectiveness>> {
        let mut query = window(start, end);
        if let Some(subject) = subject {
            query.push(("subject", subject.to_string()));
        }
        self.fetch("/analytics/curriculum", &query).await
    }

    /// Download a student's progress report; `None` when they have no lessons
    pub async fn download_progress_report(
        &self,
        student_id: i64,
        format: ReportFormat,
    ) -> Result<Option<DownloadedReport>> {
        let endpoint = format!("/analytics/reports/students/{}/progress", student_id);
        let query = [("format", format.to_string())];
        let response = match self
            .http
            .download(ANALYTICS_SERVICE, &endpoint, &query, None)
            .await
        {
            Ok(response) => response,
            Err(ClientError::NotFound(_)) => return Ok(None),
            Err(e) => return Err(e),
        };
        let headers = response.headers().clone();
        let body = response.bytes().await?.to_vec();
        Ok(Some(DownloadedReport::from_parts(&headers, body)))
    }

    /// Download the lesson report for a student's recent lessons
    pub async fn download_lesson_report(
        &self,
        student_id: i64,
        days: i64,
        format: ReportFormat,
    ) -> Result<DownloadedReport> {
        let end = Utc::now();
        let mut query = window(Some(end - Duration::days(days)), Some(end));
        query.push(("student_id", student_id.to_string()));
        query.push(("format", format.to_string()));
        let response = self
            .http
            .download(ANALYTICS_SERVICE, "/analytics/reports/lessons", &query, None)
            .await?;
        let headers = response.headers().clone();
        let body = response.bytes().await?.to_vec();
        Ok(DownloadedReport::from_parts(&headers, body))
    }
}
