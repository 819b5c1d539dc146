//! Lesson analytics and report downloads

use actix_web::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use actix_web::{HttpResponse, Scope, get, post, web};

use repit_analytics::{RenderedReport, ReportFormat, TrendPeriod};
use repit_persistence::{LessonQuery, NewLessonRecord};

use super::HandlerResult;
use super::model::{LessonReportQuery, PeriodQuery, ProgressQuery, TrendsQuery};
use crate::error::{NO_LESSON_DATA, REPORT_FORMAT_UNSUPPORTED, not_found};
use crate::metrics::{record_lesson_stored, record_report};
use crate::model::common::AppState;
use crate::model::response::Result;

fn no_data(message: String) -> HttpResponse {
    not_found(&NO_LESSON_DATA, message)
}

/// `html` when absent; unknown names answer 400
fn parse_format(format: Option<&str>) -> std::result::Result<ReportFormat, HttpResponse> {
    match format {
        None => Ok(ReportFormat::Html),
        Some(name) => name.parse().map_err(|e: String| {
            Result::<()>::http_response(400, REPORT_FORMAT_UNSUPPORTED.code, e, ())
        }),
    }
}

fn download(kind: &str, report: RenderedReport) -> HttpResponse {
    record_report(kind, report.format.as_str());
    HttpResponse::Ok()
        .insert_header((CONTENT_TYPE, report.content_type))
        .insert_header((
            CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", report.filename),
        ))
        .insert_header(("X-Report-Id", report.report_id.to_string()))
        .body(report.body)
}

#[post("/lessons")]
async fn record_lesson(
    state: web::Data<AppState>,
    body: web::Json<NewLessonRecord>,
) -> HandlerResult {
    let record = state.analytics.record_lesson(body.into_inner()).await?;
    record_lesson_stored(&record.subject);
    Ok(Result::<()>::http_created(record))
}

#[get("/lessons/summary")]
async fn lesson_summary(
    state: web::Data<AppState>,
    query: web::Query<LessonQuery>,
) -> HandlerResult {
    let summary = state.analytics.lesson_summary(&query).await?;
    Ok(Result::<()>::http_success(summary))
}

#[get("/lessons/trends")]
async fn lesson_trends(
    state: web::Data<AppState>,
    query: web::Query<TrendsQuery>,
) -> HandlerResult {
    let trends = state
        .analytics
        .lesson_trends(
            query.period.unwrap_or(TrendPeriod::Week),
            query.start,
            query.end,
        )
        .await?;
    Ok(Result::<()>::http_success(trends))
}

#[get("/tutors/{id}/performance")]
async fn tutor_performance(
    state: web::Data<AppState>,
    path: web::Path<i64>,
    query: web::Query<PeriodQuery>,
) -> HandlerResult {
    let tutor_id = path.into_inner();
    Ok(
        match state
            .analytics
            .tutor_performance(tutor_id, query.start, query.end)
            .await?
        {
            Some(performance) => Result::<()>::http_success(performance),
            None => no_data(format!("no lessons recorded for tutor '{}'", tutor_id)),
        },
    )
}

#[get("/students/{id}/progress")]
async fn student_progress(
    state: web::Data<AppState>,
    path: web::Path<i64>,
    query: web::Query<ProgressQuery>,
) -> HandlerResult {
    let student_id = path.into_inner();
    let ProgressQuery {
        subject, start, end, ..
    } = query.into_inner();
    Ok(
        match state
            .analytics
            .student_progress(student_id, subject, start, end)
            .await?
        {
            Some(progress) => Result::<()>::http_success(progress),
            None => no_data(format!("no lessons recorded for student '{}'", student_id)),
        },
    )
}

#[get("/curriculum")]
async fn curriculum_effectiveness(
    state: web::Data<AppState>,
    query: web::Query<ProgressQuery>,
) -> HandlerResult {
    let ProgressQuery {
        subject, start, end, ..
    } = query.into_inner();
    let label = subject.clone().unwrap_or_else(|| "any subject".to_string());
    Ok(
        match state
            .analytics
            .curriculum_effectiveness(subject, start, end)
            .await?
        {
            Some(curriculum) => Result::<()>::http_success(curriculum),
            None => no_data(format!("no lessons recorded for {}", label)),
        },
    )
}

#[get("/reports/lessons")]
async fn lesson_report(
    state: web::Data<AppState>,
    query: web::Query<LessonReportQuery>,
) -> HandlerResult {
    let format = match parse_format(query.format.as_deref()) {
        Ok(format) => format,
        Err(response) => return Ok(response),
    };
    let report = state
        .analytics
        .lesson_report(&query.lesson_query(), query.title.as_deref(), format)
        .await?;
    Ok(download("lessons", report))
}

#[get("/reports/students/{id}/progress")]
async fn progress_report(
    state: web::Data<AppState>,
    path: web::Path<i64>,
    query: web::Query<ProgressQuery>,
) -> HandlerResult {
    let format = match parse_format(query.format.as_deref()) {
        Ok(format) => format,
        Err(response) => return Ok(response),
    };
    let student_id = path.into_inner();
    let ProgressQuery {
        subject, start, end, ..
    } = query.into_inner();
    Ok(
        match state
            .analytics
            .progress_report(student_id, subject, start, end, format)
            .await?
        {
            Some(report) => download("progress", report),
            None => no_data(format!("no lessons recorded for student '{}'", student_id)),
        },
    )
}

pub fn routes() -> Scope {
    web::scope("/analytics")
        .service(record_lesson)
        .service(lesson_summary)
        .service(lesson_trends)
        .service(tutor_performance)
        .service(student_progress)
        .service(curriculum_effectiveness)
        .service(lesson_report)
        .service(progress_report)
}
