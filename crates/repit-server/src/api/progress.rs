//! Learning goals and study sessions, mounted under `/students/{id}`

use actix_web::{get, post, put, web};
use validator::Validate;

use repit_persistence::{NewLearningGoal, NewStudySession};

use super::HandlerResult;
use super::model::{
    GoalListQuery, GoalProgressRequest, GoalRequest, SessionsQuery, StudySessionRequest,
};
use crate::model::common::AppState;
use crate::model::response::Result;

#[post("/{id}/goals")]
async fn create_goal(
    state: web::Data<AppState>,
    path: web::Path<i64>,
    body: web::Json<GoalRequest>,
) -> HandlerResult {
    body.validate()?;
    let draft = NewLearningGoal::from(body.into_inner());
    let goal = state.progress.create_goal(path.into_inner(), &draft).await?;
    Ok(Result::<()>::http_created(goal))
}

#[get("/{id}/goals")]
async fn list_goals(
    state: web::Data<AppState>,
    path: web::Path<i64>,
    query: web::Query<GoalListQuery>,
) -> HandlerResult {
    let goals = state
        .progress
        .list_goals(path.into_inner(), query.active_only)
        .await?;
    Ok(Result::<()>::http_success(goals))
}

#[put("/{id}/goals/{goal_id}/progress")]
async fn update_goal_progress(
    state: web::Data<AppState>,
    path: web::Path<(i64, i64)>,
    body: web::Json<GoalProgressRequest>,
) -> HandlerResult {
    body.validate()?;
    let (student_id, goal_id) = path.into_inner();
    let update = state
        .progress
        .update_goal_progress(student_id, goal_id, body.value)
        .await?;
    Ok(Result::<()>::http_success(update))
}

#[post("/{id}/sessions")]
async fn record_session(
    state: web::Data<AppState>,
    path: web::Path<i64>,
    body: web::Json<StudySessionRequest>,
) -> HandlerResult {
    body.validate()?;
    let draft = NewStudySession::from(body.into_inner());
    let recorded = state
        .progress
        .record_session(path.into_inner(), &draft)
        .await?;
    Ok(Result::<()>::http_created(recorded))
}

#[get("/{id}/sessions")]
async fn recent_sessions(
    state: web::Data<AppState>,
    path: web::Path<i64>,
    query: web::Query<SessionsQuery>,
) -> HandlerResult {
    query.validate()?;
    let sessions = state
        .progress
        .recent_sessions(path.into_inner(), query.days())
        .await?;
    Ok(Result::<()>::http_success(sessions))
}

#[get("/{id}/sessions/summary")]
async fn study_summary(
    state: web::Data<AppState>,
    path: web::Path<i64>,
    query: web::Query<SessionsQuery>,
) -> HandlerResult {
    query.validate()?;
    let summary = state
        .progress
        .study_summary(path.into_inner(), query.days())
        .await?;
    Ok(Result::<()>::http_success(summary))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(create_goal)
        .service(list_goals)
        .service(update_goal_progress)
        .service(record_session)
        .service(study_summary)
        .service(recent_sessions);
}
