//! Student profile endpoints

use actix_web::{Scope, delete, get, patch, post, put, web};
use tracing::info;
use validator::Validate;

use repit_gamification::{ActivityOutcome, StatsDelta};
use repit_persistence::{NewStudent, StudentPatch};

use super::HandlerResult;
use super::model::{
    ActivityResponse, CreateStudentRequest, Deleted, ExperienceRequest, HomeworkEvent,
    StudentSearchQuery, UpdateStatsRequest, UpdateStudentRequest,
};
use crate::error::{AppError, STUDENT_NOT_EXIST, not_found};
use crate::model::common::AppState;
use crate::model::response::Result;

fn missing(student_id: i64) -> actix_web::HttpResponse {
    not_found(&STUDENT_NOT_EXIST, format!("student '{}' not exist", student_id))
}

#[post("")]
async fn create_student(
    state: web::Data<AppState>,
    body: web::Json<CreateStudentRequest>,
) -> HandlerResult {
    body.validate()?;
    let draft = NewStudent::from(body.into_inner());
    let student = state.students.create_student(&draft).await?;
    Ok(Result::<()>::http_created(student))
}

#[get("")]
async fn search_students(
    state: web::Data<AppState>,
    query: web::Query<StudentSearchQuery>,
) -> HandlerResult {
    query.validate()?;
    let page = state
        .students
        .search_students(&query.filters(), query.limit(), query.offset())
        .await?;
    Ok(Result::<()>::http_success(page))
}

#[get("/by-user/{user_id}")]
async fn get_student_by_user(state: web::Data<AppState>, path: web::Path<i64>) -> HandlerResult {
    let user_id = path.into_inner();
    Ok(match state.students.get_student_by_user_id(user_id).await? {
        Some(student) => Result::<()>::http_success(student),
        None => not_found(
            &STUDENT_NOT_EXIST,
            format!("no student profile for user '{}'", user_id),
        ),
    })
}

#[get("/{id}")]
async fn get_student(state: web::Data<AppState>, path: web::Path<i64>) -> HandlerResult {
    let student_id = path.into_inner();
    Ok(match state.students.get_student(student_id).await? {
        Some(student) => Result::<()>::http_success(student),
        None => missing(student_id),
    })
}

#[put("/{id}")]
async fn update_student(
    state: web::Data<AppState>,
    path: web::Path<i64>,
    body: web::Json<UpdateStudentRequest>,
) -> HandlerResult {
    body.validate()?;
    let student_id = path.into_inner();
    let patch = StudentPatch::from(body.into_inner());
    Ok(match state.students.update_student(student_id, &patch).await? {
        Some(student) => Result::<()>::http_success(student),
        None => missing(student_id),
    })
}

#[delete("/{id}")]
async fn delete_student(state: web::Data<AppState>, path: web::Path<i64>) -> HandlerResult {
    let student_id = path.into_inner();
    if !state.students.delete_student(student_id).await? {
        return Ok(missing(student_id));
    }
    state.invalidate_leaderboards();
    Ok(Result::<()>::http_success(Deleted { deleted: true }))
}

#[post("/{id}/experience")]
async fn add_experience(
    state: web::Data<AppState>,
    path: web::Path<i64>,
    body: web::Json<ExperienceRequest>,
) -> HandlerResult {
    body.validate()?;
    let student_id = path.into_inner();
    let outcome = state
        .students
        .add_experience(student_id, &body.into_inner().into())
        .await?;
    state.invalidate_leaderboards();
    Ok(Result::<()>::http_success(outcome))
}

#[patch("/{id}/stats")]
async fn update_stats(
    state: web::Data<AppState>,
    path: web::Path<i64>,
    body: web::Json<UpdateStatsRequest>,
) -> HandlerResult {
    body.validate()?;
    let student_id = path.into_inner();
    let delta = StatsDelta::from(body.into_inner());
    if !state
        .students
        .update_student_stats(student_id, &delta)
        .await?
    {
        return Ok(missing(student_id));
    }
    Ok(Result::<()>::http_success(true))
}

#[get("/{id}/dashboard")]
async fn get_dashboard(state: web::Data<AppState>, path: web::Path<i64>) -> HandlerResult {
    let student_id = path.into_inner();
    Ok(match state.students.get_dashboard(student_id).await? {
        Some(dashboard) => Result::<()>::http_success(dashboard),
        None => missing(student_id),
    })
}

#[get("/{id}/level")]
async fn get_level(state: web::Data<AppState>, path: web::Path<i64>) -> HandlerResult {
    let student_id = path.into_inner();
    Ok(match state.students.level_info(student_id).await? {
        Some(info) => Result::<()>::http_success(info),
        None => missing(student_id),
    })
}

#[post("/{id}/level-up")]
async fn level_up(state: web::Data<AppState>, path: web::Path<i64>) -> HandlerResult {
    let outcome = state
        .students
        .trigger_level_check(path.into_inner())
        .await?;
    Ok(Result::<()>::http_success(outcome))
}

/// Run the achievement check after an activity hook
async fn with_unlocks(
    state: &AppState,
    student_id: i64,
    outcome: ActivityOutcome,
) -> std::result::Result<ActivityResponse, AppError> {
    let achievements_unlocked = state
        .achievements
        .check_achievements_for_student(student_id)
        .await?;
    state.invalidate_leaderboards();
    info!(
        student_id,
        xp_earned = outcome.xp_earned,
        unlocked = achievements_unlocked.len(),
        "Activity recorded"
    );
    Ok(ActivityResponse {
        outcome,
        achievements_unlocked,
    })
}

#[post("/{id}/events/lesson-completed")]
async fn lesson_completed(state: web::Data<AppState>, path: web::Path<i64>) -> HandlerResult {
    let student_id = path.into_inner();
    let outcome = state.students.on_lesson_completed(student_id).await?;
    let response = with_unlocks(&state, student_id, outcome).await?;
    Ok(Result::<()>::http_success(response))
}

#[post("/{id}/events/homework-submitted")]
async fn homework_submitted(
    state: web::Data<AppState>,
    path: web::Path<i64>,
    body: Option<web::Json<HomeworkEvent>>,
) -> HandlerResult {
    let event = body.map(|b| b.into_inner()).unwrap_or_default();
    event.validate()?;
    let student_id = path.into_inner();
    let outcome = state
        .students
        .on_homework_submitted(student_id, event.score)
        .await?;
    let response = with_unlocks(&state, student_id, outcome).await?;
    Ok(Result::<()>::http_success(response))
}

pub fn routes() -> Scope {
    web::scope("/students")
        .service(create_student)
        .service(search_students)
        .service(get_student_by_user)
        .service(get_student)
        .service(update_student)
        .service(delete_student)
        .service(add_experience)
        .service(update_stats)
        .service(get_dashboard)
        .service(get_level)
        .service(level_up)
        .service(lesson_completed)
        .service(homework_submitted)
        .configure(super::progress::configure)
}
