//! Achievement catalogue and unlock endpoints

use actix_web::{Scope, delete, get, post, put, web};
use validator::Validate;

use repit_common::{AchievementRarity, AchievementType};
use repit_persistence::{AchievementFilters, AchievementPatch, NewAchievement};

use super::HandlerResult;
use super::model::{AchievementRequest, Deleted, Seeded, UpdateAchievementRequest};
use crate::error::{ACHIEVEMENT_NOT_EXIST, not_found};
use crate::model::common::AppState;
use crate::model::response::Result;

fn missing(id: i64) -> actix_web::HttpResponse {
    not_found(&ACHIEVEMENT_NOT_EXIST, format!("achievement '{}' not exist", id))
}

#[post("")]
async fn create_achievement(
    state: web::Data<AppState>,
    body: web::Json<AchievementRequest>,
) -> HandlerResult {
    body.validate()?;
    let draft = NewAchievement::from(body.into_inner());
    let achievement = state.achievements.create_achievement(&draft).await?;
    Ok(Result::<()>::http_created(achievement))
}

#[get("")]
async fn list_achievements(
    state: web::Data<AppState>,
    filters: web::Query<AchievementFilters>,
) -> HandlerResult {
    let achievements = state.achievements.list_achievements(&filters).await?;
    Ok(Result::<()>::http_success(achievements))
}

#[get("/types")]
async fn achievement_types() -> HandlerResult {
    let types: Vec<&str> = AchievementType::ALL.iter().map(|t| t.as_str()).collect();
    Ok(Result::<()>::http_success(types))
}

#[get("/rarities")]
async fn achievement_rarities() -> HandlerResult {
    let rarities: Vec<&str> = AchievementRarity::ALL.iter().map(|r| r.as_str()).collect();
    Ok(Result::<()>::http_success(rarities))
}

#[post("/initialize-defaults")]
async fn initialize_defaults(state: web::Data<AppState>) -> HandlerResult {
    let created = state.achievements.initialize_default_achievements().await?;
    Ok(Result::<()>::http_success(Seeded { created }))
}

#[get("/students/{id}")]
async fn student_achievements(state: web::Data<AppState>, path: web::Path<i64>) -> HandlerResult {
    let earned = state
        .achievements
        .get_student_achievements(path.into_inner())
        .await?;
    Ok(Result::<()>::http_success(earned))
}

#[post("/students/{id}/check")]
async fn check_student(state: web::Data<AppState>, path: web::Path<i64>) -> HandlerResult {
    let unlocked = state
        .achievements
        .check_achievements_for_student(path.into_inner())
        .await?;
    if !unlocked.is_empty() {
        state.invalidate_leaderboards();
    }
    Ok(Result::<()>::http_success(unlocked))
}

#[get("/students/{id}/stats")]
async fn student_stats(state: web::Data<AppState>, path: web::Path<i64>) -> HandlerResult {
    let stats = state
        .achievements
        .get_achievement_stats(path.into_inner())
        .await?;
    Ok(Result::<()>::http_success(stats))
}

#[get("/{id}")]
async fn get_achievement(state: web::Data<AppState>, path: web::Path<i64>) -> HandlerResult {
    let id = path.into_inner();
    Ok(match state.achievements.get_achievement(id).await? {
        Some(achievement) => Result::<()>::http_success(achievement),
        None => missing(id),
    })
}

#[put("/{id}")]
async fn update_achievement(
    state: web::Data<AppState>,
    path: web::Path<i64>,
    body: web::Json<UpdateAchievementRequest>,
) -> HandlerResult {
    body.validate()?;
    let id = path.into_inner();
    let patch = AchievementPatch::from(body.into_inner());
    Ok(match state.achievements.update_achievement(id, &patch).await? {
        Some(achievement) => Result::<()>::http_success(achievement),
        None => missing(id),
    })
}

#[delete("/{id}")]
async fn delete_achievement(state: web::Data<AppState>, path: web::Path<i64>) -> HandlerResult {
    let id = path.into_inner();
    if !state.achievements.delete_achievement(id).await? {
        return Ok(missing(id));
    }
    Ok(Result::<()>::http_success(Deleted { deleted: true }))
}

// Fixed segments are registered ahead of `/{id}`
pub fn routes() -> Scope {
    web::scope("/achievements")
        .service(create_achievement)
        .service(list_achievements)
        .service(achievement_types)
        .service(achievement_rarities)
        .service(initialize_defaults)
        .service(student_achievements)
        .service(check_student)
        .service(student_stats)
        .service(get_achievement)
        .service(update_achievement)
        .service(delete_achievement)
}
