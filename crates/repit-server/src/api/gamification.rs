//! XP, badges, streaks, leaderboards and challenges

use std::sync::Arc;

use actix_web::{Scope, get, post, put, web};
use tracing::debug;
use validator::Validate;

use repit_common::{LeaderboardPeriod, StreakKind};
use repit_gamification::{BadgeAward, DEFAULT_LEADERBOARD_LIMIT, RANKS, XpAward};
use repit_persistence::NewChallenge;

use super::HandlerResult;
use super::model::{
    AwardBadgeBody, AwardXpBody, ChallengeRequest, LeaderboardQuery, LevelProgressQuery,
    LevelProgressView, Participant, ProgressUpdate, Seeded, StreakOutcome,
};
use crate::error::{
    CHALLENGE_NOT_EXIST, RESOURCE_CONFLICT, STUDENT_NOT_EXIST, XP_AWARD_REJECTED, not_found,
};
use crate::model::common::AppState;
use crate::model::response::Result;

#[post("/students/{id}/xp")]
async fn award_xp(
    state: web::Data<AppState>,
    path: web::Path<i64>,
    body: web::Json<AwardXpBody>,
) -> HandlerResult {
    body.validate()?;
    let student_id = path.into_inner();
    let award = state
        .gamification
        .award_xp(student_id, &body.into_inner().into())
        .await?;
    Ok(match award {
        XpAward::Granted(_) => {
            state.invalidate_leaderboards();
            Result::<()>::http_success(award)
        }
        XpAward::Rejected { ref reason } => Result::<()>::http_response(
            409,
            XP_AWARD_REJECTED.code,
            reason.clone(),
            &award,
        ),
    })
}

#[post("/students/{id}/badges")]
async fn award_badge(
    state: web::Data<AppState>,
    path: web::Path<i64>,
    body: web::Json<AwardBadgeBody>,
) -> HandlerResult {
    body.validate()?;
    let student_id = path.into_inner();
    let AwardBadgeBody { code, reason } = body.into_inner();
    let award = state
        .gamification
        .award_badge(student_id, &code, reason)
        .await?;
    Ok(match award {
        BadgeAward::Awarded { .. } => {
            state.invalidate_leaderboards();
            Result::<()>::http_success(award)
        }
        BadgeAward::Rejected { ref reason } => Result::<()>::http_response(
            409,
            RESOURCE_CONFLICT.code,
            reason.clone(),
            &award,
        ),
    })
}

#[get("/students/{id}/badges")]
async fn student_badges(state: web::Data<AppState>, path: web::Path<i64>) -> HandlerResult {
    let badges = state
        .gamification
        .get_student_badges(path.into_inner())
        .await?;
    Ok(Result::<()>::http_success(badges))
}

#[get("/students/{id}/streak")]
async fn student_streak(state: web::Data<AppState>, path: web::Path<i64>) -> HandlerResult {
    let streak = state
        .gamification
        .calculate_streak(path.into_inner())
        .await?;
    Ok(Result::<()>::http_success(streak))
}

#[post("/students/{id}/streaks/{kind}")]
async fn record_streak(
    state: web::Data<AppState>,
    path: web::Path<(i64, StreakKind)>,
    body: web::Json<StreakOutcome>,
) -> HandlerResult {
    let (student_id, kind) = path.into_inner();
    let counter = state
        .gamification
        .record_streak(student_id, kind, body.success)
        .await?;
    Ok(Result::<()>::http_success(counter))
}

#[get("/students/{id}/profile")]
async fn student_profile(state: web::Data<AppState>, path: web::Path<i64>) -> HandlerResult {
    let student_id = path.into_inner();
    Ok(match state.gamification.get_profile(student_id).await? {
        Some(profile) => Result::<()>::http_success(profile),
        None => not_found(
            &STUDENT_NOT_EXIST,
            format!("student '{}' not exist", student_id),
        ),
    })
}

#[get("/leaderboard")]
async fn leaderboard(
    state: web::Data<AppState>,
    query: web::Query<LeaderboardQuery>,
) -> HandlerResult {
    query.validate()?;
    let key = (
        query.period.unwrap_or(LeaderboardPeriod::AllTime),
        query.limit.unwrap_or(DEFAULT_LEADERBOARD_LIMIT),
    );

    if let Some(entries) = state.leaderboards.get(&key).await {
        debug!(period = %key.0, limit = key.1, "Leaderboard served from cache");
        return Ok(Result::<()>::http_success(entries.as_ref()));
    }

    let entries = Arc::new(state.gamification.get_leaderboard(key.0, Some(key.1)).await?);
    state.leaderboards.insert(key, entries.clone()).await;
    Ok(Result::<()>::http_success(entries.as_ref()))
}

#[get("/levels")]
async fn ranks() -> HandlerResult {
    Ok(Result::<()>::http_success(RANKS))
}

#[get("/levels/progress")]
async fn level_progress(
    state: web::Data<AppState>,
    query: web::Query<LevelProgressQuery>,
) -> HandlerResult {
    query.validate()?;
    let table = state.gamification.ranks();
    let progress = table.next_rank_progress(query.xp);
    Ok(Result::<()>::http_success(LevelProgressView {
        total_xp: query.xp,
        rank_title: table.title(progress.current_rank).to_string(),
        progress,
    }))
}

#[post("/badges/initialize-defaults")]
async fn initialize_badges(state: web::Data<AppState>) -> HandlerResult {
    let created = state.gamification.initialize_default_badges().await?;
    Ok(Result::<()>::http_success(Seeded { created }))
}

#[post("/challenges")]
async fn create_challenge(
    state: web::Data<AppState>,
    body: web::Json<ChallengeRequest>,
) -> HandlerResult {
    body.validate()?;
    let draft = NewChallenge::from(body.into_inner());
    let challenge = state.challenges.create_challenge(&draft).await?;
    Ok(Result::<()>::http_created(challenge))
}

#[get("/challenges")]
async fn active_challenges(state: web::Data<AppState>) -> HandlerResult {
    let challenges = state.challenges.list_active_challenges().await?;
    Ok(Result::<()>::http_success(challenges))
}

#[get("/challenges/{id}")]
async fn get_challenge(state: web::Data<AppState>, path: web::Path<i64>) -> HandlerResult {
    let challenge_id = path.into_inner();
    Ok(match state.challenges.get_challenge(challenge_id).await? {
        Some(challenge) => Result::<()>::http_success(challenge),
        None => not_found(
            &CHALLENGE_NOT_EXIST,
            format!("challenge '{}' not exist", challenge_id),
        ),
    })
}

#[post("/challenges/{id}/join")]
async fn join_challenge(
    state: web::Data<AppState>,
    path: web::Path<i64>,
    body: web::Json<Participant>,
) -> HandlerResult {
    let participation = state
        .challenges
        .join_challenge(path.into_inner(), body.student_id)
        .await?;
    Ok(Result::<()>::http_success(participation))
}

#[put("/challenges/{id}/progress")]
async fn challenge_progress(
    state: web::Data<AppState>,
    path: web::Path<i64>,
    body: web::Json<ProgressUpdate>,
) -> HandlerResult {
    body.validate()?;
    let progress = state
        .challenges
        .update_challenge_progress(path.into_inner(), body.student_id, body.value)
        .await?;
    Ok(Result::<()>::http_success(progress))
}

#[post("/challenges/{id}/claim")]
async fn claim_reward(
    state: web::Data<AppState>,
    path: web::Path<i64>,
    body: web::Json<Participant>,
) -> HandlerResult {
    let reward = state
        .challenges
        .claim_challenge_reward(path.into_inner(), body.student_id)
        .await?;
    state.invalidate_leaderboards();
    Ok(Result::<()>::http_success(reward))
}

pub fn routes() -> Scope {
    web::scope("/gamification")
        .service(award_xp)
        .service(award_badge)
        .service(student_badges)
        .service(student_streak)
        .service(record_streak)
        .service(student_profile)
        .service(leaderboard)
        .service(ranks)
        .service(level_progress)
        .service(initialize_badges)
        .service(create_challenge)
        .service(active_challenges)
        .service(get_challenge)
        .service(join_challenge)
        .service(challenge_progress)
        .service(claim_reward)
}
