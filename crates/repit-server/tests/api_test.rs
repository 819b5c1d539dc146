//! End-to-end tests of the REST routes against the embedded store

use std::sync::Arc;

use actix_web::dev::ServiceResponse;
use actix_web::http::StatusCode;
use actix_web::{App, test, web};
use serde_json::{Value, json};

use repit_persistence::EmbeddedPersistService;
use repit_server::api;
use repit_server::model::common::AppState;
use repit_server::model::config::{Cli, Configuration};

fn app_state() -> Arc<AppState> {
    let configuration = Configuration::from_cli(Cli {
        config_file: "/nonexistent/application.yml".to_string(),
        ..Default::default()
    })
    .unwrap();
    Arc::new(AppState::new(
        configuration,
        Arc::new(EmbeddedPersistService::new()),
    ))
}

macro_rules! init_app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::from($state))
                .app_data(api::json_config())
                .app_data(api::query_config())
                .service(api::routes())
                .service(api::health::metrics_endpoint),
        )
        .await
    };
}

async fn body_json(resp: ServiceResponse) -> Value {
    test::read_body_json(resp).await
}

macro_rules! create_student {
    ($app:expr, $user_id:expr, $name:expr) => {{
        let req = test::TestRequest::post()
            .uri("/api/v1/students")
            .set_json(json!({"user_id": $user_id, "display_name": $name}))
            .to_request();
        let resp = test::call_service(&$app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        body_json(resp).await["data"]["id"].as_i64().unwrap()
    }};
}

#[actix_web::test]
async fn test_health_reports_storage_mode() {
    let app = init_app!(app_state());
    let req = test::TestRequest::get().uri("/api/v1/health").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body = body_json(resp).await;
    assert_eq!(body["code"], 0);
    assert_eq!(body["data"]["status"], "healthy");
    assert_eq!(body["data"]["storage_mode"], "embedded");
}

#[actix_web::test]
async fn test_metrics_without_recorder() {
    let app = init_app!(app_state());
    let req = test::TestRequest::get().uri("/metrics").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[actix_web::test]
async fn test_student_lifecycle() {
    let app = init_app!(app_state());
    let id = create_student!(app, 42, "Ann");

    // Duplicate user id
    let req = test::TestRequest::post()
        .uri("/api/v1/students")
        .set_json(json!({"user_id": 42}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(resp).await["code"], 21001);

    let req = test::TestRequest::get()
        .uri("/api/v1/students/by-user/42")
        .to_request();
    let body = body_json(test::call_service(&app, req).await).await;
    assert_eq!(body["data"]["id"], id);
    assert_eq!(body["data"]["level"], 1);

    let req = test::TestRequest::put()
        .uri(&format!("/api/v1/students/{}", id))
        .set_json(json!({"bio": "Likes algebra"}))
        .to_request();
    let body = body_json(test::call_service(&app, req).await).await;
    assert_eq!(body["data"]["bio"], "Likes algebra");
    assert_eq!(body["data"]["display_name"], "Ann");

    let req = test::TestRequest::delete()
        .uri(&format!("/api/v1/students/{}", id))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/students/{}", id))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(resp).await["code"], 21000);
}

#[actix_web::test]
async fn test_invalid_bodies_answer_400() {
    let app = init_app!(app_state());

    let req = test::TestRequest::post()
        .uri("/api/v1/students")
        .set_json(json!({"user_id": 0}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await["code"], 20002);

    let req = test::TestRequest::post()
        .uri("/api/v1/students")
        .insert_header(("content-type", "application/json"))
        .set_payload("{not json")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await["code"], 20002);
}

#[actix_web::test]
async fn test_out_of_range_counters_and_rewards_answer_400() {
    let app = init_app!(app_state());
    let id = create_student!(app, 9, "Gus");

    let req = test::TestRequest::patch()
        .uri(&format!("/api/v1/students/{}/stats", id))
        .set_json(json!({"lessons_completed": -5}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await["code"], 20002);

    let req = test::TestRequest::patch()
        .uri(&format!("/api/v1/students/{}/stats", id))
        .set_json(json!({"study_time_minutes": i64::MAX}))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::BAD_REQUEST
    );

    let req = test::TestRequest::patch()
        .uri(&format!("/api/v1/students/{}/stats", id))
        .set_json(json!({"lessons_completed": 3, "study_time_minutes": 45}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/students/{}", id))
        .to_request();
    let body = body_json(test::call_service(&app, req).await).await;
    assert_eq!(body["data"]["lessons_completed"], 3);
    assert_eq!(body["data"]["study_time_minutes"], 45);

    let req = test::TestRequest::post()
        .uri("/api/v1/achievements")
        .set_json(json!({"name": "Drain", "achievement_type": "lesson", "xp_reward": -500}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await["code"], 20002);

    let req = test::TestRequest::post()
        .uri("/api/v1/achievements")
        .set_json(json!({"name": "Marathon", "achievement_type": "lesson", "xp_reward": 40}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let achievement = body_json(resp).await["data"]["id"].as_i64().unwrap();

    let req = test::TestRequest::put()
        .uri(&format!("/api/v1/achievements/{}", achievement))
        .set_json(json!({"xp_reward": -1}))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::BAD_REQUEST
    );

    let req = test::TestRequest::put()
        .uri(&format!("/api/v1/achievements/{}", achievement))
        .set_json(json!({"name": "  "}))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::BAD_REQUEST
    );
}

#[actix_web::test]
async fn test_experience_levels_up() {
    let app = init_app!(app_state());
    let id = create_student!(app, 7, "Bo");

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/students/{}/experience", id))
        .set_json(json!({"amount": 1000, "reason": "bonus"}))
        .to_request();
    let body = body_json(test::call_service(&app, req).await).await;
    assert_eq!(body["data"]["old_level"], 1);
    assert_eq!(body["data"]["new_level"], 2);

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/students/{}/level", id))
        .to_request();
    let body = body_json(test::call_service(&app, req).await).await;
    assert_eq!(body["data"]["level"], 2);

    let req = test::TestRequest::post()
        .uri("/api/v1/students/999/experience")
        .set_json(json!({"amount": 10}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_lesson_event_unlocks_first_achievement() {
    let state = app_state();
    state.seed_defaults().await.unwrap();
    let app = init_app!(state);
    let id = create_student!(app, 8, "Cy");

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/students/{}/events/lesson-completed", id))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["data"]["xp_earned"], 100);
    let unlocked = body["data"]["achievements_unlocked"].as_array().unwrap();
    assert!(
        unlocked
            .iter()
            .any(|u| u["achievement"]["name"] == "Первый шаг")
    );

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/achievements/students/{}/stats", id))
        .to_request();
    let body = body_json(test::call_service(&app, req).await).await;
    assert!(body["data"]["earned_achievements"].as_u64().unwrap() >= 1);
}

#[actix_web::test]
async fn test_achievement_catalogue_routes() {
    let app = init_app!(app_state());

    let req = test::TestRequest::post()
        .uri("/api/v1/achievements/initialize-defaults")
        .to_request();
    let body = body_json(test::call_service(&app, req).await).await;
    assert!(body["data"]["created"].as_u64().unwrap() > 0);

    // Second seeding creates nothing
    let req = test::TestRequest::post()
        .uri("/api/v1/achievements/initialize-defaults")
        .to_request();
    let body = body_json(test::call_service(&app, req).await).await;
    assert_eq!(body["data"]["created"], 0);

    let req = test::TestRequest::get()
        .uri("/api/v1/achievements/types")
        .to_request();
    let body = body_json(test::call_service(&app, req).await).await;
    assert!(body["data"].as_array().unwrap().contains(&json!("lesson")));

    let req = test::TestRequest::get()
        .uri("/api/v1/achievements?rarity=epic")
        .to_request();
    let body = body_json(test::call_service(&app, req).await).await;
    let list = body["data"].as_array().unwrap();
    assert!(!list.is_empty());
    assert!(list.iter().all(|a| a["rarity"] == "epic"));

    let req = test::TestRequest::get()
        .uri("/api/v1/achievements/9999")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_award_xp_and_leaderboard() {
    let state = app_state();
    state.seed_defaults().await.unwrap();
    let app = init_app!(state);
    let first = create_student!(app, 1, "First");
    let second = create_student!(app, 2, "Second");

    let award = |student: i64, lesson: i64| {
        test::TestRequest::post()
            .uri(&format!("/api/v1/gamification/students/{}/xp", student))
            .set_json(json!({"action": "lesson_completed", "lesson_id": lesson}))
            .to_request()
    };

    let body = body_json(test::call_service(&app, award(first, 1)).await).await;
    assert_eq!(body["data"]["status"], "granted");
    assert_eq!(body["data"]["xp_awarded"], 50);

    // Same lesson twice
    let resp = test::call_service(&app, award(first, 1)).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body = body_json(resp).await;
    assert_eq!(body["data"]["status"], "rejected");
    assert_eq!(body["message"], "Already awarded");

    test::call_service(&app, award(first, 2)).await;
    test::call_service(&app, award(second, 3)).await;

    let req = test::TestRequest::get()
        .uri("/api/v1/gamification/leaderboard?period=all_time&limit=10")
        .to_request();
    let body = body_json(test::call_service(&app, req).await).await;
    let entries = body["data"].as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["student_id"], first);
    assert_eq!(entries[0]["position"], 1);

    // Cached board is dropped after new XP
    test::call_service(&app, award(second, 4)).await;
    test::call_service(&app, award(second, 5)).await;
    let req = test::TestRequest::get()
        .uri("/api/v1/gamification/leaderboard?period=all_time&limit=10")
        .to_request();
    let body = body_json(test::call_service(&app, req).await).await;
    assert_eq!(body["data"][0]["student_id"], second);
}

#[actix_web::test]
async fn test_badges_and_profile() {
    let state = app_state();
    state.seed_defaults().await.unwrap();
    let app = init_app!(state);
    let id = create_student!(app, 3, "Di");

    let req = test::TestRequest::post()
        .uri("/api/v1/gamification/students/3000/badges")
        .set_json(json!({"code": "xp_100"}))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::NOT_FOUND
    );

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/gamification/students/{}/badges", id))
        .set_json(json!({"code": "no_such_badge"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(resp).await["data"]["reason"], "Badge not found");

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/gamification/students/{}/badges", id))
        .set_json(json!({"code": "xp_500", "reason": "manual"}))
        .to_request();
    let body = body_json(test::call_service(&app, req).await).await;
    assert_eq!(body["data"]["status"], "awarded");
    assert_eq!(body["data"]["badge"]["code"], "xp_500");

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/gamification/students/{}/profile", id))
        .to_request();
    let body = body_json(test::call_service(&app, req).await).await;
    let badges = body["data"]["badges"].as_array().unwrap();
    assert!(badges.iter().any(|b| b["badge"]["code"] == "xp_500"));
    assert!(body["data"]["total_xp"].as_i64().unwrap() >= 100);
}

#[actix_web::test]
async fn test_level_progress_and_streak_kind() {
    let app = init_app!(app_state());
    let id = create_student!(app, 4, "Ed");

    let req = test::TestRequest::get()
        .uri("/api/v1/gamification/levels/progress?xp=175")
        .to_request();
    let body = body_json(test::call_service(&app, req).await).await;
    assert_eq!(body["data"]["current_rank"], 2);
    assert_eq!(body["data"]["next_rank"], 3);
    assert_eq!(body["data"]["xp_needed"], 75);
    assert_eq!(body["data"]["progress_percent"], 50.0);

    let req = test::TestRequest::get()
        .uri("/api/v1/gamification/levels")
        .to_request();
    let body = body_json(test::call_service(&app, req).await).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 10);

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/gamification/students/{}/streaks/study", id))
        .set_json(json!({"success": true}))
        .to_request();
    let body = body_json(test::call_service(&app, req).await).await;
    assert_eq!(body["data"]["current"], 1);

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/gamification/students/{}/streaks/dancing", id))
        .set_json(json!({"success": true}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_client_error());
}

#[actix_web::test]
async fn test_challenge_flow() {
    let app = init_app!(app_state());
    let id = create_student!(app, 5, "Fay");
    let now = chrono::Utc::now();

    let req = test::TestRequest::post()
        .uri("/api/v1/gamification/challenges")
        .set_json(json!({
            "title": "Five lessons",
            "challenge_type": "weekly",
            "target_metric": "lessons_completed",
            "target_value": 5,
            "xp_reward": 200,
            "start_date": now - chrono::Duration::days(1),
            "end_date": now + chrono::Duration::days(6)
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let challenge = body_json(resp).await["data"]["id"].as_i64().unwrap();

    let req = test::TestRequest::get()
        .uri("/api/v1/gamification/challenges")
        .to_request();
    let body = body_json(test::call_service(&app, req).await).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/gamification/challenges/{}/join", challenge))
        .set_json(json!({"student_id": id}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::put()
        .uri(&format!("/api/v1/gamification/challenges/{}/progress", challenge))
        .set_json(json!({"student_id": id, "value": 5}))
        .to_request();
    let body = body_json(test::call_service(&app, req).await).await;
    assert_eq!(body["data"]["just_completed"], true);
    assert_eq!(body["data"]["progress_percent"], 100.0);

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/gamification/challenges/{}/claim", challenge))
        .set_json(json!({"student_id": id}))
        .to_request();
    let body = body_json(test::call_service(&app, req).await).await;
    assert_eq!(body["data"]["xp_awarded"], 200);

    let req = test::TestRequest::get()
        .uri("/api/v1/gamification/challenges/777")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(resp).await["code"], 21005);
}

#[actix_web::test]
async fn test_goals_and_sessions() {
    let app = init_app!(app_state());
    let id = create_student!(app, 8, "Gil");
    let other = create_student!(app, 9, "Hal");

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/students/{}/goals", id))
        .set_json(json!({"title": "Read 10 chapters", "target_value": 10, "unit": "chapters"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body = body_json(resp).await;
    let goal_id = body["data"]["id"].as_i64().unwrap();
    assert_eq!(body["data"]["progress_percentage"], 0.0);

    let req = test::TestRequest::put()
        .uri(&format!("/api/v1/students/{}/goals/{}/progress", id, goal_id))
        .set_json(json!({"value": 4}))
        .to_request();
    let body = body_json(test::call_service(&app, req).await).await;
    assert_eq!(body["data"]["goal"]["progress_percentage"], 40.0);
    assert_eq!(body["data"]["just_completed"], false);

    let req = test::TestRequest::put()
        .uri(&format!("/api/v1/students/{}/goals/{}/progress", id, goal_id))
        .set_json(json!({"value": 10}))
        .to_request();
    let body = body_json(test::call_service(&app, req).await).await;
    assert_eq!(body["data"]["just_completed"], true);
    assert_eq!(body["data"]["goal"]["is_completed"], true);

    let req = test::TestRequest::put()
        .uri(&format!("/api/v1/students/{}/goals/{}/progress", other, goal_id))
        .set_json(json!({"value": 1}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(resp).await["code"], 21007);

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/students/{}/goals", id))
        .set_json(json!({"title": "Nothing", "target_value": 0}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/students/{}/goals?active_only=true", id))
        .to_request();
    let body = body_json(test::call_service(&app, req).await).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/students/{}/sessions", id))
        .set_json(json!({"subject": "math", "activity_type": "homework", "duration_minutes": 45, "focus_score": 80}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body = body_json(resp).await;
    assert_eq!(body["data"]["study_time_minutes"], 45);
    assert_eq!(body["data"]["current_streak"], 1);

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/students/{}/sessions", id))
        .set_json(json!({"activity_type": "homework", "duration_minutes": -5}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/students/{}", id))
        .to_request();
    let body = body_json(test::call_service(&app, req).await).await;
    assert_eq!(body["data"]["study_time_minutes"], 45);

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/students/{}/sessions?days=7", id))
        .to_request();
    let body = body_json(test::call_service(&app, req).await).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/students/{}/sessions/summary", id))
        .to_request();
    let body = body_json(test::call_service(&app, req).await).await;
    assert_eq!(body["data"]["total_minutes"], 45);
    assert_eq!(body["data"]["minutes_by_subject"]["math"], 45);

    let req = test::TestRequest::get()
        .uri("/api/v1/students/999/sessions/summary")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

fn lesson(lesson_id: i64, student_id: i64, tutor_rating: f64) -> Value {
    json!({
        "lesson_id": lesson_id,
        "tutor_id": 11,
        "student_id": student_id,
        "date": chrono::Utc::now() - chrono::Duration::days(lesson_id),
        "subject": "math",
        "duration_minutes": 60,
        "planned_duration": 60,
        "status": "completed",
        "attendance_status": "present",
        "completion_rate": 0.9,
        "tutor_rating": tutor_rating,
        "student_rating": 4.0
    })
}

#[actix_web::test]
async fn test_analytics_routes() {
    let app = init_app!(app_state());

    for (id, rating) in [(1, 4.0), (2, 5.0)] {
        let req = test::TestRequest::post()
            .uri("/api/v1/analytics/lessons")
            .set_json(lesson(id, 21, rating))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::CREATED
        );
    }

    let mut bad = lesson(3, 21, 4.0);
    bad["tutor_rating"] = json!(9.0);
    let req = test::TestRequest::post()
        .uri("/api/v1/analytics/lessons")
        .set_json(bad)
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::BAD_REQUEST
    );

    let req = test::TestRequest::get()
        .uri("/api/v1/analytics/lessons/summary?student_id=21")
        .to_request();
    let body = body_json(test::call_service(&app, req).await).await;
    assert_eq!(body["data"]["total_lessons"], 2);
    assert_eq!(body["data"]["completed_lessons"], 2);

    let req = test::TestRequest::get()
        .uri("/api/v1/analytics/tutors/11/performance")
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri("/api/v1/analytics/students/99/progress")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(resp).await["code"], 22000);

    let req = test::TestRequest::get()
        .uri("/api/v1/analytics/lessons/trends?period=day")
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
}

#[actix_web::test]
async fn test_curriculum_effectiveness_route() {
    let app = init_app!(app_state());

    for (id, topic) in [(1, "fractions"), (2, "algebra")] {
        let mut body = lesson(id, 21, 4.5);
        body["topics_covered"] = json!([topic, "review"]);
        body["difficulty_rating"] = json!(3.0);
        body["engagement_score"] = json!(4.0);
        body["homework_completion_previous"] = json!(id == 1);
        let req = test::TestRequest::post()
            .uri("/api/v1/analytics/lessons")
            .set_json(body)
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::CREATED
        );
    }

    let req = test::TestRequest::get()
        .uri("/api/v1/analytics/curriculum?subject=math")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let data = body_json(resp).await["data"].clone();
    assert_eq!(data["subject"], "math");
    assert_eq!(data["total_lessons_analyzed"], 2);
    assert_eq!(data["student_satisfaction"], 4.0);
    assert_eq!(data["engagement_by_topic"]["review"], 4.0);
    assert_eq!(data["retention_indicators"]["homework_completion_rate"], 50.0);
    assert_eq!(data["retention_indicators"]["revisited_topics"]["review"], 2);
    assert_eq!(data["difficulty_appropriateness"]["distribution"]["appropriate"], 2);

    let req = test::TestRequest::get()
        .uri("/api/v1/analytics/curriculum?subject=art")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(resp).await["code"], 22000);
}

#[actix_web::test]
async fn test_report_downloads() {
    let app = init_app!(app_state());
    let req = test::TestRequest::post()
        .uri("/api/v1/analytics/lessons")
        .set_json(lesson(1, 21, 4.5))
        .to_request();
    test::call_service(&app, req).await;

    let req = test::TestRequest::get()
        .uri("/api/v1/analytics/reports/lessons?student_id=21&title=Weekly")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let content_type = resp.headers().get("content-type").unwrap().to_str().unwrap();
    assert!(content_type.starts_with("text/html"));
    let disposition = resp
        .headers()
        .get("content-disposition")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.contains(".html"));
    let html = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
    assert!(html.contains("Weekly"));

    let req = test::TestRequest::get()
        .uri("/api/v1/analytics/reports/students/21/progress?format=json")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let json: Value = test::read_body_json(resp).await;
    assert!(json.is_object());

    let req = test::TestRequest::get()
        .uri("/api/v1/analytics/reports/lessons?format=pdf")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await["code"], 22001);

    let req = test::TestRequest::get()
        .uri("/api/v1/analytics/reports/students/404/progress")
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::NOT_FOUND
    );
}
