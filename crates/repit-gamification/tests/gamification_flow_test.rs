// Integration tests for the gamification services
// Drives a student through lessons, achievements, XP awards and leaderboards

use std::sync::Arc;

use repit_common::{LeaderboardPeriod, XpAction};
use repit_gamification::{
    AchievementService, ExponentialCurve, GamificationService, StudentService, XpAward,
    XpAwardRequest,
};
use repit_persistence::{EmbeddedPersistService, NewStudent, PersistenceService};

struct Services {
    students: StudentService,
    achievements: AchievementService,
    gamification: GamificationService,
}

async fn services() -> Services {
    let persistence: Arc<dyn PersistenceService> = Arc::new(EmbeddedPersistService::new());
    let curve = ExponentialCurve::default();

    let services = Services {
        students: StudentService::new(persistence.clone(), curve),
        achievements: AchievementService::new(persistence.clone()),
        gamification: GamificationService::new(persistence, curve),
    };
    assert_eq!(
        services
            .achievements
            .initialize_default_achievements()
            .await
            .unwrap(),
        13
    );
    assert_eq!(
        services
            .gamification
            .initialize_default_badges()
            .await
            .unwrap(),
        9
    );
    services
}

#[tokio::test]
async fn test_student_progression_flow() {
    let s = services().await;
    let student = s
        .students
        .create_student(&NewStudent {
            user_id: 1001,
            display_name: Some("Аня".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();

    // Lesson event: counter and 100 XP
    let outcome = s.students.on_lesson_completed(student.id).await.unwrap();
    assert_eq!(outcome.xp_earned, 100);
    assert!(outcome.level_up.is_none());

    // First lesson achievement worth 50 XP
    let unlocked = s
        .achievements
        .check_achievements_for_student(student.id)
        .await
        .unwrap();
    assert_eq!(unlocked.len(), 1);
    assert_eq!(unlocked[0].xp_earned, 50);
    assert!(unlocked[0].is_new_unlock);

    // Nothing new on a second check
    assert!(
        s.achievements
            .check_achievements_for_student(student.id)
            .await
            .unwrap()
            .is_empty()
    );

    // Ledger award: 150 -> 200, then xp_100 and level_2 badges add 200 more
    let mut request = XpAwardRequest::for_action(XpAction::LessonCompleted);
    request.lesson_id = Some(1);
    let XpAward::Granted(granted) = s.gamification.award_xp(student.id, &request).await.unwrap()
    else {
        panic!("lesson XP should be granted");
    };
    assert_eq!(granted.xp_awarded, 50);
    assert_eq!(granted.old_rank, 2);
    assert_eq!(granted.new_rank, 3);
    assert!(granted.rank_up);
    assert_eq!(granted.badges_awarded, vec!["xp_100", "level_2"]);
    assert_eq!(granted.total_xp, 400);

    let stats = s
        .achievements
        .get_achievement_stats(student.id)
        .await
        .unwrap();
    assert_eq!(stats.earned_achievements, 1);

    let profile = s
        .gamification
        .get_profile(student.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(profile.total_xp, 400);
    assert_eq!(profile.rank_title, "Студент");
    assert_eq!(profile.badges.len(), 2);
    assert_eq!(profile.streak.current_streak, 1);

    let dashboard = s
        .students
        .get_dashboard(student.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(dashboard.student.id, student.id);
}

#[tokio::test]
async fn test_leaderboard_orders_students() {
    let s = services().await;
    let mut ids = Vec::new();
    for (user_id, amount) in [(1, 30), (2, 90), (3, 60)] {
        let student = s
            .students
            .create_student(&NewStudent {
                user_id,
                ..Default::default()
            })
            .await
            .unwrap();
        let mut request = XpAwardRequest::for_action(XpAction::MaterialStudied);
        request.amount = Some(amount);
        s.gamification.award_xp(student.id, &request).await.unwrap();
        ids.push(student.id);
    }

    for &period in LeaderboardPeriod::ALL {
        let board = s.gamification.get_leaderboard(period, None).await.unwrap();
        let order: Vec<i64> = board.iter().map(|e| e.student_id).collect();
        assert_eq!(order, vec![ids[1], ids[2], ids[0]], "period {}", period);
        assert_eq!(board[0].xp, 90);
        assert_eq!(board[2].position, 3);
    }
}
