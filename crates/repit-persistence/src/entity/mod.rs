//! SeaORM entity definitions

pub mod achievements;
pub mod badges;
pub mod challenge_participations;
pub mod challenges;
pub mod learning_goals;
pub mod lesson_records;
pub mod streak_records;
pub mod student_achievements;
pub mod student_badges;
pub mod students;
pub mod study_sessions;
pub mod xp_transactions;

pub mod prelude {
    pub use super::achievements::Entity as Achievements;
    pub use super::badges::Entity as Badges;
    pub use super::challenge_participations::Entity as ChallengeParticipations;
    pub use super::challenges::Entity as Challenges;
    pub use super::learning_goals::Entity as LearningGoals;
    pub use super::lesson_records::Entity as LessonRecords;
    pub use super::streak_records::Entity as StreakRecords;
    pub use super::student_achievements::Entity as StudentAchievements;
    pub use super::student_badges::Entity as StudentBadges;
    pub use super::students::Entity as Students;
    pub use super::study_sessions::Entity as StudySessions;
    pub use super::xp_transactions::Entity as XpTransactions;
}
