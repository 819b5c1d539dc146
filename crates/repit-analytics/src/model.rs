//! Analytics result types

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use repit_common::string_enum;

// ============================================================================
// Lesson summary
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectCount {
    pub subject: String,
    pub count: usize,
    pub avg_rating: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    /// `YYYY-MM`
    pub period: String,
    pub average_performance: f64,
    pub lesson_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeakHours {
    pub peak_hour: u32,
    pub lessons_at_peak: usize,
    pub hourly_distribution: BTreeMap<u32, usize>,
}

/// Aggregate view over a set of lessons
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LessonSummary {
    pub total_lessons: usize,
    pub completed_lessons: usize,
    pub cancelled_lessons: usize,
    pub missed_lessons: usize,
    pub average_duration: f64,
    pub average_completion_rate: f64,
    pub average_engagement: f64,
    pub total_study_time: i64,
    pub attendance_rate: f64,
    pub punctuality_score: f64,
    pub satisfaction_score: f64,
    pub top_subjects: Vec<SubjectCount>,
    pub performance_trend: Vec<TrendPoint>,
    pub peak_learning_hours: Option<PeakHours>,
}

impl LessonSummary {
    /// Scalar metrics in display order
    pub fn headline_metrics(&self) -> Vec<(&'static str, String)> {
        vec![
            ("total_lessons", self.total_lessons.to_string()),
            ("completed_lessons", self.completed_lessons.to_string()),
            ("cancelled_lessons", self.cancelled_lessons.to_string()),
            ("missed_lessons", self.missed_lessons.to_string()),
            ("average_duration", format!("{:.2}", self.average_duration)),
            (
                "average_completion_rate",
                format!("{:.2}", self.average_completion_rate),
            ),
            ("average_engagement", format!("{:.2}", self.average_engagement)),
            ("total_study_time", self.total_study_time.to_string()),
            ("attendance_rate", format!("{:.2}", self.attendance_rate)),
            ("punctuality_score", format!("{:.2}", self.punctuality_score)),
            ("satisfaction_score", format!("{:.2}", self.satisfaction_score)),
        ]
    }
}

// ============================================================================
// Tutor performance
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectPerformance {
    pub subject: String,
    pub overall_score: f64,
    pub avg_rating: f64,
    pub avg_engagement: f64,
    pub avg_completion: f64,
    pub lesson_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyTutorTrend {
    pub month: String,
    pub lesson_count: usize,
    pub avg_rating: f64,
    pub avg_engagement: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TutorPerformance {
    pub tutor_id: i64,
    pub total_lessons: usize,
    pub unique_students: usize,
    pub average_student_rating: f64,
    pub average_parent_rating: f64,
    pub lesson_completion_rate: f64,
    pub average_engagement_score: f64,
    pub punctuality_score: f64,
    pub technical_issues_rate: f64,
    pub student_questions_average: f64,
    pub rescheduling_rate: f64,
    pub subjects_taught: Vec<String>,
    pub best_performing_subjects: Vec<SubjectPerformance>,
    pub improvement_areas: Vec<String>,
    pub monthly_trend: Vec<MonthlyTutorTrend>,
}

// ============================================================================
// Student progress
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngagementPoint {
    pub date: DateTime<Utc>,
    pub engagement_score: f64,
    pub questions_asked: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaPerformance {
    pub area: String,
    pub avg_performance: f64,
    pub lesson_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillImprovement {
    pub count: usize,
    /// Mean whole days between lessons that met the objective
    pub avg_days_between: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentProgress {
    pub student_id: i64,
    pub subject: Option<String>,
    pub total_lessons: usize,
    pub attendance_rate: f64,
    pub average_performance: f64,
    pub learning_velocity: f64,
    pub consistency_score: f64,
    pub engagement_trend: Vec<EngagementPoint>,
    pub weak_areas: Vec<AreaPerformance>,
    pub strong_areas: Vec<AreaPerformance>,
    pub recommended_focus: Vec<String>,
    pub skill_improvements: BTreeMap<String, SkillImprovement>,
}

impl StudentProgress {
    pub fn headline_metrics(&self) -> Vec<(&'static str, String)> {
        vec![
            ("total_lessons", self.total_lessons.to_string()),
            ("attendance_rate", format!("{:.2}", self.attendance_rate)),
            (
                "average_performance",
                format!("{:.2}", self.average_performance),
            ),
            ("learning_velocity", format!("{:.2}", self.learning_velocity)),
            ("consistency_score", format!("{:.2}", self.consistency_score)),
        ]
    }
}

// ============================================================================
// Curriculum effectiveness
// ============================================================================

string_enum! {
    /// How a lesson's difficulty rating compares with the comfortable middle
    pub enum DifficultyFit {
        TooEasy => "too_easy",
        Appropriate => "appropriate",
        TooHard => "too_hard",
    }
}

impl DifficultyFit {
    /// Ratings of 2 or below are too easy, 4 or above too hard
    pub fn of(rating: f64) -> Self {
        if rating <= 2.0 {
            DifficultyFit::TooEasy
        } else if rating >= 4.0 {
            DifficultyFit::TooHard
        } else {
            DifficultyFit::Appropriate
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DifficultyAnalysis {
    pub average_difficulty: f64,
    pub distribution: BTreeMap<DifficultyFit, usize>,
    pub recommendation: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetentionIndicators {
    /// Percent of tracked lessons whose previous homework was done
    pub homework_completion_rate: f64,
    pub homework_tracked_lessons: usize,
    /// Topics covered in more than one lesson, with their lesson counts
    pub revisited_topics: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurriculumEffectiveness {
    pub subject: Option<String>,
    pub total_lessons_analyzed: usize,
    /// Mean share of the lesson plan covered, 0..=1
    pub average_completion_rate: f64,
    pub learning_objective_success_rate: f64,
    pub student_satisfaction: f64,
    /// `None` when no lesson carries a difficulty rating
    pub difficulty_appropriateness: Option<DifficultyAnalysis>,
    pub engagement_by_topic: BTreeMap<String, f64>,
    pub retention_indicators: RetentionIndicators,
    pub improvement_recommendations: Vec<String>,
}

impl CurriculumEffectiveness {
    pub fn headline_metrics(&self) -> Vec<(&'static str, String)> {
        vec![
            ("total_lessons_analyzed", self.total_lessons_analyzed.to_string()),
            (
                "average_completion_rate",
                format!("{:.2}", self.average_completion_rate),
            ),
            (
                "learning_objective_success_rate",
                format!("{:.2}", self.learning_objective_success_rate),
            ),
            ("student_satisfaction", format!("{:.2}", self.student_satisfaction)),
        ]
    }
}

// ============================================================================
// Lesson trends
// ============================================================================

string_enum! {
    /// Bucket size for lesson trends
    pub enum TrendPeriod {
        Day => "day",
        Week => "week",
        Month => "month",
        Year => "year",
    }
}

impl TrendPeriod {
    /// Default look-back window in days
    pub fn default_window_days(self) -> i64 {
        match self {
            TrendPeriod::Day => 30,
            TrendPeriod::Week => 84,
            TrendPeriod::Month => 365,
            TrendPeriod::Year => 730,
        }
    }

    /// Bucket key for `date`
    pub fn key(self, date: DateTime<Utc>) -> String {
        match self {
            TrendPeriod::Day => date.format("%Y-%m-%d").to_string(),
            TrendPeriod::Week => date.format("%G-W%V").to_string(),
            TrendPeriod::Month => date.format("%Y-%m").to_string(),
            TrendPeriod::Year => date.format("%Y").to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonTrends {
    pub period_type: TrendPeriod,
    pub total_periods: usize,
    pub lessons_per_period: BTreeMap<String, usize>,
    pub completion_rate_trend: BTreeMap<String, f64>,
    pub engagement_trend: BTreeMap<String, f64>,
    /// Change between the first and last bucket, percent
    pub growth_rate: f64,
    pub most_active_weekday: Option<String>,
}
