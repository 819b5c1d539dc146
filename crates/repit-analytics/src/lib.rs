//! Repit Analytics - Lesson statistics and reports
//!
//! This crate provides:
//! - Per-lesson scoring (overall rating, performance score, success indicators)
//! - Lesson summaries, tutor performance and student progress
//! - Curriculum effectiveness per subject
//! - Period-bucketed lesson trends
//! - HTML, text and JSON report rendering

pub mod model;
pub mod report;
pub mod scoring;
pub mod service;
pub mod stats;

// Re-export commonly used types
pub use model::{
    AreaPerformance, CurriculumEffectiveness, DifficultyAnalysis, DifficultyFit, EngagementPoint,
    LessonSummary, LessonTrends, MonthlyTutorTrend, PeakHours, RetentionIndicators,
    SkillImprovement, StudentProgress, SubjectCount, SubjectPerformance, TrendPeriod, TrendPoint,
    TutorPerformance,
};
pub use report::{
    RenderedReport, ReportDocument, ReportFormat, ReportRenderer, ReportTable, describe_period,
    humanize_key, render_template,
};
pub use scoring::{LessonScoring, SuccessIndicators};
pub use service::AnalyticsService;
