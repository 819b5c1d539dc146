//! Lesson analytics entity
//!
//! Ratings and scores are on a 0-5 scale; `completion_rate` is 0-1.
//! `technical_issues`, `learning_objectives_met` and `topics_covered` are JSON
//! string arrays.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "lesson_records")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub lesson_id: i64,
    pub tutor_id: i64,
    pub student_id: i64,
    pub date: DateTimeUtc,
    pub subject: String,
    pub duration_minutes: i64,
    pub planned_duration: i64,
    pub status: String,
    pub attendance_status: String,
    pub completion_rate: f64,
    #[sea_orm(nullable)]
    pub tutor_rating: Option<f64>,
    #[sea_orm(nullable)]
    pub student_rating: Option<f64>,
    #[sea_orm(nullable)]
    pub parent_rating: Option<f64>,
    #[sea_orm(nullable)]
    pub difficulty_rating: Option<f64>,
    #[sea_orm(nullable)]
    pub engagement_score: Option<f64>,
    #[sea_orm(nullable)]
    pub punctuality_score: Option<f64>,
    pub student_questions: i64,
    pub was_rescheduled: bool,
    pub technical_issues: Json,
    pub learning_objectives_met: Json,
    pub topics_covered: Json,
    #[sea_orm(nullable)]
    pub homework_completion_previous: Option<bool>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
