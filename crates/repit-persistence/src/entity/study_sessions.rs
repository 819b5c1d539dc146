//! Study session entity; scores are on a 0-100 scale

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "study_sessions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub student_id: i64,
    #[sea_orm(nullable)]
    pub subject: Option<String>,
    pub activity_type: String,
    #[sea_orm(nullable)]
    pub activity_id: Option<String>,
    pub started_at: DateTimeUtc,
    #[sea_orm(nullable)]
    pub ended_at: Option<DateTimeUtc>,
    pub duration_minutes: i64,
    #[sea_orm(nullable)]
    pub focus_score: Option<f64>,
    #[sea_orm(nullable)]
    pub productivity_score: Option<f64>,
    #[sea_orm(nullable)]
    pub satisfaction_score: Option<f64>,
    #[sea_orm(column_type = "Text", nullable)]
    pub notes: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
