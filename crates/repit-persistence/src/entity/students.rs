//! Student profile entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "students")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub user_id: i64,
    #[sea_orm(nullable)]
    pub display_name: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub bio: Option<String>,
    #[sea_orm(nullable)]
    pub avatar_url: Option<String>,
    pub level: i32,
    pub experience_points: i64,
    pub total_xp_earned: i64,
    pub lessons_completed: i64,
    pub homework_submitted: i64,
    pub homework_perfect: i64,
    pub materials_studied: i64,
    pub study_time_minutes: i64,
    pub current_streak: i32,
    pub best_streak: i32,
    #[sea_orm(nullable)]
    pub last_activity_date: Option<DateTimeUtc>,
    pub is_active: bool,
    pub is_premium: bool,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
