//! Achievement catalogue entity
//!
//! `criteria` holds a JSON object of student metric name to minimum value.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "achievements")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub name: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    #[sea_orm(nullable)]
    pub icon_url: Option<String>,
    #[sea_orm(nullable)]
    pub badge_url: Option<String>,
    pub achievement_type: String,
    pub rarity: String,
    pub xp_reward: i64,
    pub criteria: Json,
    pub is_active: bool,
    pub is_hidden: bool,
    pub is_repeatable: bool,
    pub sort_order: i32,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
