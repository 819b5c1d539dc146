//! XP ledger entity, one row per grant

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "xp_transactions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub student_id: i64,
    /// `XpAction` wire name
    pub action: String,
    pub amount: i64,
    #[sea_orm(nullable)]
    pub lesson_id: Option<i64>,
    #[sea_orm(nullable)]
    pub homework_id: Option<i64>,
    pub description: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
