use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

pub const GOLD: i32 = 1;
pub const SILVER: i32 = 2;
pub const BRONZE: i32 = 3;
pub const HONORABLE_MENTION: i32 = 4;

/// Display name of a reward kind, `None` for unknown kinds.
pub fn kind_name(kind: i32) -> Option<&'static str> {
    match kind {
        GOLD => Some("Gold"),
        SILVER => Some("Silver"),
        BRONZE => Some("Bronze"),
        HONORABLE_MENTION => Some("Honorable Mention"),
        _ => None,
    }
}

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "submission_reward")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub submission_id: i32,
    #[sea_orm(belongs_to, from = "submission_id", to = "id")]
    pub submission: HasOne<super::submission::Entity>,

    /// 1 = Gold, 2 = Silver, 3 = Bronze, 4 = Honorable Mention.
    pub kind: i32,
    pub label: String,
}

impl ActiveModelBehavior for ActiveModel {}
