use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One judge's score for one submission. Unique on (judge_id, submission_id).
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "rating")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub judge_id: i32,
    #[sea_orm(belongs_to, from = "judge_id", to = "id")]
    pub judge: HasOne<super::judge::Entity>,

    pub submission_id: i32,
    #[sea_orm(belongs_to, from = "submission_id", to = "id")]
    pub submission: HasOne<super::submission::Entity>,

    /// The judge's user, denormalised for listing a judge's own ratings.
    pub user_id: i32,
    #[sea_orm(belongs_to, from = "user_id", to = "id")]
    pub user: HasOne<super::user::Entity>,

    pub rating: i32,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
