use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "submission_set_member")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub submission_set_id: i32,
    #[sea_orm(primary_key, auto_increment = false)]
    pub submission_id: i32,
    #[sea_orm(belongs_to, from = "submission_set_id", to = "id")]
    pub submission_set: HasOne<super::submission_set::Entity>,
    #[sea_orm(belongs_to, from = "submission_id", to = "id")]
    pub submission: HasOne<super::submission::Entity>,
}

impl ActiveModelBehavior for ActiveModel {}
