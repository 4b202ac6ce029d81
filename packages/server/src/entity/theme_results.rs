use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "theme_results")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub theme_id: i32,
    #[sea_orm(belongs_to, from = "theme_id", to = "id")]
    pub theme: HasOne<super::theme::Entity>,

    /// Minimum rating sum for a submission to be accepted.
    pub accepted_threshold: i32,
}

impl ActiveModelBehavior for ActiveModel {}
