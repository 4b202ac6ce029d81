use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "author_reward")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub author_id: i32,
    #[sea_orm(belongs_to, from = "author_id", to = "id")]
    pub author: HasOne<super::author::Entity>,

    pub theme_id: i32,
    #[sea_orm(belongs_to, from = "theme_id", to = "id")]
    pub theme: HasOne<super::theme::Entity>,

    pub label: String,
}

impl ActiveModelBehavior for ActiveModel {}
