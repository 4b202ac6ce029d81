use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Off-site copy of one media file. Pending while `done` is NULL.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "file_backup")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub media_file_id: i32,
    #[sea_orm(belongs_to, from = "media_file_id", to = "id")]
    pub media_file: HasOne<super::media_file::Entity>,

    pub done: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
}

impl Model {
    pub fn is_pending(&self) -> bool {
        self.done.is_none()
    }
}

impl ActiveModelBehavior for ActiveModel {}
