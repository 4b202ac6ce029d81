use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "media_file")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Blob key of the original, e.g. `photos/<sha256>.jpg`.
    #[sea_orm(unique)]
    pub file_key: String,
    /// Blob key of the JPEG thumbnail, e.g. `thumbs/<sha256>.jpg`.
    pub thumbnail_key: String,
    pub content_type: String,
    pub size: i64,
    pub width: i32,
    pub height: i32,

    pub user_id: i32,
    #[sea_orm(belongs_to, from = "user_id", to = "id")]
    pub user: HasOne<super::user::Entity>,

    /// NULL until the file is linked into a submission.
    pub submission_id: Option<i32>,
    #[sea_orm(belongs_to, from = "submission_id", to = "id")]
    pub submission: HasOne<super::submission::Entity>,

    #[sea_orm(has_many)]
    pub backups: HasMany<super::file_backup::Entity>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
